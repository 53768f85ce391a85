// SPDX-License-Identifier: GPL-3.0-only

//! Per-filesystem-type behavior
//!
//! Everything that differs between network filesystems (device syntax,
//! service port, mount arguments) goes through [`FsStrategy`]. The parser and
//! the engine only ever talk to the trait, so supporting a new type means
//! registering one more strategy.

mod nfs;
mod smb;
mod sshfs;

use std::collections::HashMap;
use std::sync::Arc;

use stabbie_types::{Entry, MountInvocation, MountOptions, ProbeTarget, RemoteDevice};
use thiserror::Error;
use tracing::{debug, warn};

pub use nfs::NfsStrategy;
pub use smb::SmbStrategy;
pub use sshfs::SshfsStrategy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceSpecError {
    #[error("expected {expected}, got {device:?}")]
    Malformed {
        device: String,
        expected: &'static str,
    },

    #[error("missing host in {device:?}")]
    EmptyHost { device: String },

    #[error("missing remote path in {device:?}")]
    EmptyPath { device: String },
}

pub trait FsStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Filesystem type strings routed to this strategy
    fn fs_types(&self) -> &'static [&'static str];

    fn parse_device(&self, device: &str) -> Result<RemoteDevice, DeviceSpecError>;

    /// Well-known service port, `None` when the type has none
    fn default_port(&self) -> Option<u16>;

    /// Where to probe. A `port=` option overrides the default port and
    /// `port=0` (or no port at all) falls back to an address-layer check.
    fn probe_target(&self, device: &RemoteDevice, options: &MountOptions) -> ProbeTarget {
        let port = match options.value("port") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    debug!("Ignoring unparsable port option {:?}", raw);
                    self.default_port()
                }
            },
            None => self.default_port(),
        };

        match port {
            Some(port) if port != 0 => ProbeTarget::Service {
                host: device.host.clone(),
                port,
            },
            _ => {
                debug!(
                    "No service port for {} on {}, probing the host only",
                    self.name(),
                    device.host
                );
                ProbeTarget::Host {
                    host: device.host.clone(),
                }
            }
        }
    }

    /// Arguments for the OS mount call. The marker never reaches the OS.
    fn mount_invocation(&self, entry: &Entry, marker: &str) -> MountInvocation {
        MountInvocation {
            fs_type: entry.fs_type.clone(),
            source: entry.device.source().to_string(),
            target: entry.mount_point.clone(),
            options: entry.options.render_without(marker),
        }
    }
}

/// Routes filesystem types to strategies
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    routes: HashMap<&'static str, Arc<dyn FsStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// NFS, SMB/CIFS and SSHFS
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NfsStrategy));
        registry.register(Arc::new(SmbStrategy));
        registry.register(Arc::new(SshfsStrategy));
        registry
    }

    /// Route every type of `strategy` to it, replacing earlier routes.
    pub fn register(&mut self, strategy: Arc<dyn FsStrategy>) {
        for fs_type in strategy.fs_types() {
            if let Some(previous) = self.routes.insert(fs_type, strategy.clone()) {
                warn!(
                    "Filesystem type {} moved from {} to {}",
                    fs_type,
                    previous.name(),
                    strategy.name()
                );
            }
        }
    }

    pub fn get(&self, fs_type: &str) -> Option<&Arc<dyn FsStrategy>> {
        self.routes.get(fs_type)
    }

    pub fn supports(&self, fs_type: &str) -> bool {
        self.routes.contains_key(fs_type)
    }

    /// Sorted list of routed types
    pub fn supported_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.routes.keys().copied().collect();
        types.sort_unstable();
        types
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("types", &self.supported_types())
            .finish()
    }
}

/// Split `[v6addr]` brackets off a host, leaving other hosts untouched.
fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stabbie_types::DeviceSpec;
    use std::path::PathBuf;

    struct GlusterStrategy;

    impl FsStrategy for GlusterStrategy {
        fn name(&self) -> &'static str {
            "gluster"
        }

        fn fs_types(&self) -> &'static [&'static str] {
            &["glusterfs"]
        }

        fn parse_device(&self, device: &str) -> Result<RemoteDevice, DeviceSpecError> {
            let (host, volume) = device.split_once(':').ok_or(DeviceSpecError::Malformed {
                device: device.to_string(),
                expected: "host:volume",
            })?;
            Ok(RemoteDevice {
                source: device.to_string(),
                host: host.to_string(),
                remote_path: volume.to_string(),
                user: None,
            })
        }

        fn default_port(&self) -> Option<u16> {
            Some(24007)
        }
    }

    fn nas_device() -> RemoteDevice {
        RemoteDevice {
            source: "nas:/export".to_string(),
            host: "nas".to_string(),
            remote_path: "/export".to_string(),
            user: None,
        }
    }

    #[test]
    fn defaults_cover_network_filesystems() {
        let registry = StrategyRegistry::with_defaults();
        assert_eq!(
            registry.supported_types(),
            vec!["cifs", "fuse.sshfs", "nfs", "nfs4", "smb3", "sshfs"]
        );
        assert!(!registry.supports("ext4"));
        assert!(!registry.supports("NFS"));
    }

    #[test]
    fn new_types_plug_in_without_touching_defaults() {
        let mut registry = StrategyRegistry::with_defaults();
        registry.register(Arc::new(GlusterStrategy));
        let strategy = registry.get("glusterfs").expect("gluster registered");
        assert_eq!(strategy.name(), "gluster");
        assert!(registry.supports("nfs"));
    }

    #[test]
    fn port_option_overrides_default_port() {
        let options = MountOptions::parse("x-stabbie,port=20490");
        let target = NfsStrategy.probe_target(&nas_device(), &options);
        assert_eq!(
            target,
            ProbeTarget::Service {
                host: "nas".to_string(),
                port: 20490
            }
        );
    }

    #[test]
    fn port_zero_falls_back_to_host_probe() {
        let options = MountOptions::parse("x-stabbie,port=0");
        let target = NfsStrategy.probe_target(&nas_device(), &options);
        assert_eq!(
            target,
            ProbeTarget::Host {
                host: "nas".to_string()
            }
        );
    }

    #[test]
    fn unparsable_port_keeps_default() {
        let options = MountOptions::parse("port=nfs");
        let target = NfsStrategy.probe_target(&nas_device(), &options);
        assert_eq!(
            target,
            ProbeTarget::Service {
                host: "nas".to_string(),
                port: 2049
            }
        );
    }

    #[test]
    fn mount_invocation_drops_marker_only() {
        let entry = Entry {
            line: 1,
            device: DeviceSpec::Remote(nas_device()),
            mount_point: PathBuf::from("/mnt/a"),
            fs_type: "nfs".to_string(),
            options: MountOptions::parse("x-stabbie,noauto,vers=4.2"),
            dump: 0,
            pass: 0,
        };
        let invocation = NfsStrategy.mount_invocation(&entry, "x-stabbie");
        assert_eq!(invocation.fs_type, "nfs");
        assert_eq!(invocation.source, "nas:/export");
        assert_eq!(invocation.target, PathBuf::from("/mnt/a"));
        assert_eq!(invocation.options, "noauto,vers=4.2");
    }

    #[test]
    fn strips_ipv6_brackets() {
        assert_eq!(strip_brackets("[fe80::1]"), "fe80::1");
        assert_eq!(strip_brackets("nas"), "nas");
        assert_eq!(strip_brackets("[broken"), "[broken");
    }
}
