// SPDX-License-Identifier: GPL-3.0-only

use stabbie_types::RemoteDevice;

use super::{DeviceSpecError, FsStrategy, strip_brackets};

pub const NFS_PORT: u16 = 2049;

/// `host:/export` devices
///
/// Port 2049 is probed for every protocol version. A `port=0` option asks
/// for rpcbind discovery, which is not done here: such entries get a host
/// probe instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct NfsStrategy;

impl FsStrategy for NfsStrategy {
    fn name(&self) -> &'static str {
        "nfs"
    }

    fn fs_types(&self) -> &'static [&'static str] {
        &["nfs", "nfs4"]
    }

    fn parse_device(&self, device: &str) -> Result<RemoteDevice, DeviceSpecError> {
        // Split on the last colon so bare IPv6 hosts keep theirs
        let (host, remote_path) = device.rsplit_once(':').ok_or(DeviceSpecError::Malformed {
            device: device.to_string(),
            expected: "host:/path",
        })?;

        let host = strip_brackets(host);
        if host.is_empty() {
            return Err(DeviceSpecError::EmptyHost {
                device: device.to_string(),
            });
        }
        if remote_path.is_empty() {
            return Err(DeviceSpecError::EmptyPath {
                device: device.to_string(),
            });
        }

        Ok(RemoteDevice {
            source: device.to_string(),
            host: host.to_string(),
            remote_path: remote_path.to_string(),
            user: None,
        })
    }

    fn default_port(&self) -> Option<u16> {
        Some(NFS_PORT)
    }
}
