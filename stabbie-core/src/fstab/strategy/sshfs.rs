// SPDX-License-Identifier: GPL-3.0-only

use stabbie_types::RemoteDevice;

use super::{DeviceSpecError, FsStrategy, strip_brackets};

pub const SSH_PORT: u16 = 22;

/// `[user@]host:[path]` devices
///
/// An empty path is the login directory of the remote user. The legacy
/// `sshfs#user@host:path` form used with `fuse` entries is accepted as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshfsStrategy;

impl FsStrategy for SshfsStrategy {
    fn name(&self) -> &'static str {
        "sshfs"
    }

    fn fs_types(&self) -> &'static [&'static str] {
        &["fuse.sshfs", "sshfs"]
    }

    fn parse_device(&self, device: &str) -> Result<RemoteDevice, DeviceSpecError> {
        let spec = device.strip_prefix("sshfs#").unwrap_or(device);

        let (user, rest) = match spec.split_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, spec),
        };

        // Bracketed hosts may contain colons, others end at the first one
        let (host, remote_path) = if rest.starts_with('[') {
            rest.split_once("]:")
                .map(|(host, path)| (&host[1..], path))
                .ok_or(DeviceSpecError::Malformed {
                    device: device.to_string(),
                    expected: "[user@]host:[path]",
                })?
        } else {
            rest.split_once(':').ok_or(DeviceSpecError::Malformed {
                device: device.to_string(),
                expected: "[user@]host:[path]",
            })?
        };

        let host = strip_brackets(host);
        if host.is_empty() {
            return Err(DeviceSpecError::EmptyHost {
                device: device.to_string(),
            });
        }

        Ok(RemoteDevice {
            source: device.to_string(),
            host: host.to_string(),
            remote_path: remote_path.to_string(),
            user: user.filter(|u| !u.is_empty()).map(str::to_string),
        })
    }

    fn default_port(&self) -> Option<u16> {
        Some(SSH_PORT)
    }
}
