// SPDX-License-Identifier: GPL-3.0-only

use stabbie_types::RemoteDevice;

use super::{DeviceSpecError, FsStrategy, strip_brackets};

pub const SMB_PORT: u16 = 445;

/// `//host/share[/path]` devices for cifs and smb3
#[derive(Debug, Clone, Copy, Default)]
pub struct SmbStrategy;

impl FsStrategy for SmbStrategy {
    fn name(&self) -> &'static str {
        "smb"
    }

    fn fs_types(&self) -> &'static [&'static str] {
        &["cifs", "smb3"]
    }

    fn parse_device(&self, device: &str) -> Result<RemoteDevice, DeviceSpecError> {
        let normalized = device.replace('\\', "/");
        let rest = normalized
            .strip_prefix("//")
            .ok_or(DeviceSpecError::Malformed {
                device: device.to_string(),
                expected: "//host/share",
            })?;

        let (host, share) = rest.split_once('/').unwrap_or((rest, ""));
        let host = strip_brackets(host);
        if host.is_empty() {
            return Err(DeviceSpecError::EmptyHost {
                device: device.to_string(),
            });
        }
        let share = share.trim_end_matches('/');
        if share.is_empty() {
            return Err(DeviceSpecError::EmptyPath {
                device: device.to_string(),
            });
        }

        Ok(RemoteDevice {
            source: device.to_string(),
            host: host.to_string(),
            remote_path: format!("/{share}"),
            user: None,
        })
    }

    fn default_port(&self) -> Option<u16> {
        Some(SMB_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_host_and_share() {
        let device = SmbStrategy
            .parse_device("//nas.lan/media/films")
            .expect("valid share");
        assert_eq!(device.host, "nas.lan");
        assert_eq!(device.remote_path, "/media/films");
        assert_eq!(device.source, "//nas.lan/media/films");
    }

    #[test]
    fn accepts_backslash_notation() {
        let device = SmbStrategy
            .parse_device(r"\\nas\media")
            .expect("backslash share");
        assert_eq!(device.host, "nas");
        assert_eq!(device.remote_path, "/media");
        assert_eq!(device.source, r"\\nas\media");
    }

    #[test]
    fn rejects_missing_share() {
        assert!(matches!(
            SmbStrategy.parse_device("//nas"),
            Err(DeviceSpecError::EmptyPath { .. })
        ));
        assert!(matches!(
            SmbStrategy.parse_device("//nas/"),
            Err(DeviceSpecError::EmptyPath { .. })
        ));
        assert!(matches!(
            SmbStrategy.parse_device("nas:/media"),
            Err(DeviceSpecError::Malformed { .. })
        ));
        assert!(matches!(
            SmbStrategy.parse_device("///media"),
            Err(DeviceSpecError::EmptyHost { .. })
        ));
    }
}
