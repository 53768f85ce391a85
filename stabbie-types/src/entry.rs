// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::options::MountOptions;

/// One parsed line of the mount table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// 1-based line number in the table the entry came from
    pub line: usize,

    /// First field, typed by the strategy of the filesystem type
    pub device: DeviceSpec,

    /// Local mount point (escape sequences decoded)
    pub mount_point: PathBuf,

    /// Filesystem type (e.g. "nfs", "cifs", "fuse.sshfs")
    pub fs_type: String,

    pub options: MountOptions,

    /// Opaque, passed through
    pub dump: u32,

    /// Opaque, passed through
    pub pass: u32,
}

impl Entry {
    pub fn remote(&self) -> Option<&RemoteDevice> {
        match &self.device {
            DeviceSpec::Remote(remote) => Some(remote),
            DeviceSpec::Other { .. } => None,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.device.source(),
            self.mount_point.display(),
            self.fs_type,
            self.options,
            self.dump,
            self.pass
        )
    }
}

/// Lexical normal form used to compare mount points.
///
/// Drops trailing and repeated separators and interior `.` components. The
/// filesystem is never consulted: a stat on a dead network mount can hang.
pub fn normalize_mount_point(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Decode the `\ooo` octal escapes used for whitespace and backslashes in
/// fstab fields and in the kernel's mount tables.
pub fn unescape_mount_field(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut output = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'\\'
            && index + 3 < bytes.len()
            && bytes[index + 1..index + 4]
                .iter()
                .all(|byte| (b'0'..=b'7').contains(byte))
        {
            let octal = &value[index + 1..index + 4];
            if let Ok(num) = u8::from_str_radix(octal, 8) {
                output.push(num);
                index += 4;
                continue;
            }
        }

        output.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&output).into_owned()
}

/// Device field of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DeviceSpec {
    /// Network filesystem source split into host and remote path
    Remote(RemoteDevice),
    /// Any device string for a type without a strategy
    Other { source: String },
}

impl DeviceSpec {
    /// The device field as written in the table
    pub fn source(&self) -> &str {
        match self {
            DeviceSpec::Remote(remote) => &remote.source,
            DeviceSpec::Other { source } => source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDevice {
    /// Original device field, forwarded untouched to the mount call
    pub source: String,
    pub host: String,
    pub remote_path: String,
    /// Login name for types that carry one (`user@host:path`)
    pub user: Option<String>,
}

/// What the reachability probe should contact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProbeTarget {
    /// Transport-layer check against a service port
    Service { host: String, port: u16 },
    /// Address-layer check when the type has no usable port
    Host { host: String },
}

impl ProbeTarget {
    pub fn host(&self) -> &str {
        match self {
            ProbeTarget::Service { host, .. } | ProbeTarget::Host { host } => host,
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeTarget::Service { host, port } if host.contains(':') => {
                write!(f, "[{host}]:{port}")
            }
            ProbeTarget::Service { host, port } => write!(f, "{host}:{port}"),
            ProbeTarget::Host { host } => write!(f, "{host}"),
        }
    }
}

/// Arguments handed to the OS mount facility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountInvocation {
    pub fs_type: String,
    pub source: String,
    pub target: PathBuf,
    /// Comma-separated options with the marker already removed
    pub options: String,
}
