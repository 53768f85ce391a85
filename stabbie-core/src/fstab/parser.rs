// SPDX-License-Identifier: GPL-3.0-only

//! Mount table parsing and eligibility filtering

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use stabbie_types::{
    ConfigurationError, DeviceSpec, Entry, MountInvocation, MountOptions, ParseWarning,
    ProbeTarget, normalize_mount_point, unescape_mount_field,
};
use tracing::{debug, warn};

use super::strategy::StrategyRegistry;

/// Every entry of a table plus the lines that could not be read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTable {
    pub entries: Vec<Entry>,
    pub warnings: Vec<ParseWarning>,
}

/// An entry the engine will reconcile, with its strategy output resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleEntry {
    pub entry: Entry,
    pub target: ProbeTarget,
    pub invocation: MountInvocation,
}

/// Working set of a pass, in table order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibleSet {
    pub entries: Vec<EligibleEntry>,
    pub conflicts: Vec<ConfigurationError>,
}

impl EligibleSet {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct EntryParser<'a> {
    registry: &'a StrategyRegistry,
    marker: &'a str,
}

impl<'a> EntryParser<'a> {
    pub fn new(registry: &'a StrategyRegistry, marker: &'a str) -> Self {
        Self { registry, marker }
    }

    /// Parse table text line by line.
    ///
    /// Malformed lines end up in `warnings` and never stop the parse.
    pub fn parse(&self, text: &str) -> ParsedTable {
        let mut table = ParsedTable::default();

        for (index, raw_line) in text.lines().enumerate() {
            let line = index + 1;
            let trimmed = strip_comment(raw_line).trim();
            if trimmed.is_empty() {
                continue;
            }

            match self.parse_line(line, trimmed) {
                Ok(Some(entry)) => table.entries.push(entry),
                Ok(None) => {}
                Err(warning) => {
                    warn!("Skipping {}", warning);
                    table.warnings.push(warning);
                }
            }
        }

        debug!(
            "Parsed {} entries, {} warnings",
            table.entries.len(),
            table.warnings.len()
        );
        table
    }

    fn parse_line(&self, line: usize, text: &str) -> Result<Option<Entry>, ParseWarning> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        if !(4..=6).contains(&fields.len()) {
            return Err(ParseWarning::FieldCount {
                line,
                found: fields.len(),
            });
        }

        let dump = parse_number(line, "dump", fields.get(4))?;
        let pass = parse_number(line, "pass", fields.get(5))?;

        let device = unescape_mount_field(fields[0]);
        let mount_point = PathBuf::from(unescape_mount_field(fields[1]));
        let fs_type = fields[2].to_string();
        let options = MountOptions::parse(fields[3]);
        let marked = options.has_flag(self.marker);

        let device = match self.registry.get(&fs_type) {
            Some(strategy) => match strategy.parse_device(&device) {
                Ok(remote) => DeviceSpec::Remote(remote),
                Err(e) if marked => {
                    return Err(ParseWarning::DeviceSpec {
                        line,
                        fs_type,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    debug!("Line {}: ignoring unmarked entry: {}", line, e);
                    return Ok(None);
                }
            },
            None => DeviceSpec::Other { source: device },
        };

        if marked && matches!(device, DeviceSpec::Remote(_)) && !mount_point.is_absolute() {
            return Err(ParseWarning::RelativeMountPoint { line, mount_point });
        }

        Ok(Some(Entry {
            line,
            device,
            mount_point: normalize_mount_point(&mount_point),
            fs_type,
            options,
            dump,
            pass,
        }))
    }

    /// Narrow parsed entries to the working set.
    ///
    /// Ineligible entries are dropped without a warning. Entries sharing a
    /// mount point are all excluded and reported as a conflict.
    pub fn eligible(&self, entries: &[Entry]) -> EligibleSet {
        let mut candidates = Vec::new();
        for entry in entries {
            let Some(resolved) = self.resolve(entry) else {
                debug!("Line {}: not eligible", entry.line);
                continue;
            };
            candidates.push(resolved);
        }

        let mut claims: HashMap<&Path, Vec<usize>> = HashMap::new();
        let mut order: Vec<&Path> = Vec::new();
        for candidate in &candidates {
            let lines = claims
                .entry(candidate.entry.mount_point.as_path())
                .or_insert_with(|| {
                    order.push(candidate.entry.mount_point.as_path());
                    Vec::new()
                });
            lines.push(candidate.entry.line);
        }

        let conflicts: Vec<ConfigurationError> = order
            .into_iter()
            .filter_map(|mount_point| {
                let lines = &claims[mount_point];
                (lines.len() > 1).then(|| ConfigurationError::DuplicateMountPoint {
                    mount_point: mount_point.to_path_buf(),
                    lines: lines.clone(),
                })
            })
            .collect();

        for conflict in &conflicts {
            warn!("{}", conflict);
        }

        let duplicated: Vec<PathBuf> = claims
            .iter()
            .filter(|(_, lines)| lines.len() > 1)
            .map(|(mount_point, _)| mount_point.to_path_buf())
            .collect();
        let entries = candidates
            .into_iter()
            .filter(|candidate| !duplicated.contains(&candidate.entry.mount_point))
            .collect();

        EligibleSet { entries, conflicts }
    }

    fn resolve(&self, entry: &Entry) -> Option<EligibleEntry> {
        if !entry.options.has_flag(self.marker) {
            return None;
        }
        let strategy = self.registry.get(&entry.fs_type)?;
        let remote = entry.remote()?;

        Some(EligibleEntry {
            entry: entry.clone(),
            target: strategy.probe_target(remote, &entry.options),
            invocation: strategy.mount_invocation(entry, self.marker),
        })
    }
}

/// Cut the line at the first `#` that starts a field.
///
/// A `#` inside a field (a share named `data#2`) is kept.
fn strip_comment(line: &str) -> &str {
    let mut previous = None;
    for (index, c) in line.char_indices() {
        if c == '#' && previous.is_none_or(char::is_whitespace) {
            return &line[..index];
        }
        previous = Some(c);
    }
    line
}

fn parse_number(line: usize, field: &str, value: Option<&&str>) -> Result<u32, ParseWarning> {
    match value {
        None => Ok(0),
        Some(value) => value
            .parse::<u32>()
            .map_err(|_| ParseWarning::InvalidNumber {
                line,
                field: field.to_string(),
                value: value.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
# <device> <mount point> <type> <options> <dump> <pass>
UUID=1234-abcd  /      ext4  defaults             0 1

10.0.0.5:/export   /mnt/a   nfs   x-stabbie,noauto   0 0
10.0.0.5:/media    /mnt/b   nfs   noauto             0 0
//nas/share        /mnt/c   cifs  x-stabbie,guest    0 0
tmpfs              /tmp     tmpfs x-stabbie          0 0
";

    fn parser(registry: &StrategyRegistry) -> EntryParser<'_> {
        EntryParser::new(registry, "x-stabbie")
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let registry = StrategyRegistry::with_defaults();
        let table = parser(&registry).parse(TABLE);

        assert!(table.warnings.is_empty());
        let lines: Vec<usize> = table.entries.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 4, 5, 6, 7]);
    }

    #[test]
    fn typed_fields_are_filled_in() {
        let registry = StrategyRegistry::with_defaults();
        let table =
            parser(&registry).parse("10.0.0.5:/export /mnt/a nfs x-stabbie,noauto 0 0\n");

        let entry = &table.entries[0];
        let remote = entry.remote().expect("nfs device is remote");
        assert_eq!(remote.host, "10.0.0.5");
        assert_eq!(remote.remote_path, "/export");
        assert_eq!(entry.mount_point, PathBuf::from("/mnt/a"));
        assert!(entry.options.has_flag("x-stabbie"));
        assert!(entry.options.has_flag("noauto"));
        assert_eq!((entry.dump, entry.pass), (0, 0));
    }

    #[test]
    fn eligibility_needs_marker_and_supported_type() {
        let registry = StrategyRegistry::with_defaults();
        let parser = parser(&registry);
        let table = parser.parse(TABLE);
        let set = parser.eligible(&table.entries);

        let mount_points: Vec<PathBuf> = set
            .entries
            .iter()
            .map(|e| e.entry.mount_point.clone())
            .collect();
        assert_eq!(
            mount_points,
            vec![PathBuf::from("/mnt/a"), PathBuf::from("/mnt/c")]
        );
        assert!(set.conflicts.is_empty());
    }

    #[test]
    fn eligible_entry_carries_probe_target_and_invocation() {
        let registry = StrategyRegistry::with_defaults();
        let parser = parser(&registry);
        let table = parser.parse("//nas/share /mnt/c cifs x-stabbie,guest 0 0\n");
        let set = parser.eligible(&table.entries);

        let eligible = &set.entries[0];
        assert_eq!(
            eligible.target,
            ProbeTarget::Service {
                host: "nas".to_string(),
                port: 445
            }
        );
        assert_eq!(eligible.invocation.options, "guest");
        assert_eq!(eligible.invocation.source, "//nas/share");
    }

    #[test]
    fn malformed_line_warns_and_parsing_continues() {
        let registry = StrategyRegistry::with_defaults();
        let parser = parser(&registry);
        let text = "\
10.0.0.5:/a /mnt/a nfs x-stabbie 0 0
garbage-without-fields
10.0.0.5:/b /mnt/b nfs x-stabbie 0 0
10.0.0.5:/c /mnt/c nfs x-stabbie 0 0
";
        let table = parser.parse(text);
        assert_eq!(
            table.warnings,
            vec![ParseWarning::FieldCount { line: 2, found: 1 }]
        );
        assert_eq!(parser.eligible(&table.entries).entries.len(), 3);
    }

    #[test]
    fn dump_and_pass_are_optional_but_numeric() {
        let registry = StrategyRegistry::with_defaults();
        let parser = parser(&registry);
        let text = "\
10.0.0.5:/a /mnt/a nfs x-stabbie
10.0.0.5:/b /mnt/b nfs x-stabbie 1 two
10.0.0.5:/c /mnt/c nfs x-stabbie 0 0 extra
";
        let table = parser.parse(text);
        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.entries[0].dump, 0);
        assert_eq!(
            table.warnings,
            vec![
                ParseWarning::InvalidNumber {
                    line: 2,
                    field: "pass".to_string(),
                    value: "two".to_string()
                },
                ParseWarning::FieldCount { line: 3, found: 7 },
            ]
        );
    }

    #[test]
    fn escaped_whitespace_is_decoded() {
        let registry = StrategyRegistry::with_defaults();
        let table =
            parser(&registry).parse("//nas/my\\040share /mnt/my\\040share cifs x-stabbie 0 0\n");
        let entry = &table.entries[0];
        assert_eq!(entry.mount_point, PathBuf::from("/mnt/my share"));
        assert_eq!(entry.device.source(), "//nas/my share");
    }

    #[test]
    fn bad_device_warns_only_when_marked() {
        let registry = StrategyRegistry::with_defaults();
        let parser = parser(&registry);
        let text = "\
not-a-share /mnt/a cifs x-stabbie 0 0
not-a-share /mnt/b cifs defaults 0 0
";
        let table = parser.parse(text);
        assert!(table.entries.is_empty());
        assert_eq!(table.warnings.len(), 1);
        assert!(matches!(
            table.warnings[0],
            ParseWarning::DeviceSpec { line: 1, .. }
        ));
    }

    #[test]
    fn relative_mount_point_is_rejected_for_marked_entries() {
        let registry = StrategyRegistry::with_defaults();
        let table = parser(&registry).parse("nas:/export mnt/a nfs x-stabbie 0 0\n");
        assert!(table.entries.is_empty());
        assert_eq!(
            table.warnings,
            vec![ParseWarning::RelativeMountPoint {
                line: 1,
                mount_point: PathBuf::from("mnt/a")
            }]
        );
    }

    #[test]
    fn duplicate_mount_points_are_all_excluded() {
        let registry = StrategyRegistry::with_defaults();
        let parser = parser(&registry);
        let text = "\
10.0.0.5:/a /mnt/a  nfs x-stabbie 0 0
10.0.0.6:/a /mnt/a/ nfs x-stabbie 0 0
10.0.0.5:/b /mnt/b  nfs x-stabbie 0 0
10.0.0.7:/a /mnt/a  nfs noauto    0 0
";
        let table = parser.parse(text);
        let set = parser.eligible(&table.entries);

        assert_eq!(set.entries.len(), 1);
        assert_eq!(set.entries[0].entry.mount_point, PathBuf::from("/mnt/b"));
        assert_eq!(
            set.conflicts,
            vec![ConfigurationError::DuplicateMountPoint {
                mount_point: PathBuf::from("/mnt/a"),
                lines: vec![1, 2],
            }]
        );
    }

    #[test]
    fn trailing_comment_is_ignored() {
        let registry = StrategyRegistry::with_defaults();
        let parser = parser(&registry);
        let table = parser.parse("nas:/e /mnt/a nfs x-stabbie 0 0 # home nas\n");

        assert!(table.warnings.is_empty());
        assert_eq!(table.entries.len(), 1);
        assert_eq!(parser.eligible(&table.entries).entries.len(), 1);
    }

    #[test]
    fn hash_inside_a_field_is_not_a_comment() {
        let registry = StrategyRegistry::with_defaults();
        let table = parser(&registry).parse("//nas/data#2 /mnt/d cifs x-stabbie#note\n");

        assert!(table.warnings.is_empty());
        assert_eq!(table.entries[0].device.source(), "//nas/data#2");
        assert!(table.entries[0].options.has_flag("x-stabbie#note"));
        assert_eq!(strip_comment("  # only a comment"), "  ");
    }

    #[test]
    fn repeated_options_reach_the_mount_call_in_order() {
        let registry = StrategyRegistry::with_defaults();
        let parser = parser(&registry);
        let table = parser.parse("nas:/e /mnt/a nfs ro,x-stabbie,rw,ro 0 0\n");
        let set = parser.eligible(&table.entries);

        assert_eq!(set.entries[0].invocation.options, "ro,rw,ro");
    }

    #[test]
    fn marker_is_configurable() {
        let registry = StrategyRegistry::with_defaults();
        let parser = EntryParser::new(&registry, "x-automount");
        let text = "\
10.0.0.5:/a /mnt/a nfs x-stabbie 0 0
10.0.0.5:/b /mnt/b nfs x-automount 0 0
";
        let table = parser.parse(text);
        let set = parser.eligible(&table.entries);
        assert_eq!(set.entries.len(), 1);
        assert_eq!(set.entries[0].invocation.options, "");
    }
}
