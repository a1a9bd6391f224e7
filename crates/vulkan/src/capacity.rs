// Copyright 2026 The Prism Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Persisted Capacity
//!
//! Descriptor totals observed by a previous run, stored as plain text:
//!
//! ```text
//! NumSets 12
//! Sampler 0
//! CombinedImageSampler 9
//! ...
//! ```
//!
//! The file is a hint.  A missing, stale or garbled file costs a few extra pools on the next run,
//! so `load` never fails.  It logs and returns `None`.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::binding::DescriptorKind;
use crate::descriptors::DescriptorCounts;

const SETS_KEY: &str = "NumSets";

#[derive(thiserror::Error, Debug)]
pub enum CapacityError {
    #[error("capacity file I/O: {0}")]
    Io(#[from] io::Error),

    #[error("capacity file line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("capacity file has no {SETS_KEY} line")]
    MissingSets,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PersistedCapacity {
    pub counts: DescriptorCounts,
}

impl PersistedCapacity {
    /// Unknown descriptor type names are skipped so that files written by other builds still load.
    pub fn parse(text: &str) -> Result<Self, CapacityError> {
        let mut counts = DescriptorCounts::default();
        let mut seen_sets = false;

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let mut fields = raw.split_whitespace();
            let (Some(name), Some(value), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(CapacityError::Parse {
                    line,
                    reason: format!("expected `<name> <count>`, got {raw:?}"),
                });
            };
            let value: u32 = value.parse().map_err(|e| CapacityError::Parse {
                line,
                reason: format!("{value:?}: {e}"),
            })?;

            if name == SETS_KEY {
                counts.sets = value;
                seen_sets = true;
            } else if let Some(kind) = DescriptorKind::from_name(name) {
                counts[kind] = value;
            } else {
                warn!(line, name, "skipping unknown descriptor type in capacity file");
            }
        }

        if !seen_sets {
            return Err(CapacityError::MissingSets);
        }
        Ok(Self { counts })
    }

    /// Every descriptor kind is written, zero or not.
    pub fn to_text(&self) -> String {
        let mut text = format!("{SETS_KEY} {}\n", self.counts.sets);
        for (kind, count) in self.counts.iter() {
            text.push_str(&format!("{} {count}\n", kind.name()));
        }
        text
    }

    /// `None` when the file is absent or unusable.
    pub fn load(path: &Path) -> Option<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no persisted descriptor capacity");
                return None;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read descriptor capacity");
                return None;
            }
        };
        match Self::parse(&text) {
            Ok(capacity) => {
                info!(path = %path.display(), capacity = %capacity.counts, "loaded descriptor capacity");
                Some(capacity)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring descriptor capacity file");
                None
            }
        }
    }

    /// Overwrites `path`, creating parent directories as needed.
    pub fn store(&self, path: &Path) -> Result<(), CapacityError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_text())?;
        info!(path = %path.display(), capacity = %self.counts, "persisted descriptor capacity");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_text_format() {
        let mut counts = DescriptorCounts::with_sets(3);
        counts[DescriptorKind::UniformBuffer] = 4;
        counts[DescriptorKind::CombinedImageSampler] = 2;
        let text = PersistedCapacity { counts }.to_text();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + DescriptorKind::COUNT);
        assert_eq!(lines[0], "NumSets 3");
        assert!(lines.contains(&"UniformBuffer 4"));
        assert!(lines.contains(&"CombinedImageSampler 2"));
        assert!(lines.contains(&"InputAttachment 0"));

        assert_eq!(PersistedCapacity::parse(&text).unwrap().counts, counts);
    }

    #[test]
    fn test_parse_tolerates_unknown_types() {
        let parsed = PersistedCapacity::parse(
            "NumSets 2\n\nUniformBuffer 5\nAccelerationStructure 7\n  StorageImage 1  \n",
        )
        .unwrap();
        assert_eq!(parsed.counts.sets, 2);
        assert_eq!(parsed.counts[DescriptorKind::UniformBuffer], 5);
        assert_eq!(parsed.counts[DescriptorKind::StorageImage], 1);
        assert_eq!(parsed.counts.descriptors(), 6);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            PersistedCapacity::parse("UniformBuffer 5\n"),
            Err(CapacityError::MissingSets)
        ));
        assert!(matches!(
            PersistedCapacity::parse("NumSets 2\nUniformBuffer five\n"),
            Err(CapacityError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            PersistedCapacity::parse("NumSets 2 3\n"),
            Err(CapacityError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_load_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("capacity.txt");
        assert_eq!(PersistedCapacity::load(&path), None);

        let mut counts = DescriptorCounts::with_sets(7);
        counts[DescriptorKind::StorageBuffer] = 9;
        let capacity = PersistedCapacity { counts };
        capacity.store(&path).unwrap();
        assert_eq!(PersistedCapacity::load(&path), Some(capacity));

        // Overwrites rather than appends.
        let smaller = PersistedCapacity {
            counts: DescriptorCounts::with_sets(1),
        };
        smaller.store(&path).unwrap();
        assert_eq!(PersistedCapacity::load(&path), Some(smaller));

        fs::write(&path, "garbage").unwrap();
        assert_eq!(PersistedCapacity::load(&path), None);
    }
}
