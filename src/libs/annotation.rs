//! Annotated FASTA headers of the training and lookup sets.
//!
//! `>idx#ACCESSION#organism#length#Nucleolus. Chromatin.`
//! Field 1 is the accession, field 4 the `.`-separated location list.

use crate::libs::error::{LocError, Result};
use std::collections::HashSet;
use std::io::BufRead;

/// Split an annotated header into (accession, raw location text).
pub fn parse_annotated_header(line: &str) -> Option<(String, String)> {
    let header = line.strip_prefix('>')?;
    let cols: Vec<&str> = header.split('#').collect();
    if cols.len() < 5 {
        return None;
    }

    Some((cols[1].trim().to_string(), cols[4].trim().to_string()))
}

/// `Nucleolus. PML body.` => ["Nucleolus", "PML body"]
pub fn split_locations(text: &str) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Class names use underscores where locations may use spaces, and the
/// other way round.
pub fn location_matches(location: &str, class_name: &str) -> bool {
    location == class_name.replace(' ', "_") || location == class_name.replace('_', " ")
}

/// Accessions and locations of the training items, in gram-matrix order.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub ids: Vec<String>,
    pub locations: Vec<Vec<String>>,
}

impl TrainingSet {
    pub fn from_path(path: &str) -> Result<Self> {
        let reader = crate::reader(path)?;
        Self::from_reader(reader, path)
    }

    pub fn from_reader<R: BufRead>(reader: R, origin: &str) -> Result<Self> {
        let mut set = TrainingSet::default();
        let mut seen = HashSet::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if !line.starts_with('>') {
                continue;
            }
            let (ac, locations) = parse_annotated_header(&line).ok_or_else(|| {
                LocError::format(
                    origin,
                    format!("line {}: header has fewer than 5 `#`-separated fields", idx + 1),
                )
            })?;
            if !seen.insert(ac.clone()) {
                log::warn!("{}: accession {} occurs more than once", origin, ac);
            }
            set.ids.push(ac);
            set.locations.push(split_locations(&locations));
        }

        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Membership of every training item in `class_name`.
    pub fn labels(&self, class_name: &str) -> Vec<bool> {
        let labels: Vec<bool> = self
            .locations
            .iter()
            .map(|locs| locs.iter().any(|l| location_matches(l, class_name)))
            .collect();

        let positives = labels.iter().filter(|&&m| m).count();
        log::debug!(
            "For {} read {} positives and {} negatives",
            class_name,
            positives,
            labels.len() - positives
        );

        labels
    }
}

/// One membership per line: `1`, `+1` or `true` for members, `0`, `-1` or
/// `false` for the rest.
pub fn read_labels(path: &str) -> Result<Vec<bool>> {
    let reader = crate::reader(path)?;
    labels_from_reader(reader, path)
}

pub fn labels_from_reader<R: BufRead>(reader: R, origin: &str) -> Result<Vec<bool>> {
    let mut labels = vec![];
    for line in crate::libs::io::content_lines(reader) {
        let line = line?;
        let member = match line.as_str() {
            "1" | "+1" | "true" => true,
            "0" | "-1" | "false" => false,
            other => {
                return Err(LocError::format(
                    origin,
                    format!("label {}: `{}` is not a class membership", labels.len(), other),
                ))
            }
        };
        labels.push(member);
    }

    Ok(labels)
}
