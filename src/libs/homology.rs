//! Homology shortcut: proteins with a close BLAST hit in the lookup set take
//! over the hit's annotated locations and skip the classifiers.

use crate::libs::annotation::parse_annotated_header;
use crate::libs::error::{LocError, Result};
use crate::libs::layout::{file_not_there_check, DataLayout, Target};
use crate::libs::protein::ProteinSet;
use indexmap::IndexMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Sequence identities at or below this carry no reliability.
pub const BLAST_MIN: f64 = 20.0;
pub const PREDICTION_FILE: &str = "blast.predictions";

/// Accession => location text of the lookup set.
pub type LookupTable = IndexMap<String, String>;

pub fn read_lookup(path: &str, traveller: bool) -> Result<LookupTable> {
    let reader = crate::reader(path)?;
    lookup_from_reader(reader, path, traveller)
}

pub fn lookup_from_reader<R: BufRead>(reader: R, origin: &str, traveller: bool) -> Result<LookupTable> {
    let mut table = LookupTable::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if !line.starts_with('>') {
            continue;
        }
        let (ac, mut locations) = parse_annotated_header(&line).ok_or_else(|| {
            LocError::format(
                origin,
                format!("line {}: header has fewer than 5 `#`-separated fields", idx + 1),
            )
        })?;
        if traveller {
            locations = if locations.contains("Traveller") {
                "Traveller.".to_string()
            } else {
                "NOT Traveller.".to_string()
            };
        }
        if table.contains_key(&ac) {
            return Err(LocError::format(
                origin,
                format!("accession {} occurs more than once", ac),
            ));
        }
        table.insert(ac, locations);
    }

    Ok(table)
}

/// `(identity - 20) * 100 / 80`, rounded to two decimals.
pub fn blast_reliability(seq_identity: f64) -> f64 {
    let scaled = (seq_identity - BLAST_MIN) * 100.0 / (100.0 - BLAST_MIN);
    (scaled * 100.0).round() / 100.0
}

/// Always shows the decimal point: `100.0`, `62.5`, `61.25`.
pub fn format_reliability(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HomologyHit {
    pub query: String,
    pub hit: String,
    pub seq_identity: f64,
}

/// Lines of `query hit seq_identity`, e.g. `A4Q9E5\tA4Q9E5\t100.0`.
pub fn parse_blast_predictions<R: BufRead>(reader: R, origin: &str) -> Result<Vec<HomologyHit>> {
    let mut hits = vec![];

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            continue;
        }
        if fields.len() < 3 {
            return Err(LocError::format(
                origin,
                format!("line {}: no sequence identity for {}", idx + 1, fields[0]),
            ));
        }
        let seq_identity = fields[2].parse::<f64>().map_err(|_| {
            LocError::format(
                origin,
                format!("line {}: sequence identity `{}` is not a number", idx + 1, fields[2]),
            )
        })?;
        hits.push(HomologyHit {
            query: fields[0].to_string(),
            hit: fields[1].to_string(),
            seq_identity,
        });
    }

    Ok(hits)
}

/// Marks the hit proteins. Returns the number of proteins predicted this way.
pub fn apply_hits(proteins: &mut ProteinSet, hits: &[HomologyHit], lookup: &LookupTable) -> Result<usize> {
    let mut count = 0;
    for hit in hits {
        let locations = lookup.get(&hit.hit).ok_or_else(|| {
            LocError::format(
                PREDICTION_FILE,
                format!("hit {} is not in the lookup set", hit.hit),
            )
        })?;
        match proteins.get_mut(&hit.query) {
            Some(protein) => {
                protein.has_homology_hit = true;
                protein.has_prediction = true;
                protein.localization = Some(locations.trim().to_string());
                protein.reliability = Some(format_reliability(blast_reliability(hit.seq_identity)));
                log::info!("BLAST hit: {} -> {} {}", hit.query, hit.hit, locations);
                count += 1;
            }
            None => {
                log::warn!("BLAST prediction for {} which is not a query protein", hit.query);
            }
        }
    }

    Ok(count)
}

fn run_tool(tool: &str, cmd: &mut Command) -> Result<()> {
    log::debug!("{:?}", cmd);
    let output = cmd.output().map_err(|e| LocError::ExternalTool {
        tool: tool.to_string(),
        status: "not started".to_string(),
        stderr: e.to_string(),
    })?;
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    if !output.status.success() {
        return Err(LocError::ExternalTool {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr,
        });
    }
    if stderr.contains("Use of uninitialized value $query") {
        return Err(LocError::ExternalTool {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: "query accession could not be determined from the input FASTA".to_string(),
        });
    }
    if !stderr.is_empty() {
        log::debug!("{}: {}", tool, stderr);
    }

    Ok(())
}

/// The blastpgp -> psi-blast2hssp.pl -> PrintBlastPredictions.jar chain,
/// run inside one scratch directory.
pub struct HomologySearch<'a> {
    layout: &'a DataLayout,
    scratch: &'a Path,
}

impl<'a> HomologySearch<'a> {
    pub fn new(layout: &'a DataLayout, scratch: &'a Path) -> Self {
        Self { layout, scratch }
    }

    pub fn check_tools() -> Result<()> {
        for tool in ["blastpgp", "perl", "java"] {
            if which::which(tool).is_err() {
                return Err(LocError::setup(format!(
                    "{} not found in PATH, it is needed for the homology search (see --no-blast)",
                    tool
                )));
            }
        }
        Ok(())
    }

    pub fn blast_args(&self, fasta: &Path, out: &Path) -> Vec<String> {
        vec![
            "-F".to_string(),
            "F".to_string(),
            "-a".to_string(),
            "1".to_string(),
            "-j".to_string(),
            "3".to_string(),
            "-b".to_string(),
            "150".to_string(),
            "-e".to_string(),
            format!("1e{}", self.layout.target.evalue_exponent()),
            "-h".to_string(),
            "1e-10".to_string(),
            "-d".to_string(),
            self.layout.blast_db().display().to_string(),
            "-i".to_string(),
            fasta.display().to_string(),
            "-o".to_string(),
            out.display().to_string(),
        ]
    }

    /// Runs the whole chain and marks the hit proteins. Every file created in
    /// the scratch directory is pushed onto `created`, also when a step fails.
    pub fn run(&self, proteins: &mut ProteinSet, created: &mut Vec<PathBuf>) -> Result<usize> {
        let lookup_path = self.layout.lookup_fasta().display().to_string();
        let lookup = read_lookup(&lookup_path, self.layout.target == Target::Traveller)?;
        log::info!("Read {} lookup proteins", lookup.len());

        for (id, protein) in proteins.iter() {
            let out = self.scratch.join(format!("{}.blastPsiOutTmp", id));
            file_not_there_check(&out)?;
            log::debug!("BLAST search for {}", id);

            created.push(out.clone());
            created.push(PathBuf::from(format!("{}.psiBlast2hssp", out.display())));
            run_tool(
                "blastpgp",
                Command::new("blastpgp").args(self.blast_args(&protein.fasta, &out)),
            )?;
        }

        run_tool(
            "psi-blast2hssp.pl",
            Command::new("perl")
                .arg(self.layout.hssp_script())
                .arg(self.scratch),
        )?;

        let prediction_file = self.scratch.join(PREDICTION_FILE);
        file_not_there_check(&prediction_file)?;
        created.push(prediction_file.clone());
        run_tool(
            "PrintBlastPredictions.jar",
            Command::new("java")
                .arg("-jar")
                .arg(self.layout.prediction_printer())
                .arg(self.scratch)
                .arg("maxSeqId")
                .arg(&prediction_file),
        )?;

        let origin = prediction_file.display().to_string();
        let hits = parse_blast_predictions(crate::reader(&origin)?, &origin)?;
        let count = apply_hits(proteins, &hits, &lookup)?;
        log::info!("{} of {} query proteins have a BLAST hit", count, proteins.len());

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::layout::DEFAULT_AMINO;
    use crate::libs::protein::Protein;
    use std::io::Cursor;

    const LOOKUP: &str = ">1#A4Q9E5#Homo sapiens#120#Nucleolus. PML body.
MKV
>2#P11111#Homo sapiens#80#Chromatin. Traveller.
MST
";

    #[test]
    fn test_lookup() {
        let table = lookup_from_reader(Cursor::new(LOOKUP), "lookup", false).unwrap();
        assert_eq!(table["A4Q9E5"], "Nucleolus. PML body.");

        let table = lookup_from_reader(Cursor::new(LOOKUP), "lookup", true).unwrap();
        assert_eq!(table["A4Q9E5"], "NOT Traveller.");
        assert_eq!(table["P11111"], "Traveller.");
    }

    #[test]
    fn test_lookup_duplicate() {
        let text = format!("{}{}", LOOKUP, ">3#A4Q9E5#x#1#Chromatin.\n");
        let err = lookup_from_reader(Cursor::new(text), "lookup", false).unwrap_err();
        assert!(matches!(err, LocError::Format { .. }));
    }

    #[test]
    fn test_reliability() {
        assert_eq!(blast_reliability(100.0), 100.0);
        assert_eq!(blast_reliability(70.0), 62.5);
        assert_eq!(blast_reliability(69.0), 61.25);
        assert_eq!(format_reliability(100.0), "100.0");
        assert_eq!(format_reliability(61.25), "61.25");
    }

    #[test]
    fn test_apply_hits() {
        let mut proteins: ProteinSet = ["Q1", "Q2"]
            .iter()
            .map(|id| (id.to_string(), Protein::new(id, PathBuf::from(format!("{}.fasta", id)))))
            .collect();
        let lookup = lookup_from_reader(Cursor::new(LOOKUP), "lookup", false).unwrap();
        let hits = parse_blast_predictions(
            Cursor::new("Q1\tA4Q9E5\t100.0\n\nQX\tP11111\t50\n"),
            "pred",
        )
        .unwrap();
        assert_eq!(hits.len(), 2);

        let count = apply_hits(&mut proteins, &hits, &lookup).unwrap();
        assert_eq!(count, 1);
        assert_eq!(proteins["Q1"].localization.as_deref(), Some("Nucleolus. PML body."));
        assert_eq!(proteins["Q1"].reliability.as_deref(), Some("100.0"));
        assert_eq!(proteins["Q1"].source_tag(), "b");
        assert!(!proteins["Q2"].has_homology_hit);

        let unknown = vec![HomologyHit {
            query: "Q2".to_string(),
            hit: "NOPE".to_string(),
            seq_identity: 90.0,
        }];
        assert!(apply_hits(&mut proteins, &unknown, &lookup).is_err());
    }

    #[test]
    fn test_blast_args() {
        let layout = DataLayout::new("data", Target::Traveller, DEFAULT_AMINO);
        let scratch = PathBuf::from("tmp");
        let search = HomologySearch::new(&layout, &scratch);
        let args = search.blast_args(Path::new("Q1.fasta"), Path::new("tmp/Q1.blastPsiOutTmp"));
        assert_eq!(args[9], "1e-5");
        assert_eq!(args[13], "data/tr/tr_blastdb");
    }
}
