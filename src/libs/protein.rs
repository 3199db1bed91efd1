use crate::libs::error::{LocError, Result};
use indexmap::IndexMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A query protein and its cumulative prediction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Protein {
    pub id: String,
    pub fasta: PathBuf,
    pub profile: Option<PathBuf>,
    pub has_homology_hit: bool,
    pub has_prediction: bool,
    /// `Nucleolus. Chromatin.`
    pub localization: Option<String>,
    /// `87. 61.` for the classifier, a sequence identity for homology hits
    pub reliability: Option<String>,
}

impl Protein {
    pub fn new(id: &str, fasta: PathBuf) -> Self {
        Self {
            id: id.to_string(),
            fasta,
            ..Default::default()
        }
    }

    /// `b` for homology hits, `s` for classifier predictions, `NA` otherwise.
    pub fn source_tag(&self) -> &'static str {
        if !self.has_prediction {
            "NA"
        } else if self.has_homology_hit {
            "b"
        } else {
            "s"
        }
    }
}

/// Query proteins keyed by identifier, in file-name order.
pub type ProteinSet = IndexMap<String, Protein>;

/// `Q9XLZ3.fasta` => `Q9XLZ3`
pub fn file_prefix(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let prefix = match name.find('.') {
        Some(pos) => &name[..pos],
        None => name,
    };
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_string())
    }
}

fn files_with_suffix(dir: &str, suffix: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(dir);
    if !path.is_dir() {
        return Err(LocError::setup(format!(
            "folder {} does not exist or is not reachable",
            dir
        )));
    }

    let mut files = vec![];
    for entry in std::fs::read_dir(path)? {
        let entry_path = entry?.path();
        let matches = entry_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(suffix))
            .unwrap_or(false);
        if matches && entry_path.is_file() {
            files.push(entry_path);
        }
    }
    files.sort();

    Ok(files)
}

/// One protein per FASTA file, with its profile attached by file prefix.
pub fn collect_proteins(
    fasta_dir: &str,
    fasta_suffix: &str,
    profile_dir: &str,
    profile_suffix: &str,
) -> Result<ProteinSet> {
    let mut proteins = ProteinSet::new();

    for fasta in files_with_suffix(fasta_dir, fasta_suffix)? {
        let id = file_prefix(&fasta)
            .ok_or_else(|| LocError::setup(format!("no protein id in {}", fasta.display())))?;
        if proteins.contains_key(&id) {
            return Err(LocError::setup(format!(
                "FASTA prefix {} is used by more than one file in {}",
                id, fasta_dir
            )));
        }
        proteins.insert(id.clone(), Protein::new(&id, fasta));
    }

    for profile in files_with_suffix(profile_dir, profile_suffix)? {
        let id = file_prefix(&profile).unwrap_or_default();
        match proteins.get_mut(&id) {
            Some(protein) => protein.profile = Some(profile),
            None => {
                return Err(LocError::setup(format!(
                    "found profile {} for which no FASTA file was provided",
                    profile.display()
                )))
            }
        }
    }

    log::info!("Read {} FASTA files from {}", proteins.len(), fasta_dir);

    Ok(proteins)
}

/// The single record of a query FASTA, renamed to `id`: `>{id}\n{sequence}\n`.
pub fn clean_fasta(path: &Path, id: &str) -> Result<Vec<u8>> {
    let origin = path.display().to_string();
    let reader = crate::reader(&origin)?;
    let mut fa_in = noodles_fasta::io::Reader::new(reader);

    let mut records = vec![];
    for result in fa_in.records() {
        let record = result.map_err(|e| LocError::format(&origin, e.to_string()))?;
        records.push(record);
    }
    if records.len() != 1 {
        return Err(LocError::format(
            &origin,
            format!("expected exactly one sequence, found {}", records.len()),
        ));
    }

    let seq: &[u8] = records[0].sequence().as_ref();
    let mut out = Vec::with_capacity(seq.len() + id.len() + 3);
    out.extend_from_slice(format!(">{}\n", id).as_bytes());
    out.extend_from_slice(seq);
    out.push(b'\n');

    Ok(out)
}

/// Write the query ID list and the combined sequence+profile kernel input,
/// both in `ids` order.
pub fn write_kernel_inputs(
    proteins: &ProteinSet,
    ids: &[String],
    id_file: &Path,
    input_file: &Path,
) -> Result<()> {
    let mut id_out = std::io::BufWriter::new(std::fs::File::create(id_file)?);
    let mut input_out = std::io::BufWriter::new(std::fs::File::create(input_file)?);

    for id in ids {
        let protein = proteins
            .get(id)
            .ok_or_else(|| LocError::setup(format!("unknown query protein {}", id)))?;
        let profile = protein.profile.as_ref().ok_or_else(|| {
            LocError::setup(format!("no profile file was provided for {}", id))
        })?;

        writeln!(id_out, "{}", id)?;
        input_out.write_all(&clean_fasta(&protein.fasta, id)?)?;
        input_out.write_all(&std::fs::read(profile)?)?;
    }
    id_out.flush()?;
    input_out.flush()?;

    Ok(())
}
