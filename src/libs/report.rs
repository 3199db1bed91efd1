use crate::libs::error::{LocError, Result};
use crate::libs::protein::{Protein, ProteinSet};
use std::io::Write;
use std::path::Path;

pub const HEADER: &str = "# Sub-nuclear Localization Prediction using LocNuclei
#
# NOTATION Protein Id: Fasta sequences Id truncated by whitespace
# NOTATION Localization: Predicted sub-nuclear localization class
# NOTATION Source: s == svm, b == blast
#
# Protein Id\tLocalization\tSource
";

pub const HEADER_RI: &str = "# Sub-nuclear Localization Prediction using LocNuclei
#
# NOTATION Protein Id: Fasta sequences Id truncated by whitespace
# NOTATION Localization: Predicted sub-nuclear localization class
# NOTATION Source: s == svm, b == blast
# NOTATION Reliability Index (RI) between 0 and 100
#
# Protein Id\tLocalization\tSource\tRI
";

/// `{id} \t {loc} \t {src}[ \t {ri}]`
pub fn result_line(protein: &Protein, with_reliability: bool) -> String {
    let (loc, reliability) = if protein.has_prediction {
        (
            protein.localization.as_deref().unwrap_or("unknown"),
            protein.reliability.as_deref().unwrap_or("NA"),
        )
    } else {
        ("unknown", "NA")
    };

    if with_reliability {
        format!(
            "{} \t {} \t {} \t {}",
            protein.id,
            loc,
            protein.source_tag(),
            reliability
        )
    } else {
        format!("{} \t {} \t {}", protein.id, loc, protein.source_tag())
    }
}

pub fn write_report<W: Write>(writer: &mut W, proteins: &ProteinSet, with_reliability: bool) -> Result<()> {
    writer.write_all(if with_reliability { HEADER_RI } else { HEADER }.as_bytes())?;
    for protein in proteins.values() {
        writeln!(writer, "{}", result_line(protein, with_reliability))?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes next to `path` and moves into place at the end, an existing
/// `path` is never overwritten.
pub fn write_report_atomic(path: &Path, proteins: &ProteinSet, with_reliability: bool) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut buf = std::io::BufWriter::new(tmp.as_file_mut());
        write_report(&mut buf, proteins, with_reliability)?;
    }
    tmp.persist_noclobber(path).map_err(|e| {
        LocError::setup(format!("cannot create {}: {}", path.display(), e.error))
    })?;
    log::info!("Results written to {}", path.display());

    Ok(())
}
