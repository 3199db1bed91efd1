use crate::libs::error::{LocError, Result};
use indexmap::IndexMap;
use std::io::BufRead;

/// The fixed header line of the parameter table.
pub const PARAM_HEADER: &str = "class;fold;f1;C;tol;l;y;class_weights";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassWeight {
    /// Weights inversely proportional to class frequencies
    Balanced,
    None,
}

impl ClassWeight {
    /// `auto` is what older tables write for `balanced`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "auto" | "balanced" => Some(ClassWeight::Balanced),
            "" | "none" | "None" => Some(ClassWeight::None),
            _ => None,
        }
    }
}

/// Kernel and SVM hyperparameters of one target class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassParameters {
    pub kmer: usize,
    pub sub_score: usize,
    pub c: f64,
    pub tol: f64,
    pub class_weight: ClassWeight,
}

impl ClassParameters {
    pub fn kernel_pair(&self) -> (usize, usize) {
        (self.kmer, self.sub_score)
    }
}

/// Class name => parameters, in table order.
pub type ParameterTable = IndexMap<String, ClassParameters>;

/// ```
/// let table = locnuc::libs::params::read_params("tests/predict/data/sn/sn_best_params").unwrap();
/// assert_eq!(table.keys().next().unwrap(), "Chromatin");
/// ```
pub fn read_params(path: &str) -> Result<ParameterTable> {
    log::debug!("Reading parameters from file {}", path);
    let reader = crate::reader(path)?;
    params_from_reader(reader, path)
}

pub fn params_from_reader<R: BufRead>(reader: R, origin: &str) -> Result<ParameterTable> {
    let mut table = ParameterTable::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line == PARAM_HEADER {
            continue;
        }
        let at = |msg: String| LocError::format(origin, format!("line {}: {}", idx + 1, msg));

        // Chromatin;fold_5;0.68622294052;1.0;0.1;4;7;auto
        let fields: Vec<&str> = line.split(';').map(str::trim).collect();
        if fields.len() < 8 {
            return Err(at(format!("expected 8 `;`-separated columns, found {}", fields.len())));
        }

        let class_name = fields[0].to_string();
        if class_name.is_empty() {
            return Err(at("empty class name".to_string()));
        }

        let c = parse_positive::<f64>(fields[3], "C").map_err(&at)?;
        let tol = parse_positive::<f64>(fields[4], "tolerance").map_err(&at)?;
        let kmer = parse_positive::<usize>(fields[5], "k-mer length").map_err(&at)?;
        let sub_score = parse_positive::<usize>(fields[6], "substitution score").map_err(&at)?;
        let class_weight = ClassWeight::from_token(fields[7])
            .ok_or_else(|| at(format!("unknown class weight mode `{}`", fields[7])))?;

        if table.contains_key(&class_name) {
            return Err(at(format!("class `{}` is listed twice", class_name)));
        }
        table.insert(
            class_name,
            ClassParameters {
                kmer,
                sub_score,
                c,
                tol,
                class_weight,
            },
        );
    }

    Ok(table)
}

fn parse_positive<T>(field: &str, what: &str) -> std::result::Result<T, String>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match field.parse::<T>() {
        Ok(v) if v > T::default() => Ok(v),
        Ok(_) => Err(format!("{} must be positive, got `{}`", what, field)),
        Err(_) => Err(format!("{} `{}` is not a number", what, field)),
    }
}

/// Distinct (k-mer length, substitution score) pairs, in first-use order.
pub fn kernel_pairs(table: &ParameterTable) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize)> = vec![];
    for params in table.values() {
        let pair = params.kernel_pair();
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs
}
