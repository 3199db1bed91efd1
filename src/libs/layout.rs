//! Where the precomputed data of a prediction target lives.
//!
//! ```text
//! <data>/my-string-kernel
//! <data>/blast_scripts/{psi-blast2hssp.pl,PrintBlastPredictions.jar}
//! <data>/<abbr>/<abbr>_best_params
//! <data>/<abbr>/<abbr>_lookup.fa
//! <data>/<abbr>/<abbr>_blastdb{.phr,.pin,.psq}
//! <data>/<abbr>/matrices/l{k}_y{y}.matrix
//! <data>/<abbr>/matrices/l{k}_y{y}.norm.matrix
//! <data>/<abbr>/matrices/<abbr>_train.{fasta,idList,psiBlastMat}
//! <data>/<abbr>/matrices/<abbr>.globals
//! ```

use crate::libs::error::{LocError, Result};
use crate::libs::kernel::KernelTool;
use std::path::{Path, PathBuf};

pub const STRING_KERNEL: &str = "my-string-kernel";
pub const DEFAULT_AMINO: &str = "/usr/share/fastprofkernel/data/Amino.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Sub-nuclear compartments
    Subnuclear,
    /// Nuclear travelling proteins
    Traveller,
}

impl Target {
    pub fn abbr(&self) -> &'static str {
        match self {
            Target::Subnuclear => "sn",
            Target::Traveller => "tr",
        }
    }

    /// BLAST e-value exponent, `1e{exp}`
    pub fn evalue_exponent(&self) -> i32 {
        match self {
            Target::Subnuclear => -20,
            Target::Traveller => -5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DataLayout {
    pub data_dir: PathBuf,
    pub target: Target,
    pub amino: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: &str, target: Target, amino: &str) -> Self {
        Self {
            data_dir: PathBuf::from(data_dir),
            target,
            amino: PathBuf::from(amino),
        }
    }

    pub fn target_dir(&self) -> PathBuf {
        self.data_dir.join(self.target.abbr())
    }

    pub fn matrix_dir(&self) -> PathBuf {
        self.target_dir().join("matrices")
    }

    fn in_matrix_dir(&self, suffix: &str) -> PathBuf {
        self.matrix_dir()
            .join(format!("{}{}", self.target.abbr(), suffix))
    }

    pub fn raw_matrix(&self, kmer: usize, sub_score: usize) -> PathBuf {
        self.matrix_dir().join(format!("l{}_y{}.matrix", kmer, sub_score))
    }

    pub fn norm_matrix(&self, kmer: usize, sub_score: usize) -> PathBuf {
        self.matrix_dir().join(format!("l{}_y{}.norm.matrix", kmer, sub_score))
    }

    pub fn train_fasta(&self) -> PathBuf {
        self.in_matrix_dir("_train.fasta")
    }

    pub fn train_ids(&self) -> PathBuf {
        self.in_matrix_dir("_train.idList")
    }

    pub fn train_kernel_input(&self) -> PathBuf {
        self.in_matrix_dir("_train.psiBlastMat")
    }

    pub fn globals(&self) -> PathBuf {
        self.in_matrix_dir(".globals")
    }

    pub fn best_params(&self) -> PathBuf {
        self.target_dir()
            .join(format!("{}_best_params", self.target.abbr()))
    }

    pub fn kernel_exe(&self) -> PathBuf {
        self.data_dir.join(STRING_KERNEL)
    }

    pub fn blast_db(&self) -> PathBuf {
        self.target_dir()
            .join(format!("{}_blastdb", self.target.abbr()))
    }

    pub fn lookup_fasta(&self) -> PathBuf {
        self.target_dir()
            .join(format!("{}_lookup.fa", self.target.abbr()))
    }

    pub fn hssp_script(&self) -> PathBuf {
        self.data_dir.join("blast_scripts").join("psi-blast2hssp.pl")
    }

    pub fn prediction_printer(&self) -> PathBuf {
        self.data_dir
            .join("blast_scripts")
            .join("PrintBlastPredictions.jar")
    }

    pub fn kernel_tool(&self) -> KernelTool {
        KernelTool {
            exe: self.kernel_exe(),
            train_ids: self.train_ids(),
            train_input: self.train_kernel_input(),
            amino: self.amino.clone(),
            globals: self.globals(),
        }
    }

    /// Files the classifier stage reads, for every (k, y) pair in use.
    pub fn check_classifier_files(&self, pairs: &[(usize, usize)]) -> Result<()> {
        for &(k, y) in pairs {
            file_check(&self.raw_matrix(k, y))?;
            file_check(&self.norm_matrix(k, y))?;
        }
        file_check(&self.train_fasta())?;
        file_check(&self.train_ids())?;
        file_check(&self.train_kernel_input())?;
        file_check(&self.globals())?;
        file_check(&self.kernel_exe())?;
        file_check(&self.amino)?;
        Ok(())
    }

    pub fn check_homology_files(&self) -> Result<()> {
        let db = self.blast_db().display().to_string();
        for ext in ["phr", "pin", "psq"] {
            file_check(Path::new(&format!("{}.{}", db, ext)))?;
        }
        file_check(&self.lookup_fasta())?;
        file_check(&self.hssp_script())?;
        file_check(&self.prediction_printer())?;
        Ok(())
    }
}

pub fn file_check(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LocError::setup(format!("file {} not available", path.display())))
    }
}

pub fn file_not_there_check(path: &Path) -> Result<()> {
    if path.exists() {
        Err(LocError::setup(format!("file {} exists already", path.display())))
    } else {
        Ok(())
    }
}
