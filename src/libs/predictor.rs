//! One prediction run: homology shortcut, string kernel per (k, y) pair,
//! one SVM per class, results folded in parameter-table order.

use crate::libs::aggregate::{ClassOutcome, ResultAggregator};
use crate::libs::annotation::TrainingSet;
use crate::libs::classify::{ClassClassifier, ClassifierOptions};
use crate::libs::error::{LocError, Result};
use crate::libs::gram::{read_gram_matrix, TrainingDiagonal};
use crate::libs::homology::HomologySearch;
use crate::libs::kernel::{normalize_kernel_output, KernelTool};
use crate::libs::layout::{file_check, file_not_there_check, DataLayout};
use crate::libs::params::{kernel_pairs, read_params, ParameterTable};
use crate::libs::protein::{collect_proteins, write_kernel_inputs, ProteinSet};
use crate::libs::report::write_report_atomic;
use itertools::Itertools;
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

pub const QUERY_IDS_FILE: &str = "query_ids.lst";
pub const QUERY_KERNEL_INPUT_FILE: &str = "query_kernel_input.psiBlastMat";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomologyMode {
    /// Homology search, then classifiers for the rest
    Full,
    /// Stop after the homology search
    Only,
    /// Classifiers for every protein
    Skip,
}

#[derive(Debug, Clone)]
pub struct PredictOptions {
    pub fasta_dir: String,
    pub fasta_suffix: String,
    pub profile_dir: String,
    pub profile_suffix: String,
    pub outfile: PathBuf,
    pub layout: DataLayout,
    pub temp_dir: Option<PathBuf>,
    /// Keep scratch files
    pub debug: bool,
    pub homology: HomologyMode,
    pub reliability: bool,
    pub parallel: usize,
}

enum Scratch {
    Owned(tempfile::TempDir),
    Given(PathBuf),
}

impl Scratch {
    fn path(&self) -> &Path {
        match self {
            Scratch::Owned(dir) => dir.path(),
            Scratch::Given(path) => path,
        }
    }
}

/// Normalized training gram and query rows of one (k, y) pair.
struct KernelPair {
    gram: DMatrix<f64>,
    query: DMatrix<f64>,
}

pub struct Predictor {
    options: PredictOptions,
}

impl Predictor {
    pub fn new(options: PredictOptions) -> Self {
        Self { options }
    }

    fn uses_classifiers(&self) -> bool {
        self.options.homology != HomologyMode::Only
    }

    fn uses_homology(&self) -> bool {
        self.options.homology != HomologyMode::Skip
    }

    /// Everything the run will read exists, and nothing it will write does.
    pub fn self_check(&self, table: &ParameterTable) -> Result<()> {
        let layout = &self.options.layout;
        if self.uses_classifiers() {
            layout.check_classifier_files(&kernel_pairs(table))?;
        }
        if self.uses_homology() {
            layout.check_homology_files()?;
            HomologySearch::check_tools()?;
        }
        if let Some(dir) = &self.options.temp_dir {
            if !dir.is_dir() {
                return Err(LocError::setup(format!(
                    "folder {} does not exist or is not reachable",
                    dir.display()
                )));
            }
        }
        file_not_there_check(&self.options.outfile)?;

        Ok(())
    }

    /// Runs all stages and writes the result file. Nothing is written when
    /// any stage fails.
    pub fn run(&self) -> Result<ProteinSet> {
        let layout = &self.options.layout;
        let best_params = layout.best_params();
        file_check(&best_params)?;
        let table = read_params(&best_params.display().to_string())?;
        log::info!("Read parameters of {} classes", table.len());

        self.self_check(&table)?;

        let mut proteins = collect_proteins(
            &self.options.fasta_dir,
            &self.options.fasta_suffix,
            &self.options.profile_dir,
            &self.options.profile_suffix,
        )?;

        let scratch = match &self.options.temp_dir {
            Some(dir) => Scratch::Given(dir.clone()),
            None => Scratch::Owned(tempfile::TempDir::new()?),
        };
        log::info!("Working directory is {}", scratch.path().display());

        let mut created = vec![];
        let result = self.run_stages(&mut proteins, &table, scratch.path(), &mut created);
        self.clean_up(scratch, &created);
        result?;

        write_report_atomic(&self.options.outfile, &proteins, self.options.reliability)?;

        Ok(proteins)
    }

    fn clean_up(&self, scratch: Scratch, created: &[PathBuf]) {
        if self.options.debug {
            let kept = match scratch {
                Scratch::Owned(dir) => dir.into_path(),
                Scratch::Given(path) => path,
            };
            log::info!("Scratch files are kept in {}", kept.display());
            return;
        }

        for file in created {
            match std::fs::remove_file(file) {
                Ok(()) => log::debug!("Deleted {}", file.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Cannot delete {}: {}", file.display(), e),
            }
        }
        // an owned TempDir goes away on drop
    }

    fn run_stages(
        &self,
        proteins: &mut ProteinSet,
        table: &ParameterTable,
        scratch: &Path,
        created: &mut Vec<PathBuf>,
    ) -> Result<()> {
        if self.uses_homology() {
            HomologySearch::new(&self.options.layout, scratch).run(proteins, created)?;
        }
        if !self.uses_classifiers() {
            return Ok(());
        }

        let query_ids: Vec<String> = proteins
            .values()
            .filter(|p| !p.has_homology_hit)
            .map(|p| p.id.clone())
            .collect();
        if query_ids.is_empty() {
            log::info!("All query proteins were predicted by homology");
            return Ok(());
        }
        log::info!("Running the classifiers for {} query proteins", query_ids.len());

        let id_file = scratch.join(QUERY_IDS_FILE);
        let input_file = scratch.join(QUERY_KERNEL_INPUT_FILE);
        file_not_there_check(&id_file)?;
        file_not_there_check(&input_file)?;
        created.push(id_file.clone());
        created.push(input_file.clone());
        write_kernel_inputs(proteins, &query_ids, &id_file, &input_file)?;

        let outcomes = self.classify_all(table, &query_ids, &id_file, &input_file)?;
        ResultAggregator::new(proteins, &query_ids, self.options.reliability).fold_all(&outcomes)?;

        Ok(())
    }

    /// Verdicts of every class, in table order.
    fn classify_all(
        &self,
        table: &ParameterTable,
        query_ids: &[String],
        id_file: &Path,
        input_file: &Path,
    ) -> Result<Vec<ClassOutcome>> {
        let layout = &self.options.layout;
        let training = TrainingSet::from_path(&layout.train_fasta().display().to_string())?;
        let tool = layout.kernel_tool();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.parallel)
            .build()
            .map_err(|e| LocError::setup(e.to_string()))?;

        let entries: Vec<(usize, &String, _)> = table
            .iter()
            .enumerate()
            .map(|(idx, (name, params))| (idx, name, params))
            .collect();
        let mut outcomes: Vec<Option<ClassOutcome>> = vec![None; table.len()];

        for (kmer, sub_score) in kernel_pairs(table) {
            let classes: Vec<_> = entries
                .iter()
                .filter(|(_, _, p)| p.kernel_pair() == (kmer, sub_score))
                .collect();
            log::info!(
                "l{}_y{}: {}",
                kmer,
                sub_score,
                classes.iter().map(|(_, name, _)| name).join(", ")
            );

            let pair = self.kernel_pair(&tool, &training, query_ids, id_file, input_file, kmer, sub_score)?;

            let scored: Vec<(usize, ClassOutcome)> = pool.install(|| {
                classes
                    .par_iter()
                    .map(|(idx, name, params)| -> Result<(usize, ClassOutcome)> {
                        let members = training.labels(name);
                        let options = ClassifierOptions::from_params(params, self.options.reliability);
                        let clf = ClassClassifier::train(&pair.gram, &members, &options)?;
                        let verdicts = clf.score(&pair.query, self.options.reliability)?;
                        Ok((
                            *idx,
                            ClassOutcome {
                                class_name: name.to_string(),
                                verdicts,
                            },
                        ))
                    })
                    .collect::<Result<Vec<_>>>()
            })?;

            for (idx, outcome) in scored {
                outcomes[idx] = Some(outcome);
            }
        }

        outcomes
            .into_iter()
            .zip(table.keys())
            .map(|(outcome, name)| {
                outcome.ok_or_else(|| LocError::classifier(format!("class {} was not scored", name)))
            })
            .collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn kernel_pair(
        &self,
        tool: &KernelTool,
        training: &TrainingSet,
        query_ids: &[String],
        id_file: &Path,
        input_file: &Path,
        kmer: usize,
        sub_score: usize,
    ) -> Result<KernelPair> {
        let layout = &self.options.layout;

        let raw_path = layout.raw_matrix(kmer, sub_score).display().to_string();
        let diagonal = TrainingDiagonal::from_path(&raw_path)?;
        if diagonal.len() != training.len() {
            return Err(LocError::format(
                &raw_path,
                format!(
                    "{} training items in the matrix but {} in the training set",
                    diagonal.len(),
                    training.len()
                ),
            ));
        }

        let raw = tool.run(id_file, input_file, kmer, sub_score)?;
        let query = normalize_kernel_output(&raw, &diagonal)?;
        if query.nrows() != query_ids.len() {
            return Err(LocError::kernel(format!(
                "{} query rows for {} query proteins",
                query.nrows(),
                query_ids.len()
            )));
        }

        let norm_path = layout.norm_matrix(kmer, sub_score).display().to_string();
        let gram = read_gram_matrix(&norm_path)?;
        if gram.nrows() != diagonal.len() {
            return Err(LocError::format(
                &norm_path,
                format!(
                    "{} rows but the raw matrix has {}",
                    gram.nrows(),
                    diagonal.len()
                ),
            ));
        }

        Ok(KernelPair { gram, query })
    }
}
