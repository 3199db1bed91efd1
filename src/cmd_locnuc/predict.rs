use clap::*;
use locnuc::libs::layout::{DataLayout, Target, DEFAULT_AMINO};
use locnuc::libs::predictor::{HomologyMode, PredictOptions, Predictor};
use std::path::PathBuf;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("predict")
        .about("Predicts sub-nuclear localizations for a folder of proteins")
        .after_help(
            r###"
Every file in <fasta_dir> ending with --fasta-suffix is one query protein, its
identifier is the file name up to the first `.`. The profile of a protein is the
file in <profile_dir> with the same prefix.

Process:
1. Proteins with a close BLAST hit in the lookup set take over its locations
2. The string kernel is run once per (k-mer length, substitution score) pair
3. One SVM per class in the parameter table scores the remaining proteins
4. Results are written to <outfile>, which must not exist yet

Output:
* Comment header, then one line per protein
* `id \t localization \t source[ \t RI]`
* Source: s == svm, b == blast, NA == no prediction

Notes:
* --data-dir holds my-string-kernel, blast_scripts/ and one folder per target
* blastpgp, perl and java need to be in PATH unless --no-blast is given
* Scratch files go to a fresh temporary folder, or --temp-dir if given
* --debug keeps the scratch files
* Nothing is written when any step fails

Examples:
1. Sub-nuclear localizations:
   locnuc predict fasta/ profiles/ result.txt

2. Nuclear travellers, with reliability indices:
   locnuc predict fasta/ profiles/ result.txt -t --ri

3. Classifiers only, four threads:
   locnuc predict fasta/ profiles/ result.txt --no-blast -p 4

"###,
        )
        .arg(
            Arg::new("fasta_dir")
                .required(true)
                .index(1)
                .help("Folder with one FASTA file per query protein"),
        )
        .arg(
            Arg::new("profile_dir")
                .required(true)
                .index(2)
                .help("Folder with the BLAST profiles of the query proteins"),
        )
        .arg(
            Arg::new("outfile")
                .required(true)
                .index(3)
                .help("Result file"),
        )
        .arg(
            Arg::new("fasta_suffix")
                .long("fasta-suffix")
                .num_args(1)
                .default_value(".fasta")
                .help("Suffix of the FASTA files"),
        )
        .arg(
            Arg::new("profile_suffix")
                .long("profile-suffix")
                .num_args(1)
                .default_value(".profile")
                .help("Suffix of the profile files"),
        )
        .arg(
            Arg::new("data_dir")
                .long("data-dir")
                .num_args(1)
                .default_value("data")
                .help("Folder with the precomputed training data"),
        )
        .arg(
            Arg::new("amino")
                .long("amino")
                .num_args(1)
                .default_value(DEFAULT_AMINO)
                .help("Amino acid alphabet of the string kernel"),
        )
        .arg(
            Arg::new("temp_dir")
                .long("temp-dir")
                .num_args(1)
                .help("Existing folder for scratch files"),
        )
        .arg(
            Arg::new("traveller")
                .long("traveller")
                .short('t')
                .action(ArgAction::SetTrue)
                .help("Predict nuclear travellers instead of sub-nuclear compartments"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .short('d')
                .action(ArgAction::SetTrue)
                .help("Keep scratch files"),
        )
        .arg(
            Arg::new("only_blast")
                .long("only-blast")
                .short('b')
                .action(ArgAction::SetTrue)
                .conflicts_with("no_blast")
                .help("Only run the homology search"),
        )
        .arg(
            Arg::new("no_blast")
                .long("no-blast")
                .action(ArgAction::SetTrue)
                .help("Skip the homology search"),
        )
        .arg(
            Arg::new("ri")
                .long("ri")
                .action(ArgAction::SetTrue)
                .help("Report reliability indices"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of threads for the classifiers"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let target = if args.get_flag("traveller") {
        Target::Traveller
    } else {
        Target::Subnuclear
    };
    let layout = DataLayout::new(
        args.get_one::<String>("data_dir").unwrap(),
        target,
        args.get_one::<String>("amino").unwrap(),
    );

    let homology = if args.get_flag("only_blast") {
        HomologyMode::Only
    } else if args.get_flag("no_blast") {
        HomologyMode::Skip
    } else {
        HomologyMode::Full
    };

    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    if opt_parallel == 0 {
        anyhow::bail!("--parallel needs at least one thread");
    }

    let options = PredictOptions {
        fasta_dir: args.get_one::<String>("fasta_dir").unwrap().to_string(),
        fasta_suffix: args.get_one::<String>("fasta_suffix").unwrap().to_string(),
        profile_dir: args.get_one::<String>("profile_dir").unwrap().to_string(),
        profile_suffix: args.get_one::<String>("profile_suffix").unwrap().to_string(),
        outfile: PathBuf::from(args.get_one::<String>("outfile").unwrap()),
        layout,
        temp_dir: args.get_one::<String>("temp_dir").map(PathBuf::from),
        debug: args.get_flag("debug"),
        homology,
        reliability: args.get_flag("ri"),
        parallel: opt_parallel,
    };

    //----------------------------
    // Run
    //----------------------------
    let start = std::time::Instant::now();
    let proteins = Predictor::new(options).run()?;

    let predicted = proteins.values().filter(|p| p.has_prediction).count();
    log::info!(
        "{} of {} proteins predicted in {:.1?}",
        predicted,
        proteins.len(),
        start.elapsed()
    );

    Ok(())
}
