use clap::*;
use locnuc::libs::annotation::read_labels;
use locnuc::libs::classify::{ClassClassifier, ClassifierOptions};
use locnuc::libs::gram::{read_dense_matrix, read_gram_matrix};
use locnuc::libs::params::ClassWeight;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("classify")
        .about("Trains one class on a gram matrix and scores query rows")
        .after_help(
            r###"
Inputs:
* <train_gram>: normalized training gram matrix with a `n n` header line
* <labels>: n lines of class membership, `1`/`+1`/`true` or `0`/`-1`/`false`
* <query_matrix>: headerless rows of n normalized similarities, as written by
  `locnuc normalize`

A query row is a member iff its decision value is strictly positive.

Output:
* `row \t decision \t verdict[ \t reliability]`
* verdict is `1` or `0`, reliability is `NA` on negative verdicts

Examples:
1. Score with the defaults (C = 1, tol = 0.001):
   locnuc classify l3_y5.norm.matrix labels.txt query.tsv

2. Balanced weights with reliability indices:
   locnuc classify l3_y5.norm.matrix labels.txt query.tsv --c 10 --balanced --ri

"###,
        )
        .arg(
            Arg::new("train_gram")
                .required(true)
                .index(1)
                .help("Normalized training gram matrix"),
        )
        .arg(
            Arg::new("labels")
                .required(true)
                .index(2)
                .help("Class membership of every training item"),
        )
        .arg(
            Arg::new("query_matrix")
                .required(true)
                .index(3)
                .help("Normalized query x train matrix. [stdin] for standard input"),
        )
        .arg(
            Arg::new("c")
                .long("c")
                .num_args(1)
                .default_value("1.0")
                .value_parser(value_parser!(f64))
                .help("Soft-margin penalty C"),
        )
        .arg(
            Arg::new("tol")
                .long("tol")
                .num_args(1)
                .default_value("0.001")
                .value_parser(value_parser!(f64))
                .help("Stopping tolerance of the solver"),
        )
        .arg(
            Arg::new("balanced")
                .long("balanced")
                .action(ArgAction::SetTrue)
                .help("Weight C inversely to the class frequencies"),
        )
        .arg(
            Arg::new("ri")
                .long("ri")
                .action(ArgAction::SetTrue)
                .help("Report reliability indices"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let gram = read_gram_matrix(args.get_one::<String>("train_gram").unwrap())?;
    let labels = read_labels(args.get_one::<String>("labels").unwrap())?;
    let query = read_dense_matrix(args.get_one::<String>("query_matrix").unwrap())?;
    let is_ri = args.get_flag("ri");

    let options = ClassifierOptions {
        c: *args.get_one::<f64>("c").unwrap(),
        tol: *args.get_one::<f64>("tol").unwrap(),
        class_weight: if args.get_flag("balanced") {
            ClassWeight::Balanced
        } else {
            ClassWeight::None
        },
        probability: is_ri,
    };

    //----------------------------
    // Ops
    //----------------------------
    let clf = ClassClassifier::train(&gram, &labels, &options)?;
    let decisions = clf.decision_function(&query)?;
    let verdicts = clf.verdicts(&decisions, is_ri)?;

    let mut writer = locnuc::writer(args.get_one::<String>("outfile").unwrap())?;
    for (row, (decision, verdict)) in decisions.iter().zip(verdicts.iter()).enumerate() {
        let flag = if verdict.positive { 1 } else { 0 };
        if is_ri {
            let ri = verdict
                .reliability
                .map(|r| r.to_string())
                .unwrap_or_else(|| "NA".to_string());
            writer.write_fmt(format_args!("{}\t{:.6}\t{}\t{}\n", row, decision, flag, ri))?;
        } else {
            writer.write_fmt(format_args!("{}\t{:.6}\t{}\n", row, decision, flag))?;
        }
    }
    writer.flush()?;

    Ok(())
}
