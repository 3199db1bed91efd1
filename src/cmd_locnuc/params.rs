use clap::*;
use locnuc::libs::params::{read_params, ClassWeight};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("params")
        .about("Shows a parameter table")
        .after_help(
            r###"
<table> is the semicolon-separated `<abbr>_best_params` file:

    class;fold;f1;C;tol;l;y;class_weights

Lines starting with `#` and the header line are skipped.

Output:
* `class \t l \t y \t C \t tol \t class_weights`, in table order

Examples:
1. Show the sub-nuclear classes:
   locnuc params data/sn/sn_best_params

"###,
        )
        .arg(
            Arg::new("table")
                .required(true)
                .index(1)
                .help("Parameter table"),
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
    let table = read_params(args.get_one::<String>("table").unwrap())?;
    let mut writer = locnuc::writer(args.get_one::<String>("outfile").unwrap())?;

    for (name, params) in &table {
        let weight = match params.class_weight {
            ClassWeight::Balanced => "balanced",
            ClassWeight::None => "none",
        };
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{}\t{}\t{}\n",
            name, params.kmer, params.sub_score, params.c, params.tol, weight
        ))?;
    }
    writer.flush()?;

    Ok(())
}
