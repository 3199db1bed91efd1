use clap::*;
use locnuc::libs::gram::TrainingDiagonal;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("diag")
        .about("Extracts the self-similarities of a raw training gram matrix")
        .after_help(
            r###"
The first line of <matrix> is `row_count col_count`; the diagonal value of row i
is its i-th whitespace-separated field and has to be an integer.

Output:
* `index \t diagonal`, one line per training item

Examples:
1. Show the diagonal of a training matrix:
   locnuc diag data/sn/matrices/l3_y5.matrix

"###,
        )
        .arg(
            Arg::new("matrix")
                .required(true)
                .index(1)
                .help("Raw training gram matrix. [stdin] for standard input"),
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
    let diagonal = TrainingDiagonal::from_path(args.get_one::<String>("matrix").unwrap())?;
    let mut writer = locnuc::writer(args.get_one::<String>("outfile").unwrap())?;

    for (index, value) in diagonal.iter() {
        writer.write_fmt(format_args!("{}\t{}\n", index, value))?;
    }
    writer.flush()?;

    Ok(())
}
