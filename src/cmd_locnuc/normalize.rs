use clap::*;
use itertools::Itertools;
use locnuc::libs::gram::TrainingDiagonal;
use locnuc::libs::kernel::normalize_kernel_output;
use std::io::Read;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("normalize")
        .about("Normalizes raw string-kernel output against a training matrix")
        .after_help(
            r###"
<kernel_output> is what my-string-kernel prints: an optional banner line, a
`row_count col_count` header and one row per query protein with `col_count`
raw similarities followed by the query's self-similarity.

Every value becomes `raw / sqrt(diagonal[col] * self_hit)`, the diagonal coming
from --matrix.

Output:
* One tab-separated row per query protein, `col_count` columns

Examples:
1. Normalize a saved kernel block:
   locnuc normalize kernel.out --matrix data/sn/matrices/l3_y5.matrix

2. Straight from the kernel tool:
   my-string-kernel ... | locnuc normalize stdin --matrix l3_y5.matrix

"###,
        )
        .arg(
            Arg::new("kernel_output")
                .required(true)
                .index(1)
                .help("Raw kernel block. [stdin] for standard input"),
        )
        .arg(
            Arg::new("matrix")
                .long("matrix")
                .short('m')
                .required(true)
                .num_args(1)
                .help("Raw training gram matrix holding the diagonal"),
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

    let mut raw = vec![];
    locnuc::reader(args.get_one::<String>("kernel_output").unwrap())?.read_to_end(&mut raw)?;
    let matrix = normalize_kernel_output(&raw, &diagonal)?;

    let mut writer = locnuc::writer(args.get_one::<String>("outfile").unwrap())?;
    for row in matrix.row_iter() {
        writer.write_fmt(format_args!("{}\n", row.iter().join("\t")))?;
    }
    writer.flush()?;

    Ok(())
}
