extern crate clap;
use clap::*;

mod cmd_locnuc;

fn main() -> anyhow::Result<()> {
    let app = Command::new("locnuc")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`locnuc` - Sub-nuclear localization prediction")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug messages to stderr"),
        )
        .subcommand(cmd_locnuc::predict::make_subcommand())
        .subcommand(cmd_locnuc::classify::make_subcommand())
        .subcommand(cmd_locnuc::diag::make_subcommand())
        .subcommand(cmd_locnuc::normalize::make_subcommand())
        .subcommand(cmd_locnuc::params::make_subcommand())
        .after_help(
            r###"Subcommands:

* Prediction:
    * predict   - Homology shortcut and string-kernel SVMs for a folder of proteins

* Inspection:
    * classify  - Train on a gram matrix and score query rows
    * diag      - Self-similarities of a training gram matrix
    * normalize - Normalize raw string-kernel output
    * params    - Show a parameter table

Logging goes to stderr, `-v` or RUST_LOG=debug for details.

"###,
        );

    let matches = app.get_matches();

    let level = if matches.get_flag("verbose") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match matches.subcommand() {
        Some(("predict", sub_matches)) => cmd_locnuc::predict::execute(sub_matches),
        Some(("classify", sub_matches)) => cmd_locnuc::classify::execute(sub_matches),
        Some(("diag", sub_matches)) => cmd_locnuc::diag::execute(sub_matches),
        Some(("normalize", sub_matches)) => cmd_locnuc::normalize::execute(sub_matches),
        Some(("params", sub_matches)) => cmd_locnuc::params::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
