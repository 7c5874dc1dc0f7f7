use crate::cli::commands::validator_is_file;
use clap::{Arg, Command};

#[must_use]
pub fn command() -> Command {
    Command::new("put").about("Upload local files").arg(
        Arg::new("files")
            .help("Files to upload")
            .required(true)
            .num_args(1..)
            .value_parser(validator_is_file())
            .value_name("FILE"),
    )
}
