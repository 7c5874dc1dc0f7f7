use crate::cli::commands::validator_is_url;
use clap::{Arg, Command};

#[must_use]
pub fn command() -> Command {
    Command::new("import")
        .about("Relay files from publicly accessible URLs")
        .arg(
            Arg::new("urls")
                .help("Download links, one per argument")
                .required(true)
                .num_args(1..)
                .value_parser(validator_is_url())
                .value_name("URL"),
        )
}
