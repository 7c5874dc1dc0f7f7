use crate::cli::actions::Action;
use anyhow::{Context, Result, anyhow};
use std::path::PathBuf;

// return Action based on the subcommand
/// # Errors
///
/// Will return `Err` if the arguments are missing
pub fn dispatch(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("put", sub_m)) => {
            let files: Vec<PathBuf> = sub_m
                .get_many::<PathBuf>("files")
                .context("file arguments missing")?
                .cloned()
                .collect();
            Ok(Action::Put { files })
        }

        Some(("import", sub_m)) => {
            let urls: Vec<String> = sub_m
                .get_many::<String>("urls")
                .context("url arguments missing")?
                .cloned()
                .collect();
            Ok(Action::Import { urls })
        }

        _ => Err(anyhow!("no subcommand provided")),
    }
}
