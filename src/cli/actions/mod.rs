pub mod import;
pub mod put;

use crate::transfer::{TransferError, TransferOutcome};
use anyhow::{Result, anyhow};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Action {
    Put { files: Vec<PathBuf> },
    Import { urls: Vec<String> },
}

// print terminal outcomes; non-zero exit when anything failed
pub(crate) fn report(
    outcomes: &[TransferOutcome],
    rejected: &[(String, TransferError)],
) -> Result<()> {
    for (name, err) in rejected {
        eprintln!("{} {name}: {err}", "rejected".red());
    }

    let mut failed = rejected.len();

    for outcome in outcomes {
        match &outcome.result {
            Ok(key) => println!("{} {}: {key}", "done".green(), outcome.name),
            Err(err) => {
                failed += 1;
                eprintln!("{} {}: {err}", "failed".red(), outcome.name);
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!(
            "{failed} of {} transfers failed",
            outcomes.len() + rejected.len()
        ));
    }

    Ok(())
}
