//! The `tabula compare` command.

use clap::Args;
use std::path::PathBuf;
use tabula_core::{compare_files, ComparisonOutcome};

/// Arguments for the `compare` command.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// JSON files to compare; the first one is the reference
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Print the outcome label on stdout and the diff on stderr. FAILED is an error exit.
pub async fn execute(args: CompareArgs) -> anyhow::Result<()> {
    let outcome = compare_files(&args.files).await;
    println!("{}", outcome.label());

    if let ComparisonOutcome::Failed(failure) = &outcome {
        eprintln!("{failure}");
        anyhow::bail!("Comparison failed");
    }
    Ok(())
}
