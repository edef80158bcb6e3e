use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use smc_engine::summarize_checkpoint;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Checkpoint file written by `smc-cli run`.
    #[arg(long)]
    pub checkpoint: PathBuf,
    /// Print only the last stored step instead of the whole history.
    #[arg(long)]
    pub last: bool,
}

pub fn run(args: &InspectArgs) -> Result<(), Box<dyn Error>> {
    let mut summary = summarize_checkpoint(&args.checkpoint)?;
    if args.last {
        let keep = summary.steps.len().saturating_sub(1);
        summary.steps.drain(..keep);
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
