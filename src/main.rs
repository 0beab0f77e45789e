mod cli;
mod execute;

use clap::Parser;
use impmap::logging;
use crate::cli::CLI;
use anyhow::{anyhow, Result};

fn main() -> Result<()>{
    let cli = CLI::parse();
    logging::init(cli.verbose).map_err(|e| anyhow!(e))?;
    execute::execute(cli)
}
