// SPDX-License-Identifier: MIT

//! Host harness for the sweepbench RF test firmware.

mod cli;
mod commands;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    cli::run(cli::Cli::parse())
}
