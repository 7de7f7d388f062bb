// SPDX-License-Identifier: MIT

//! Command-line interface definitions.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use crate::commands;
use crate::transport::Transport;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "sweepbench")]
#[command(about = "Host harness for the sweepbench RF test firmware")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyACM0)
    #[arg(short, long)]
    pub port: String,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    pub baud: u32,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the simple countdown test
    Simple {
        /// Test id (must be positive)
        #[arg(value_name = "ID")]
        id: i32,
    },

    /// Run an SNR/batch sweep test
    Sweep {
        /// Test id
        #[arg(short, long, default_value = "1")]
        id: i32,

        /// SNR range as start:step:stop (inclusive, positive step)
        #[arg(short, long)]
        range: String,

        /// Samples per SNR point
        #[arg(short = 'n', long, default_value = "10")]
        batch: u32,
    },

    /// Switch between simulated and deterministic metrics
    Mode {
        #[arg(value_enum, value_name = "STATE")]
        state: ModeState,
    },

    /// Cancel the active test
    Cancel,

    /// Print firmware output as it arrives
    Listen {
        /// Stop after this many seconds (default: run until interrupted)
        #[arg(short, long)]
        seconds: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeState {
    On,
    Off,
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    let mut transport = Transport::new(&cli.port, cli.baud)?;

    match cli.command {
        Commands::Simple { id } => commands::simple(&mut transport, id),
        Commands::Sweep { id, range, batch } => commands::sweep(&mut transport, id, &range, batch),
        Commands::Mode { state } => commands::mode(&mut transport, matches!(state, ModeState::On)),
        Commands::Cancel => commands::cancel(&mut transport),
        Commands::Listen { seconds } => commands::listen(&mut transport, seconds),
    }
}
