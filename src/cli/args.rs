//! Command-line argument parsing for toolrelay
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// toolrelay - call registered tools with retries, timeouts and circuit breaking
#[derive(Parser, Debug)]
#[command(name = "toolrelay")]
#[command(version)]
#[command(about = "Invoke and orchestrate registered agent tools", long_about = None)]
pub struct Args {
    /// Tool catalog (JSON with "tools" and "agents")
    #[arg(long, global = true, env = "TOOLRELAY_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress logs and summary)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Execute one tool
    Run {
        /// Tool id (quotes and surrounding text are tolerated)
        tool_id: String,

        /// Parameters: JSON object, or plain text passed as "input"
        #[arg(short, long)]
        params: Option<String>,
    },

    /// Execute several tools concurrently and aggregate the results
    Chain {
        /// Agent whose bound tools are used (all tools by default)
        #[arg(short, long)]
        agent: Option<String>,

        /// Tool ids
        #[arg(required = true)]
        tool_ids: Vec<String>,

        /// Parameters shared by every tool
        #[arg(short, long)]
        params: Option<String>,
    },

    /// Check connectivity to a tool's endpoint
    Check {
        tool_id: String,
    },

    /// List registered tools
    List {
        /// Only tools owned by this organization
        #[arg(long)]
        org: Option<String>,
    },

    /// Show one tool with its parameter schema
    Info {
        tool_id: String,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Check that tool commands have a catalog to work from
    pub fn validate(&self) -> Result<(), String> {
        if self.command != Commands::Config && self.catalog.is_none() {
            return Err("A tool catalog is required. Use '--catalog <FILE>' or set TOOLRELAY_CATALOG.".to_string());
        }
        Ok(())
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Check if should show progress and summaries
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show detailed events
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
