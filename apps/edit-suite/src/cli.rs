//! Command-line interface.

use clap::{ArgAction, Args, Parser, Subcommand};
use edit_harness::FailurePolicy;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "edit-suite", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "EDIT_SUITE_CONFIG")]
    pub config: Option<PathBuf>,

    /// More logging; repeat for more detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run test cases (all of them when none are named)
    Run(RunArgs),
    /// List the available test cases
    List,
    /// Write a default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Cases to run
    pub cases: Vec<String>,

    /// Replace a dimension's values, e.g. --dim Text=EMPTY_STRING,abc
    #[arg(long = "dim", value_name = "NAME=V1,V2")]
    pub dims: Vec<String>,

    /// Per-case time limit in seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Stop each case at its first failing combination
    #[arg(long, conflicts_with = "collect_all")]
    pub fail_fast: bool,

    /// Run every combination and report all failures
    #[arg(long)]
    pub collect_all: bool,

    /// Directory for logged images
    #[arg(long, value_name = "DIR")]
    pub artifacts: Option<PathBuf>,

    /// Write a JSON report of all outcomes
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Combination file (TOML or JSON) supplying dimension values
    #[arg(long, value_name = "FILE")]
    pub combinations: Option<PathBuf>,

    /// Directory of master images for rendering checks
    #[arg(long, value_name = "DIR")]
    pub masters: Option<PathBuf>,
}

impl RunArgs {
    /// Policy requested on the command line, if any.
    pub fn failure_policy(&self) -> Option<FailurePolicy> {
        if self.fail_fast {
            Some(FailurePolicy::FailFast)
        } else if self.collect_all {
            Some(FailurePolicy::CollectAll)
        } else {
            None
        }
    }
}
