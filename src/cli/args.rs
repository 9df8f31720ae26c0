//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::domain::RemovePolicy;

/// First-child/next-sibling tree store driven by a batch command protocol
#[derive(Parser, Debug)]
#[command(name = "sibtree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Diagnostics on stderr: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file (applied on top of the global config)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// What REMOVE does with the children of the removed node [promote|drop]
    #[arg(long, global = true)]
    pub policy: Option<RemovePolicy>,

    /// Also reject attaching a node below its own descendant
    #[arg(long, global = true)]
    pub strict_cycles: bool,

    /// Defaults to `run` on stdin
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the command protocol (node declarations, then commands)
    Run {
        /// Input file (default: stdin)
        #[arg(value_hint = ValueHint::FilePath)]
        input: Option<PathBuf>,
        /// Print the final tree after the last command
        #[arg(long)]
        dump: bool,
    },

    /// Walk through build, move and remove on a sample tree
    Demo {
        /// Draw the tree with box characters instead of indentation
        #[arg(long)]
        termtree: bool,
    },

    /// Inspect settings
    Settings {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a template config file
    Template,
    /// Show the global config file location
    Path,
}
