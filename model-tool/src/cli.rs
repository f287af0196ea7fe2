//! Root CLI structure for model-tool

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::commands::resolve::ResolveArgs;

#[derive(Parser)]
#[command(name = "model-tool")]
#[command(about = "Inspect DMD, MD2 and KVX models and sprite model associations", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display the header of a model file
    Info {
        /// Path to the model file
        file: PathBuf,

        /// List skins and whether they resolve
        #[arg(short, long)]
        skins: bool,
    },

    /// List the animation frames of a model
    Frames {
        /// Path to the model file
        file: PathBuf,

        /// Only show frames whose name starts with this prefix
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Realize vertex buffers and report their size
    Build {
        /// Model files, relative to the root when one is given
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory used as the resource archive
        #[arg(short, long)]
        root: Option<PathBuf>,
    },

    /// Load a manifest and resolve sprite frames to models
    Resolve(ResolveArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
