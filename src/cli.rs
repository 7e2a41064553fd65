use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log debug detail (pruned candidates, naming decisions)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Designate hierarchical lineages on a supported phylogeny
    Designate {
        /// Rooted Newick tree with support values on internal nodes
        #[arg(long)]
        tree: PathBuf,
        /// FASTA alignment of the tip sequences
        #[arg(long)]
        alignment: PathBuf,
        /// Ancestral sequences (FASTA or per-site state table)
        #[arg(long)]
        ancestral: PathBuf,
        /// Metadata table (tab separated, or comma separated for .csv)
        #[arg(long)]
        metadata: PathBuf,
        /// Output sequence table
        #[arg(short = 'o', long = "output", default_value = "lineages.tsv")]
        output_file: PathBuf,
        /// Per-lineage summary table (default: <output>.summary.tsv when enabled in config)
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Also write a JSON report with parameters and input digests
        #[arg(long)]
        json: Option<PathBuf>,
        /// Read parameters from this config instead of the user config
        #[arg(long)]
        config: Option<PathBuf>,
        /// Minimum node support (exclusive; the maximum support always qualifies)
        #[arg(long)]
        min_support: Option<f64>,
        /// Minimum tips below a candidate node
        #[arg(long)]
        min_tips: Option<usize>,
        /// Minimum informative fraction of each sequence
        #[arg(long)]
        coverage: Option<f64>,
        /// Dot levels allowed before a fresh letter token is used
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Write the default configuration to the user config directory
    InitConfig {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}
