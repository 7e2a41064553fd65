use crate::config::Config;
use crate::export::formats::lineage::LineageExport;
use crate::export::table::{write_lineage_summary_to, write_sequence_table_to};
use crate::export::{AnalysisExport, InputDigest};
use crate::lineage::{designate_with, DesignationParams, Outcome};
use crate::readers::{alignment, ancestral, metadata, newick};
use crate::utils::progress::SpinnerBuilder;
use anyhow::{ensure, Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct DesignateOptions {
    pub tree: PathBuf,
    pub alignment: PathBuf,
    pub ancestral: PathBuf,
    pub metadata: PathBuf,
    pub output_file: PathBuf,
    pub summary: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub min_support: Option<f64>,
    pub min_tips: Option<usize>,
    pub coverage: Option<f64>,
    pub max_depth: Option<usize>,
    pub quiet_progress: bool,
}

impl DesignateOptions {
    /// Command-line overrides win over the config file.
    fn params(&self, config: &Config) -> Result<DesignationParams> {
        let mut params = config.designation.clone();
        if let Some(min_support) = self.min_support {
            params = params.with_min_support(min_support);
        }
        if let Some(min_tips) = self.min_tips {
            params = params.with_min_cluster_tips(min_tips);
        }
        if let Some(coverage) = self.coverage {
            params = params.with_coverage_threshold(coverage);
        }
        if let Some(max_depth) = self.max_depth {
            params = params.with_max_dot_depth(max_depth);
        }
        ensure!(
            (0.0..=1.0).contains(&params.coverage_threshold),
            "coverage threshold must be between 0 and 1, got {}",
            params.coverage_threshold
        );
        ensure!(params.max_dot_depth > 0, "max dot depth must be at least 1");
        ensure!(params.token_capacity > 0, "token capacity must be at least 1");
        Ok(params)
    }

    fn summary_path(&self, config: &Config) -> Option<PathBuf> {
        self.summary.clone().or_else(|| {
            config
                .write_summary
                .then(|| summary_path_for(&self.output_file))
        })
    }
}

fn summary_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "lineages".to_string());
    output.with_file_name(format!("{}.summary.tsv", stem))
}

pub fn run(options: DesignateOptions) -> Result<()> {
    let config = match &options.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    let params = options.params(&config)?;

    let progress = SpinnerBuilder::new("Reading tree")
        .hidden(options.quiet_progress)
        .build()?;
    let tree = newick::read_newick(&options.tree)?;
    info!(
        tips = tree.n_tips(),
        nodes = tree.n_nodes(),
        "loaded tree {}",
        options.tree.display()
    );

    progress.set_message("Reading alignment");
    let alignment = alignment::read_alignment(&options.alignment)?;
    info!(sequences = alignment.len(), "loaded alignment");

    progress.set_message("Reading ancestral states");
    let ancestral = ancestral::read_ancestral(&options.ancestral)?;
    info!(nodes = ancestral.len(), "loaded ancestral states");

    progress.set_message("Reading metadata");
    let metadata = metadata::read_metadata(&options.metadata)?;
    info!(records = metadata.len(), "loaded metadata");

    progress.set_message("Designating lineages");
    let designation = designate_with(&tree, &alignment, &metadata, &ancestral, &params)
        .context("Lineage designation failed")?;

    progress.set_message("Writing results");
    write_sequence_table_to(&options.output_file, &designation.rows)?;

    if let Some(summary) = options.summary_path(&config) {
        write_lineage_summary_to(&summary, &designation.lineages)?;
    }

    if let Some(json) = &options.json {
        let inputs = vec![
            InputDigest::from_file("tree", &options.tree)?,
            InputDigest::from_file("alignment", &options.alignment)?,
            InputDigest::from_file("ancestral", &options.ancestral)?,
            InputDigest::from_file("metadata", &options.metadata)?,
        ];
        let export = AnalysisExport::new(
            LineageExport::from_designation(&designation),
            params.clone(),
            inputs,
        );
        export.write_json(json)?;
    }

    let message = match designation.outcome {
        Outcome::Designated => format!(
            "Designated {} lineages; results written to {}",
            designation.lineages.len(),
            options.output_file.display()
        ),
        Outcome::NoCandidates => format!(
            "No lineages designated; results written to {}",
            options.output_file.display()
        ),
    };
    progress.finish_with_message(message);
    Ok(())
}
