use crate::lineage::Lineage;
use crate::types::SequenceRow;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Flattened view of a [`Lineage`] for tabular output.
#[derive(Debug, Serialize)]
struct LineageSummaryRow<'a> {
    lineage: &'a str,
    parent: Option<&'a str>,
    ancestral_id: &'a str,
    tip_count: usize,
    assigned: usize,
    shared_differences: usize,
    first_year: Option<i32>,
    last_year: Option<i32>,
    countries: String,
    previous_labels: String,
}

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_writer(writer)
}

/// Write one row per sequence; unset cells are left empty.
pub fn write_sequence_table<W: Write>(writer: W, rows: &[SequenceRow]) -> Result<()> {
    let mut out = tsv_writer(writer);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_lineage_summary<W: Write>(writer: W, lineages: &[Lineage]) -> Result<()> {
    let mut out = tsv_writer(writer);
    for lineage in lineages {
        out.serialize(LineageSummaryRow {
            lineage: &lineage.label,
            parent: lineage.parent.as_deref(),
            ancestral_id: &lineage.ancestral_id,
            tip_count: lineage.tip_count,
            assigned: lineage.assigned,
            shared_differences: lineage.shared_differences,
            first_year: lineage.first_year,
            last_year: lineage.last_year,
            countries: lineage.countries.join(";"),
            previous_labels: lineage.previous_labels.join(","),
        })?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_sequence_table_to(path: &Path, rows: &[SequenceRow]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    write_sequence_table(file, rows)
        .with_context(|| format!("Failed to write output file {}", path.display()))
}

pub fn write_lineage_summary_to(path: &Path, lineages: &[Lineage]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create summary file {}", path.display()))?;
    write_lineage_summary(file, lineages)
        .with_context(|| format!("Failed to write summary file {}", path.display()))
}
