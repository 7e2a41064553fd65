use crate::readers::open_input;
use crate::types::AncestralStates;
use anyhow::{bail, Context, Result};
use bio::io::fasta;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{BufRead, Read};
use std::path::Path;

#[derive(Deserialize, Debug)]
struct StateRow {
    #[serde(rename = "Node")]
    node: String,
    #[serde(rename = "Site")]
    site: usize,
    #[serde(rename = "State")]
    state: String,
}

/// Map IQ-TREE style `Node12` names onto `NODE_0000012`; other names pass
/// through unchanged.
pub fn normalize_node_id(name: &str) -> String {
    let name = name.trim();
    match name.strip_prefix("Node").or_else(|| name.strip_prefix("node")) {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            match digits.parse::<usize>() {
                Ok(index) => format!("NODE_{:07}", index),
                Err(_) => name.to_string(),
            }
        }
        _ => name.to_string(),
    }
}

pub fn parse_ancestral_fasta<R: Read>(reader: R) -> Result<AncestralStates> {
    let mut states = AncestralStates::new();
    for record in fasta::Reader::new(reader).records() {
        let record = record.context("Malformed ancestral FASTA record")?;
        states.insert(normalize_node_id(record.id()), record.seq().to_vec());
    }
    Ok(states)
}

/// Parse an IQ-TREE `.state` table (tab separated, `#` comments, columns
/// `Node Site State p_A ...`) into one sequence per node.
pub fn parse_state_table<R: Read>(reader: R) -> Result<AncestralStates> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(reader);

    let mut sites: BTreeMap<String, BTreeMap<usize, u8>> = BTreeMap::new();
    for row in csv_reader.deserialize::<StateRow>() {
        let row = row.context("Malformed ancestral state row")?;
        let base = row.state.bytes().next().unwrap_or(b'N');
        sites
            .entry(normalize_node_id(&row.node))
            .or_default()
            .insert(row.site, base);
    }

    let mut states = AncestralStates::new();
    for (node, columns) in sites {
        let expected: Vec<usize> = (1..=columns.len()).collect();
        if !columns.keys().copied().eq(expected.iter().copied()) {
            bail!("Ancestral states for {} do not cover sites 1..={}", node, columns.len());
        }
        states.insert(node, columns.into_values().collect::<Vec<u8>>());
    }
    Ok(states)
}

/// Read ancestral reconstructions from FASTA or an IQ-TREE state table,
/// choosing by the first non-blank character.
pub fn read_ancestral(path: &Path) -> Result<AncestralStates> {
    let mut reader = open_input(path)?;
    let is_fasta = loop {
        let buf = reader
            .fill_buf()
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if buf.is_empty() {
            break false;
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(idx) => break buf[idx] == b'>',
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    };

    let states = if is_fasta {
        parse_ancestral_fasta(reader)
    } else {
        parse_state_table(reader)
    };
    states.with_context(|| format!("Failed to read ancestral states {}", path.display()))
}
