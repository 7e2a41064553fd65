use crate::readers::open_input;
use crate::types::Alignment;
use anyhow::{Context, Result};
use bio::io::fasta;
use std::io::Read;
use std::path::Path;

pub fn parse_alignment<R: Read>(reader: R) -> Result<Alignment> {
    let mut alignment = Alignment::new();
    for record in fasta::Reader::new(reader).records() {
        let record = record.context("Malformed FASTA record")?;
        alignment.insert(record.id(), record.seq().to_vec());
    }
    Ok(alignment)
}

/// Read an aligned FASTA file (plain or compressed) keyed by record id.
pub fn read_alignment(path: &Path) -> Result<Alignment> {
    parse_alignment(open_input(path)?)
        .with_context(|| format!("Failed to read alignment {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_alignment() {
        let fasta = b">s1 collected 2019\nACGT\nAC--\n>s2\nNNGTACGT\n";
        let alignment = parse_alignment(&fasta[..]).unwrap();
        assert_eq!(alignment.len(), 2);
        assert_eq!(alignment.get("s1"), Some(&b"ACGTAC--"[..]));
        assert_eq!(alignment.get("s2"), Some(&b"NNGTACGT"[..]));
    }
}
