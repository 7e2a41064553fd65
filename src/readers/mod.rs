pub mod alignment;
pub mod ancestral;
pub mod metadata;
pub mod newick;

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Open a possibly compressed input file.
pub(crate) fn open_input(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let (reader, _compression) = niffler::get_reader(Box::new(file))
        .with_context(|| format!("Failed to detect compression of {}", path.display()))?;
    Ok(BufReader::new(reader))
}
