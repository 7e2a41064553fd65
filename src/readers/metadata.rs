use crate::readers::open_input;
use crate::types::{Metadata, MetadataRecord};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Deserialize, Debug)]
struct MetadataRow {
    #[serde(alias = "ID", alias = "name", alias = "taxon", alias = "strain", alias = "seq_id")]
    id: String,
    #[serde(default, alias = "Year", alias = "date")]
    year: Option<String>,
    #[serde(default, alias = "Country", alias = "origin")]
    country: Option<String>,
    #[serde(default, alias = "Assignment", alias = "lineage", alias = "previous")]
    assignment: Option<String>,
}

fn cell(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("NA"))
}

/// Extract a year from `2019`, `2019-05-02` or `2019.4`.
pub fn parse_year(value: &str) -> Option<i32> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

pub fn parse_metadata<R: Read>(reader: R, delimiter: u8) -> Result<Metadata> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut metadata = Metadata::new();
    for (line, row) in csv_reader.deserialize::<MetadataRow>().enumerate() {
        let row = row.with_context(|| format!("Malformed metadata row {}", line + 2))?;
        metadata.insert(MetadataRecord {
            id: row.id.trim().to_string(),
            year: cell(row.year).as_deref().and_then(parse_year),
            country: cell(row.country),
            assignment: cell(row.assignment),
        });
    }
    Ok(metadata)
}

/// Read a metadata table; `.csv` files are comma separated, everything
/// else is treated as tab separated.
pub fn read_metadata(path: &Path) -> Result<Metadata> {
    let name = path.to_string_lossy().to_ascii_lowercase();
    let delimiter = if name.ends_with(".csv") || name.ends_with(".csv.gz") {
        b','
    } else {
        b'\t'
    };
    parse_metadata(open_input(path)?, delimiter)
        .with_context(|| format!("Failed to read metadata {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2019"), Some(2019));
        assert_eq!(parse_year("2019-05-02"), Some(2019));
        assert_eq!(parse_year("19"), None);
        assert_eq!(parse_year(""), None);
    }

    #[test]
    fn test_blank_and_na_cells_are_unset() {
        let table = "id\tyear\tcountry\tassignment\n\
                     s1\t2018\tBrazil\t3III\n\
                     s2\tNA\t\tNA\n";
        let metadata = parse_metadata(table.as_bytes(), b'\t').unwrap();
        assert_eq!(metadata.len(), 2);
        let s1 = metadata.get("s1").unwrap();
        assert_eq!(s1.year, Some(2018));
        assert_eq!(s1.country.as_deref(), Some("Brazil"));
        assert_eq!(s1.assignment.as_deref(), Some("3III"));
        let s2 = metadata.get("s2").unwrap();
        assert_eq!(s2, &MetadataRecord::new("s2"));
    }

    #[test]
    fn test_column_aliases() {
        let table = "name,date,origin,lineage\ns1,2020-01-03,Peru,2II\n";
        let metadata = parse_metadata(table.as_bytes(), b',').unwrap();
        let s1 = metadata.get("s1").unwrap();
        assert_eq!(s1.year, Some(2020));
        assert_eq!(s1.country.as_deref(), Some("Peru"));
        assert_eq!(s1.assignment.as_deref(), Some("2II"));
    }
}
