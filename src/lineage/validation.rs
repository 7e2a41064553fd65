use crate::error::{DesignationError, DesignationResult};
use crate::lineage::tree::PhyloTree;
use crate::types::{Alignment, Metadata};

pub(crate) fn validate_inputs(
    tree: &PhyloTree,
    alignment: &Alignment,
    metadata: &Metadata,
) -> DesignationResult<()> {
    if !tree.has_support() {
        return Err(DesignationError::MissingSupportData);
    }

    if let Some(missing) = tree
        .tip_labels()
        .iter()
        .find(|label| metadata.get(label).is_none())
    {
        return Err(DesignationError::MissingMetadataRow {
            id: missing.clone(),
        });
    }

    let mut records = alignment.iter();
    if let Some(first) = records.next() {
        let expected = first.bases.len();
        if let Some(bad) = records.find(|r| r.bases.len() != expected) {
            return Err(DesignationError::AlignmentWidthMismatch {
                id: bad.id.clone(),
                expected,
                found: bad.bases.len(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetadataRecord;

    fn cherry(support: Option<f64>) -> PhyloTree {
        PhyloTree::from_parents(
            vec!["a".to_string(), "b".to_string()],
            &[Some(2), Some(2), None],
            vec![None, None, support],
        )
        .unwrap()
    }

    #[test]
    fn test_missing_support() {
        let metadata: Metadata = vec![MetadataRecord::new("a"), MetadataRecord::new("b")]
            .into_iter()
            .collect();
        let err = validate_inputs(&cherry(None), &Alignment::new(), &metadata).unwrap_err();
        assert_eq!(err, DesignationError::MissingSupportData);
    }

    #[test]
    fn test_missing_metadata_row() {
        let metadata: Metadata = vec![MetadataRecord::new("a")].into_iter().collect();
        let err = validate_inputs(&cherry(Some(99.0)), &Alignment::new(), &metadata).unwrap_err();
        assert_eq!(
            err,
            DesignationError::MissingMetadataRow {
                id: "b".to_string()
            }
        );
    }

    #[test]
    fn test_ragged_alignment() {
        let metadata: Metadata = vec![MetadataRecord::new("a"), MetadataRecord::new("b")]
            .into_iter()
            .collect();
        let alignment: Alignment = vec![("a", b"ACGT".to_vec()), ("b", b"ACG".to_vec())]
            .into_iter()
            .collect();
        let err = validate_inputs(&cherry(Some(99.0)), &alignment, &metadata).unwrap_err();
        assert!(matches!(
            err,
            DesignationError::AlignmentWidthMismatch { expected: 4, found: 3, .. }
        ));
    }
}
