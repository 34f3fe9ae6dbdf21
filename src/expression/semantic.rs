//! Namesake matching by lineage
//!
//! For every name present in both headings: equal lineages match; differing
//! lineages, or lineage missing on either side, are a `SemanticMismatch`
//! unless the check is turned off, in which case every namesake matches.
//! Key determination downstream then works on names alone.

use crate::errors::{AlgebraError, AlgebraResult};
use crate::heading::Heading;

/// Matched namesakes, in `left` heading order.
pub(crate) fn match_namesakes(
    left: &Heading,
    right: &Heading,
    semantic_check: bool,
) -> AlgebraResult<Vec<String>> {
    let mut matched = Vec::new();
    for attr in left.attributes() {
        let Some(other) = right.get(&attr.name) else {
            continue;
        };
        if semantic_check {
            match (&attr.lineage, &other.lineage) {
                (Some(a), Some(b)) if a == b => {}
                (Some(a), Some(b)) => {
                    return Err(AlgebraError::lineage_conflict(&attr.name, a, b));
                }
                _ => return Err(AlgebraError::missing_lineage(&attr.name)),
            }
        }
        matched.push(attr.name.clone());
    }
    Ok(matched)
}
