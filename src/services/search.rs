use tracing::debug;

use crate::models::ClientRecord;
use crate::store::{Field, Filter, RecordStore, StoreError};

/// Which lookup tier produced the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    Fuzzy,
    NoMatch,
}

#[derive(Debug)]
pub struct SearchHits {
    pub tier: MatchTier,
    pub records: Vec<ClientRecord>,
}

/// Looks `term` up as an exact identifier first, then as a case-insensitive
/// substring of the name. The two result sets are never merged.
///
/// No length check happens here: an empty `term` reaches the name tier and
/// matches every record.
pub async fn resolve(store: &dyn RecordStore, term: &str) -> Result<SearchHits, StoreError> {
    let exact = store
        .query(&Filter::Equals {
            field: Field::Identifier,
            value: term.to_string(),
        })
        .await?;
    if !exact.is_empty() {
        debug!("Identifier match: {} records", exact.len());
        return Ok(SearchHits {
            tier: MatchTier::Exact,
            records: exact,
        });
    }

    let fuzzy = store
        .query(&Filter::Contains {
            field: Field::Name,
            value: term.to_string(),
        })
        .await?;
    debug!("Name match: {} records", fuzzy.len());
    let tier = if fuzzy.is_empty() {
        MatchTier::NoMatch
    } else {
        MatchTier::Fuzzy
    };
    Ok(SearchHits {
        tier,
        records: fuzzy,
    })
}
