//! Direct lookup resolution

use crate::error::ReadError;
use std::collections::HashSet;
use verity_core::{Candidate, CandidateKind, Id, PrimaryStore};

/// Direct candidates with their ids resolved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectResolution {
    /// Resolved candidates, first occurrence of each uuid only
    pub candidates: Vec<Candidate>,
    /// Name lookups that matched nothing
    pub unresolved: u64,
    /// Later candidates resolving to an already seen uuid
    pub duplicates: u64,
}

/// Resolve the ids of direct candidates
///
/// By-name candidates are looked up against the store and dropped when the
/// name matches nothing; by-uuid candidates take their id from the uuid.
/// Candidates that already carry an id pass through. The result is
/// deduplicated by uuid, first occurrence wins.
pub async fn resolve_direct(
    store: &dyn PrimaryStore,
    page: Vec<Candidate>,
) -> Result<DirectResolution, ReadError> {
    let mut out = DirectResolution::default();
    let mut seen = HashSet::with_capacity(page.len());

    for candidate in page {
        let id = match (&candidate.kind, candidate.id()) {
            (_, Some(id)) => id.clone(),
            (CandidateKind::DirectByUuid { uuid }, None) => Id::new(*uuid, candidate.entity_type()),
            (CandidateKind::DirectByName { name }, None) => {
                let found = store
                    .lookup_id_by_name(candidate.entity_type(), name)
                    .await
                    .map_err(|source| ReadError::Load { count: 1, source })?;
                match found {
                    Some(id) => id,
                    None => {
                        tracing::debug!(
                            target: "verity::read",
                            entity_type = candidate.entity_type(),
                            name = %name,
                            "Direct lookup matched no entity"
                        );
                        out.unresolved += 1;
                        continue;
                    }
                }
            }
            // Plain and geo candidates always carry an id
            (_, None) => {
                out.unresolved += 1;
                continue;
            }
        };

        if !seen.insert(id.uuid()) {
            out.duplicates += 1;
            continue;
        }
        out.candidates.push(candidate.resolve(id));
    }
    Ok(out)
}
