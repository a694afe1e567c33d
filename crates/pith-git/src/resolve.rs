//! Reference-delta resolution.

use crate::{delta, GitError, Result};
use pith_storage::{ObjectDatabase, ObjectId};

/// A delta waiting for its base object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelta {
    /// Id of the object the delta applies to.
    pub base: ObjectId,
    /// Raw delta instruction stream.
    pub delta: Vec<u8>,
}

/// Applies queued deltas until none remain, storing each result.
///
/// Each pass applies every delta whose base is already in `db`, so chains
/// resolve in any order. A pass that makes no progress fails with
/// [`GitError::UnresolvedDelta`]. Results take the type of their base.
pub fn resolve_deltas<D: ObjectDatabase + ?Sized>(
    db: &D,
    mut pending: Vec<PendingDelta>,
) -> Result<Vec<ObjectId>> {
    let mut resolved = Vec::with_capacity(pending.len());
    let mut pass = 0usize;

    while !pending.is_empty() {
        pass += 1;
        let (ready, waiting): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|entry| db.exists(&entry.base));

        if ready.is_empty() {
            let base = waiting.first().map(|entry| entry.base);
            return Err(match base {
                Some(base) => GitError::UnresolvedDelta {
                    base,
                    remaining: waiting.len(),
                },
                None => GitError::format("delta queue emptied without progress"),
            });
        }

        for entry in ready {
            let base = db.get(&entry.base)?;
            let data = delta::apply(&base.data, &entry.delta)?;
            let id = db.put(base.object_type, &data)?;
            tracing::debug!(base = %entry.base, id = %id, size = data.len(), "resolved delta");
            resolved.push(id);
        }

        tracing::debug!(pass, remaining = waiting.len(), "delta pass complete");
        pending = waiting;
    }

    Ok(resolved)
}
