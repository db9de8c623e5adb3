//! Storage-quota arithmetic.
//!
//! The ledger is side-effect free: it computes whether a size delta keeps a
//! project under its ceiling and returns the new consumed size for the caller
//! to persist.

/// A reservation that would exceed the project's storage ceiling.
#[derive(Debug, PartialEq, Eq)]
pub struct QuotaExceeded {
    /// Bytes the caller asked to add.
    pub requested: i64,
    /// Bytes still free under the ceiling before the reservation.
    pub available: i64,
}

/// Reserve `delta` bytes against a project's storage.
///
/// `delta` is signed: positive for new content, negative when an update
/// shrinks a file or a delete releases it. Returns the project's new consumed
/// size on success.
pub fn reserve(current_size: i64, max_size: i64, delta: i64) -> Result<i64, QuotaExceeded> {
    let new_size = current_size.saturating_add(delta);
    if new_size > max_size {
        return Err(QuotaExceeded {
            requested: delta,
            available: max_size - current_size,
        });
    }
    Ok(new_size)
}
