//! Bounded retry loop for optimistic-concurrency critical sections.
//!
//! A guarded write that observes a stale version token fails with a conflict
//! error; the loop re-invokes the critical section, which must re-read every
//! row it touches, until it commits or the attempt bound is reached. This is
//! a client-side compare-and-swap emulation: the last successful committer
//! wins, losers retry against fresh state.

/// Failure of a [`retry_on_conflict`] loop.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The critical section failed with a non-retryable error. Validation
    /// failures are deterministic and propagate on the first attempt.
    Aborted(E),
    /// Every attempt lost the optimistic-lock race.
    Exhausted { attempts: u32 },
}

/// Run `op` until it succeeds, fails with a non-conflict error, or
/// `max_attempts` attempts have all conflicted.
///
/// `is_conflict` classifies the critical section's errors; only conflicting
/// errors re-enter the loop. The closure is re-invoked from scratch on every
/// attempt so that no stale in-memory state survives a lost race.
pub async fn retry_on_conflict<T, E, F, Fut, C>(
    max_attempts: u32,
    is_conflict: C,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
{
    let mut attempts = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_conflict(&err) => {
                attempts += 1;
                if attempts == max_attempts {
                    return Err(RetryError::Exhausted { attempts });
                }
            }
            Err(err) => return Err(RetryError::Aborted(err)),
        }
    }
}
