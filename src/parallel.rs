//! Partial-failure results for parallel batches.

use crate::error::LinkError;
use crate::models::BatchKey;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of a parallel batch: every key succeeded, or some failed.
pub type BatchOutcome<T> = Result<BTreeMap<BatchKey, T>, ParallelExecutionError<T>>;

/// A batch in which at least one key failed.
///
/// `succeeded` and `failed` partition the batch's keys. The succeeded side
/// stays fully usable: at the client level it holds the executed
/// [`Statement`](crate::Statement)s with their responses attached.
pub struct ParallelExecutionError<S> {
    succeeded: BTreeMap<BatchKey, S>,
    failed: BTreeMap<BatchKey, LinkError>,
}

impl<S> ParallelExecutionError<S> {
    pub fn new(succeeded: BTreeMap<BatchKey, S>, failed: BTreeMap<BatchKey, LinkError>) -> Self {
        Self { succeeded, failed }
    }

    pub fn succeeded(&self) -> &BTreeMap<BatchKey, S> {
        &self.succeeded
    }

    pub fn failed(&self) -> &BTreeMap<BatchKey, LinkError> {
        &self.failed
    }

    /// Split into the succeeded and failed maps.
    pub fn into_parts(self) -> (BTreeMap<BatchKey, S>, BTreeMap<BatchKey, LinkError>) {
        (self.succeeded, self.failed)
    }

    /// Transform the succeeded side, keeping keys and failures.
    pub fn map<T>(self, mut f: impl FnMut(S) -> T) -> ParallelExecutionError<T> {
        ParallelExecutionError {
            succeeded: self
                .succeeded
                .into_iter()
                .map(|(key, value)| (key, f(value)))
                .collect(),
            failed: self.failed,
        }
    }
}

/// Partition per-key results into a [`BatchOutcome`].
pub fn collect_outcome<T, E>(results: impl IntoIterator<Item = (BatchKey, Result<T, E>)>) -> BatchOutcome<T>
where
    E: Into<LinkError>,
{
    let mut succeeded = BTreeMap::new();
    let mut failed = BTreeMap::new();

    for (key, result) in results {
        match result {
            Ok(value) => {
                succeeded.insert(key, value);
            },
            Err(err) => {
                failed.insert(key, err.into());
            },
        }
    }

    if failed.is_empty() {
        Ok(succeeded)
    } else {
        Err(ParallelExecutionError::new(succeeded, failed))
    }
}

impl<S> fmt::Display for ParallelExecutionError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .failed
            .iter()
            .map(|(key, err)| format!("[{}] {}", key, err))
            .collect();
        write!(f, "{}", messages.join("\n---\n"))
    }
}

impl<S: fmt::Debug> fmt::Debug for ParallelExecutionError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelExecutionError")
            .field("succeeded", &self.succeeded)
            .field("failed", &self.failed)
            .finish()
    }
}

impl<S: fmt::Debug> std::error::Error for ParallelExecutionError<S> {}
