//! Epoch-guarded loading
//!
//! An [`Epoch`] is minted each time a context switch begins. Any
//! asynchronous operation captures the epoch it started under and, on
//! completion, checks that it is still current before publishing
//! anything. A stale result becomes [`LoadResult::Superseded`]: inert,
//! not retried, not an error. This one primitive makes every race in
//! the engine safe without true cancellation.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Monotonic generation counter value. Epoch 0 means no switch has
/// begun yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Epoch(u64);

impl Epoch {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Outcome of an epoch-guarded load. Only `Ok`/`Err` reach the UI;
/// `Pending` marks an in-progress panel and `Superseded` is terminal
/// and silent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum LoadResult<T> {
    Pending,
    Ok(T),
    Err(EngineError),
    Superseded,
}

impl<T> LoadResult<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, LoadResult::Ok(_))
    }

    /// True once the load has produced a user-visible outcome.
    pub fn is_settled(&self) -> bool {
        matches!(self, LoadResult::Ok(_) | LoadResult::Err(_))
    }
}

/// The monotonic counter behind epoch guarding. Exactly one epoch is
/// current at any instant.
#[derive(Debug, Default)]
pub struct EpochGate {
    current: AtomicU64,
}

impl EpochGate {
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
        }
    }

    /// Mint a new epoch, superseding every operation still running
    /// under an older one.
    pub fn begin(&self) -> Epoch {
        Epoch(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn current(&self) -> Epoch {
        Epoch(self.current.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.current() == epoch
    }

    /// Run `fut` to completion, then gate its outcome on `epoch` still
    /// being current. The underlying operation always runs to
    /// completion; cancellation here is result-discarding only.
    pub async fn run_guarded<T, F>(&self, epoch: Epoch, fut: F) -> LoadResult<T>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        let outcome = fut.await;
        if !self.is_current(epoch) {
            return LoadResult::Superseded;
        }
        match outcome {
            Ok(value) => LoadResult::Ok(value),
            Err(err) => LoadResult::Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_is_monotonic() {
        let gate = EpochGate::new();
        let first = gate.begin();
        let second = gate.begin();
        assert!(second > first);
        assert!(gate.is_current(second));
        assert!(!gate.is_current(first));
    }

    #[test]
    fn test_run_guarded_passes_current_results() {
        tokio_test::block_on(async {
            let gate = EpochGate::new();
            let epoch = gate.begin();

            let ok = gate.run_guarded(epoch, async { Ok(7) }).await;
            assert_eq!(ok, LoadResult::Ok(7));

            let err = gate
                .run_guarded(epoch, async {
                    Err::<i32, _>(EngineError::Connectivity {
                        reason: "refused".to_string(),
                    })
                })
                .await;
            assert!(matches!(err, LoadResult::Err(EngineError::Connectivity { .. })));
        });
    }

    #[test]
    fn test_run_guarded_discards_stale_epoch() {
        tokio_test::block_on(async {
            let gate = EpochGate::new();
            let stale = gate.begin();
            let _newer = gate.begin();

            let result = gate.run_guarded(stale, async { Ok(42) }).await;
            assert_eq!(result, LoadResult::Superseded);
        });
    }

    #[test]
    fn test_supersession_mid_flight() {
        tokio_test::block_on(async {
            let gate = EpochGate::new();
            let epoch = gate.begin();

            // The fetch itself triggers a newer switch before finishing.
            let result = gate
                .run_guarded(epoch, async {
                    gate.begin();
                    Ok("stale data")
                })
                .await;
            assert_eq!(result, LoadResult::Superseded);
        });
    }

    #[test]
    fn test_load_result_settled() {
        assert!(LoadResult::Ok(1).is_settled());
        assert!(LoadResult::<i32>::Err(EngineError::MetricsUnavailable).is_settled());
        assert!(!LoadResult::<i32>::Pending.is_settled());
        assert!(!LoadResult::<i32>::Superseded.is_settled());
    }
}
