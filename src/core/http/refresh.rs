use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::debug;

use crate::core::error::ApiError;

#[derive(Default)]
struct RefreshRecord {
    generation: u64,
    last_outcome: Option<Result<(), ApiError>>,
}

/// Single-flight guard around the token reissue call.
///
/// Callers snapshot [`RefreshGate::generation`] before sending a request. A
/// caller whose request then fails with an expired token joins the gate with
/// that snapshot: the first one in runs the reissue while holding the lock,
/// everyone queued behind it (FIFO) sees the generation has moved past their
/// snapshot and shares the recorded outcome instead of reissuing again.
#[derive(Default)]
pub struct RefreshGate {
    record: Mutex<RefreshRecord>,
    generation: AtomicU64,
}

impl RefreshGate {
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub async fn refresh<F, Fut>(&self, observed: u64, reissue: F) -> Result<(), ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), ApiError>>,
    {
        let mut record = self.record.lock().await;
        if record.generation > observed {
            if let Some(outcome) = record.last_outcome.clone() {
                debug!(
                    generation = record.generation,
                    "Joining completed token refresh"
                );
                return outcome;
            }
        }

        let outcome = reissue().await;
        record.generation += 1;
        record.last_outcome = Some(outcome.clone());
        self.generation.store(record.generation, Ordering::Release);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_reissue() {
        let gate = Arc::new(RefreshGate::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let observed = gate.generation();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = Arc::clone(&gate);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                gate.refresh(observed, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(())
                })
                .await
            }));
        }

        for handle in handles {
            assert!(handle.await.expect("join").is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.generation(), 1);
    }

    #[tokio::test]
    async fn late_joiner_shares_failed_outcome() {
        let gate = RefreshGate::default();
        let observed = gate.generation();
        let failure = ApiError::transport("reissue rejected");

        let first = gate
            .refresh(observed, || async { Err(ApiError::transport("reissue rejected")) })
            .await;
        assert_eq!(first, Err(failure.clone()));

        let calls = AtomicUsize::new(0);
        let second = gate
            .refresh(observed, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert_eq!(second, Err(failure));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn newer_snapshot_triggers_a_fresh_reissue() {
        let gate = RefreshGate::default();
        gate.refresh(0, || async { Ok(()) }).await.expect("first refresh");

        let calls = AtomicUsize::new(0);
        gate.refresh(gate.generation(), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .expect("second refresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gate.generation(), 2);
    }
}
