//! Per-user quiz scores, kept for the lifetime of the process.

use std::collections::HashMap;

use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct ScoreLedger {
    scores: Mutex<HashMap<i64, u64>>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current score; 0 for users never seen.
    pub async fn get(&self, user_id: i64) -> u64 {
        self.scores.lock().await.get(&user_id).copied().unwrap_or(0)
    }

    /// Add one point and return the new score.
    pub async fn increment(&self, user_id: i64) -> u64 {
        let mut scores = self.scores.lock().await;
        let score = scores.entry(user_id).or_insert(0);
        *score += 1;
        *score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unseen_user_is_zero() {
        let ledger = ScoreLedger::new();
        assert_eq!(ledger.get(42).await, 0);
    }

    #[tokio::test]
    async fn test_increment() {
        let ledger = ScoreLedger::new();
        assert_eq!(ledger.increment(1).await, 1);
        assert_eq!(ledger.increment(1).await, 2);
        assert_eq!(ledger.get(1).await, 2);
        assert_eq!(ledger.get(2).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments() {
        let ledger = Arc::new(ScoreLedger::new());
        let tasks: Vec<_> = (0..100)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.increment(7).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(ledger.get(7).await, 100);
    }
}
