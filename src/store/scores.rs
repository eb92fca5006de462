use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::game_logic::models::{GameMode, GameResult};
use crate::game_logic::utils::unix_millis;
use crate::store::kv::{KeyValueStore, StorageError};

pub const HIGH_SCORES_KEY: &str = "highScores";
pub const MAX_SCORES_PER_MODE: usize = 5;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    pub score: u32,
    pub points: u32,
    /// Unix millis.
    pub date: i64,
}

type HighScoreTable = HashMap<GameMode, Vec<ScoreEntry>>;

/// Ranks by points, then by correct answers.
fn ranks_above(candidate: &ScoreEntry, other: &ScoreEntry) -> bool {
    (candidate.points, candidate.score) > (other.points, other.score)
}

/// Top five results per mode. Clones share the write lock, so concurrent
/// saves never drop each other's entries.
#[derive(Debug, Clone)]
pub struct HighScores {
    store: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl HighScores {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load(&self) -> Result<HighScoreTable, StorageError> {
        match self.store.get(HIGH_SCORES_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "High score table unreadable, starting fresh");
                HighScoreTable::new()
            })),
            None => Ok(HighScoreTable::new()),
        }
    }

    pub async fn top(&self, mode: GameMode) -> Result<Vec<ScoreEntry>, StorageError> {
        Ok(self.load().await?.remove(&mode).unwrap_or_default())
    }

    /// Inserts the score if the mode's list has room or it beats the worst
    /// entry. Returns whether it made the list.
    #[tracing::instrument(skip(self), fields(game.mode = %mode))]
    pub async fn save(
        &self,
        mode: GameMode,
        score: u32,
        points: u32,
    ) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.load().await?;
        let entries = table.entry(mode).or_default();
        let candidate = ScoreEntry {
            score,
            points,
            date: unix_millis(),
        };

        let qualifies = entries.len() < MAX_SCORES_PER_MODE
            || entries
                .last()
                .is_some_and(|worst| ranks_above(&candidate, worst));
        if !qualifies {
            return Ok(false);
        }

        entries.push(candidate);
        entries.sort_by(|a, b| (b.points, b.score).cmp(&(a.points, a.score)));
        entries.truncate(MAX_SCORES_PER_MODE);

        self.store
            .set(HIGH_SCORES_KEY, serde_json::to_string(&table)?)
            .await?;
        tracing::info!(score.points = points, score.correct = score, "New high score");
        Ok(true)
    }

    pub async fn record_result(&self, result: &GameResult) -> Result<bool, StorageError> {
        self.save(result.mode, result.score, result.points).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::MemoryStore;

    fn scores() -> HighScores {
        HighScores::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_first_five_always_qualify_and_are_sorted() {
        let high_scores = scores();
        for points in [30, 10, 50, 20, 40] {
            assert!(high_scores.save(GameMode::Classic, 1, points).await.unwrap());
        }
        let top: Vec<u32> = high_scores
            .top(GameMode::Classic)
            .await
            .unwrap()
            .iter()
            .map(|e| e.points)
            .collect();
        assert_eq!(top, vec![50, 40, 30, 20, 10]);
    }

    #[tokio::test]
    async fn test_full_list_needs_to_beat_the_worst() {
        let high_scores = scores();
        for _ in 0..5 {
            high_scores.save(GameMode::Survival, 3, 100).await.unwrap();
        }
        assert!(!high_scores.save(GameMode::Survival, 3, 100).await.unwrap());
        assert!(!high_scores.save(GameMode::Survival, 9, 90).await.unwrap());
        // Same points, more correct answers wins the tie.
        assert!(high_scores.save(GameMode::Survival, 4, 100).await.unwrap());

        let top = high_scores.top(GameMode::Survival).await.unwrap();
        assert_eq!(top.len(), MAX_SCORES_PER_MODE);
        assert_eq!(top[0].score, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_keep_every_entry() {
        let high_scores = scores();
        let tasks: Vec<_> = (0..5u32)
            .map(|i| {
                let high_scores = high_scores.clone();
                tokio::spawn(async move {
                    high_scores.save(GameMode::Classic, i, 10 * (i + 1)).await
                })
            })
            .collect();

        let mut qualified = 0;
        for task in tasks {
            if task.await.unwrap().unwrap() {
                qualified += 1;
            }
        }
        assert_eq!(qualified, 5);
        let top = high_scores.top(GameMode::Classic).await.unwrap();
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].points, 50);
        assert_eq!(top[4].points, 10);
    }

    #[tokio::test]
    async fn test_modes_are_ranked_separately() {
        let high_scores = scores();
        high_scores.save(GameMode::Speedrun, 5, 80).await.unwrap();
        assert!(high_scores.top(GameMode::TimeAttack).await.unwrap().is_empty());
        assert_eq!(high_scores.top(GameMode::Speedrun).await.unwrap().len(), 1);
    }
}
