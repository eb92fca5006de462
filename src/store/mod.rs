use std::sync::Arc;

pub mod achievements;
pub mod kv;
pub mod question_cache;
pub mod scores;

pub use achievements::Achievements;
pub use kv::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use question_cache::QuestionCache;
pub use scores::HighScores;

use crate::game_logic::models::{GameMode, GameResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    pub is_new_high_score: bool,
    pub unlocked_achievements: Vec<String>,
}

/// Consumes finished single-player results: high scores, lifetime progress
/// and achievements. Versus results are not recorded.
#[derive(Debug, Clone)]
pub struct ResultRecorder {
    high_scores: HighScores,
    achievements: Achievements,
}

impl ResultRecorder {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            high_scores: HighScores::new(store.clone()),
            achievements: Achievements::new(store),
        }
    }

    pub fn high_scores(&self) -> &HighScores {
        &self.high_scores
    }

    pub fn achievements(&self) -> &Achievements {
        &self.achievements
    }

    #[tracing::instrument(skip(self, result), fields(
        game.mode = %result.mode,
        result.score = result.score
    ))]
    pub async fn record(&self, result: &GameResult) -> Result<RecordOutcome, StorageError> {
        if result.mode == GameMode::Versus {
            tracing::debug!("Versus results are not recorded");
            return Ok(RecordOutcome::default());
        }

        let is_new_high_score = self.high_scores.record_result(result).await?;
        self.achievements.record_progress(result).await?;
        let unlocked_achievements = self
            .achievements
            .check(result, |id| {
                tracing::info!(achievement.id = %id, "Achievement unlocked");
            })
            .await?;

        Ok(RecordOutcome {
            is_new_high_score,
            unlocked_achievements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_logic::models::{VersusOutcome, Winner};

    fn finished(mode: GameMode) -> GameResult {
        GameResult {
            score: 3,
            total: Some(5),
            points: 70,
            mode,
            hints_used: None,
            lives_left: None,
            category: "science".to_string(),
            questions_history: Vec::new(),
            versus: None,
        }
    }

    #[tokio::test]
    async fn test_single_player_result_is_recorded() {
        let recorder = ResultRecorder::new(Arc::new(MemoryStore::new()));
        let outcome = recorder.record(&finished(GameMode::Classic)).await.unwrap();

        assert!(outcome.is_new_high_score);
        assert_eq!(outcome.unlocked_achievements, vec!["FIRST_GAME".to_string()]);
        assert_eq!(recorder.high_scores().top(GameMode::Classic).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_versus_result_is_skipped() {
        let recorder = ResultRecorder::new(Arc::new(MemoryStore::new()));
        let mut result = finished(GameMode::Versus);
        result.versus = Some(VersusOutcome {
            player1_name: "A".to_string(),
            player2_name: "B".to_string(),
            player1_score: 3,
            player2_score: 1,
            player1_points: 70,
            player2_points: 20,
            winner: Winner::Player1,
        });

        assert_eq!(recorder.record(&result).await.unwrap(), RecordOutcome::default());
        assert!(recorder.high_scores().top(GameMode::Versus).await.unwrap().is_empty());
        assert_eq!(recorder.achievements().progress().await.unwrap().games_played, 0);
    }
}
