use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::game_logic::models::{GameMode, GameResult};
use crate::store::kv::{KeyValueStore, StorageError};

pub const PROGRESS_KEY: &str = "achievementProgress";
pub const UNLOCKED_KEY: &str = "unlockedAchievements";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const ACHIEVEMENTS: &[AchievementDefinition] = &[
    AchievementDefinition {
        id: "FIRST_GAME",
        name: "First Steps",
        description: "Finish your first game.",
    },
    AchievementDefinition {
        id: "QUIZ_MASTER",
        name: "Quiz Master",
        description: "Answer 50 questions correctly in total.",
    },
    AchievementDefinition {
        id: "ENCYCLOPEDIA",
        name: "Walking Encyclopedia",
        description: "Play games in 5 different categories.",
    },
    AchievementDefinition {
        id: "CLASSIC_EXPERT",
        name: "Classic Expert",
        description: "Get a perfect score in a classic game of at least 10 questions.",
    },
    AchievementDefinition {
        id: "TIME_ATTACK_PRO",
        name: "Against the Clock",
        description: "Answer 15 questions correctly in one time attack game.",
    },
    AchievementDefinition {
        id: "SURVIVOR_STREAK",
        name: "Nerves of Steel",
        description: "Answer 10 questions correctly in one sudden death game.",
    },
    AchievementDefinition {
        id: "ULTIMATE_SURVIVOR",
        name: "Ultimate Survivor",
        description: "Finish a survival game without a mistake and all lives intact.",
    },
];

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AchievementProgress {
    pub total_correct_answers: u32,
    pub games_played: u32,
    pub played_categories: BTreeSet<String>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub definition: AchievementDefinition,
    pub unlocked: bool,
}

fn is_perfect(result: &GameResult) -> bool {
    result.total.is_some_and(|total| result.score == total)
}

/// Whether `result`, with lifetime `progress`, earns achievement `id`.
fn is_earned(id: &str, result: &GameResult, progress: &AchievementProgress) -> bool {
    match id {
        "FIRST_GAME" => progress.games_played >= 1,
        "QUIZ_MASTER" => progress.total_correct_answers >= 50,
        "ENCYCLOPEDIA" => progress.played_categories.len() >= 5,
        "CLASSIC_EXPERT" => {
            result.mode == GameMode::Classic
                && result.total.is_some_and(|total| total >= 10)
                && is_perfect(result)
        }
        "TIME_ATTACK_PRO" => result.mode == GameMode::TimeAttack && result.score >= 15,
        "SURVIVOR_STREAK" => result.mode == GameMode::SuddenDeath && result.score >= 10,
        "ULTIMATE_SURVIVOR" => {
            result.mode == GameMode::Survival && is_perfect(result) && result.lives_left == Some(3)
        }
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct Achievements {
    store: Arc<dyn KeyValueStore>,
    /// Held across every read-modify-write of the progress and unlock keys.
    write_lock: Arc<Mutex<()>>,
}

impl Achievements {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn progress(&self) -> Result<AchievementProgress, StorageError> {
        Ok(match self.store.get(PROGRESS_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Achievement progress unreadable, starting fresh");
                AchievementProgress::default()
            }),
            None => AchievementProgress::default(),
        })
    }

    pub async fn unlocked(&self) -> Result<BTreeSet<String>, StorageError> {
        Ok(match self.store.get(UNLOCKED_KEY).await? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            None => BTreeSet::new(),
        })
    }

    /// Folds one finished game into the lifetime counters.
    pub async fn record_progress(
        &self,
        result: &GameResult,
    ) -> Result<AchievementProgress, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut progress = self.progress().await?;
        progress.total_correct_answers += result.score;
        progress.games_played += 1;
        if !result.category.is_empty() {
            progress.played_categories.insert(result.category.clone());
        }
        self.store
            .set(PROGRESS_KEY, serde_json::to_string(&progress)?)
            .await?;
        Ok(progress)
    }

    /// Unlocks every achievement `result` earns that was not unlocked yet,
    /// calling `on_unlock` once for each. Returns the newly unlocked ids.
    pub async fn check(
        &self,
        result: &GameResult,
        mut on_unlock: impl FnMut(&str) + Send,
    ) -> Result<Vec<String>, StorageError> {
        let _guard = self.write_lock.lock().await;
        let progress = self.progress().await?;
        let mut unlocked = self.unlocked().await?;

        let newly_unlocked: Vec<String> = ACHIEVEMENTS
            .iter()
            .filter(|a| !unlocked.contains(a.id) && is_earned(a.id, result, &progress))
            .map(|a| a.id.to_string())
            .collect();

        if newly_unlocked.is_empty() {
            return Ok(newly_unlocked);
        }

        for id in &newly_unlocked {
            on_unlock(id);
            unlocked.insert(id.clone());
        }
        self.store
            .set(UNLOCKED_KEY, serde_json::to_string(&unlocked)?)
            .await?;
        Ok(newly_unlocked)
    }

    pub async fn statuses(&self) -> Result<Vec<AchievementStatus>, StorageError> {
        let unlocked = self.unlocked().await?;
        Ok(ACHIEVEMENTS
            .iter()
            .map(|definition| AchievementStatus {
                definition: *definition,
                unlocked: unlocked.contains(definition.id),
            })
            .collect())
    }
}
