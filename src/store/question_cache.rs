use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::game_logic::models::{DifficultySelector, Question};
use crate::game_logic::utils::unix_millis;
use crate::store::kv::{KeyValueStore, StorageError};

pub const CACHE_KEY_PREFIX: &str = "questionCache_";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 7);

#[derive(Serialize, Deserialize, Debug, Clone)]
struct CacheEntry {
    /// Unix millis of the last write.
    timestamp: i64,
    questions: Vec<Question>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub category: String,
    pub difficulty: String,
    pub count: usize,
}

/// Generated questions kept per category and difficulty so a game can start
/// without calling the generator, and offline.
#[derive(Debug, Clone)]
pub struct QuestionCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
    write_lock: Arc<Mutex<()>>,
}

impl QuestionCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn key(category: &str, difficulty: DifficultySelector) -> String {
        format!("{}{}_{}", CACHE_KEY_PREFIX, category, difficulty.as_str())
    }

    async fn load(&self, category: &str, difficulty: DifficultySelector) -> Option<CacheEntry> {
        self.load_at(category, difficulty, unix_millis()).await
    }

    async fn load_at(
        &self,
        category: &str,
        difficulty: DifficultySelector,
        now_millis: i64,
    ) -> Option<CacheEntry> {
        let key = Self::key(category, difficulty);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!(cache.key = %key, error = %e, "Failed to read question cache");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(cache.key = %key, error = %e, "Dropping unreadable cache entry");
                self.remove_quietly(&key).await;
                return None;
            }
        };

        let age_millis = now_millis.saturating_sub(entry.timestamp);
        if age_millis > self.ttl.as_millis() as i64 {
            tracing::debug!(cache.key = %key, cache.age_ms = age_millis, "Cache entry expired");
            self.remove_quietly(&key).await;
            return None;
        }
        Some(entry)
    }

    async fn remove_quietly(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            tracing::warn!(cache.key = %key, error = %e, "Failed to remove cache entry");
        }
    }

    /// Returns the cached questions when at least `min_count` are stored.
    #[tracing::instrument(skip(self), fields(
        cache.category = %category,
        cache.difficulty = %difficulty.as_str()
    ))]
    pub async fn get_cached(
        &self,
        category: &str,
        difficulty: DifficultySelector,
        min_count: usize,
    ) -> Option<Vec<Question>> {
        let entry = self.load(category, difficulty).await?;
        if entry.questions.len() >= min_count {
            tracing::debug!(cache.count = entry.questions.len(), "Cache hit");
            Some(entry.questions)
        } else {
            tracing::debug!(cache.count = entry.questions.len(), "Cache has too few questions");
            None
        }
    }

    /// Appends questions whose prompt is not cached yet and refreshes the
    /// entry timestamp. Returns how many were added.
    #[tracing::instrument(skip(self, new_questions), fields(
        cache.category = %category,
        cache.difficulty = %difficulty.as_str(),
        cache.incoming = new_questions.len()
    ))]
    pub async fn save_cached(
        &self,
        category: &str,
        difficulty: DifficultySelector,
        new_questions: &[Question],
    ) -> Result<usize, StorageError> {
        if new_questions.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_lock.lock().await;
        let mut questions = self
            .load(category, difficulty)
            .await
            .map(|entry| entry.questions)
            .unwrap_or_default();

        let mut known: HashSet<String> = questions.iter().map(|q| q.prompt.clone()).collect();
        let mut added = 0;
        for question in new_questions {
            if known.insert(question.prompt.clone()) {
                questions.push(question.clone());
                added += 1;
            }
        }
        if added == 0 {
            return Ok(0);
        }

        let entry = CacheEntry {
            timestamp: unix_millis(),
            questions,
        };
        let key = Self::key(category, difficulty);
        self.store.set(&key, serde_json::to_string(&entry)?).await?;

        tracing::info!(cache.added = added, cache.count = entry.questions.len(), "Saved questions to cache");
        Ok(added)
    }

    pub async fn status(&self, category: &str, difficulty: DifficultySelector) -> CacheStatus {
        let count = self
            .load(category, difficulty)
            .await
            .map(|entry| entry.questions.len())
            .unwrap_or(0);
        CacheStatus {
            category: category.to_string(),
            difficulty: difficulty.as_str().to_string(),
            count,
        }
    }

    /// Removes every cache entry. Returns the number of entries removed.
    #[tracing::instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<usize, StorageError> {
        let _guard = self.write_lock.lock().await;
        let keys = self.store.keys_with_prefix(CACHE_KEY_PREFIX).await?;
        let mut cleared = 0;
        for key in keys {
            if self.store.remove(&key).await? {
                cleared += 1;
            }
        }
        tracing::info!(cache.cleared = cleared, "Cleared question cache");
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_logic::models::Difficulty;
    use crate::store::kv::MemoryStore;

    fn question(prompt: &str) -> Question {
        Question {
            id: String::new(),
            prompt: prompt.to_string(),
            choices: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            answer_index: 0,
            explanation: None,
            difficulty: Difficulty::Easy,
            image_url: None,
            sources: None,
            is_skipped: false,
            is_surprise: false,
        }
    }

    fn cache_with(store: Arc<dyn KeyValueStore>) -> QuestionCache {
        QuestionCache::new(store, DEFAULT_CACHE_TTL)
    }

    #[tokio::test]
    async fn test_save_dedupes_by_prompt() {
        let cache = cache_with(Arc::new(MemoryStore::new()));
        let mixed = DifficultySelector::Mixed;

        let added = cache
            .save_cached("history", mixed, &[question("one"), question("two"), question("one")])
            .await
            .unwrap();
        assert_eq!(added, 2);

        let added = cache
            .save_cached("history", mixed, &[question("two"), question("three")])
            .await
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(cache.status("history", mixed).await.count, 3);

        assert_eq!(cache.save_cached("history", mixed, &[question("three")]).await.unwrap(), 0);
        assert_eq!(cache.save_cached("history", mixed, &[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_cached_requires_min_count() {
        let cache = cache_with(Arc::new(MemoryStore::new()));
        let easy = DifficultySelector::Fixed(Difficulty::Easy);
        cache
            .save_cached("science", easy, &[question("a"), question("b"), question("c")])
            .await
            .unwrap();

        assert_eq!(cache.get_cached("science", easy, 3).await.unwrap().len(), 3);
        assert!(cache.get_cached("science", easy, 4).await.is_none());
        assert!(cache.get_cached("science", DifficultySelector::Mixed, 1).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_removed_on_read() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cache = cache_with(store.clone());
        let mixed = DifficultySelector::Mixed;
        cache.save_cached("art", mixed, &[question("x")]).await.unwrap();

        let eight_days = 8 * 24 * 60 * 60 * 1000;
        assert!(cache.load_at("art", mixed, unix_millis() + eight_days).await.is_none());
        assert!(store.get("questionCache_art_mixed").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_quota_failure_surfaces_as_full() {
        let cache = cache_with(Arc::new(MemoryStore::with_quota(64)));
        let err = cache
            .save_cached("space", DifficultySelector::Mixed, &[question("a very long prompt")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Full { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_batches_for_one_category_are_merged() {
        let cache = cache_with(Arc::new(MemoryStore::new()));
        let tasks: Vec<_> = (0..4)
            .map(|batch| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let questions: Vec<Question> = (0..5)
                        .map(|i| question(&format!("batch {} question {}", batch, i)))
                        .collect();
                    cache
                        .save_cached("history", DifficultySelector::Mixed, &questions)
                        .await
                })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 5);
        }
        assert_eq!(cache.status("history", DifficultySelector::Mixed).await.count, 20);
    }

    #[tokio::test]
    async fn test_clear_all_only_touches_cache_keys() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set("highScores", "{}".to_string()).await.unwrap();
        let cache = cache_with(store.clone());
        cache.save_cached("a", DifficultySelector::Mixed, &[question("1")]).await.unwrap();
        cache
            .save_cached("b", DifficultySelector::Fixed(Difficulty::Hard), &[question("2")])
            .await
            .unwrap();

        assert_eq!(cache.clear_all().await.unwrap(), 2);
        assert_eq!(cache.status("a", DifficultySelector::Mixed).await.count, 0);
        assert!(store.get("highScores").await.unwrap().is_some());
    }
}
