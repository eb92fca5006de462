use crate::error::{ConfigError, Result as AppResult};
use crate::game_logic::GameMode;
use crate::store::question_cache::DEFAULT_CACHE_TTL;
use config::{Config, Environment, File, Value, ValueKind};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Milliseconds per replenished request, per client IP.
    #[serde(default = "default_rate_limit_period_ms")]
    pub rate_limit_period_ms: u64,
    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,
}

fn default_rate_limit_period_ms() -> u64 {
    500
}

fn default_rate_limit_burst() -> u32 {
    30
}

#[derive(Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Without a key the server runs offline: cached questions only, no assists.
    pub api_key: Option<String>,
    pub base_url: String,
    pub question_model: String,
    pub assist_model: String,
    pub max_questions_fetch: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            question_model: "gemini-1.5-flash".to_string(),
            assist_model: "gemini-2.5-flash".to_string(),
            max_questions_fetch: 20,
        }
    }
}

// Keeps the key out of the startup log.
impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("question_model", &self.question_model)
            .field("assist_model", &self.assist_model)
            .field("max_questions_fetch", &self.max_questions_fetch)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Keep everything in memory; nothing survives a restart.
    pub in_memory: bool,
    /// Upper bound for the persisted store, in bytes.
    pub quota_bytes: Option<usize>,
    pub cache_ttl_days: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            in_memory: false,
            quota_bytes: Some(5 * 1024 * 1024),
            cache_ttl_days: DEFAULT_CACHE_TTL.as_secs() / 86_400,
        }
    }
}

impl StorageConfig {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("store.json")
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_days * 24 * 60 * 60)
    }
}

#[derive(Debug, Deserialize)]
pub struct GamesConfig {
    #[serde(deserialize_with = "deserialize_string_or_list_to_modes")]
    pub enabled_modes: HashSet<GameMode>,
}

impl Default for GamesConfig {
    fn default() -> Self {
        Self {
            enabled_modes: GameMode::all().into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AppSettings {
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub games: GamesConfig,
}

impl AppSettings {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.ai.max_questions_fetch == 0 {
            return Err(ConfigError::InvalidValue(
                "ai.max_questions_fetch must be at least 1".to_string(),
            ));
        }
        if self.server.rate_limit_period_ms == 0 || self.server.rate_limit_burst == 0 {
            return Err(ConfigError::InvalidValue(
                "server rate limit period and burst must be positive".to_string(),
            ));
        }
        if self.games.enabled_modes.is_empty() {
            return Err(ConfigError::Missing("games.enabled_modes".to_string()));
        }
        Ok(self)
    }
}

pub fn load_settings() -> AppResult<AppSettings> {
    let mut builder = Config::builder()
        .add_source(
            Environment::with_prefix("QUIZDEN")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        )
        .add_source(File::with_name("config").required(false));

    let default_modes: Vec<Value> = GameMode::all()
        .iter()
        .map(|mode| Value::new(None, ValueKind::String(mode.id().to_string())))
        .collect();

    builder = builder
        .set_default("server.port", 8080)
        .and_then(|b| b.set_default("server.cors_origins", Vec::<String>::new()))
        .and_then(|b| {
            b.set_default(
                "games.enabled_modes",
                Value::new(None, ValueKind::Array(default_modes)),
            )
        })
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let settings = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let settings: AppSettings = settings
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    Ok(settings.validate()?)
}

fn parse_mode<E: serde::de::Error>(raw: &str) -> Result<GameMode, E> {
    raw.parse::<GameMode>().map_err(E::custom)
}

/// Accepts `"all"`, a comma separated string or a list of mode ids, in any
/// letter case.
fn deserialize_string_or_list_to_modes<'de, D>(
    deserializer: D,
) -> Result<HashSet<GameMode>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    let mut set = HashSet::new();

    match value {
        Value::String(s) => {
            if s.trim().eq_ignore_ascii_case("all") {
                set.extend(GameMode::all());
            } else {
                for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
                    set.insert(parse_mode::<D::Error>(item)?);
                }
            }
        }
        Value::Array(arr) => {
            for item in arr {
                if let Value::String(s) = item {
                    if s.trim().eq_ignore_ascii_case("all") {
                        set.extend(GameMode::all());
                    } else {
                        set.insert(parse_mode::<D::Error>(&s)?);
                    }
                } else {
                    return Err(D::Error::custom("Array must contain only strings"));
                }
            }
        }
        _ => return Err(D::Error::custom("Expected string or array of strings")),
    }

    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn games(value: serde_json::Value) -> Result<GamesConfig, serde_json::Error> {
        serde_json::from_value(json!({ "enabled_modes": value }))
    }

    #[test]
    fn test_enabled_modes_from_comma_string() {
        let config = games(json!("classic, TimeAttack,versus")).unwrap();
        assert_eq!(config.enabled_modes.len(), 3);
        assert!(config.enabled_modes.contains(&GameMode::TimeAttack));
        assert!(!config.enabled_modes.contains(&GameMode::Survival));
    }

    #[test]
    fn test_enabled_modes_all() {
        let config = games(json!("ALL")).unwrap();
        assert_eq!(config.enabled_modes.len(), GameMode::all().len());
    }

    #[test]
    fn test_enabled_modes_rejects_unknown_and_non_strings() {
        assert!(games(json!(["classic", "marathon"])).is_err());
        assert!(games(json!([1, 2])).is_err());
        assert!(games(json!(42)).is_err());
    }

    #[test]
    fn test_ai_config_debug_hides_key() {
        let config = AiConfig {
            api_key: Some("super-secret".to_string()),
            ..AiConfig::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_sections_default_when_missing() {
        let settings: AppSettings = serde_json::from_value(json!({
            "server": { "port": 3000, "cors_origins": [] },
            "games": { "enabled_modes": "all" }
        }))
        .unwrap();
        assert!(settings.ai.api_key.is_none());
        assert_eq!(settings.ai.max_questions_fetch, 20);
        assert_eq!(settings.storage.cache_ttl(), Duration::from_secs(7 * 86_400));
        assert!(settings.storage.store_path().ends_with("store.json"));
        assert!(!settings.storage.in_memory);
        assert_eq!(settings.server.rate_limit_period_ms, 500);
        assert_eq!(settings.server.rate_limit_burst, 30);
    }

    #[test]
    fn test_validate_rejects_zero_fetch() {
        let settings: AppSettings = serde_json::from_value(json!({
            "server": { "port": 3000, "cors_origins": [] },
            "ai": { "max_questions_fetch": 0 },
            "games": { "enabled_modes": "classic" }
        }))
        .unwrap();
        assert!(matches!(settings.validate(), Err(ConfigError::InvalidValue(_))));
    }
}
