use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_TOTAL_QUESTIONS: usize = 3;
pub const MAX_TOTAL_QUESTIONS: usize = 20;
pub const REQUIRED_CHOICES: usize = 4;

/// Difficulty tier of a single question.
///
/// The generator may label tiers in English or with the Arabic labels used by
/// some question banks; anything else lands in `Unrated`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    #[default]
    Unrated,
}

impl From<String> for Difficulty {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "easy" | "سهل" => Difficulty::Easy,
            "medium" | "متوسط" => Difficulty::Medium,
            "hard" | "صعب" => Difficulty::Hard,
            _ => Difficulty::Unrated,
        }
    }
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Unrated => "unrated",
        }
    }
}

/// Settings-level difficulty: either a fixed tier or a mix of all tiers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(from = "String", into = "String")]
pub enum DifficultySelector {
    #[default]
    Mixed,
    Fixed(Difficulty),
}

impl From<String> for DifficultySelector {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "mixed" | "متغير" | "" => DifficultySelector::Mixed,
            _ => match Difficulty::from(raw) {
                Difficulty::Unrated => DifficultySelector::Mixed,
                tier => DifficultySelector::Fixed(tier),
            },
        }
    }
}

impl From<DifficultySelector> for String {
    fn from(selector: DifficultySelector) -> Self {
        selector.as_str().to_string()
    }
}

impl DifficultySelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultySelector::Mixed => "mixed",
            DifficultySelector::Fixed(tier) => tier.as_str(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum GameMode {
    #[default]
    Classic,
    TimeAttack,
    Speedrun,
    SuddenDeath,
    Survival,
    Versus,
}

impl GameMode {
    pub fn all() -> Vec<Self> {
        vec![
            GameMode::Classic,
            GameMode::TimeAttack,
            GameMode::Speedrun,
            GameMode::SuddenDeath,
            GameMode::Survival,
            GameMode::Versus,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::TimeAttack => "timeAttack",
            GameMode::Speedrun => "speedrun",
            GameMode::SuddenDeath => "suddenDeath",
            GameMode::Survival => "survival",
            GameMode::Versus => "versus",
        }
    }

    /// Modes that play a fixed number of questions; the rest are bounded by
    /// time or lives and use the whole pool.
    pub fn is_count_limited(&self) -> bool {
        matches!(self, GameMode::Classic | GameMode::Versus)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        GameMode::all()
            .into_iter()
            .find(|mode| mode.id().to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown game mode '{}'", s))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_skipped: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_surprise: bool,
}

impl Question {
    /// Checks the shape promised by the generator contract: a non-empty
    /// prompt, exactly four choices and an answer index inside them.
    pub fn validate(&self) -> Result<(), String> {
        if self.prompt.trim().is_empty() {
            return Err("empty prompt".to_string());
        }
        if self.choices.len() != REQUIRED_CHOICES {
            return Err(format!(
                "expected {} choices, got {}",
                REQUIRED_CHOICES,
                self.choices.len()
            ));
        }
        if self.answer_index >= self.choices.len() {
            return Err(format!(
                "answer index {} out of range for {} choices",
                self.answer_index,
                self.choices.len()
            ));
        }
        Ok(())
    }

    pub fn correct_choice(&self) -> Option<&str> {
        self.choices.get(self.answer_index).map(String::as_str)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub shuffle_questions: bool,
    pub shuffle_choices: bool,
    pub total_questions: usize,
    pub category: String,
    pub game_mode: GameMode,
    pub difficulty: DifficultySelector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player1_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player2_name: Option<String>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            shuffle_questions: true,
            shuffle_choices: true,
            total_questions: 5,
            category: "general".to_string(),
            game_mode: GameMode::Classic,
            difficulty: DifficultySelector::Mixed,
            player1_name: Some("Player 1".to_string()),
            player2_name: Some("Player 2".to_string()),
        }
    }
}

impl GameSettings {
    pub fn normalized(mut self) -> Self {
        self.total_questions = self
            .total_questions
            .clamp(MIN_TOTAL_QUESTIONS, MAX_TOTAL_QUESTIONS);
        if self.category.trim().is_empty() {
            self.category = "general".to_string();
        }
        self
    }
}

/// One resolved question. Single-player entries leave the second player's
/// answer out entirely; `Some(None)` means player two did not answer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionHistoryEntry {
    pub question: Question,
    pub player1_answer_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player2_answer_index: Option<Option<usize>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Winner {
    Player1,
    Player2,
    Draw,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersusOutcome {
    pub player1_name: String,
    pub player2_name: String,
    pub player1_score: u32,
    pub player2_score: u32,
    pub player1_points: u32,
    pub player2_points: u32,
    pub winner: Winner,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    pub points: u32,
    pub mode: GameMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hints_used: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lives_left: Option<u32>,
    pub category: String,
    pub questions_history: Vec<QuestionHistoryEntry>,
    #[serde(flatten)]
    pub versus: Option<VersusOutcome>,
}
