use async_trait::async_trait;

pub mod error;
pub mod gemini;

pub use error::AiError;
pub use gemini::GeminiClient;

use crate::game_logic::models::{DifficultySelector, Question};

/// The external AI collaborator: question generation plus the two
/// best-effort assists shown during play.
#[async_trait]
pub trait TriviaAi: Send + Sync + std::fmt::Debug {
    /// Generates up to `count` validated questions about `category_name`.
    /// `category_id` is only used to build question ids.
    async fn generate_questions(
        &self,
        category_id: &str,
        category_name: &str,
        count: usize,
        difficulty: DifficultySelector,
    ) -> Result<Vec<Question>, AiError>;

    /// One sentence nudging towards the answer without giving it away.
    async fn smart_hint(&self, question: &Question) -> Result<String, AiError>;

    /// One sentence of related trivia that does not repeat the explanation.
    async fn fun_fact(&self, question: &Question) -> Result<String, AiError>;
}
