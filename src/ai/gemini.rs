use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::AiError;
use super::TriviaAi;
use crate::config::AiConfig;
use crate::game_logic::models::{DifficultySelector, Question, Source};
use crate::game_logic::utils::unix_millis;

const QUESTION_TEMPERATURE: f32 = 0.5;
const HINT_TEMPERATURE: f32 = 0.7;
const HINT_MAX_TOKENS: u32 = 50;
const FACT_TEMPERATURE: f32 = 0.8;
const FACT_MAX_TOKENS: u32 = 70;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<JsonValue>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize, Debug)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<JsonValue>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateContentResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    /// Web sources from search grounding, deduplicated by uri.
    fn sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = Vec::new();
        let chunks = self
            .candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|m| m.grounding_chunks.as_slice())
            .unwrap_or_default();
        for web in chunks.iter().filter_map(|chunk| chunk.web.as_ref()) {
            let Some(uri) = web.uri.as_ref().filter(|uri| !uri.is_empty()) else {
                continue;
            };
            if sources.iter().any(|s| &s.uri == uri) {
                continue;
            }
            sources.push(Source {
                uri: uri.clone(),
                title: web.title.clone().unwrap_or_else(|| uri.clone()),
            });
        }
        sources
    }
}

/// Strips a surrounding markdown code fence, with or without a `json` tag.
pub fn clean_json_text(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// Parses the generator's JSON array. Entries that fail to parse or validate
/// are dropped; no usable entry at all is an error.
pub fn parse_generated_questions(
    text: &str,
    category_id: &str,
    sources: &[Source],
    generated_at: i64,
) -> Result<Vec<Question>, AiError> {
    let cleaned = clean_json_text(text);
    if cleaned.is_empty() {
        return Err(AiError::EmptyResponse("question list"));
    }

    let value: JsonValue = serde_json::from_str(cleaned)
        .map_err(|e| AiError::MalformedPayload(format!("invalid JSON: {}", e)))?;
    let JsonValue::Array(items) = value else {
        return Err(AiError::MalformedPayload("expected a JSON array".to_string()));
    };

    let total = items.len();
    let mut questions = Vec::with_capacity(total);
    for (position, item) in items.into_iter().enumerate() {
        let mut question: Question = match serde_json::from_value(item) {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(item.position = position, error = %e, "Dropping unparseable generated question");
                continue;
            }
        };
        if let Err(reason) = question.validate() {
            tracing::warn!(item.position = position, %reason, "Dropping invalid generated question");
            continue;
        }
        question.id = format!("{}-{}-{}", category_id, questions.len(), generated_at);
        question.sources = (!sources.is_empty()).then(|| sources.to_vec());
        question.is_skipped = false;
        question.is_surprise = false;
        questions.push(question);
    }

    if questions.is_empty() {
        return Err(AiError::MalformedPayload(format!(
            "none of the {} generated questions were usable",
            total
        )));
    }
    if questions.len() < total {
        tracing::info!(kept = questions.len(), total, "Some generated questions were dropped");
    }
    Ok(questions)
}

fn question_prompt(category_name: &str, count: usize, difficulty: DifficultySelector) -> String {
    let difficulty_rule = match difficulty {
        DifficultySelector::Mixed => {
            "Tag each question with its difficulty (\"easy\", \"medium\" or \"hard\") and mix the levels.".to_string()
        }
        DifficultySelector::Fixed(tier) => {
            format!("Every question must have difficulty \"{}\".", tier.as_str())
        }
    };

    format!(
        r#"You write accurate, verifiable quiz questions. Use Google Search to check every fact before writing a question.

Write {count} unique, varied multiple-choice questions about "{category_name}".

Rules:
1. Each question has exactly 4 choices and exactly one correct answer.
2. Give a short, clear explanation of the correct answer.
3. {difficulty_rule}
4. Avoid ambiguous or opinion-based questions.
5. Output only a valid JSON array, with no extra text and no markdown.

Each element must look like:
{{
  "prompt": "question text",
  "choices": ["choice 1", "choice 2", "choice 3", "choice 4"],
  "answerIndex": 0,
  "explanation": "why the answer is correct",
  "difficulty": "easy"
}}"#
    )
}

fn choices_list(question: &Question) -> String {
    question
        .choices
        .iter()
        .map(|c| format!("- {}", c))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hint_prompt(question: &Question) -> String {
    format!(
        r#"You are the assistant in a quiz game. Write a smart hint for this multiple-choice question.

Rules:
1. One short sentence.
2. Never reveal the correct answer directly; only point the player in the right direction.
3. Avoid repeating words from the question or the correct answer.

Question: "{}"
Choices:
{}
Correct answer: "{}"

Good hint for "What is the capital of Australia?" (Canberra): "It is not the largest or best-known city in the country."
Bad hint: "It starts with C."

Now write the hint."#,
        question.prompt,
        choices_list(question),
        question.correct_choice().unwrap_or_default()
    )
}

fn fact_prompt(question: &Question) -> String {
    format!(
        r#"You are a cheerful quiz assistant. Share one short, surprising fact related to the topic of this question.

Rules:
1. One sentence.
2. It must differ from the explanation below and add a new angle.
3. Do not start with "Did you know".

Question topic: "{}"
Correct answer (for context): "{}"
Explanation to avoid repeating: "{}"

Now write the fact."#,
        question.prompt,
        question.correct_choice().unwrap_or_default(),
        question.explanation.as_deref().unwrap_or_default()
    )
}

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    question_model: String,
    assist_model: String,
}

impl GeminiClient {
    /// Returns `None` when no API key is configured.
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let api_key = config.api_key.as_ref().map(|k| k.trim()).filter(|k| !k.is_empty())?;
        Some(Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            question_model: config.question_model.clone(),
            assist_model: config.assist_model.clone(),
        })
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        generation_config: GenerationConfig,
        tools: Vec<JsonValue>,
    ) -> Result<GenerateContentResponse, AiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
            generation_config,
            tools,
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error body".to_string());
            tracing::error!(ai.model = %model, http.status = %status, "AI request failed");
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }

    async fn short_text(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
        what: &'static str,
    ) -> Result<String, AiError> {
        let response = self
            .generate(
                model,
                prompt,
                GenerationConfig {
                    temperature,
                    max_output_tokens: Some(max_tokens),
                    thinking_config: Some(serde_json::json!({ "thinkingBudget": 0 })),
                },
                Vec::new(),
            )
            .await?;
        let text = response.text();
        let text = text.trim();
        if text.is_empty() {
            return Err(AiError::EmptyResponse(what));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl TriviaAi for GeminiClient {
    #[tracing::instrument(skip(self), fields(ai.model = %self.question_model))]
    async fn generate_questions(
        &self,
        category_id: &str,
        category_name: &str,
        count: usize,
        difficulty: DifficultySelector,
    ) -> Result<Vec<Question>, AiError> {
        let prompt = question_prompt(category_name, count, difficulty);
        let response = self
            .generate(
                &self.question_model,
                &prompt,
                GenerationConfig {
                    temperature: QUESTION_TEMPERATURE,
                    max_output_tokens: None,
                    thinking_config: None,
                },
                vec![serde_json::json!({ "google_search": {} })],
            )
            .await?;

        let questions = parse_generated_questions(
            &response.text(),
            category_id,
            &response.sources(),
            unix_millis(),
        )?;
        tracing::info!(questions.count = questions.len(), "Generated questions");
        Ok(questions)
    }

    #[tracing::instrument(skip(self, question), fields(question.id = %question.id))]
    async fn smart_hint(&self, question: &Question) -> Result<String, AiError> {
        self.short_text(
            &self.assist_model,
            &hint_prompt(question),
            HINT_TEMPERATURE,
            HINT_MAX_TOKENS,
            "hint",
        )
        .await
    }

    #[tracing::instrument(skip(self, question), fields(question.id = %question.id))]
    async fn fun_fact(&self, question: &Question) -> Result<String, AiError> {
        self.short_text(
            &self.question_model,
            &fact_prompt(question),
            FACT_TEMPERATURE,
            FACT_MAX_TOKENS,
            "fun fact",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_logic::models::Difficulty;

    #[test]
    fn test_clean_json_text_strips_fences() {
        assert_eq!(clean_json_text("```json\n[1]\n```"), "[1]");
        assert_eq!(clean_json_text("```\n[2]```"), "[2]");
        assert_eq!(clean_json_text("  [3]  "), "[3]");
        assert_eq!(clean_json_text(""), "");
    }

    #[test]
    fn test_parse_drops_malformed_entries() {
        let text = r#"```json
[
  {"prompt": "Capital of France?", "choices": ["Paris", "Rome", "Oslo", "Bern"], "answerIndex": 0, "explanation": "Paris.", "difficulty": "سهل"},
  {"prompt": "Three choices", "choices": ["a", "b", "c"], "answerIndex": 0},
  {"prompt": "Out of range", "choices": ["a", "b", "c", "d"], "answerIndex": 4},
  {"choices": ["a", "b", "c", "d"], "answerIndex": 1},
  {"prompt": "Largest planet?", "choices": ["Mars", "Jupiter", "Venus", "Earth"], "answerIndex": 1, "difficulty": "medium"}
]
```"#;
        let sources = vec![Source {
            uri: "https://example.org".to_string(),
            title: "Example".to_string(),
        }];
        let questions = parse_generated_questions(text, "science", &sources, 42).unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, "science-0-42");
        assert_eq!(questions[0].difficulty, Difficulty::Easy);
        assert_eq!(questions[1].id, "science-1-42");
        assert_eq!(questions[1].difficulty, Difficulty::Medium);
        assert_eq!(questions[1].sources.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_parse_rejects_non_arrays_and_empty_results() {
        assert!(matches!(
            parse_generated_questions(r#"{"prompt": "x"}"#, "c", &[], 1),
            Err(AiError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_generated_questions("[]", "c", &[], 1),
            Err(AiError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_generated_questions("not json", "c", &[], 1),
            Err(AiError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_generated_questions("```json```", "c", &[], 1),
            Err(AiError::EmptyResponse(_))
        ));
    }

    #[test]
    fn test_response_sources_are_deduplicated() {
        let raw = r#"{
          "candidates": [{
            "content": {"parts": [{"text": "[]"}]},
            "groundingMetadata": {"groundingChunks": [
              {"web": {"uri": "https://a.example", "title": "A"}},
              {"web": {"uri": "https://a.example", "title": "A again"}},
              {"web": {"uri": "https://b.example"}},
              {"retrievedContext": {}}
            ]}
          }]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let sources = response.sources();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "A");
        assert_eq!(sources[1].title, "https://b.example");
        assert_eq!(response.text(), "[]");
    }

    #[test]
    fn test_client_requires_api_key() {
        let mut config = AiConfig::default();
        assert!(GeminiClient::from_config(&config).is_none());
        config.api_key = Some("   ".to_string());
        assert!(GeminiClient::from_config(&config).is_none());
        config.api_key = Some("secret".to_string());
        assert!(GeminiClient::from_config(&config).is_some());
    }

    #[test]
    fn test_prompts_mention_the_question() {
        let question = Question {
            id: "q".to_string(),
            prompt: "Largest ocean?".to_string(),
            choices: vec!["Pacific".into(), "Atlantic".into(), "Indian".into(), "Arctic".into()],
            answer_index: 0,
            explanation: Some("By area.".to_string()),
            difficulty: Difficulty::Easy,
            image_url: None,
            sources: None,
            is_skipped: false,
            is_surprise: false,
        };
        assert!(hint_prompt(&question).contains("Largest ocean?"));
        assert!(fact_prompt(&question).contains("By area."));
        assert!(
            question_prompt("Space", 20, DifficultySelector::Fixed(Difficulty::Hard))
                .contains("\"hard\"")
        );
    }
}
