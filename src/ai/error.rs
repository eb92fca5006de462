use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("AI service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("AI returned malformed data: {0}")]
    MalformedPayload(String),
    #[error("AI returned an empty {0}")]
    EmptyResponse(&'static str),
    #[error("No AI service is configured")]
    Offline,
}

impl AiError {
    /// Message safe to show players.
    pub fn user_message(&self) -> &'static str {
        match self {
            AiError::MalformedPayload(_) => {
                "The AI did not return questions in a usable format. Please try again."
            }
            AiError::Offline => "You are offline. Connect to the internet to use AI features.",
            _ => "The AI service failed. Please try again.",
        }
    }
}

pub type Result<T, E = AiError> = std::result::Result<T, E>;
