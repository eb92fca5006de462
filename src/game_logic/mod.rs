use std::fmt::Debug;
use std::time::Instant;

pub mod messages;
pub mod models;
pub mod prepare;
pub mod solo;
pub mod timer;
pub mod utils;
pub mod versus;

pub use messages::{ClientToServerMessage, PlayerCommand, ServerToClientMessage};
pub use models::{GameMode, GameResult, GameSettings, Question};
pub use solo::SoloSession;
pub use timer::{TimerHandle, TimerOutcome};
pub use versus::VersusSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistKind {
    SmartHint,
    FunFact,
}

/// Identifies an in-flight hint or fun-fact request by the question it was
/// made for. Results for any other question are dropped on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssistTicket {
    pub kind: AssistKind,
    pub question_index: usize,
}

#[derive(Debug, Clone)]
pub struct AssistRequest {
    pub ticket: AssistTicket,
    pub question: Question,
}

/// Work the engine wants done outside itself: AI calls to start and notices
/// to show the players.
#[derive(Debug, Default)]
pub struct SessionOutbox {
    pub assists: Vec<AssistRequest>,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    /// Stale, duplicate or not applicable in the current state.
    Ignored,
    Updated,
    Quit,
}

/// Shared surface of the single-player and versus engines. The session actor
/// drives either one through it.
pub trait GameSession: Send + Sync + Debug + 'static {
    fn mode(&self) -> GameMode;

    fn apply_command(&mut self, command: PlayerCommand, now: Instant) -> CommandEffect;

    /// Applies the outcome of an assist request. Returns false when the
    /// ticket no longer matches the displayed question.
    fn apply_assist(&mut self, ticket: AssistTicket, outcome: Result<String, String>) -> bool;

    fn next_timer(&self) -> Option<TimerHandle>;

    fn fire_timer(&mut self, handle: TimerHandle, now: Instant) -> TimerOutcome;

    fn quit(&mut self);

    fn is_terminated(&self) -> bool;

    fn is_aborted(&self) -> bool;

    /// Yields the final result once, after termination.
    fn take_result(&mut self) -> Option<GameResult>;

    fn drain_outbox(&mut self) -> SessionOutbox;

    fn snapshot(&self, now: Instant) -> serde_json::Value;
}
