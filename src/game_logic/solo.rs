use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::game_logic::messages::PlayerCommand;
use crate::game_logic::models::{
    Difficulty, GameMode, GameResult, GameSettings, Question, QuestionHistoryEntry, Source,
};
use crate::game_logic::timer::{Countdown, TimerHandle, TimerKind, TimerOutcome, TimerSlot};
use crate::game_logic::utils::{answer_stats, base_points, shuffle, streak_bonus};
use crate::game_logic::{
    AssistKind, AssistRequest, AssistTicket, CommandEffect, GameSession, SessionOutbox,
};

pub const TIME_ATTACK_DURATION: Duration = Duration::from_secs(60);
const TIME_ATTACK_CORRECT_BONUS: Duration = Duration::from_secs(2);
const TIME_ATTACK_WRONG_PENALTY: Duration = Duration::from_secs(3);

pub const SPEEDRUN_TIME_PER_QUESTION: Duration = Duration::from_secs(5);
const SPEEDRUN_COMBO_WINDOW: Duration = Duration::from_secs(2);
const MAX_COMBO_MULTIPLIER: u32 = 4;

const SUDDEN_DEATH_START_SECS: u64 = 10;
const SUDDEN_DEATH_FLOOR_SECS: u64 = 3;

pub const SURVIVAL_LIVES: u32 = 3;
const LIFE_RESTORE_STREAK: u32 = 5;

const CORRECT_ADVANCE_DELAY: Duration = Duration::from_millis(1200);
const WRONG_ADVANCE_DELAY: Duration = Duration::from_millis(1500);
const SKIP_ADVANCE_DELAY: Duration = Duration::from_millis(500);

const FIFTY_FIFTY_REMOVALS: usize = 2;

/// What happens once the advance delay after a resolved question elapses.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Continuation {
    Advance,
    FinishAfterDelay,
    /// The session ended on the spot (time attack clock hit zero).
    FinishNow,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SoloPhase {
    AwaitingAnswer,
    Resolved { continuation: Continuation },
    Terminated,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AssistState {
    Idle,
    Pending,
    Ready(String),
}

impl AssistState {
    fn text(&self) -> Option<String> {
        match self {
            AssistState::Ready(text) => Some(text.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum ModeRules {
    Classic,
    TimeAttack { clock: Countdown },
    Speedrun { combo: u32 },
    SuddenDeath { second_chance_used: bool },
    Survival { lives: u32, lifeline_pending: bool },
}

impl ModeRules {
    fn for_mode(mode: GameMode) -> Self {
        match mode {
            GameMode::Classic => ModeRules::Classic,
            GameMode::TimeAttack => ModeRules::TimeAttack {
                clock: Countdown::new(TIME_ATTACK_DURATION),
            },
            GameMode::Speedrun => ModeRules::Speedrun { combo: 0 },
            GameMode::SuddenDeath => ModeRules::SuddenDeath {
                second_chance_used: false,
            },
            GameMode::Survival => ModeRules::Survival {
                lives: SURVIVAL_LIVES,
                lifeline_pending: false,
            },
            GameMode::Versus => {
                warn!("Versus settings handed to the single-player engine, playing as classic");
                ModeRules::Classic
            }
        }
    }

    fn question_time_limit(&self, index: usize) -> Option<Duration> {
        match self {
            ModeRules::Speedrun { .. } => Some(SPEEDRUN_TIME_PER_QUESTION),
            ModeRules::SuddenDeath { .. } => Some(sudden_death_limit(index)),
            _ => None,
        }
    }

    fn reset_for_question(&mut self) {
        if let ModeRules::Speedrun { combo } = self {
            *combo = 0;
        }
    }

    fn combo_multiplier(&mut self, elapsed: Duration) -> u32 {
        match self {
            ModeRules::Speedrun { combo } if elapsed < SPEEDRUN_COMBO_WINDOW => {
                *combo += 1;
                (1 + *combo).min(MAX_COMBO_MULTIPLIER)
            }
            _ => 1,
        }
    }

    /// Returns true when a life was restored.
    fn on_correct(&mut self, streak: u32) -> bool {
        match self {
            ModeRules::TimeAttack { clock } => {
                clock.add(TIME_ATTACK_CORRECT_BONUS);
                false
            }
            ModeRules::Survival { lives, .. }
                if *lives < SURVIVAL_LIVES && streak % LIFE_RESTORE_STREAK == 0 =>
            {
                *lives += 1;
                true
            }
            _ => false,
        }
    }

    fn on_wrong(&mut self, now: Instant, notices: &mut Vec<String>) -> Continuation {
        match self {
            ModeRules::Classic => Continuation::Advance,
            ModeRules::TimeAttack { clock } => {
                clock.subtract(TIME_ATTACK_WRONG_PENALTY);
                if clock.is_expired(now) {
                    Continuation::FinishNow
                } else {
                    Continuation::Advance
                }
            }
            ModeRules::Speedrun { combo } => {
                *combo = 0;
                Continuation::Advance
            }
            ModeRules::SuddenDeath { second_chance_used } => {
                if *second_chance_used {
                    Continuation::FinishAfterDelay
                } else {
                    *second_chance_used = true;
                    notices.push("Second chance used! The next mistake ends the game.".to_string());
                    Continuation::Advance
                }
            }
            ModeRules::Survival {
                lives,
                lifeline_pending,
            } => {
                *lives = lives.saturating_sub(1);
                if *lives == 0 {
                    Continuation::FinishAfterDelay
                } else {
                    if *lives == 1 {
                        *lifeline_pending = true;
                    }
                    Continuation::Advance
                }
            }
        }
    }

    fn lives(&self) -> Option<u32> {
        match self {
            ModeRules::Survival { lives, .. } => Some(*lives),
            _ => None,
        }
    }
}

/// Answer window for sudden death. The first two questions get the full ten
/// seconds, then each one loses a second down to the floor.
fn sudden_death_limit(index: usize) -> Duration {
    let shrink = index.saturating_sub(1) as u64;
    Duration::from_secs(
        SUDDEN_DEATH_START_SECS
            .saturating_sub(shrink)
            .max(SUDDEN_DEATH_FLOOR_SECS),
    )
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    pub question_index: usize,
    pub choice: Option<usize>,
    pub correct_index: usize,
    pub is_correct: bool,
    pub points_awarded: u32,
    pub streak: u32,
    pub life_restored: bool,
    pub timed_out: bool,
    pub answer_stats: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Ignored,
    Answered(AnswerFeedback),
}

/// What a client may see of a question. The answer and its explanation stay
/// hidden until the question is resolved.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub prompt: String,
    pub choices: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub is_surprise: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
}

impl QuestionView {
    pub fn new(question: &Question, revealed: bool) -> Self {
        Self {
            id: question.id.clone(),
            prompt: question.prompt.clone(),
            choices: question.choices.clone(),
            difficulty: question.difficulty,
            image_url: question.image_url.clone(),
            is_surprise: question.is_surprise,
            answer_index: revealed.then_some(question.answer_index),
            explanation: if revealed {
                question.explanation.clone()
            } else {
                None
            },
            sources: if revealed {
                question.sources.clone()
            } else {
                None
            },
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SoloView {
    pub mode: GameMode,
    pub phase: SoloPhase,
    pub question_index: usize,
    pub question_count: usize,
    pub progress_visible: bool,
    pub question: Option<QuestionView>,
    pub selected: Option<usize>,
    pub removed_choices: Vec<usize>,
    pub score: u32,
    pub points: u32,
    pub streak: u32,
    pub last_streak: u32,
    pub lives: Option<u32>,
    pub clock_remaining_ms: Option<u64>,
    pub skip_available: bool,
    pub hints_used: u32,
    pub hint: Option<String>,
    pub hint_pending: bool,
    pub fun_fact: Option<String>,
    pub fun_fact_pending: bool,
    pub last_answer: Option<AnswerFeedback>,
}

/// Single-player engine for classic, time attack, speedrun, sudden death and
/// survival. It never sleeps: callers feed it commands and fire the timer it
/// reports through [`SoloSession::next_timer`].
#[derive(Debug)]
pub struct SoloSession {
    mode: GameMode,
    category: String,
    questions: Vec<Question>,
    rules: ModeRules,
    phase: SoloPhase,
    current: usize,
    question_started_at: Instant,
    selected: Option<usize>,
    removed_choices: Vec<usize>,
    hint: AssistState,
    fun_fact: AssistState,
    last_answer: Option<AnswerFeedback>,
    score: u32,
    points: u32,
    streak: u32,
    last_streak: u32,
    hints_used: u32,
    skip_used: bool,
    history: Vec<QuestionHistoryEntry>,
    timer: TimerSlot,
    outbox: SessionOutbox,
    result: Option<GameResult>,
    rng: StdRng,
}

impl SoloSession {
    pub fn new(questions: Vec<Question>, settings: &GameSettings, now: Instant) -> Self {
        Self::with_rng(questions, settings, now, StdRng::from_entropy())
    }

    pub fn with_rng(
        questions: Vec<Question>,
        settings: &GameSettings,
        now: Instant,
        rng: StdRng,
    ) -> Self {
        let mut session = Self {
            mode: settings.game_mode,
            category: settings.category.clone(),
            questions,
            rules: ModeRules::for_mode(settings.game_mode),
            phase: SoloPhase::AwaitingAnswer,
            current: 0,
            question_started_at: now,
            selected: None,
            removed_choices: Vec::new(),
            hint: AssistState::Idle,
            fun_fact: AssistState::Idle,
            last_answer: None,
            score: 0,
            points: 0,
            streak: 0,
            last_streak: 0,
            hints_used: 0,
            skip_used: false,
            history: Vec::new(),
            timer: TimerSlot::default(),
            outbox: SessionOutbox::default(),
            result: None,
            rng,
        };

        if session.questions.is_empty() {
            session.finish();
        } else {
            session.enter_question(0, now);
        }
        session
    }

    pub fn next_timer(&self) -> Option<TimerHandle> {
        self.timer.armed()
    }

    fn enter_question(&mut self, index: usize, now: Instant) {
        self.current = index;
        self.phase = SoloPhase::AwaitingAnswer;
        self.question_started_at = now;
        self.selected = None;
        self.removed_choices.clear();
        self.hint = AssistState::Idle;
        self.fun_fact = AssistState::Idle;
        self.last_answer = None;
        self.rules.reset_for_question();

        let lifeline = match &mut self.rules {
            ModeRules::Survival {
                lifeline_pending, ..
            } => std::mem::take(lifeline_pending),
            _ => false,
        };
        if lifeline {
            self.removed_choices = self.pick_wrong_choices();
            if !self.removed_choices.is_empty() {
                self.outbox
                    .notices
                    .push("Last life! Two wrong answers were removed.".to_string());
            }
        }

        match &mut self.rules {
            ModeRules::TimeAttack { clock } => {
                clock.start(now);
                if let Some(deadline) = clock.deadline() {
                    self.timer.schedule(TimerKind::SessionClock, index, deadline);
                }
            }
            rules => {
                if let Some(limit) = rules.question_time_limit(index) {
                    self.timer
                        .schedule(TimerKind::QuestionClock, index, now + limit);
                }
            }
        }

        debug!(
            game.mode = %self.mode,
            question.index = index,
            question.count = self.questions.len(),
            "Entered question"
        );
    }

    fn pick_wrong_choices(&mut self) -> Vec<usize> {
        let Some(question) = self.questions.get(self.current) else {
            return Vec::new();
        };
        let wrong: Vec<usize> = (0..question.choices.len())
            .filter(|&i| i != question.answer_index)
            .collect();
        let mut picked = shuffle(&wrong, &mut self.rng);
        picked.truncate(FIFTY_FIFTY_REMOVALS);
        picked.sort_unstable();
        picked
    }

    fn pause_clock(&mut self, now: Instant) {
        if let ModeRules::TimeAttack { clock } = &mut self.rules {
            clock.pause(now);
        }
    }

    fn is_last_question(&self) -> bool {
        self.current + 1 >= self.questions.len()
    }

    pub fn submit_answer(&mut self, choice: usize, now: Instant) -> SubmitOutcome {
        if self.phase != SoloPhase::AwaitingAnswer {
            return SubmitOutcome::Ignored;
        }
        let Some(question) = self.questions.get(self.current) else {
            return SubmitOutcome::Ignored;
        };
        if choice >= question.choices.len() || self.removed_choices.contains(&choice) {
            debug!(choice, question.index = self.current, "Ignoring unavailable choice");
            return SubmitOutcome::Ignored;
        }
        SubmitOutcome::Answered(self.resolve(Some(choice), now))
    }

    fn resolve(&mut self, choice: Option<usize>, now: Instant) -> AnswerFeedback {
        self.timer.cancel();
        self.pause_clock(now);

        let question = self.questions[self.current].clone();
        let elapsed = now.saturating_duration_since(self.question_started_at);
        let is_correct = choice == Some(question.answer_index);

        self.selected = choice;
        self.history.push(QuestionHistoryEntry {
            question: question.clone(),
            player1_answer_index: choice,
            player2_answer_index: None,
        });

        let mut points_awarded = 0;
        let mut life_restored = false;
        let continuation = if is_correct {
            self.streak += 1;
            self.score += 1;

            let multiplier = self.rules.combo_multiplier(elapsed);
            points_awarded =
                base_points(question.difficulty) * multiplier + streak_bonus(self.streak);
            if question.is_surprise {
                points_awarded *= 2;
                self.outbox
                    .notices
                    .push("Surprise question! Double points.".to_string());
            }
            self.points += points_awarded;

            life_restored = self.rules.on_correct(self.streak);
            if life_restored {
                self.outbox.notices.push("Life restored!".to_string());
            }
            Continuation::Advance
        } else {
            self.last_streak = self.streak;
            self.streak = 0;
            self.rules.on_wrong(now, &mut self.outbox.notices)
        };

        let continuation = match continuation {
            Continuation::Advance if self.is_last_question() => Continuation::FinishAfterDelay,
            other => other,
        };

        let stats = answer_stats(
            question.answer_index,
            question.choices.len(),
            question.difficulty,
            &mut self.rng,
        );
        let feedback = AnswerFeedback {
            question_index: self.current,
            choice,
            correct_index: question.answer_index,
            is_correct,
            points_awarded,
            streak: self.streak,
            life_restored,
            timed_out: choice.is_none(),
            answer_stats: stats,
        };
        self.last_answer = Some(feedback.clone());

        debug!(
            game.mode = %self.mode,
            question.index = self.current,
            answer.correct = is_correct,
            answer.points = points_awarded,
            ?continuation,
            "Resolved question"
        );

        if continuation == Continuation::FinishNow {
            self.finish();
            return feedback;
        }

        self.fun_fact = AssistState::Pending;
        self.outbox.assists.push(AssistRequest {
            ticket: AssistTicket {
                kind: AssistKind::FunFact,
                question_index: self.current,
            },
            question,
        });

        self.phase = SoloPhase::Resolved { continuation };
        let delay = if is_correct {
            CORRECT_ADVANCE_DELAY
        } else {
            WRONG_ADVANCE_DELAY
        };
        self.timer
            .schedule(TimerKind::Advance, self.current, now + delay);
        feedback
    }

    /// Skips the current question. Allowed once per session and only before
    /// answering; the question is recorded as unanswered without touching the
    /// score or streak.
    pub fn skip(&mut self, now: Instant) -> bool {
        if self.skip_used || self.phase != SoloPhase::AwaitingAnswer {
            return false;
        }
        let Some(question) = self.questions.get_mut(self.current) else {
            return false;
        };
        question.is_skipped = true;
        let question = question.clone();

        self.skip_used = true;
        self.timer.cancel();
        self.pause_clock(now);
        self.selected = None;
        self.history.push(QuestionHistoryEntry {
            question,
            player1_answer_index: None,
            player2_answer_index: None,
        });

        let continuation = if self.is_last_question() {
            Continuation::FinishAfterDelay
        } else {
            Continuation::Advance
        };
        self.phase = SoloPhase::Resolved { continuation };
        self.timer
            .schedule(TimerKind::Advance, self.current, now + SKIP_ADVANCE_DELAY);
        self.outbox.notices.push("Question skipped".to_string());
        true
    }

    /// Removes two wrong choices. Once per question, before answering.
    pub fn use_fifty_fifty(&mut self) -> Option<Vec<usize>> {
        if self.phase != SoloPhase::AwaitingAnswer || !self.removed_choices.is_empty() {
            return None;
        }
        let removed = self.pick_wrong_choices();
        if removed.is_empty() {
            return None;
        }
        self.removed_choices = removed.clone();
        self.hints_used += 1;
        Some(removed)
    }

    pub fn request_hint(&mut self) -> Option<AssistTicket> {
        if self.phase != SoloPhase::AwaitingAnswer || self.hint != AssistState::Idle {
            return None;
        }
        let question = self.questions.get(self.current)?.clone();
        let ticket = AssistTicket {
            kind: AssistKind::SmartHint,
            question_index: self.current,
        };
        self.hint = AssistState::Pending;
        self.outbox.assists.push(AssistRequest { ticket, question });
        Some(ticket)
    }

    pub fn apply_assist(&mut self, ticket: AssistTicket, outcome: Result<String, String>) -> bool {
        if ticket.question_index != self.current
            || matches!(self.phase, SoloPhase::Terminated | SoloPhase::Aborted)
        {
            debug!(?ticket, question.index = self.current, "Discarding stale assist result");
            return false;
        }

        match ticket.kind {
            AssistKind::SmartHint => {
                if self.hint != AssistState::Pending {
                    return false;
                }
                match outcome {
                    Ok(text) => {
                        self.hint = AssistState::Ready(text);
                        self.hints_used += 1;
                    }
                    Err(message) => {
                        self.hint = AssistState::Idle;
                        self.outbox.notices.push(message);
                    }
                }
                true
            }
            AssistKind::FunFact => {
                if self.fun_fact != AssistState::Pending {
                    return false;
                }
                self.fun_fact = match outcome {
                    Ok(text) => AssistState::Ready(text),
                    Err(_) => AssistState::Idle,
                };
                true
            }
        }
    }

    pub fn fire_timer(&mut self, handle: TimerHandle, now: Instant) -> TimerOutcome {
        if !self.timer.claim(&handle) {
            return TimerOutcome::Stale;
        }

        match handle.kind {
            TimerKind::QuestionClock => {
                if self.phase == SoloPhase::AwaitingAnswer {
                    self.resolve(None, now);
                }
            }
            TimerKind::SessionClock => {
                self.pause_clock(now);
                info!(game.mode = %self.mode, "Session clock ran out");
                self.finish();
            }
            TimerKind::Advance => match self.phase {
                SoloPhase::Resolved {
                    continuation: Continuation::Advance,
                } => self.enter_question(self.current + 1, now),
                SoloPhase::Resolved { .. } => self.finish(),
                _ => {}
            },
            TimerKind::RevealTick => {}
        }
        TimerOutcome::Fired
    }

    pub fn quit(&mut self) {
        if matches!(self.phase, SoloPhase::Terminated | SoloPhase::Aborted) {
            return;
        }
        self.timer.cancel();
        self.phase = SoloPhase::Aborted;
        info!(game.mode = %self.mode, question.index = self.current, "Session aborted");
    }

    fn finish(&mut self) {
        if self.phase == SoloPhase::Terminated {
            return;
        }
        self.timer.cancel();
        self.phase = SoloPhase::Terminated;

        let answered = self.history.len() as u32;
        let (total, lives_left) = match &self.rules {
            ModeRules::TimeAttack { .. } | ModeRules::SuddenDeath { .. } => (None, None),
            ModeRules::Survival { lives, .. } => (Some(answered), Some(*lives)),
            _ => (Some(answered), None),
        };

        info!(
            game.mode = %self.mode,
            result.score = self.score,
            result.points = self.points,
            "Session finished"
        );

        self.result = Some(GameResult {
            score: self.score,
            total,
            points: self.points,
            mode: self.mode,
            hints_used: Some(self.hints_used),
            lives_left,
            category: self.category.clone(),
            questions_history: self.history.clone(),
            versus: None,
        });
    }

    pub fn take_result(&mut self) -> Option<GameResult> {
        self.result.take()
    }

    pub fn view(&self, now: Instant) -> SoloView {
        let active = !matches!(self.phase, SoloPhase::Terminated | SoloPhase::Aborted);
        let revealed = matches!(self.phase, SoloPhase::Resolved { .. });

        let clock_remaining = match &self.rules {
            ModeRules::TimeAttack { clock } => Some(clock.remaining(now)),
            _ => self
                .timer
                .armed()
                .filter(|handle| handle.kind == TimerKind::QuestionClock)
                .map(|handle| handle.deadline.saturating_duration_since(now)),
        };

        SoloView {
            mode: self.mode,
            phase: self.phase,
            question_index: self.current,
            question_count: self.questions.len(),
            progress_visible: self.mode == GameMode::Classic,
            question: self
                .questions
                .get(self.current)
                .filter(|_| active)
                .map(|question| QuestionView::new(question, revealed)),
            selected: self.selected,
            removed_choices: self.removed_choices.clone(),
            score: self.score,
            points: self.points,
            streak: self.streak,
            last_streak: self.last_streak,
            lives: self.rules.lives(),
            clock_remaining_ms: clock_remaining.map(|d| d.as_millis() as u64),
            skip_available: !self.skip_used && self.phase == SoloPhase::AwaitingAnswer,
            hints_used: self.hints_used,
            hint: self.hint.text(),
            hint_pending: self.hint == AssistState::Pending,
            fun_fact: self.fun_fact.text(),
            fun_fact_pending: self.fun_fact == AssistState::Pending,
            last_answer: self.last_answer.clone(),
        }
    }
}

impl GameSession for SoloSession {
    fn mode(&self) -> GameMode {
        self.mode
    }

    fn apply_command(&mut self, command: PlayerCommand, now: Instant) -> CommandEffect {
        let applied = match command {
            PlayerCommand::SelectChoice { index } => {
                matches!(self.submit_answer(index, now), SubmitOutcome::Answered(_))
            }
            PlayerCommand::UseFiftyFifty => self.use_fifty_fifty().is_some(),
            PlayerCommand::UseSmartHint => self.request_hint().is_some(),
            PlayerCommand::Skip => self.skip(now),
            PlayerCommand::Quit => {
                SoloSession::quit(self);
                return CommandEffect::Quit;
            }
            PlayerCommand::SelectVersusChoice { .. } => false,
        };
        if applied {
            CommandEffect::Updated
        } else {
            CommandEffect::Ignored
        }
    }

    fn apply_assist(&mut self, ticket: AssistTicket, outcome: Result<String, String>) -> bool {
        SoloSession::apply_assist(self, ticket, outcome)
    }

    fn next_timer(&self) -> Option<TimerHandle> {
        SoloSession::next_timer(self)
    }

    fn fire_timer(&mut self, handle: TimerHandle, now: Instant) -> TimerOutcome {
        SoloSession::fire_timer(self, handle, now)
    }

    fn quit(&mut self) {
        SoloSession::quit(self)
    }

    fn is_terminated(&self) -> bool {
        self.phase == SoloPhase::Terminated
    }

    fn is_aborted(&self) -> bool {
        self.phase == SoloPhase::Aborted
    }

    fn take_result(&mut self) -> Option<GameResult> {
        SoloSession::take_result(self)
    }

    fn drain_outbox(&mut self) -> SessionOutbox {
        std::mem::take(&mut self.outbox)
    }

    fn snapshot(&self, now: Instant) -> JsonValue {
        serde_json::to_value(self.view(now)).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to serialize solo view");
            JsonValue::Null
        })
    }
}
