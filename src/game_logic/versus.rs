use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::game_logic::messages::PlayerCommand;
use crate::game_logic::models::{
    GameMode, GameResult, GameSettings, Question, QuestionHistoryEntry, VersusOutcome, Winner,
};
use crate::game_logic::solo::QuestionView;
use crate::game_logic::timer::{TimerHandle, TimerKind, TimerOutcome, TimerSlot};
use crate::game_logic::utils::base_points;
use crate::game_logic::{AssistTicket, CommandEffect, GameSession, SessionOutbox};

pub const REVEAL_COUNTDOWN: u8 = 3;
const REVEAL_TICK: Duration = Duration::from_secs(1);
const POST_REVEAL_DELAY: Duration = Duration::from_secs(2);
pub const SPEED_BONUS: u32 = 10;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PlayerSlot {
    Player1,
    Player2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub choice: usize,
    pub at: Instant,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum VersusPhase {
    AwaitingBoth,
    CountdownToReveal { remaining: u8 },
    Revealed,
    Terminated,
    Aborted,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RevealSummary {
    pub question_index: usize,
    pub correct_index: usize,
    pub player1_choice: usize,
    pub player2_choice: usize,
    pub player1_points_awarded: u32,
    pub player2_points_awarded: u32,
    pub speed_bonus_to: Option<PlayerSlot>,
}

#[derive(Debug, Clone)]
struct Contender {
    name: String,
    score: u32,
    points: u32,
    selection: Option<Selection>,
}

impl Contender {
    fn new(name: Option<&String>, fallback: &str) -> Self {
        let name = name
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .unwrap_or(fallback)
            .to_string();
        Self {
            name,
            score: 0,
            points: 0,
            selection: None,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ContenderView {
    pub name: String,
    pub score: u32,
    pub points: u32,
    pub answered: bool,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VersusView {
    pub mode: GameMode,
    pub phase: VersusPhase,
    pub question_index: usize,
    pub question_count: usize,
    pub question: Option<QuestionView>,
    pub player1: ContenderView,
    pub player2: ContenderView,
    pub last_reveal: Option<RevealSummary>,
}

/// Two players on one device answering the same question. Both answers stay
/// hidden until a short countdown after the second one arrives.
#[derive(Debug)]
pub struct VersusSession {
    category: String,
    questions: Vec<Question>,
    phase: VersusPhase,
    current: usize,
    player1: Contender,
    player2: Contender,
    last_reveal: Option<RevealSummary>,
    history: Vec<QuestionHistoryEntry>,
    timer: TimerSlot,
    outbox: SessionOutbox,
    result: Option<GameResult>,
}

impl VersusSession {
    pub fn new(questions: Vec<Question>, settings: &GameSettings) -> Self {
        if settings.game_mode != GameMode::Versus {
            warn!(game.mode = %settings.game_mode, "Non-versus settings handed to the versus engine");
        }
        let mut session = Self {
            category: settings.category.clone(),
            questions,
            phase: VersusPhase::AwaitingBoth,
            current: 0,
            player1: Contender::new(settings.player1_name.as_ref(), "Player 1"),
            player2: Contender::new(settings.player2_name.as_ref(), "Player 2"),
            last_reveal: None,
            history: Vec::new(),
            timer: TimerSlot::default(),
            outbox: SessionOutbox::default(),
            result: None,
        };
        if session.questions.is_empty() {
            session.finish();
        }
        session
    }

    pub fn next_timer(&self) -> Option<TimerHandle> {
        self.timer.armed()
    }

    fn contender_mut(&mut self, player: PlayerSlot) -> &mut Contender {
        match player {
            PlayerSlot::Player1 => &mut self.player1,
            PlayerSlot::Player2 => &mut self.player2,
        }
    }

    /// Records one player's answer. Returns false for a second answer from the
    /// same player, an out-of-range choice, or any answer outside
    /// `AwaitingBoth`.
    pub fn submit(&mut self, player: PlayerSlot, choice: usize, at: Instant) -> bool {
        if self.phase != VersusPhase::AwaitingBoth {
            return false;
        }
        let Some(question) = self.questions.get(self.current) else {
            return false;
        };
        if choice >= question.choices.len() {
            return false;
        }
        let question_index = self.current;
        let contender = self.contender_mut(player);
        if contender.selection.is_some() {
            debug!(?player, question.index = question_index, "Duplicate versus answer ignored");
            return false;
        }
        contender.selection = Some(Selection { choice, at });

        if self.player1.selection.is_some() && self.player2.selection.is_some() {
            self.phase = VersusPhase::CountdownToReveal {
                remaining: REVEAL_COUNTDOWN,
            };
            self.timer
                .schedule(TimerKind::RevealTick, self.current, at + REVEAL_TICK);
        }
        true
    }

    pub fn fire_timer(&mut self, handle: TimerHandle, now: Instant) -> TimerOutcome {
        if !self.timer.claim(&handle) {
            return TimerOutcome::Stale;
        }

        match (handle.kind, self.phase) {
            (TimerKind::RevealTick, VersusPhase::CountdownToReveal { remaining }) => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.reveal(now);
                } else {
                    self.phase = VersusPhase::CountdownToReveal { remaining };
                    self.timer
                        .schedule(TimerKind::RevealTick, self.current, now + REVEAL_TICK);
                }
            }
            (TimerKind::Advance, VersusPhase::Revealed) => {
                if self.current + 1 >= self.questions.len() {
                    self.finish();
                } else {
                    self.current += 1;
                    self.player1.selection = None;
                    self.player2.selection = None;
                    self.phase = VersusPhase::AwaitingBoth;
                }
            }
            (kind, phase) => {
                debug!(?kind, ?phase, "Timer fired in a phase that does not use it");
            }
        }
        TimerOutcome::Fired
    }

    fn reveal(&mut self, now: Instant) {
        let question = self.questions[self.current].clone();
        let (Some(first), Some(second)) = (self.player1.selection, self.player2.selection) else {
            return;
        };

        let base = base_points(question.difficulty);
        let first_correct = first.choice == question.answer_index;
        let second_correct = second.choice == question.answer_index;

        let mut first_points = if first_correct { base } else { 0 };
        let mut second_points = if second_correct { base } else { 0 };
        let speed_bonus_to = if first_correct && second_correct {
            if first.at < second.at {
                first_points += SPEED_BONUS;
                Some(PlayerSlot::Player1)
            } else {
                second_points += SPEED_BONUS;
                Some(PlayerSlot::Player2)
            }
        } else {
            None
        };

        if first_correct {
            self.player1.score += 1;
        }
        if second_correct {
            self.player2.score += 1;
        }
        self.player1.points += first_points;
        self.player2.points += second_points;

        self.history.push(QuestionHistoryEntry {
            question: question.clone(),
            player1_answer_index: Some(first.choice),
            player2_answer_index: Some(Some(second.choice)),
        });

        self.last_reveal = Some(RevealSummary {
            question_index: self.current,
            correct_index: question.answer_index,
            player1_choice: first.choice,
            player2_choice: second.choice,
            player1_points_awarded: first_points,
            player2_points_awarded: second_points,
            speed_bonus_to,
        });

        debug!(
            question.index = self.current,
            player1.points = first_points,
            player2.points = second_points,
            ?speed_bonus_to,
            "Revealed versus answers"
        );

        self.phase = VersusPhase::Revealed;
        self.timer
            .schedule(TimerKind::Advance, self.current, now + POST_REVEAL_DELAY);
    }

    pub fn quit(&mut self) {
        if matches!(self.phase, VersusPhase::Terminated | VersusPhase::Aborted) {
            return;
        }
        self.timer.cancel();
        self.phase = VersusPhase::Aborted;
        info!(question.index = self.current, "Versus session aborted");
    }

    fn finish(&mut self) {
        if self.phase == VersusPhase::Terminated {
            return;
        }
        self.timer.cancel();
        self.phase = VersusPhase::Terminated;

        let winner = match self.player1.points.cmp(&self.player2.points) {
            std::cmp::Ordering::Greater => Winner::Player1,
            std::cmp::Ordering::Less => Winner::Player2,
            std::cmp::Ordering::Equal => Winner::Draw,
        };

        info!(
            player1.points = self.player1.points,
            player2.points = self.player2.points,
            ?winner,
            "Versus session finished"
        );

        self.result = Some(GameResult {
            score: self.player1.score,
            total: Some(self.questions.len() as u32),
            points: self.player1.points,
            mode: GameMode::Versus,
            hints_used: None,
            lives_left: None,
            category: self.category.clone(),
            questions_history: self.history.clone(),
            versus: Some(VersusOutcome {
                player1_name: self.player1.name.clone(),
                player2_name: self.player2.name.clone(),
                player1_score: self.player1.score,
                player2_score: self.player2.score,
                player1_points: self.player1.points,
                player2_points: self.player2.points,
                winner,
            }),
        });
    }

    pub fn take_result(&mut self) -> Option<GameResult> {
        self.result.take()
    }

    pub fn view(&self) -> VersusView {
        let active = !matches!(self.phase, VersusPhase::Terminated | VersusPhase::Aborted);
        let contender_view = |c: &Contender| ContenderView {
            name: c.name.clone(),
            score: c.score,
            points: c.points,
            answered: c.selection.is_some(),
        };
        VersusView {
            mode: GameMode::Versus,
            phase: self.phase,
            question_index: self.current,
            question_count: self.questions.len(),
            question: self
                .questions
                .get(self.current)
                .filter(|_| active)
                .map(|q| QuestionView::new(q, self.phase == VersusPhase::Revealed)),
            player1: contender_view(&self.player1),
            player2: contender_view(&self.player2),
            last_reveal: self.last_reveal.clone(),
        }
    }
}

impl GameSession for VersusSession {
    fn mode(&self) -> GameMode {
        GameMode::Versus
    }

    fn apply_command(&mut self, command: PlayerCommand, now: Instant) -> CommandEffect {
        match command {
            PlayerCommand::SelectVersusChoice { player, index } => {
                if self.submit(player, index, now) {
                    CommandEffect::Updated
                } else {
                    CommandEffect::Ignored
                }
            }
            PlayerCommand::Quit => {
                VersusSession::quit(self);
                CommandEffect::Quit
            }
            _ => CommandEffect::Ignored,
        }
    }

    fn apply_assist(&mut self, ticket: AssistTicket, _outcome: Result<String, String>) -> bool {
        debug!(?ticket, "Versus sessions do not use assists");
        false
    }

    fn next_timer(&self) -> Option<TimerHandle> {
        VersusSession::next_timer(self)
    }

    fn fire_timer(&mut self, handle: TimerHandle, now: Instant) -> TimerOutcome {
        VersusSession::fire_timer(self, handle, now)
    }

    fn quit(&mut self) {
        VersusSession::quit(self)
    }

    fn is_terminated(&self) -> bool {
        self.phase == VersusPhase::Terminated
    }

    fn is_aborted(&self) -> bool {
        self.phase == VersusPhase::Aborted
    }

    fn take_result(&mut self) -> Option<GameResult> {
        VersusSession::take_result(self)
    }

    fn drain_outbox(&mut self) -> SessionOutbox {
        std::mem::take(&mut self.outbox)
    }

    fn snapshot(&self, _now: Instant) -> JsonValue {
        serde_json::to_value(self.view()).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to serialize versus view");
            JsonValue::Null
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_logic::models::Difficulty;

    impl VersusSession {
        fn phase(&self) -> VersusPhase {
            self.phase
        }

        fn points(&self, player: PlayerSlot) -> u32 {
            match player {
                PlayerSlot::Player1 => self.player1.points,
                PlayerSlot::Player2 => self.player2.points,
            }
        }
    }

    fn questions(count: usize, difficulty: Difficulty) -> Vec<Question> {
        (0..count)
            .map(|i| Question {
                id: format!("v{}", i),
                prompt: format!("Versus {}", i),
                choices: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                answer_index: 1,
                explanation: None,
                difficulty,
                image_url: None,
                sources: None,
                is_skipped: false,
                is_surprise: false,
            })
            .collect()
    }

    fn versus(count: usize, difficulty: Difficulty) -> VersusSession {
        let settings = GameSettings {
            game_mode: GameMode::Versus,
            player1_name: Some("Ada".to_string()),
            player2_name: Some("  ".to_string()),
            ..GameSettings::default()
        };
        VersusSession::new(questions(count, difficulty), &settings)
    }

    /// Runs the reveal countdown to completion and returns the reveal time.
    fn run_countdown(session: &mut VersusSession) -> Instant {
        let mut last = None;
        for _ in 0..REVEAL_COUNTDOWN {
            let handle = session.next_timer().unwrap();
            assert_eq!(handle.kind, TimerKind::RevealTick);
            assert_eq!(session.fire_timer(handle, handle.deadline), TimerOutcome::Fired);
            last = Some(handle.deadline);
        }
        assert_eq!(session.phase(), VersusPhase::Revealed);
        last.unwrap()
    }

    fn advance(session: &mut VersusSession) -> Instant {
        let handle = session.next_timer().unwrap();
        assert_eq!(handle.kind, TimerKind::Advance);
        session.fire_timer(handle, handle.deadline);
        handle.deadline
    }

    #[test]
    fn test_faster_correct_player_gets_speed_bonus() {
        let t0 = Instant::now();
        let mut session = versus(3, Difficulty::Medium);
        assert!(session.submit(PlayerSlot::Player1, 1, t0 + Duration::from_millis(100)));
        assert!(session.submit(PlayerSlot::Player2, 1, t0 + Duration::from_millis(150)));
        assert_eq!(
            session.phase(),
            VersusPhase::CountdownToReveal {
                remaining: REVEAL_COUNTDOWN
            }
        );

        run_countdown(&mut session);
        assert_eq!(session.points(PlayerSlot::Player1), 30);
        assert_eq!(session.points(PlayerSlot::Player2), 20);
        assert_eq!(
            session.view().last_reveal.unwrap().speed_bonus_to,
            Some(PlayerSlot::Player1)
        );
    }

    #[test]
    fn test_tied_timestamps_award_bonus_to_player_two() {
        let t0 = Instant::now();
        let mut session = versus(1, Difficulty::Easy);
        session.submit(PlayerSlot::Player2, 1, t0);
        session.submit(PlayerSlot::Player1, 1, t0);
        run_countdown(&mut session);
        assert_eq!(session.points(PlayerSlot::Player1), 10);
        assert_eq!(session.points(PlayerSlot::Player2), 20);
    }

    #[test]
    fn test_no_bonus_when_only_one_is_correct() {
        let t0 = Instant::now();
        let mut session = versus(1, Difficulty::Hard);
        session.submit(PlayerSlot::Player1, 0, t0);
        session.submit(PlayerSlot::Player2, 1, t0 + Duration::from_secs(4));
        run_countdown(&mut session);
        assert_eq!(session.points(PlayerSlot::Player1), 0);
        assert_eq!(session.points(PlayerSlot::Player2), 30);
        assert_eq!(session.view().last_reveal.unwrap().speed_bonus_to, None);
    }

    #[test]
    fn test_second_answer_from_same_player_is_ignored() {
        let t0 = Instant::now();
        let mut session = versus(2, Difficulty::Easy);
        assert!(session.submit(PlayerSlot::Player1, 0, t0));
        assert!(!session.submit(PlayerSlot::Player1, 1, t0));
        assert!(!session.submit(PlayerSlot::Player2, 9, t0));
        assert_eq!(session.phase(), VersusPhase::AwaitingBoth);
        assert!(session.next_timer().is_none());
        assert!(session.view().player1.answered);
        assert!(!session.view().player2.answered);
    }

    #[test]
    fn test_full_game_result_and_winner() {
        let t0 = Instant::now();
        let mut session = versus(2, Difficulty::Easy);

        session.submit(PlayerSlot::Player1, 1, t0);
        session.submit(PlayerSlot::Player2, 2, t0);
        run_countdown(&mut session);
        let now = advance(&mut session);
        assert_eq!(session.view().question_index, 1);
        assert_eq!(session.phase(), VersusPhase::AwaitingBoth);

        session.submit(PlayerSlot::Player2, 1, now);
        session.submit(PlayerSlot::Player1, 1, now + Duration::from_millis(50));
        run_countdown(&mut session);
        advance(&mut session);

        assert!(session.is_terminated());
        let result = session.take_result().unwrap();
        assert_eq!(result.score, 2);
        assert_eq!(result.total, Some(2));
        assert_eq!(result.points, 20);
        assert_eq!(result.questions_history.len(), 2);
        assert_eq!(result.questions_history[0].player2_answer_index, Some(Some(2)));

        let outcome = result.versus.unwrap();
        assert_eq!(outcome.player1_name, "Ada");
        assert_eq!(outcome.player2_name, "Player 2");
        assert_eq!(outcome.player1_points, 20);
        assert_eq!(outcome.player2_points, 20);
        assert_eq!(outcome.winner, Winner::Draw);
        assert!(session.take_result().is_none());
    }

    #[test]
    fn test_quit_during_countdown_cancels_reveal() {
        let t0 = Instant::now();
        let mut session = versus(2, Difficulty::Easy);
        session.submit(PlayerSlot::Player1, 1, t0);
        session.submit(PlayerSlot::Player2, 1, t0);
        let tick = session.next_timer().unwrap();

        assert_eq!(session.apply_command(PlayerCommand::Quit, t0), CommandEffect::Quit);
        assert_eq!(session.fire_timer(tick, tick.deadline), TimerOutcome::Stale);
        assert!(session.is_aborted());
        assert!(session.take_result().is_none());
    }

    #[test]
    fn test_single_player_commands_are_ignored() {
        let mut session = versus(2, Difficulty::Easy);
        let now = Instant::now();
        assert_eq!(
            session.apply_command(PlayerCommand::SelectChoice { index: 1 }, now),
            CommandEffect::Ignored
        );
        assert_eq!(
            session.apply_command(PlayerCommand::UseFiftyFifty, now),
            CommandEffect::Ignored
        );
    }
}
