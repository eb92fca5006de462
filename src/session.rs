use axum::extract::ws;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::ai::{AiError, TriviaAi};
use crate::game_logic::{
    AssistKind, AssistRequest, AssistTicket, CommandEffect, GameMode, GameSession, PlayerCommand,
    ServerToClientMessage, SoloSession, TimerHandle, TimerOutcome, VersusSession,
};
use crate::launcher::PreparedGame;
use crate::store::ResultRecorder;

const SESSION_INACTIVITY_TIMEOUT: StdDuration = StdDuration::from_secs(60 * 60);
const IDLE_TIMER_FALLBACK: StdDuration = StdDuration::from_secs(24 * 60 * 60);

#[derive(Debug, Serialize, Clone)]
pub struct SessionDetails {
    pub session_id: Uuid,
    pub mode: GameMode,
    pub category: String,
    pub category_name: String,
    pub question_count: usize,
    pub from_cache: bool,
}

#[derive(Debug)]
pub enum SessionManagerMessage {
    CreateSession {
        game: PreparedGame,
        respond_to: oneshot::Sender<SessionDetails>,
    },
    GetSessionHandle {
        session_id: Uuid,
        respond_to: oneshot::Sender<Option<SessionActorHandle>>,
    },
    SessionActorShutdown {
        session_id: Uuid,
    },
}

pub struct SessionManagerActor {
    receiver: mpsc::Receiver<SessionManagerMessage>,
    sessions: HashMap<Uuid, SessionActorHandle>,
    self_sender: mpsc::Sender<SessionManagerMessage>,
    ai: Option<Arc<dyn TriviaAi>>,
    recorder: ResultRecorder,
}

impl SessionManagerActor {
    fn new(
        receiver: mpsc::Receiver<SessionManagerMessage>,
        self_sender: mpsc::Sender<SessionManagerMessage>,
        ai: Option<Arc<dyn TriviaAi>>,
        recorder: ResultRecorder,
    ) -> Self {
        SessionManagerActor {
            receiver,
            sessions: HashMap::new(),
            self_sender,
            ai,
            recorder,
        }
    }

    #[tracing::instrument(skip(self, msg), fields(
        msg_type = %std::any::type_name_of_val(&msg)
    ))]
    async fn handle_message(&mut self, msg: SessionManagerMessage) {
        match msg {
            SessionManagerMessage::CreateSession { game, respond_to } => {
                let session_id = Uuid::new_v4();
                let mode = game.settings.game_mode;
                let manager_handle = SessionManagerHandle {
                    sender: self.self_sender.clone(),
                };
                let details = SessionDetails {
                    session_id,
                    mode,
                    category: game.category.id.clone(),
                    category_name: game.category.name.clone(),
                    question_count: game.questions.len(),
                    from_cache: game.from_cache,
                };

                let PreparedGame {
                    settings,
                    questions,
                    notices,
                    ..
                } = game;

                let handle = match mode {
                    GameMode::Versus => SessionActorHandle::spawn(
                        session_id,
                        32,
                        manager_handle,
                        self.ai.clone(),
                        self.recorder.clone(),
                        notices,
                        move |_now| VersusSession::new(questions, &settings),
                    ),
                    _ => SessionActorHandle::spawn(
                        session_id,
                        32,
                        manager_handle,
                        self.ai.clone(),
                        self.recorder.clone(),
                        notices,
                        move |now| SoloSession::new(questions, &settings, now),
                    ),
                };
                self.sessions.insert(session_id, handle);

                tracing::info!(
                    session.id = %session_id,
                    game.mode = %mode,
                    game.category = %details.category,
                    question.count = details.question_count,
                    "Created session"
                );
                let _ = respond_to.send(details);
            }
            SessionManagerMessage::GetSessionHandle {
                session_id,
                respond_to,
            } => {
                tracing::debug!(session.id = %session_id, "Received GetSessionHandle request");
                let _ = respond_to.send(self.sessions.get(&session_id).cloned());
            }
            SessionManagerMessage::SessionActorShutdown { session_id } => {
                if self.sessions.remove(&session_id).is_some() {
                    tracing::info!(session.id = %session_id, "Cleaning up session after actor shutdown");
                } else {
                    tracing::warn!(session.id = %session_id, "Received shutdown for unknown session");
                }
            }
        }
    }
}

#[tracing::instrument(skip(actor))]
pub async fn run_session_manager_actor(mut actor: SessionManagerActor) {
    tracing::info!("SessionManager actor started");
    while let Some(msg) = actor.receiver.recv().await {
        actor.handle_message(msg).await;
    }
    tracing::info!("SessionManager actor stopped");
}

#[derive(Clone, Debug)]
pub struct SessionManagerHandle {
    sender: mpsc::Sender<SessionManagerMessage>,
}

impl SessionManagerHandle {
    pub fn spawn(
        buffer_size: usize,
        ai: Option<Arc<dyn TriviaAi>>,
        recorder: ResultRecorder,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = SessionManagerActor::new(receiver, sender.clone(), ai, recorder);
        tokio::spawn(run_session_manager_actor(actor));
        Self { sender }
    }

    pub async fn create_session(&self, game: PreparedGame) -> Result<SessionDetails, String> {
        let (respond_to, rx) = oneshot::channel();
        self.sender
            .send(SessionManagerMessage::CreateSession { game, respond_to })
            .await
            .map_err(|e| format!("Failed to send CreateSession: {}", e))?;
        rx.await
            .map_err(|e| format!("SessionManager no response: {}", e))
    }

    pub async fn get_session_handle(&self, session_id: Uuid) -> Option<SessionActorHandle> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(SessionManagerMessage::GetSessionHandle {
                session_id,
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return None;
        }
        rx.await.ok().flatten()
    }

    pub async fn notify_session_shutdown(&self, session_id: Uuid) -> Result<(), String> {
        self.sender
            .send(SessionManagerMessage::SessionActorShutdown { session_id })
            .await
            .map_err(|e| format!("Failed to send SessionActorShutdown: {}", e))
    }
}

#[derive(Debug)]
pub enum SessionActorMessage {
    ClientEvent {
        client_id: Uuid,
        command: PlayerCommand,
    },
    ClientConnected {
        client_id: Uuid,
        client_tx: mpsc::Sender<ws::Message>,
    },
    ClientDisconnected {
        client_id: Uuid,
    },
    AssistReady {
        ticket: AssistTicket,
        outcome: Result<String, String>,
    },
}

type EngineStarter<S> = Box<dyn FnOnce(Instant) -> S + Send + Sync>;

/// Owns one running game. The engine is built when the first client joins
/// so that clocks do not run while the page is loading.
pub struct SessionActor<S: GameSession> {
    receiver: mpsc::Receiver<SessionActorMessage>,
    session_id: Uuid,
    starter: Option<EngineStarter<S>>,
    engine: Option<S>,
    clients: HashMap<Uuid, mpsc::Sender<ws::Message>>,
    manager_handle: SessionManagerHandle,
    ai: Option<Arc<dyn TriviaAi>>,
    recorder: ResultRecorder,
    launch_notices: Vec<String>,
    assist_tasks: Vec<JoinHandle<()>>,
}

impl<S: GameSession> SessionActor<S> {
    fn new(
        receiver: mpsc::Receiver<SessionActorMessage>,
        session_id: Uuid,
        starter: EngineStarter<S>,
        manager_handle: SessionManagerHandle,
        ai: Option<Arc<dyn TriviaAi>>,
        recorder: ResultRecorder,
        launch_notices: Vec<String>,
    ) -> Self {
        SessionActor {
            receiver,
            session_id,
            starter: Some(starter),
            engine: None,
            clients: HashMap::new(),
            manager_handle,
            ai,
            recorder,
            launch_notices,
            assist_tasks: Vec::new(),
        }
    }

    /// Returns true when the session is over and the actor should stop.
    #[tracing::instrument(skip(self, msg, self_sender), fields(
        session.id = %self.session_id,
        msg_type = %std::any::type_name_of_val(&msg)
    ))]
    async fn handle_message(
        &mut self,
        msg: SessionActorMessage,
        self_sender: &mpsc::Sender<SessionActorMessage>,
    ) -> bool {
        match msg {
            SessionActorMessage::ClientEvent { client_id, command } => {
                tracing::debug!(client.id = %client_id, ?command, "Processing command from client");
                let Some(engine) = self.engine.as_mut() else {
                    tracing::warn!(client.id = %client_id, "Command before the session started");
                    return false;
                };
                match engine.apply_command(command, Instant::now()) {
                    CommandEffect::Ignored => {
                        tracing::trace!(client.id = %client_id, "Command ignored");
                        return false;
                    }
                    CommandEffect::Updated | CommandEffect::Quit => {}
                }
            }
            SessionActorMessage::ClientConnected {
                client_id,
                client_tx,
            } => {
                tracing::debug!(client.id = %client_id, "Client connected");
                self.clients.insert(client_id, client_tx);
                if let Some(start) = self.starter.take() {
                    let engine = start(Instant::now());
                    tracing::info!(game.mode = %engine.mode(), "Session started");
                    self.engine = Some(engine);
                }
                for message in std::mem::take(&mut self.launch_notices) {
                    self.broadcast(&ServerToClientMessage::Notice { message }).await;
                }
            }
            SessionActorMessage::ClientDisconnected { client_id } => {
                tracing::debug!(client.id = %client_id, "Client disconnected");
                self.clients.remove(&client_id);
                if self.clients.is_empty() {
                    tracing::info!("Session is empty after client disconnection. Aborting");
                    if let Some(engine) = self.engine.as_mut() {
                        engine.quit();
                    }
                    return true;
                }
                return false;
            }
            SessionActorMessage::AssistReady { ticket, outcome } => {
                let Some(engine) = self.engine.as_mut() else {
                    return false;
                };
                if !engine.apply_assist(ticket, outcome) {
                    return false;
                }
            }
        }
        self.flush(self_sender).await
    }

    #[tracing::instrument(skip(self, handle, self_sender), fields(session.id = %self.session_id))]
    async fn fire_timer(
        &mut self,
        handle: TimerHandle,
        self_sender: &mpsc::Sender<SessionActorMessage>,
    ) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };
        match engine.fire_timer(handle, Instant::now()) {
            TimerOutcome::Fired => {
                tracing::trace!(timer.kind = ?handle.kind, question.index = handle.question_index, "Timer fired");
                self.flush(self_sender).await
            }
            TimerOutcome::Stale => false,
        }
    }

    /// Starts pending assists, relays notices and pushes the new state. On
    /// termination also records the result.
    async fn flush(&mut self, self_sender: &mpsc::Sender<SessionActorMessage>) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };
        let outbox = engine.drain_outbox();
        let now = Instant::now();
        let state = engine.snapshot(now);
        let terminated = engine.is_terminated();
        let aborted = engine.is_aborted();
        let result = if terminated { engine.take_result() } else { None };

        for request in outbox.assists {
            self.spawn_assist(request, self_sender);
        }
        for message in outbox.notices {
            self.broadcast(&ServerToClientMessage::Notice { message }).await;
        }
        self.broadcast(&ServerToClientMessage::StateUpdate { state })
            .await;

        if aborted {
            self.broadcast(&ServerToClientMessage::GameAborted).await;
            return true;
        }

        if let Some(result) = result {
            let outcome = match self.recorder.record(&result).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to record game result");
                    self.broadcast(&ServerToClientMessage::Notice {
                        message: "Your result could not be saved.".to_string(),
                    })
                    .await;
                    Default::default()
                }
            };
            self.broadcast(&ServerToClientMessage::GameFinished {
                result,
                is_new_high_score: outcome.is_new_high_score,
                unlocked_achievements: outcome.unlocked_achievements,
            })
            .await;
            return true;
        }
        terminated
    }

    fn spawn_assist(
        &mut self,
        request: AssistRequest,
        self_sender: &mpsc::Sender<SessionActorMessage>,
    ) {
        self.assist_tasks.retain(|task| !task.is_finished());

        let ai = self.ai.clone();
        let sender = self_sender.clone();
        let AssistRequest { ticket, question } = request;
        self.assist_tasks.push(tokio::spawn(async move {
            let outcome = match ai {
                Some(ai) => match ticket.kind {
                    AssistKind::SmartHint => ai.smart_hint(&question).await,
                    AssistKind::FunFact => ai.fun_fact(&question).await,
                },
                None => Err(AiError::Offline),
            };
            let outcome = outcome.map_err(|e| {
                tracing::debug!(error = %e, ?ticket, "Assist request failed");
                e.user_message().to_string()
            });
            if sender
                .send(SessionActorMessage::AssistReady { ticket, outcome })
                .await
                .is_err()
            {
                tracing::debug!(?ticket, "Session ended before the assist arrived");
            }
        }));
    }

    async fn broadcast(&self, message: &ServerToClientMessage) {
        let ws_msg = match message.to_ws_text() {
            Ok(ws_msg) => ws_msg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize message for clients");
                return;
            }
        };
        for (client_id, client_tx) in &self.clients {
            if client_tx.send(ws_msg.clone()).await.is_err() {
                tracing::warn!(client.id = %client_id, "Failed to send message to client");
            }
        }
    }
}

#[tracing::instrument(skip(actor, self_sender), fields(session.id = %actor.session_id))]
pub async fn run_session_actor<S: GameSession>(
    mut actor: SessionActor<S>,
    self_sender: mpsc::Sender<SessionActorMessage>,
) {
    tracing::info!("Session actor started");

    let mut last_client_activity = tokio::time::Instant::now();

    loop {
        let armed = actor.engine.as_ref().and_then(|engine| engine.next_timer());
        let timer_deadline = match armed {
            Some(handle) => tokio::time::Instant::from_std(handle.deadline),
            None => tokio::time::Instant::now() + IDLE_TIMER_FALLBACK,
        };
        let idle_deadline = last_client_activity + SESSION_INACTIVITY_TIMEOUT;

        tokio::select! {
            maybe_msg = actor.receiver.recv() => {
                match maybe_msg {
                    Some(msg) => {
                        if matches!(msg, SessionActorMessage::ClientEvent { .. }) {
                            last_client_activity = tokio::time::Instant::now();
                        }
                        if actor.handle_message(msg, &self_sender).await {
                            tracing::info!("Session over");
                            break;
                        }
                    }
                    None => {
                        tracing::info!("Session actor channel closed. Shutting down");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep_until(timer_deadline), if armed.is_some() => {
                let Some(handle) = armed else { continue };
                if actor.fire_timer(handle, &self_sender).await {
                    tracing::info!("Session over");
                    break;
                }
            }
            _ = tokio::time::sleep_until(idle_deadline), if !actor.clients.is_empty() => {
                tracing::info!("Session inactivity timeout. Aborting");
                if let Some(engine) = actor.engine.as_mut() {
                    engine.quit();
                }
                actor.broadcast(&ServerToClientMessage::GameAborted).await;
                break;
            }
        }
    }

    tracing::info!("Session actor stopping");
    if let Err(e) = actor
        .manager_handle
        .notify_session_shutdown(actor.session_id)
        .await
    {
        tracing::error!(error = %e, "Failed to notify SessionManager of shutdown");
    }
    for task in actor.assist_tasks.drain(..) {
        task.abort();
    }
}

#[derive(Clone, Debug)]
pub struct SessionActorHandle {
    pub sender: mpsc::Sender<SessionActorMessage>,
    pub session_id: Uuid,
}

impl SessionActorHandle {
    pub fn spawn<S: GameSession>(
        session_id: Uuid,
        buffer_size: usize,
        manager_handle: SessionManagerHandle,
        ai: Option<Arc<dyn TriviaAi>>,
        recorder: ResultRecorder,
        launch_notices: Vec<String>,
        start: impl FnOnce(Instant) -> S + Send + Sync + 'static,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = SessionActor::<S>::new(
            receiver,
            session_id,
            Box::new(start),
            manager_handle,
            ai,
            recorder,
            launch_notices,
        );
        tokio::spawn(run_session_actor::<S>(actor, sender.clone()));
        Self { sender, session_id }
    }

    pub async fn forward_command(
        &self,
        client_id: Uuid,
        command: PlayerCommand,
    ) -> Result<(), String> {
        self.sender
            .send(SessionActorMessage::ClientEvent { client_id, command })
            .await
            .map_err(|e| format!("Failed to send command: {}", e))
    }

    pub async fn client_connected(&self, client_id: Uuid, client_tx: mpsc::Sender<ws::Message>) {
        if self
            .sender
            .send(SessionActorMessage::ClientConnected {
                client_id,
                client_tx,
            })
            .await
            .is_err()
        {
            tracing::error!("Failed to send ClientConnected");
        }
    }

    pub async fn client_disconnected(&self, client_id: Uuid) {
        if self
            .sender
            .send(SessionActorMessage::ClientDisconnected { client_id })
            .await
            .is_err()
        {
            tracing::error!("Failed to send ClientDisconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResolvedCategory;
    use crate::game_logic::models::{Difficulty, GameSettings, Question};
    use crate::store::{KeyValueStore, MemoryStore};
    use tokio::time::timeout;

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            prompt: format!("Prompt {}", id),
            choices: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            answer_index: 1,
            explanation: None,
            difficulty: Difficulty::Easy,
            image_url: None,
            sources: None,
            is_skipped: false,
            is_surprise: false,
        }
    }

    fn prepared(mode: GameMode, count: usize, notices: Vec<String>) -> PreparedGame {
        PreparedGame {
            settings: GameSettings {
                game_mode: mode,
                shuffle_choices: false,
                total_questions: count,
                ..GameSettings::default()
            },
            category: ResolvedCategory {
                id: "general".to_string(),
                name: "General Knowledge".to_string(),
            },
            questions: (0..count).map(|i| question(&format!("q{}", i))).collect(),
            from_cache: true,
            notices,
        }
    }

    fn manager() -> (SessionManagerHandle, ResultRecorder) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let recorder = ResultRecorder::new(store);
        (SessionManagerHandle::spawn(8, None, recorder.clone()), recorder)
    }

    async fn next_message(rx: &mut mpsc::Receiver<ws::Message>) -> ServerToClientMessage {
        let msg = timeout(StdDuration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for a server message")
            .expect("client channel closed");
        match msg {
            ws::Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    async fn wait_for<F>(rx: &mut mpsc::Receiver<ws::Message>, mut pred: F) -> ServerToClientMessage
    where
        F: FnMut(&ServerToClientMessage) -> bool,
    {
        loop {
            let msg = next_message(rx).await;
            if pred(&msg) {
                return msg;
            }
        }
    }

    async fn join(
        manager: &SessionManagerHandle,
        game: PreparedGame,
    ) -> (SessionActorHandle, mpsc::Receiver<ws::Message>) {
        let details = manager.create_session(game).await.unwrap();
        let handle = manager
            .get_session_handle(details.session_id)
            .await
            .expect("session registered");
        let (tx, rx) = mpsc::channel(64);
        handle.client_connected(Uuid::new_v4(), tx).await;
        (handle, rx)
    }

    #[tokio::test]
    async fn test_create_session_reports_details() {
        let (manager, _) = manager();
        let details = manager
            .create_session(prepared(GameMode::Survival, 3, Vec::new()))
            .await
            .unwrap();
        assert_eq!(details.mode, GameMode::Survival);
        assert_eq!(details.question_count, 3);
        assert_eq!(details.category_name, "General Knowledge");
        assert!(manager.get_session_handle(details.session_id).await.is_some());
        assert!(manager.get_session_handle(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_launch_notices_reach_the_first_client() {
        let (manager, _) = manager();
        let game = prepared(GameMode::Classic, 1, vec!["Storage is full.".to_string()]);
        let (handle, mut rx) = join(&manager, game).await;
        let client = Uuid::new_v4();
        handle.forward_command(client, PlayerCommand::UseFiftyFifty).await.unwrap();

        match next_message(&mut rx).await {
            ServerToClientMessage::Notice { message } => assert_eq!(message, "Storage is full."),
            other => panic!("unexpected message: {:?}", other),
        }
        wait_for(&mut rx, |m| match m {
            ServerToClientMessage::StateUpdate { state } => {
                state["removedChoices"].as_array().map(Vec::len) == Some(2)
            }
            _ => false,
        })
        .await;
    }

    #[tokio::test]
    async fn test_classic_game_finishes_and_records_result() {
        let (manager, recorder) = manager();
        let (handle, mut rx) = join(&manager, prepared(GameMode::Classic, 1, Vec::new())).await;
        let session_id = handle.session_id;

        handle
            .forward_command(Uuid::new_v4(), PlayerCommand::SelectChoice { index: 1 })
            .await
            .unwrap();

        let finished = wait_for(&mut rx, |m| {
            matches!(m, ServerToClientMessage::GameFinished { .. })
        })
        .await;
        match finished {
            ServerToClientMessage::GameFinished {
                result,
                is_new_high_score,
                unlocked_achievements,
            } => {
                assert_eq!(result.score, 1);
                assert_eq!(result.total, Some(1));
                assert!(is_new_high_score);
                assert!(unlocked_achievements.contains(&"FIRST_GAME".to_string()));
            }
            other => panic!("unexpected message: {:?}", other),
        }

        assert_eq!(recorder.high_scores().top(GameMode::Classic).await.unwrap().len(), 1);

        // The actor deregisters itself once the game is over.
        let mut gone = false;
        for _ in 0..50 {
            if manager.get_session_handle(session_id).await.is_none() {
                gone = true;
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(20)).await;
        }
        assert!(gone);
    }

    #[tokio::test]
    async fn test_offline_hint_produces_notice() {
        let (manager, _) = manager();
        let (handle, mut rx) = join(&manager, prepared(GameMode::Classic, 2, Vec::new())).await;
        handle
            .forward_command(Uuid::new_v4(), PlayerCommand::UseSmartHint)
            .await
            .unwrap();

        let notice = wait_for(&mut rx, |m| matches!(m, ServerToClientMessage::Notice { .. })).await;
        if let ServerToClientMessage::Notice { message } = notice {
            assert_eq!(message, AiError::Offline.user_message());
        }
    }

    #[tokio::test]
    async fn test_quit_aborts_without_recording() {
        let (manager, recorder) = manager();
        let (handle, mut rx) = join(&manager, prepared(GameMode::Classic, 2, Vec::new())).await;
        handle
            .forward_command(Uuid::new_v4(), PlayerCommand::Quit)
            .await
            .unwrap();

        wait_for(&mut rx, |m| matches!(m, ServerToClientMessage::GameAborted)).await;
        assert!(recorder.high_scores().top(GameMode::Classic).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_versus_reveal_after_both_players_answer() {
        let (manager, _) = manager();
        let (handle, mut rx) = join(&manager, prepared(GameMode::Versus, 1, Vec::new())).await;
        let client = Uuid::new_v4();
        handle
            .forward_command(
                client,
                PlayerCommand::SelectVersusChoice {
                    player: crate::game_logic::versus::PlayerSlot::Player1,
                    index: 1,
                },
            )
            .await
            .unwrap();
        handle
            .forward_command(
                client,
                PlayerCommand::SelectVersusChoice {
                    player: crate::game_logic::versus::PlayerSlot::Player2,
                    index: 0,
                },
            )
            .await
            .unwrap();

        let finished = timeout(
            StdDuration::from_secs(10),
            wait_for(&mut rx, |m| matches!(m, ServerToClientMessage::GameFinished { .. })),
        )
        .await
        .expect("versus game did not finish");
        if let ServerToClientMessage::GameFinished { result, is_new_high_score, .. } = finished {
            let versus = result.versus.expect("versus outcome");
            assert_eq!(versus.player1_score, 1);
            assert_eq!(versus.player2_score, 0);
            assert!(!is_new_high_score);
        }
    }
}
