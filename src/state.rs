use crate::launcher::GameLauncher;
use crate::session::SessionManagerHandle;
use crate::store::ResultRecorder;

#[derive(Clone)]
pub struct AppState {
    pub session_manager: SessionManagerHandle,
    pub launcher: GameLauncher,
    pub recorder: ResultRecorder,
}
