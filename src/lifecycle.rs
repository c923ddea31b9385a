//! Coarse launcher state shown on the Start/Play control.

/// What the launcher is currently doing with the selected game.
///
/// `Ready` is the only state that accepts a play action; `Failed` is the
/// only state that accepts a retry (which re-runs the update check). The
/// two downloading states differ only in the label shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LauncherState {
    #[default]
    Ready,
    Failed,
    DownloadingGame,
    DownloadingUpdate,
}

impl LauncherState {
    /// Label for the Start/Play control.
    pub fn label(&self) -> &'static str {
        match self {
            LauncherState::Ready => "Start",
            LauncherState::Failed => "Failed",
            LauncherState::DownloadingGame => "Downloading...",
            LauncherState::DownloadingUpdate => "Updating...",
        }
    }

    /// Whether a play action is accepted right now.
    pub fn accepts_play(&self) -> bool {
        matches!(self, LauncherState::Ready)
    }

    /// Whether a retry (re-run of the update check) is accepted right now.
    pub fn accepts_retry(&self) -> bool {
        matches!(self, LauncherState::Failed)
    }
}
