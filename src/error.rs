use thiserror::Error;

#[derive(Debug, Error)]
pub enum WizardError {
    /// Rejected on the client before any request went out.
    #[error("{0}")]
    Validation(String),
    /// The server answered with `{"error": ...}`.
    #[error("{0}")]
    Server(String),
    #[error("server answered {status} without an error message")]
    Http { status: u16 },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("a docking run is already being monitored")]
    RunInProgress,
    #[error("no docking run is being monitored")]
    NoActiveRun,
    #[error("wizard state lock poisoned")]
    Poisoned,
    #[error("run monitor task failed: {0}")]
    Task(String),
}

pub type Result<T, E = WizardError> = std::result::Result<T, E>;

impl WizardError {
    /// Text a status line shows for this error: the server's own message when
    /// it sent one, otherwise one of the two caller-supplied fallbacks.
    pub fn status_text(&self, rejected: &str, unreachable: &str) -> String {
        match self {
            WizardError::Server(msg) | WizardError::Validation(msg) => msg.clone(),
            WizardError::Http { .. } => rejected.to_string(),
            _ => unreachable.to_string(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(
            self,
            WizardError::Transport(_) | WizardError::Decode(_) | WizardError::Io(_)
        )
    }
}
