use std::{error::Error, fmt};

/// Failure talking to the delta-protocol backend. Upstream errors keep
/// the backend's status code and raw body so the caller can surface both.
#[derive(Debug)]
pub enum ProviderError {
    Upstream { status: u16, body: String },
    Transport(anyhow::Error),
}

impl ProviderError {
    pub fn upstream(status: u16, body: String) -> Self {
        ProviderError::Upstream { status, body }
    }

    pub fn transport(err: impl Into<anyhow::Error>) -> Self {
        ProviderError::Transport(err.into())
    }

    /// Status to relay: the backend's own code, or 500 for transport and
    /// translation faults.
    pub fn status(&self) -> u16 {
        match self {
            ProviderError::Upstream { status, .. } => *status,
            ProviderError::Transport(_) => 500,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Upstream { status, body } => {
                write!(f, "upstream returned {status}: {body}")
            }
            ProviderError::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProviderError {}
