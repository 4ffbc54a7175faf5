//! Lifecycle errors for the [`Core`](crate::supervisor::Core) state machine.
//!
//! Per-event codec/transport errors never reach here: worker loops convert
//! those into a prune-and-continue action and log them instead. Only
//! violations of the Clean/Running/Unclean state machine surface to the
//! caller of `start`/`shutdown`.

use thiserror::Error;

/// Identifies a worker that failed to join during shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerId {
    Acceptor,
    Reader,
    Router(usize),
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acceptor => write!(f, "acceptor"),
            Self::Reader => write!(f, "reader"),
            Self::Router(index) => write!(f, "router[{index}]"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    /// `start` was called on a Core that was not Clean.
    #[error("start called on a Core that is not in the Clean state")]
    InvalidState,

    /// `shutdown` could not join every worker within its timeout; the Core
    /// has transitioned to the terminal Unclean state.
    #[error("shutdown failed to join worker(s): {}", format_unjoined(.unjoined))]
    ShutdownFailed { unjoined: Vec<WorkerId> },

    /// Binding the public listener failed.
    #[error("failed to bind listener on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

fn format_unjoined(unjoined: &[WorkerId]) -> String {
    unjoined
        .iter()
        .map(std::string::ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, CoreError>;
