//! CLI-boundary error taxonomy (§6 exit-code contract).
//!
//! Every inner crate keeps propagating its own `thiserror` type; `anyhow`
//! only appears here, at the outermost edge, to collect whatever reached the
//! CLI without forcing every command function to name a single error enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Exit code per §6: 1 for usage/exists/not-found, 2 for anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 1,
            CliError::Other(_) => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
