use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Domain validation errors
    #[error("Invalid slot ID: {id} (must be {min}-{max})")]
    InvalidSlotId { id: i64, min: u16, max: u16 },

    #[error("Invalid pairing secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
