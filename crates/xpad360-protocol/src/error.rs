use thiserror::Error;

/// Error returned when parsing protocol names and codes.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unknown button: {0}")]
    UnknownButton(String),
    #[error("unknown led state: {0}")]
    UnknownLedState(String),
    #[error("invalid led code: 0x{0:02x}")]
    InvalidLedCode(u8),
}
