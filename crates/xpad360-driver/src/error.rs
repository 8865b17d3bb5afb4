use thiserror::Error;

use crate::usb::TransferError;

/// Error type for controller operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport rejected a request.
    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),
    /// The device advertised something the driver can't use.
    #[error("invalid descriptor: {0}")]
    Descriptor(String),
    /// No controller is attached.
    #[error("controller is not connected")]
    NotConnected,
    /// A generic backend error.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Convenient result alias for controller operations.
pub type Result<T> = std::result::Result<T, Error>;
