//! Driver error types.

use tdm_hal::SdkError;
use thiserror::Error;

/// Error type for driver operations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// An SDK call failed.
    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),

    /// A board index was out of range or the board is absent.
    #[error("Board {board} not present")]
    BoardNotPresent { board: u32 },

    /// The channel was never provisioned or its provisioning failed.
    #[error("Channel {channel} not ready")]
    ChannelNotReady { channel: u32 },

    /// The span has no hardware resources yet.
    #[error("Span {span} not provisioned")]
    SpanNotProvisioned { span: u32 },

    /// Invalid parameter passed to the driver.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// The operation is not supported on this channel type.
    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    /// No channel on the span holds a pending event.
    #[error("No pending event")]
    NoPendingEvent,
}

impl DriverError {
    /// Creates a board-not-present error.
    pub fn board_not_present(board: u32) -> Self {
        DriverError::BoardNotPresent { board }
    }

    /// Creates a channel-not-ready error.
    pub fn channel_not_ready(channel: u32) -> Self {
        DriverError::ChannelNotReady { channel }
    }

    /// Creates a span-not-provisioned error.
    pub fn span_not_provisioned(span: u32) -> Self {
        DriverError::SpanNotProvisioned { span }
    }

    /// Creates an invalid parameter error with a message.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        DriverError::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates an unsupported-operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        DriverError::Unsupported {
            operation: operation.into(),
        }
    }
}

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tdm_hal::{SdkError, SdkStatus};

    #[test]
    fn test_sdk_error_conversion() {
        fn fails() -> DriverResult<()> {
            Err(SdkError::from_status(SdkStatus::HardwareFault))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, DriverError::Sdk(_)));
        assert!(err.to_string().contains("SDK_STATUS_HARDWARE_FAULT"));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DriverError::channel_not_ready(7).to_string(),
            "Channel 7 not ready"
        );
        assert_eq!(
            DriverError::unsupported("get alarms").to_string(),
            "Operation not supported: get alarms"
        );
    }
}
