//! SDK error types and status handling.
//!
//! Converts raw vendor status codes into Rust's Result type so that
//! every SDK call in the driver propagates failures with `?`.

use std::fmt;
use thiserror::Error;

/// Status codes matching the vendor SDK C API.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkStatus {
    Success = 0,
    Failure = -1,
    InvalidHandle = -2,
    InvalidParameter = -3,
    NoResources = -4,
    NotFound = -5,
    NotSupported = -6,
    QueueEmpty = -7,
    Busy = -8,
    HardwareFault = -9,
    Timeout = -10,
}

impl SdkStatus {
    /// Creates a status from a raw i32 value.
    pub fn from_raw(status: i32) -> Self {
        match status {
            0 => SdkStatus::Success,
            -2 => SdkStatus::InvalidHandle,
            -3 => SdkStatus::InvalidParameter,
            -4 => SdkStatus::NoResources,
            -5 => SdkStatus::NotFound,
            -6 => SdkStatus::NotSupported,
            -7 => SdkStatus::QueueEmpty,
            -8 => SdkStatus::Busy,
            -9 => SdkStatus::HardwareFault,
            -10 => SdkStatus::Timeout,
            _ => SdkStatus::Failure,
        }
    }

    /// Returns true if the status indicates success.
    pub fn is_success(&self) -> bool {
        *self == SdkStatus::Success
    }

    /// Converts to a Result, returning Ok(()) for success.
    pub fn into_result(self) -> SdkResult<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(SdkError::Status { status: self })
        }
    }
}

impl fmt::Display for SdkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SdkStatus::Success => "SDK_STATUS_SUCCESS",
            SdkStatus::Failure => "SDK_STATUS_FAILURE",
            SdkStatus::InvalidHandle => "SDK_STATUS_INVALID_HANDLE",
            SdkStatus::InvalidParameter => "SDK_STATUS_INVALID_PARAMETER",
            SdkStatus::NoResources => "SDK_STATUS_NO_RESOURCES",
            SdkStatus::NotFound => "SDK_STATUS_NOT_FOUND",
            SdkStatus::NotSupported => "SDK_STATUS_NOT_SUPPORTED",
            SdkStatus::QueueEmpty => "SDK_STATUS_QUEUE_EMPTY",
            SdkStatus::Busy => "SDK_STATUS_BUSY",
            SdkStatus::HardwareFault => "SDK_STATUS_HARDWARE_FAULT",
            SdkStatus::Timeout => "SDK_STATUS_TIMEOUT",
        };
        write!(f, "{}", s)
    }
}

/// Error type for SDK operations.
#[derive(Debug, Clone, Error)]
pub enum SdkError {
    /// The SDK returned an error status.
    #[error("SDK operation failed: {status}")]
    Status { status: SdkStatus },

    /// Invalid parameter passed to the SDK.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// The requested object was not found.
    #[error("Not found: {item}")]
    NotFound { item: String },

    /// Internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SdkError {
    /// Creates an error from a status code.
    pub fn from_status(status: SdkStatus) -> Self {
        match status {
            SdkStatus::InvalidParameter => SdkError::InvalidParameter {
                message: format!("SDK returned {}", status),
            },
            SdkStatus::NotFound => SdkError::NotFound {
                item: "unknown".to_string(),
            },
            _ => SdkError::Status { status },
        }
    }

    /// Creates an invalid parameter error with a message.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        SdkError::InvalidParameter {
            message: message.into(),
        }
    }

    /// Creates a not found error with an item description.
    pub fn not_found(item: impl Into<String>) -> Self {
        SdkError::NotFound { item: item.into() }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        SdkError::Internal {
            message: message.into(),
        }
    }

    /// Returns the underlying status if this is a Status error.
    pub fn status(&self) -> Option<SdkStatus> {
        match self {
            SdkError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;
