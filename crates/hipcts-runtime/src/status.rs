//! Runtime status codes.
//!
//! Every runtime call reports its outcome as a [`Status`]. The numeric values
//! match the HIP runtime's `hipError_t` so codes printed in failure messages
//! can be looked up in the vendor documentation.

use core::fmt;

/// Outcome of a runtime call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    Success = 0,
    ErrorInvalidValue = 1,
    ErrorOutOfMemory = 2,
    ErrorNotInitialized = 3,
    ErrorInvalidDeviceFunction = 98,
    ErrorInvalidDevice = 101,
    ErrorInvalidHandle = 400,
    ErrorNotReady = 600,
    ErrorPeerAccessAlreadyEnabled = 704,
    ErrorLaunchFailure = 719,
    ErrorNotSupported = 801,
    ErrorUnknown = 999,
}

impl Status {
    /// Every known status, in code order.
    pub const ALL: [Status; 12] = [
        Status::Success,
        Status::ErrorInvalidValue,
        Status::ErrorOutOfMemory,
        Status::ErrorNotInitialized,
        Status::ErrorInvalidDeviceFunction,
        Status::ErrorInvalidDevice,
        Status::ErrorInvalidHandle,
        Status::ErrorNotReady,
        Status::ErrorPeerAccessAlreadyEnabled,
        Status::ErrorLaunchFailure,
        Status::ErrorNotSupported,
        Status::ErrorUnknown,
    ];

    /// Map a raw code back to a status. Unknown codes become `ErrorUnknown`.
    pub fn from_code(code: i32) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.code() == code)
            .unwrap_or(Status::ErrorUnknown)
    }

    pub fn code(self) -> i32 {
        self as i32
    }

    #[inline]
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Symbolic name, as `hipGetErrorName` would print it.
    pub fn name(self) -> &'static str {
        match self {
            Status::Success => "hipSuccess",
            Status::ErrorInvalidValue => "hipErrorInvalidValue",
            Status::ErrorOutOfMemory => "hipErrorOutOfMemory",
            Status::ErrorNotInitialized => "hipErrorNotInitialized",
            Status::ErrorInvalidDeviceFunction => "hipErrorInvalidDeviceFunction",
            Status::ErrorInvalidDevice => "hipErrorInvalidDevice",
            Status::ErrorInvalidHandle => "hipErrorInvalidHandle",
            Status::ErrorNotReady => "hipErrorNotReady",
            Status::ErrorPeerAccessAlreadyEnabled => "hipErrorPeerAccessAlreadyEnabled",
            Status::ErrorLaunchFailure => "hipErrorLaunchFailure",
            Status::ErrorNotSupported => "hipErrorNotSupported",
            Status::ErrorUnknown => "hipErrorUnknown",
        }
    }

    /// Human-readable description, as `hipGetErrorString` would print it.
    pub fn description(self) -> &'static str {
        match self {
            Status::Success => "no error",
            Status::ErrorInvalidValue => "invalid argument",
            Status::ErrorOutOfMemory => "out of memory",
            Status::ErrorNotInitialized => "initialization error",
            Status::ErrorInvalidDeviceFunction => "invalid device function",
            Status::ErrorInvalidDevice => "invalid device ordinal",
            Status::ErrorInvalidHandle => "invalid resource handle",
            Status::ErrorNotReady => "device not ready",
            Status::ErrorPeerAccessAlreadyEnabled => "peer access is already enabled",
            Status::ErrorLaunchFailure => "unspecified launch failure",
            Status::ErrorNotSupported => "operation not supported",
            Status::ErrorUnknown => "unknown error",
        }
    }

    /// Convert to a `Result`, treating anything but `Success` as an error.
    pub fn ok(self) -> Result<(), Status> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.description())
    }
}

impl std::error::Error for Status {}

impl From<Result<(), Status>> for Status {
    fn from(result: Result<(), Status>) -> Self {
        match result {
            Ok(()) => Status::Success,
            Err(status) => status,
        }
    }
}
