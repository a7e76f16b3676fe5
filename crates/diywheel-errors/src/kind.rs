//! Error kinds and severity levels.

use core::fmt;

/// Coarse classification shared by every crate-level error enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WheelErrorKind {
    /// Handshake or configuration failed before the loop started
    SetupFailure = 1,
    /// A single bus, host or stream transaction failed
    TransientIo = 2,
    /// An inbound record or frame could not be decoded
    ProtocolParse = 3,
}

impl WheelErrorKind {
    /// Get the numeric code for this kind.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Create a kind from its numeric code.
    #[inline]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::SetupFailure),
            2 => Some(Self::TransientIo),
            3 => Some(Self::ProtocolParse),
            _ => None,
        }
    }

    /// Severity of an error of this kind.
    pub const fn severity(self) -> ErrorSeverity {
        match self {
            Self::SetupFailure => ErrorSeverity::Critical,
            Self::TransientIo => ErrorSeverity::Warning,
            Self::ProtocolParse => ErrorSeverity::Info,
        }
    }

    /// Whether the runtime must refuse to start the control loop.
    #[inline]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::SetupFailure)
    }
}

impl fmt::Display for WheelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetupFailure => write!(f, "setup failure"),
            Self::TransientIo => write!(f, "transient I/O"),
            Self::ProtocolParse => write!(f, "protocol parse"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, the device cannot operate
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Implemented by each crate's error enum to map itself onto the taxonomy.
pub trait Classify: std::error::Error {
    /// The kind of this error.
    fn kind(&self) -> WheelErrorKind;

    /// Severity, derived from the kind unless overridden.
    fn severity(&self) -> ErrorSeverity {
        self.kind().severity()
    }
}
