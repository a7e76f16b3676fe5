//! Error taxonomy for the DIY wheel firmware crates.
//!
//! Every crate in the workspace defines its own `thiserror` enum and
//! classifies each variant into one of three kinds:
//!
//! - [`WheelErrorKind::SetupFailure`]: fatal, only raised before the control
//!   loop starts
//! - [`WheelErrorKind::TransientIo`]: a bus or host transaction failed; the tick
//!   degrades and continues
//! - [`WheelErrorKind::ProtocolParse`]: an inbound record or frame is discarded
//!
//! Once the loop is running, errors are consumed at the tick boundary with
//! [`TickResultExt::consume`], which logs at the level matching the kind.
//!
//! # Example
//!
//! ```
//! use diywheel_errors::{Classify, TickResultExt, WheelErrorKind};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("bus went quiet")]
//! struct Quiet;
//!
//! impl Classify for Quiet {
//!     fn kind(&self) -> WheelErrorKind {
//!         WheelErrorKind::TransientIo
//!     }
//! }
//!
//! let state: Result<i32, Quiet> = Err(Quiet);
//! assert_eq!(state.consume("get_state"), None);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod kind;
pub mod tick;

pub use kind::{Classify, ErrorSeverity, WheelErrorKind};
pub use tick::TickResultExt;
