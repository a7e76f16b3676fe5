//! Listener counters reported when a listener exits.

/// Units are records for the line listener and frames for the accessory
/// listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub accepted: u64,
    pub rejected: u64,
}
