//! Shared types for the forgotten-item solver

use std::time::{SystemTime, UNIX_EPOCH};

/// Sentinel timestamp meaning "never observed mobile"
pub const NEVER: u64 = 0;

/// Get current epoch milliseconds
#[inline]
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Per-item record of current mobility and the last time movement was seen.
///
/// `last_mobile_at` is monotonically non-decreasing across the process
/// lifetime: a stale clock value from the collaborator never rewinds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MobilityState {
    mobile: bool,
    last_mobile_at: u64,
}

impl MobilityState {
    pub fn new() -> Self {
        Self { mobile: false, last_mobile_at: NEVER }
    }

    /// Record a movement observation at the given wall-clock time.
    pub fn mark_mobile(&mut self, at: u64) {
        self.mobile = true;
        if at > self.last_mobile_at {
            self.last_mobile_at = at;
        }
    }

    /// Record a stillness observation. The timestamp stays at the last time
    /// the item *was* mobile, not the time stillness was observed.
    pub fn mark_still(&mut self) {
        self.mobile = false;
    }

    pub fn is_mobile(&self) -> bool {
        self.mobile
    }

    pub fn last_mobile_at(&self) -> u64 {
        self.last_mobile_at
    }

    /// Milliseconds since the item was last seen moving, or `None` if it has
    /// never been seen moving.
    pub fn elapsed_since_mobile(&self, now: u64) -> Option<u64> {
        if self.last_mobile_at == NEVER {
            return None;
        }
        Some(now.saturating_sub(self.last_mobile_at))
    }
}

impl Default for MobilityState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_never_mobile() {
        let state = MobilityState::new();
        assert!(!state.is_mobile());
        assert_eq!(state.last_mobile_at(), NEVER);
        assert_eq!(state.elapsed_since_mobile(1_000_000), None);
    }

    #[test]
    fn test_mark_still_keeps_timestamp() {
        let mut state = MobilityState::new();
        state.mark_mobile(5_000);
        state.mark_still();
        assert!(!state.is_mobile());
        assert_eq!(state.last_mobile_at(), 5_000);
        assert_eq!(state.elapsed_since_mobile(8_000), Some(3_000));
    }

    #[test]
    fn test_timestamp_is_monotonic() {
        let mut state = MobilityState::new();
        state.mark_mobile(10_000);
        // Out-of-order clock value from the collaborator must not rewind
        state.mark_mobile(4_000);
        assert!(state.is_mobile());
        assert_eq!(state.last_mobile_at(), 10_000);
    }

    #[test]
    fn test_elapsed_saturates_at_zero() {
        let mut state = MobilityState::new();
        state.mark_mobile(10_000);
        assert_eq!(state.elapsed_since_mobile(9_000), Some(0));
    }
}
