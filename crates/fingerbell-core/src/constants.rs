//! Core constants for the fingerprint doorbell controller.
//!
//! This module defines the fixed domain limits, timing defaults, and
//! persistence keys shared by the hardware, storage, and engine crates.
//! Timing values are defaults only; the engine reads the effective values
//! from its configuration.
//!
//! # Slot Domain
//!
//! The optical sensor stores templates in numbered slots. This controller
//! manages slots `1..=200`:
//!
//! ```
//! use fingerbell_core::constants::*;
//!
//! fn is_valid_slot(id: i64) -> bool {
//!     (MIN_SLOT_ID as i64..=MAX_SLOT_ID as i64).contains(&id)
//! }
//!
//! assert!(is_valid_slot(1));
//! assert!(is_valid_slot(200));
//! assert!(!is_valid_slot(0));
//! ```

// ============================================================================
// Template Slots
// ============================================================================

/// Lowest template slot managed by the controller.
pub const MIN_SLOT_ID: u16 = 1;

/// Highest template slot managed by the controller.
///
/// Matches the template capacity of the R503/AS608 sensor family.
pub const MAX_SLOT_ID: u16 = 200;

/// Number of slots in the managed range.
pub const SLOT_COUNT: usize = (MAX_SLOT_ID - MIN_SLOT_ID + 1) as usize;

/// Name reported for a matched slot that has no registered label.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Matched-id value published when no template is matched.
pub const NO_MATCH_ID: i32 = -1;

// ============================================================================
// Enrollment
// ============================================================================

/// Number of capture passes merged into one template.
///
/// The sensor keeps one character buffer per pass, numbered `1..=ENROLL_PASSES`.
pub const ENROLL_PASSES: u8 = 5;

// ============================================================================
// Timing Defaults (milliseconds)
// ============================================================================

/// Minimum interval between two scan polls.
///
/// Polling faster than this saturates the 57600 baud link without improving
/// responsiveness.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Pause after a recognised finger before the next poll is eligible.
pub const DEFAULT_MATCH_COOLDOWN_MS: u64 = 3000;

/// Pause after a doorbell ring before the next poll is eligible.
pub const DEFAULT_RING_COOLDOWN_MS: u64 = 1000;

/// Poll interval while waiting for a finger to be placed or lifted.
pub const DEFAULT_FINGER_POLL_INTERVAL_MS: u64 = 50;

/// Delay after the finger is lifted before prompting for the next pass.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Delay after a successful pass so the user sees the confirmation LED.
pub const DEFAULT_PASS_CONFIRM_DELAY_MS: u64 = 1000;

/// Upper bound on any single wait for finger placement or removal.
pub const DEFAULT_FINGER_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Delay between link verification attempts during setup.
pub const DEFAULT_CONNECT_RETRY_DELAY_MS: u64 = 5000;

/// Number of link verification attempts during setup.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 2;

// ============================================================================
// Sensor Notepad
// ============================================================================

/// Bytes per notepad page on the sensor.
pub const NOTEPAD_PAGE_SIZE: usize = 32;

/// Number of notepad pages on the sensor (pages `0..NOTEPAD_PAGE_COUNT`).
pub const NOTEPAD_PAGE_COUNT: u8 = 16;

/// Notepad page holding the pairing secret.
pub const DEFAULT_PAIRING_PAGE: u8 = 0;

// ============================================================================
// Pairing Secret
// ============================================================================

/// Number of digest bytes kept in a pairing secret.
pub const PAIRING_SECRET_BYTES: usize = 16;

/// Length of the hex-rendered pairing secret.
///
/// Exactly fills one notepad page.
pub const PAIRING_SECRET_LEN: usize = PAIRING_SECRET_BYTES * 2;

// ============================================================================
// Persistence Keys
// ============================================================================

/// Preference namespace holding the slot id to name map.
///
/// Keys are decimal slot ids (`"1"` .. `"200"`).
pub const REGISTRY_NAMESPACE: &str = "fingerprints";

/// Preference namespace holding the pairing record.
pub const PAIRING_NAMESPACE: &str = "pairing";

/// Key of the locally stored pairing secret.
pub const PAIRING_CODE_KEY: &str = "pairing_code";

/// Key of the persisted pairing validity flag.
pub const PAIRING_VALID_KEY: &str = "pairing_valid";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_count_matches_range() {
        assert_eq!(SLOT_COUNT, 200);
    }

    #[test]
    fn test_secret_fills_one_notepad_page() {
        assert_eq!(PAIRING_SECRET_LEN, NOTEPAD_PAGE_SIZE);
    }

    #[test]
    fn test_pairing_page_in_range() {
        assert!(DEFAULT_PAIRING_PAGE < NOTEPAD_PAGE_COUNT);
    }
}
