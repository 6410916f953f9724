use crate::{
    Result,
    constants::{
        MAX_SLOT_ID, MIN_SLOT_ID, NO_MATCH_ID, NOTEPAD_PAGE_SIZE, PAIRING_SECRET_LEN,
    },
    error::Error,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Template slot identifier (1-200)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u16")]
pub struct SlotId(u16);

impl SlotId {
    /// Create a new slot ID with validation.
    ///
    /// Accepts a signed value so that host-supplied ids such as `-1` or `0`
    /// are rejected rather than wrapped.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlotId` if the ID is outside the valid range (1-200).
    pub fn new(id: i64) -> Result<Self> {
        if !(i64::from(MIN_SLOT_ID)..=i64::from(MAX_SLOT_ID)).contains(&id) {
            return Err(Error::InvalidSlotId {
                id,
                min: MIN_SLOT_ID,
                max: MAX_SLOT_ID,
            });
        }
        Ok(SlotId(id as u16))
    }

    /// Get the raw slot ID.
    #[must_use]
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Zero-based position of this slot in a dense table.
    #[must_use]
    pub fn index(&self) -> usize {
        usize::from(self.0 - MIN_SLOT_ID)
    }

    /// Iterate over every slot in the managed range, in ascending order.
    pub fn all() -> impl Iterator<Item = SlotId> {
        (MIN_SLOT_ID..=MAX_SLOT_ID).map(SlotId)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SlotId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: i64 = s.trim().parse().map_err(|_| Error::InvalidSlotId {
            id: -1,
            min: MIN_SLOT_ID,
            max: MAX_SLOT_ID,
        })?;
        SlotId::new(id)
    }
}

impl TryFrom<i64> for SlotId {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        SlotId::new(value)
    }
}

impl From<SlotId> for u16 {
    fn from(slot: SlotId) -> Self {
        slot.0
    }
}

/// Shared secret proving the attached sensor is the one originally paired.
///
/// Always 32 lowercase hex characters, which exactly fills one sensor notepad
/// page.
///
/// # Security
/// Comparison is constant-time and requires equal length, so a prefix or a
/// truncated page never matches.
#[derive(Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PairingSecret(String);

impl PairingSecret {
    /// Create a pairing secret with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidSecret` unless the value is exactly 32 lowercase
    /// hex characters.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.len() != PAIRING_SECRET_LEN {
            return Err(Error::InvalidSecret(format!(
                "expected {PAIRING_SECRET_LEN} characters, got {}",
                secret.len()
            )));
        }

        if !secret
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(Error::InvalidSecret(
                "must be lowercase hexadecimal".to_string(),
            ));
        }

        Ok(PairingSecret(secret.to_string()))
    }

    /// Get the secret as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the secret bytes as written to the sensor.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Compare against raw bytes read back from the sensor.
    ///
    /// Length and content must both match.
    #[must_use]
    pub fn matches(&self, candidate: &[u8]) -> bool {
        self.0.as_bytes().ct_eq(candidate).into()
    }

    /// Render the secret as one notepad page.
    #[must_use]
    pub fn to_page(&self) -> [u8; NOTEPAD_PAGE_SIZE] {
        let mut page = [0u8; NOTEPAD_PAGE_SIZE];
        let bytes = self.as_bytes();
        page[..bytes.len()].copy_from_slice(bytes);
        page
    }
}

impl fmt::Debug for PairingSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairingSecret({}…)", &self.0[..4])
    }
}

impl fmt::Display for PairingSecret {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for PairingSecret {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other.as_bytes())
    }
}

impl TryFrom<String> for PairingSecret {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        PairingSecret::new(&value)
    }
}

impl From<PairingSecret> for String {
    fn from(secret: PairingSecret) -> Self {
        secret.0
    }
}

/// Locally persisted half of the sensor pairing.
///
/// `valid` is only ever `true` while `local_secret` equals the secret last
/// read from the sensor. A `false` value is persisted and survives reboots
/// until an explicit re-pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingRecord {
    /// Secret written to the sensor on the last successful pair.
    pub local_secret: Option<PairingSecret>,

    /// Whether the sensor still holds `local_secret`.
    pub valid: bool,
}

impl PairingRecord {
    /// Record for a freshly confirmed pairing.
    pub fn paired(secret: PairingSecret) -> Self {
        Self {
            local_secret: Some(secret),
            valid: true,
        }
    }

    /// True when no secret was ever stored.
    #[must_use]
    pub fn is_first_boot(&self) -> bool {
        self.local_secret.is_none()
    }
}

/// Outcome of one completed scan cycle.
///
/// Three shapes exist, distinguished by `found` and `matched` rather than by
/// the id alone:
///
/// | shape | found | matched | ring | id |
/// |---|---|---|---|---|
/// | identified | true | true | false | slot |
/// | doorbell | true | false | true | -1 |
/// | cleared | false | false | false | -1 |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// A finger produced a usable print this cycle.
    pub found: bool,

    /// The print matched an enrolled template.
    pub matched: bool,

    /// Matched slot, if any.
    pub slot: Option<SlotId>,

    /// Registered name of the matched slot, `"Unknown"` when unlabelled,
    /// empty when nothing matched.
    pub name: String,

    /// Sensor confidence score, 0 when nothing matched.
    pub confidence: u16,

    /// Doorbell flag: a valid print that matched nothing.
    pub ring: bool,

    /// When the cycle completed.
    pub timestamp: DateTime<Utc>,
}

impl MatchResult {
    /// A recognised finger.
    pub fn identified(slot: SlotId, name: impl Into<String>, confidence: u16) -> Self {
        Self {
            found: true,
            matched: true,
            slot: Some(slot),
            name: name.into(),
            confidence,
            ring: false,
            timestamp: Utc::now(),
        }
    }

    /// A valid print that matched no enrolled template.
    pub fn doorbell() -> Self {
        Self {
            found: true,
            matched: false,
            slot: None,
            name: String::new(),
            confidence: 0,
            ring: true,
            timestamp: Utc::now(),
        }
    }

    /// The finger of a previous event was removed.
    pub fn cleared() -> Self {
        Self {
            found: false,
            matched: false,
            slot: None,
            name: String::new(),
            confidence: 0,
            ring: false,
            timestamp: Utc::now(),
        }
    }

    /// Matched id as published to the host (`-1` when none).
    #[must_use]
    pub fn id(&self) -> i32 {
        self.slot.map_or(NO_MATCH_ID, |slot| i32::from(slot.as_u16()))
    }

    #[must_use]
    pub fn is_identified(&self) -> bool {
        self.found && self.matched
    }

    #[must_use]
    pub fn is_doorbell(&self) -> bool {
        self.found && !self.matched && self.ring
    }

    #[must_use]
    pub fn is_cleared(&self) -> bool {
        !self.found
    }
}

/// Controller session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No live link to the sensor.
    Disconnected,

    /// Link up, no presentation in progress.
    Idle,

    /// A presentation is being processed or is still latched.
    Scanning,

    /// A multi-pass enrollment owns the sensor.
    Enrolling,
}

impl SessionState {
    /// Check if transition to target state is valid from this state.
    ///
    /// # Examples
    ///
    /// ```
    /// use fingerbell_core::SessionState;
    ///
    /// assert!(SessionState::Idle.can_transition_to(&SessionState::Enrolling));
    /// assert!(!SessionState::Enrolling.can_transition_to(&SessionState::Enrolling));
    /// assert!(!SessionState::Disconnected.can_transition_to(&SessionState::Scanning));
    /// ```
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            // Reconnection
            (SessionState::Disconnected, SessionState::Idle)
            // Scan loop
            | (SessionState::Idle, SessionState::Scanning)
            | (SessionState::Scanning, SessionState::Idle)
            // Enrollment entry and unconditional exit
            | (SessionState::Idle | SessionState::Scanning, SessionState::Enrolling)
            | (SessionState::Enrolling, SessionState::Idle)
            // Link loss
            | (
                SessionState::Idle | SessionState::Scanning | SessionState::Enrolling,
                SessionState::Disconnected
            )
        )
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }

    /// True while the scan loop may poll the sensor.
    #[must_use]
    pub fn can_scan(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Scanning)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::Idle => "Idle",
            SessionState::Scanning => "Scanning",
            SessionState::Enrolling => "Enrolling",
        };
        write!(f, "{}", state_str)
    }
}
