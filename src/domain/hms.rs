//! HMS - Health Management System event identity and records
//!
//! A health event is identified by a 64-bit key: the 32-bit `attr` field of the
//! printer report in the high half, the 32-bit `code` field in the low half.

use serde::{Serialize, Serializer};

use crate::domain::severity::{Severity, severity_of};
use crate::helpers::Millis;

/// Composite 64-bit identity of a health event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HmsCode(pub u64);

impl HmsCode {
    pub fn new(attribute: u32, code: u32) -> Self {
        Self((u64::from(attribute) << 32) | u64::from(code))
    }

    pub fn attribute(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    pub fn code(&self) -> u32 {
        self.0 as u32
    }

    /// Zero never identifies a real event
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn severity(&self) -> Severity {
        severity_of(self.code())
    }

    pub fn display_code(&self) -> DisplayCode {
        DisplayCode::new(*self)
    }
}

impl std::fmt::Display for HmsCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_code().as_str())
    }
}

const DISPLAY_LEN: usize = 23;
const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Fixed-width rendering `HMS_aaaa_bbbb_cccc_dddd` of an [`HmsCode`]
///
/// Stored inline so building one never allocates.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayCode([u8; DISPLAY_LEN]);

impl DisplayCode {
    pub fn new(code: HmsCode) -> Self {
        let mut buf = *b"HMS_0000_0000_0000_0000";
        for group in 0..4 {
            let value = (code.0 >> (48 - group * 16)) as u16;
            let start = 4 + group * 5;
            for nibble in 0..4 {
                let shift = 12 - nibble * 4;
                buf[start + nibble] = HEX_UPPER[usize::from((value >> shift) & 0xF)];
            }
        }
        Self(buf)
    }

    pub fn as_str(&self) -> &str {
        // Only ASCII bytes are ever written.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl std::fmt::Display for DisplayCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Debug for DisplayCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DisplayCode({})", self.as_str())
    }
}

impl PartialEq<str> for DisplayCode {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for DisplayCode {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Serialize for DisplayCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One observed anomaly tracked by the event table
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthEvent {
    /// Composite identity
    #[serde(skip)]
    pub code_key: HmsCode,
    /// Raw `attr` field
    #[serde(skip)]
    pub attribute: u32,
    /// Raw `code` field
    #[serde(skip)]
    pub code: u32,
    /// Printable identity
    pub display_code: DisplayCode,
    /// Classification of `code`
    pub severity: Severity,
    /// First time this code was seen in its current slot
    pub first_seen: Millis,
    /// Last time this code was reported
    pub last_seen: Millis,
    /// Number of reports since the slot was (re)initialised
    pub occurrence_count: u32,
    /// Seen within the TTL window
    pub active: bool,
}

impl HealthEvent {
    /// Fresh record for a code first seen at `now`
    pub fn new(code_key: HmsCode, now: Millis) -> Self {
        Self {
            code_key,
            attribute: code_key.attribute(),
            code: code_key.code(),
            display_code: code_key.display_code(),
            severity: code_key.severity(),
            first_seen: now,
            last_seen: now,
            occurrence_count: 1,
            active: true,
        }
    }

    /// Record another report of the same code
    pub fn refresh(&mut self, now: Millis) {
        self.last_seen = now;
        self.occurrence_count = self.occurrence_count.saturating_add(1);
        self.active = true;
    }

    /// Milliseconds since the last report, tolerant of clock wraparound
    pub fn age(&self, now: Millis) -> Millis {
        now.wrapping_sub(self.last_seen)
    }
}
