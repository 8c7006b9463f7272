//! Severity - HMS Severity Classification

use serde::{Deserialize, Serialize};

/// Severity of a health event, ordered `None < Info < Warning < Error < Fatal`
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unclassified code
    #[default]
    None = 0,
    /// Informational message
    Info = 1,
    /// Common problem, printing may continue
    Warning = 2,
    /// Serious problem
    Error = 3,
    /// Printing cannot continue
    Fatal = 4,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::None => "None",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Fatal => "Fatal",
        }
    }

    /// Whether this severity counts as a problem (Warning or worse)
    pub fn is_problem(&self) -> bool {
        *self >= Severity::Warning
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a raw 32-bit HMS code field.
///
/// The severity lives in the upper 16 bits: 1 = Fatal, 2 = Error,
/// 3 = Warning, 4 = Info, anything else is unclassified.
pub fn severity_of(code: u32) -> Severity {
    match (code >> 16) as u16 {
        1 => Severity::Fatal,
        2 => Severity::Error,
        3 => Severity::Warning,
        4 => Severity::Info,
        _ => Severity::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_upper_half() {
        assert_eq!(severity_of(0x0001_0000), Severity::Fatal);
        assert_eq!(severity_of(0x0002_0003), Severity::Error);
        assert_eq!(severity_of(0x0003_FFFF), Severity::Warning);
        assert_eq!(severity_of(0x0004_0001), Severity::Info);
        assert_eq!(severity_of(0x0000_0001), Severity::None);
        assert_eq!(severity_of(0x0005_0000), Severity::None);
        assert_eq!(severity_of(0xFFFF_0000), Severity::None);
    }

    #[test]
    fn test_severity_ordering() {
        let ranked: Vec<Severity> = [1u32, 2, 3, 4, 9]
            .iter()
            .map(|hi| severity_of(hi << 16))
            .collect();
        assert!(ranked.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(ranked.iter().max(), Some(&Severity::Fatal));
    }

    #[test]
    fn test_is_problem_threshold() {
        assert!(!Severity::Info.is_problem());
        assert!(Severity::Warning.is_problem());
        assert!(Severity::Fatal.is_problem());
    }
}
