use std::collections::BTreeSet;

use crate::error::{HapticError, Result};
use crate::instruments::gm_program_from_name;

/// C2, the bottom of the default haptic register.
pub const DEFAULT_LOW_NOTE: u8 = 36;
/// C4, the top of the default haptic register.
pub const DEFAULT_HIGH_NOTE: u8 = 60;

/// Keeps note-ons inside an inclusive pitch interval, optionally only for
/// an allow-list of instruments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFilter {
    low_note: u8,
    high_note: u8,
    allowed_programs: Option<BTreeSet<u8>>,
}

impl RegisterFilter {
    pub fn new(low_note: u8, high_note: u8) -> Result<Self> {
        if high_note > 127 {
            return Err(HapticError::InvalidRegister {
                low: low_note,
                high: high_note,
                reason: "notes must be within 0..=127",
            });
        }
        if low_note > high_note {
            return Err(HapticError::InvalidRegister {
                low: low_note,
                high: high_note,
                reason: "low note is above high note",
            });
        }
        Ok(Self {
            low_note,
            high_note,
            allowed_programs: None,
        })
    }

    /// Restrict to instruments given by General MIDI name (`"Cello"`) or as
    /// `"Program<N>"` for programs without a recognisable name.
    pub fn with_instruments<I, S>(self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let programs = names
            .into_iter()
            .map(|name| parse_instrument(name.as_ref()))
            .collect::<Result<BTreeSet<u8>>>()?;
        Ok(self.with_programs(programs))
    }

    pub fn with_programs(mut self, programs: impl IntoIterator<Item = u8>) -> Self {
        self.allowed_programs = Some(programs.into_iter().collect());
        self
    }

    pub fn low_note(&self) -> u8 {
        self.low_note
    }

    pub fn high_note(&self) -> u8 {
        self.high_note
    }

    pub fn allowed_programs(&self) -> Option<&BTreeSet<u8>> {
        self.allowed_programs.as_ref()
    }

    pub fn in_register(&self, note: u8) -> bool {
        (self.low_note..=self.high_note).contains(&note)
    }

    /// An unresolved program never matches an allow-list.
    pub fn accepts(&self, note: u8, program: Option<u8>) -> bool {
        if !self.in_register(note) {
            return false;
        }
        match (&self.allowed_programs, program) {
            (None, _) => true,
            (Some(allowed), Some(program)) => allowed.contains(&program),
            (Some(_), None) => false,
        }
    }
}

impl Default for RegisterFilter {
    fn default() -> Self {
        Self {
            low_note: DEFAULT_LOW_NOTE,
            high_note: DEFAULT_HIGH_NOTE,
            allowed_programs: None,
        }
    }
}

fn parse_instrument(name: &str) -> Result<u8> {
    if let Some(program) = gm_program_from_name(name) {
        return Ok(program);
    }
    let trimmed = name.trim();
    let numeric = trimmed
        .get(..7)
        .filter(|prefix| prefix.eq_ignore_ascii_case("program"))
        .and_then(|_| trimmed[7..].trim().parse::<u8>().ok())
        .filter(|program| *program <= 127);
    numeric.ok_or_else(|| HapticError::UnknownInstrument(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::LOW_STRINGS;

    #[test]
    fn test_default_register_bounds_inclusive() {
        let filter = RegisterFilter::default();
        assert!(filter.accepts(36, None));
        assert!(filter.accepts(60, None));
        assert!(!filter.accepts(35, None));
        assert!(!filter.accepts(61, None));
    }

    #[test]
    fn test_invalid_register() {
        assert!(RegisterFilter::new(61, 60).is_err());
        assert!(RegisterFilter::new(0, 128).is_err());
        assert!(RegisterFilter::new(40, 40).is_ok());
    }

    #[test]
    fn test_instrument_allow_list() {
        let filter = RegisterFilter::default().with_instruments(LOW_STRINGS).unwrap();
        assert!(filter.accepts(40, Some(42)));
        assert!(filter.accepts(40, Some(43)));
        assert!(!filter.accepts(40, Some(0)));
        assert!(!filter.accepts(40, None));
        // Register still applies
        assert!(!filter.accepts(70, Some(42)));
    }

    #[test]
    fn test_program_number_names() {
        let filter = RegisterFilter::default()
            .with_instruments(["Program7", "program 99"])
            .unwrap();
        let allowed: Vec<u8> = filter.allowed_programs().unwrap().iter().copied().collect();
        assert_eq!(allowed, vec![7, 99]);
    }

    #[test]
    fn test_unknown_instrument_rejected() {
        let err = RegisterFilter::default().with_instruments(["Theremin"]).unwrap_err();
        assert_eq!(err, HapticError::UnknownInstrument("Theremin".to_string()));
        assert!(RegisterFilter::default().with_instruments(["Program200"]).is_err());
    }
}
