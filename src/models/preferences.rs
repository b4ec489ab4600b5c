use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Vibe {
    History,
    Nature,
    Religion,
    Adventure,
    Beach,
    Culture,
}

impl Vibe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vibe::History => "History",
            Vibe::Nature => "Nature",
            Vibe::Religion => "Religion",
            Vibe::Adventure => "Adventure",
            Vibe::Beach => "Beach",
            Vibe::Culture => "Culture",
        }
    }
}

impl fmt::Display for Vibe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    #[serde(rename = "Budget")]
    Budget,
    #[serde(rename = "Mid-Range")]
    MidRange,
    #[serde(rename = "Luxury")]
    Luxury,
}

impl Budget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Budget::Budget => "Budget",
            Budget::MidRange => "Mid-Range",
            Budget::Luxury => "Luxury",
        }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }

    /// Parse a month by its English name, ignoring case.
    pub fn from_name(name: &str) -> Option<Month> {
        let name = name.trim();
        Month::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PreferencesError {
    ZeroDuration,
}

impl fmt::Display for PreferencesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferencesError::ZeroDuration => write!(f, "Trip duration must be at least one day"),
        }
    }
}

impl std::error::Error for PreferencesError {}

/// What the traveller asked for. Only ever held in view state.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub vibe: Vibe,
    pub budget: Budget,
    pub duration: u32,
    pub starting_city: String,
    pub month: Month,
}

impl Preferences {
    pub fn validate(&self) -> Result<(), PreferencesError> {
        if self.duration == 0 {
            return Err(PreferencesError::ZeroDuration);
        }
        Ok(())
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            vibe: Vibe::History,
            budget: Budget::MidRange,
            duration: 3,
            starting_city: String::new(),
            month: Month::October,
        }
    }
}
