use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Duration;

use super::ModelError;

/// Allowed object lifetimes. Expiry is fixed at creation and never extended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub enum Lifetime {
    FiveMinutes,
    OneHour,
    #[default]
    OneDay,
    OneWeek,
    ThirtyDays,
}

impl Lifetime {
    pub const ALL: [Lifetime; 5] = [
        Lifetime::FiveMinutes,
        Lifetime::OneHour,
        Lifetime::OneDay,
        Lifetime::OneWeek,
        Lifetime::ThirtyDays,
    ];

    pub fn as_secs(&self) -> u64 {
        match self {
            Lifetime::FiveMinutes => 5 * 60,
            Lifetime::OneHour => 60 * 60,
            Lifetime::OneDay => 24 * 60 * 60,
            Lifetime::OneWeek => 7 * 24 * 60 * 60,
            Lifetime::ThirtyDays => 30 * 24 * 60 * 60,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(self.as_secs() as i64)
    }

    /// Range-check a requested lifetime against the allow-list
    pub fn from_secs(secs: u64) -> Result<Self, ModelError> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_secs() == secs)
            .ok_or(ModelError::InvalidDuration(secs))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Lifetime::FiveMinutes => "5m",
            Lifetime::OneHour => "1h",
            Lifetime::OneDay => "1d",
            Lifetime::OneWeek => "7d",
            Lifetime::ThirtyDays => "30d",
        }
    }
}

impl TryFrom<u64> for Lifetime {
    type Error = ModelError;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        Self::from_secs(secs)
    }
}

impl From<Lifetime> for u64 {
    fn from(lifetime: Lifetime) -> Self {
        lifetime.as_secs()
    }
}

impl FromStr for Lifetime {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.label() == s)
            .ok_or_else(|| ModelError::InvalidLifetimeLabel(s.to_string()))
    }
}

impl Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
