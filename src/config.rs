use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{PoolError, Result};
use crate::model::Version;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Where the pool lives and how to reach it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub pool: String,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub retry_delay: Option<Duration>,
    /// Shallow clone depth; 0 or absent means full history.
    #[serde(default)]
    pub depth: Option<u32>,
}

impl Source {
    /// Reject incomplete sources before any repository access.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("uri", &self.uri),
            ("pool", &self.pool),
            ("branch", &self.branch),
        ] {
            if value.trim().is_empty() {
                return Err(PoolError::Validation(format!("missing {field}")));
            }
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY)
    }
}

/// Exactly one of these selects the operation an `out` request performs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutParams {
    #[serde(default)]
    pub acquire: bool,
    /// Claim this specific lock by name.
    #[serde(default)]
    pub claim: Option<String>,
    /// Directory holding the claim ticket of the lock to release.
    #[serde(default)]
    pub release: Option<String>,
    /// Directory holding the claim ticket of the lock to remove.
    #[serde(default)]
    pub remove: Option<String>,
    /// Directory holding the lock to add as unclaimed.
    #[serde(default)]
    pub add: Option<String>,
    /// Directory holding the lock to add as already claimed.
    #[serde(default)]
    pub add_claimed: Option<String>,
}

impl OutParams {
    /// Names of every operation field that is set.
    pub fn selected(&self) -> Vec<&'static str> {
        [
            ("acquire", self.acquire),
            ("claim", self.claim.is_some()),
            ("release", self.release.is_some()),
            ("remove", self.remove.is_some()),
            ("add", self.add.is_some()),
            ("add_claimed", self.add_claimed.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutRequest {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub params: OutParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InRequest {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
}

impl InRequest {
    pub fn validate(&self) -> Result<&Version> {
        self.source.validate()?;
        self.version
            .as_ref()
            .ok_or_else(|| PoolError::Validation("missing version".into()))
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}

/// Parse a duration written as a sequence of decimal numbers with unit
/// suffixes, e.g. `1h5m10s`, `1.5s`, `100ms`.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let text = input.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    if text.is_empty() {
        return Err("empty duration".into());
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut nanos = 0f64;
    let mut rest = text;
    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        if number_end == 0 {
            return Err(format!("invalid duration {input:?}"));
        }
        let value: f64 = rest[..number_end]
            .parse()
            .map_err(|_| format!("invalid duration {input:?}"))?;
        rest = &rest[number_end..];

        let unit_end = rest.find(is_number).unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            "" => return Err(format!("missing unit in duration {input:?}")),
            unit => return Err(format!("unknown unit {unit:?} in duration {input:?}")),
        };
        nanos += value * scale;
        rest = &rest[unit_end..];
    }

    Ok(Duration::from_nanos(nanos.round() as u64))
}
