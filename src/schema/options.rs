//! Write options applied to prepared inserts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Write consistency level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    #[default]
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsistencyLevel::Any => "ANY",
            ConsistencyLevel::One => "ONE",
            ConsistencyLevel::Two => "TWO",
            ConsistencyLevel::Three => "THREE",
            ConsistencyLevel::Quorum => "QUORUM",
            ConsistencyLevel::All => "ALL",
            ConsistencyLevel::LocalQuorum => "LOCAL_QUORUM",
            ConsistencyLevel::EachQuorum => "EACH_QUORUM",
            ConsistencyLevel::LocalOne => "LOCAL_ONE",
        };
        f.write_str(name)
    }
}

impl FromStr for ConsistencyLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "ANY" => Ok(ConsistencyLevel::Any),
            "ONE" => Ok(ConsistencyLevel::One),
            "TWO" => Ok(ConsistencyLevel::Two),
            "THREE" => Ok(ConsistencyLevel::Three),
            "QUORUM" => Ok(ConsistencyLevel::Quorum),
            "ALL" => Ok(ConsistencyLevel::All),
            "LOCAL_QUORUM" => Ok(ConsistencyLevel::LocalQuorum),
            "EACH_QUORUM" => Ok(ConsistencyLevel::EachQuorum),
            "LOCAL_ONE" => Ok(ConsistencyLevel::LocalOne),
            _ => anyhow::bail!("Invalid consistency level: {}", s),
        }
    }
}

/// Serial consistency for conditional writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SerialConsistencyLevel {
    Serial,
    #[default]
    LocalSerial,
}

/// Options baked into a prepared insert.
///
/// Part of the statement cache key: two batches with different options get
/// different prepared statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WriteOptions {
    pub consistency: ConsistencyLevel,
    pub serial_consistency: SerialConsistencyLevel,
    pub ttl_seconds: Option<u32>,
    /// Write timestamp in microseconds since the epoch
    pub timestamp_micros: Option<i64>,
    pub idempotent: bool,
    /// Render as a conditional `IF NOT EXISTS` insert
    pub if_not_exists: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            consistency: ConsistencyLevel::LocalQuorum,
            serial_consistency: SerialConsistencyLevel::LocalSerial,
            ttl_seconds: None,
            timestamp_micros: None,
            idempotent: true,
            if_not_exists: false,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_consistency(mut self, consistency: ConsistencyLevel) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn with_serial_consistency(mut self, serial: SerialConsistencyLevel) -> Self {
        self.serial_consistency = serial;
        self
    }

    pub fn with_ttl(mut self, ttl_seconds: u32) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }

    pub fn with_timestamp(mut self, timestamp_micros: i64) -> Self {
        self.timestamp_micros = Some(timestamp_micros);
        self
    }

    pub fn with_idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    pub fn with_if_not_exists(mut self, if_not_exists: bool) -> Self {
        self.if_not_exists = if_not_exists;
        self
    }

    /// Conditional writes are never safe to retry blindly
    pub fn is_idempotent(&self) -> bool {
        self.idempotent && !self.if_not_exists
    }
}
