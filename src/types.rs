// src/types.rs

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::Deserialize;

/// Capacity of the channel between a stream's producer loop and its consumer.
///
/// - `Rendezvous`: a send completes only once the consumer has taken the
///   event (default behaviour).
/// - `Bounded(n)`: up to `n` events may sit in the channel before the
///   producer is suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "CapacityRepr")]
pub enum ChannelCapacity {
    Rendezvous,
    Bounded(NonZeroUsize),
}

impl ChannelCapacity {
    /// Build a capacity from a plain count, treating `0` as rendezvous.
    pub fn from_count(n: usize) -> Self {
        match NonZeroUsize::new(n) {
            Some(n) => ChannelCapacity::Bounded(n),
            None => ChannelCapacity::Rendezvous,
        }
    }

    /// Number of slots the underlying channel needs.
    pub(crate) fn slots(self) -> usize {
        match self {
            ChannelCapacity::Rendezvous => 1,
            ChannelCapacity::Bounded(n) => n.get(),
        }
    }
}

impl Default for ChannelCapacity {
    fn default() -> Self {
        ChannelCapacity::Rendezvous
    }
}

impl fmt::Display for ChannelCapacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelCapacity::Rendezvous => f.write_str("rendezvous"),
            ChannelCapacity::Bounded(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for ChannelCapacity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "rendezvous" {
            return Ok(ChannelCapacity::Rendezvous);
        }
        match s.parse::<usize>() {
            Ok(0) => Err(
                "invalid capacity: 0 (use \"rendezvous\" for an unbuffered channel)".to_string(),
            ),
            Ok(n) => Ok(ChannelCapacity::from_count(n)),
            Err(_) => Err(format!(
                "invalid capacity: {s} (expected \"rendezvous\" or a positive integer)"
            )),
        }
    }
}

/// TOML accepts either `capacity = "rendezvous"` or `capacity = 16`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CapacityRepr {
    Count(i64),
    Name(String),
}

impl TryFrom<CapacityRepr> for ChannelCapacity {
    type Error = String;

    fn try_from(repr: CapacityRepr) -> Result<Self, Self::Error> {
        match repr {
            CapacityRepr::Count(n) => match usize::try_from(n) {
                Ok(count) if count > 0 => Ok(ChannelCapacity::from_count(count)),
                _ => Err(format!(
                    "invalid capacity: {n} (expected \"rendezvous\" or a positive integer)"
                )),
            },
            CapacityRepr::Name(s) => s.parse(),
        }
    }
}
