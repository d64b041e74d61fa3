//! Weekly slot keys

use crate::{MathError, Result};
use chrono::{Datelike, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A (day-of-week, time-of-day) pair. Monday is day 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    weekday: u8,
    time: NaiveTime,
}

impl SlotKey {
    /// Create a slot key, rejecting weekdays outside `0..=6`
    pub fn new(weekday: u8, time: NaiveTime) -> Result<Self> {
        if weekday > 6 {
            return Err(MathError::InvalidInput(format!(
                "Weekday must be between 0 and 6, got {}",
                weekday
            )));
        }

        Ok(Self { weekday, time })
    }

    /// The slot a timestamp falls into
    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self {
            weekday: timestamp.weekday().num_days_from_monday() as u8,
            time: timestamp.time(),
        }
    }

    /// Day of week, Monday = 0
    pub fn weekday(&self) -> u8 {
        self.weekday
    }

    /// Time of day
    pub fn time(&self) -> NaiveTime {
        self.time
    }

    /// Saturday or Sunday
    pub fn is_weekend(&self) -> bool {
        self.weekday > 4
    }
}

impl From<NaiveDateTime> for SlotKey {
    fn from(timestamp: NaiveDateTime) -> Self {
        Self::of(&timestamp)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day {} @ {}", self.weekday, self.time.format("%H:%M"))
    }
}
