//! Slot-grouped look-back windows
//!
//! Contains the two pieces of the seasonal windower:
//! - `SlotBuffer`: the last `period` rows seen for a single slot
//! - `SlotWindower`: runs one buffer per slot key over a chronological series

use crate::slot::SlotKey;
use crate::{MathError, Result};
use chrono::NaiveDateTime;
use std::collections::{HashMap, VecDeque};

/// Bounded history of one slot.
///
/// Missing rows take up a position in the window but are skipped by the mean.
#[derive(Debug, Clone)]
pub struct SlotBuffer {
    period: usize,
    values: VecDeque<Option<f64>>,
}

impl SlotBuffer {
    /// Create a new buffer holding the last `period` rows
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self::with_period(period))
    }

    fn with_period(period: usize) -> Self {
        Self {
            period,
            values: VecDeque::with_capacity(period),
        }
    }

    /// Push a new row, evicting the oldest one once the buffer is full
    pub fn update(&mut self, value: Option<f64>) {
        self.values.push_back(value);

        if self.values.len() > self.period {
            self.values.pop_front();
        }
    }

    /// Mean of the present values in the window, `None` if there are none
    pub fn value(&self) -> Option<f64> {
        let (sum, count) = self
            .values
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Number of rows currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no row has been pushed yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the buffer, clearing all rows
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// Rolling mean over the previous `window` rows sharing a slot key.
///
/// The window is strictly backward looking: the output at `t` is computed
/// before the row at `t` enters its slot buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindower {
    window: usize,
}

impl SlotWindower {
    /// Seasonal mean over the last `window` same-slot rows
    pub fn mean(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(MathError::InvalidInput(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self { window })
    }

    /// Value of the same slot the last time it occurred
    pub fn last_observed() -> Self {
        Self { window: 1 }
    }

    /// Get the window size
    pub fn window(&self) -> usize {
        self.window
    }

    /// Compute the look-back statistic for every point.
    ///
    /// Points must be in strictly increasing timestamp order. The output has
    /// one entry per input point; `None` means the slot had no usable history.
    pub fn apply<I>(&self, points: I) -> Result<Vec<Option<f64>>>
    where
        I: IntoIterator<Item = (NaiveDateTime, Option<f64>)>,
    {
        let points = points.into_iter();
        let mut output = Vec::with_capacity(points.size_hint().0);
        let mut buffers: HashMap<SlotKey, SlotBuffer> = HashMap::new();
        let mut previous: Option<NaiveDateTime> = None;

        for (timestamp, value) in points {
            if let Some(prev) = previous {
                if timestamp <= prev {
                    return Err(MathError::InvalidInput(format!(
                        "Timestamps must be strictly increasing: {} follows {}",
                        timestamp, prev
                    )));
                }
            }
            previous = Some(timestamp);

            let buffer = buffers
                .entry(SlotKey::of(&timestamp))
                .or_insert_with(|| SlotBuffer::with_period(self.window));
            output.push(buffer.value());
            buffer.update(value);
        }

        Ok(output)
    }
}
