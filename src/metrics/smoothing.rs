//! Rolling buffers and smoothing helpers shared by the engines.

use std::collections::VecDeque;

/// Fixed-capacity rolling buffer of recent values.
///
/// Used for terrain grade smoothing: the buffer keeps `capacity` samples
/// while the smoothed value is taken over a shorter trailing window.
#[derive(Debug, Clone)]
pub struct RollingBuffer {
    /// Buffer of recent values
    buffer: VecDeque<f64>,
    /// Maximum number of values kept
    capacity: usize,
}

impl RollingBuffer {
    /// Create a new rolling buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value, evicting the oldest when full.
    pub fn push(&mut self, value: f64) {
        self.buffer.push_back(value);
        if self.buffer.len() > self.capacity {
            self.buffer.pop_front();
        }
    }

    /// Average of the last `window` values, or `None` if fewer are buffered.
    pub fn trailing_average(&self, window: usize) -> Option<f64> {
        if window == 0 || self.buffer.len() < window {
            return None;
        }
        let sum: f64 = self.buffer.iter().rev().take(window).sum();
        Some(sum / window as f64)
    }

    /// Most recent value.
    pub fn last(&self) -> Option<f64> {
        self.buffer.back().copied()
    }

    /// Value before the most recent one.
    pub fn previous(&self) -> Option<f64> {
        let len = self.buffer.len();
        if len < 2 {
            None
        } else {
            self.buffer.get(len - 2).copied()
        }
    }

    /// Largest buffered value.
    pub fn max(&self) -> Option<f64> {
        self.buffer.iter().copied().reduce(f64::max)
    }

    /// Get the number of values in the buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Reset the buffer.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Time-windowed series of `(timestamp_ms, value)` pairs.
///
/// Entries older than the window (relative to the newest entry) are pruned,
/// always keeping at least one entry.
#[derive(Debug, Clone)]
pub struct TimeWindow {
    entries: VecDeque<(i64, f64)>,
    window_ms: i64,
}

impl TimeWindow {
    /// Create a window spanning `window_ms` milliseconds.
    pub fn new(window_ms: i64) -> Self {
        Self {
            entries: VecDeque::new(),
            window_ms,
        }
    }

    /// Append an entry and prune expired ones.
    pub fn push(&mut self, timestamp_ms: i64, value: f64) {
        self.entries.push_back((timestamp_ms, value));
        while self.entries.len() > 1 {
            match self.entries.front() {
                Some(&(t, _)) if timestamp_ms - t > self.window_ms => {
                    self.entries.pop_front();
                }
                _ => break,
            }
        }
    }

    /// Seconds spanned by the window and the value change across it.
    pub fn span(&self) -> Option<(f64, f64)> {
        if self.entries.len() < 2 {
            return None;
        }
        let (t0, v0) = *self.entries.front()?;
        let (t1, v1) = *self.entries.back()?;
        Some(((t1 - t0) as f64 / 1000.0, v1 - v0))
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the window is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reset the window.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

/// Centred moving average over `window` values.
///
/// Returns the input unchanged when it is shorter than the window.
pub fn centered_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return values.to_vec();
    }

    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(values.len());
            let slice = &values[start..end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
