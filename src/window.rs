use crate::models::Measurement;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Number of points kept for the chart and table in the reference dashboard.
pub const DEFAULT_MAX_POINTS: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => panic!("window capacity must be non-zero"),
};

/// Bounded, time-ascending history of the most recent measurements.
///
/// Appends are expected in non-decreasing instant order; the window never
/// re-sorts. Once full, every append evicts the oldest measurement.
#[derive(Debug, Clone)]
pub struct TimeSeriesWindow {
    max_points: NonZeroUsize,
    points: VecDeque<Measurement>,
}

impl TimeSeriesWindow {
    pub fn new(max_points: NonZeroUsize) -> Self {
        Self {
            max_points,
            points: VecDeque::with_capacity(max_points.get()),
        }
    }

    pub fn max_points(&self) -> usize {
        self.max_points.get()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.points.len() == self.max_points.get()
    }

    /// Appends `measurement`, evicting the oldest point if the window is full.
    /// Returns the evicted measurement, if any.
    pub fn append(&mut self, measurement: Measurement) -> Option<Measurement> {
        let evicted = if self.is_full() {
            self.points.pop_front()
        } else {
            None
        };
        self.points.push_back(measurement);
        evicted
    }

    /// Most recently appended measurement.
    pub fn latest(&self) -> Option<&Measurement> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.points.iter()
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Measurement> {
        self.iter().copied().collect()
    }
}

impl Default for TimeSeriesWindow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POINTS)
    }
}
