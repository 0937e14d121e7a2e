use std::{fmt, ops::AddAssign};

/// Running mean that can be merged with other trackers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AvgTracker {
    total: f64,
    count: u64,
}

impl AvgTracker {
    /// A tracker that has already seen `count` samples summing to `total`
    pub fn new(total: f64, count: u64) -> Self {
        Self { total, count }
    }

    pub fn sample(val: f64) -> Self {
        Self::new(val, 1)
    }

    /// NaN until something has been added
    pub fn mean(&self) -> f64 {
        if self.count > 0 {
            self.total / self.count as f64
        } else {
            f64::NAN
        }
    }
}

impl AddAssign for AvgTracker {
    fn add_assign(&mut self, other: AvgTracker) {
        if !other.total.is_nan() {
            self.total += other.total;
            self.count += other.count;
        }
    }
}

impl fmt::Display for AvgTracker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.4} (n={})", self.mean(), self.count)
    }
}
