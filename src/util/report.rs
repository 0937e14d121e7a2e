use super::avg_tracker::AvgTracker;
use ahash::HashMap;
use std::{
    fmt,
    ops::{AddAssign, Index, IndexMut},
};

/// A single entry of the navigation report
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    /// Counters and rates, summed when added to
    Value(f64),
    /// Timings and per-agent figures, averaged over every sample
    Mean(AvgTracker),
}

impl From<u64> for Metric {
    fn from(val: u64) -> Self {
        Metric::Value(val as f64)
    }
}

impl From<f64> for Metric {
    fn from(val: f64) -> Self {
        Metric::Value(val)
    }
}

impl From<AvgTracker> for Metric {
    fn from(val: AvgTracker) -> Self {
        Metric::Mean(val)
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Value(0.0)
    }
}

impl AddAssign for Metric {
    fn add_assign(&mut self, other: Metric) {
        match (self, other) {
            (Metric::Value(a), Metric::Value(b)) => *a += b,
            (Metric::Mean(a), Metric::Mean(b)) => *a += b,
            // a fresh key starts as Value(0.0)
            (slot, other) => *slot = other,
        }
    }
}

impl Metric {
    pub fn value(&self) -> f64 {
        match self {
            Metric::Value(val) => *val,
            Metric::Mean(avg) => avg.mean(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Metric::Value(val) => write!(f, "{val}"),
            Metric::Mean(avg) => write!(f, "{avg}"),
        }
    }
}

/// Named metrics collected over an evaluation run, printed sorted by name
#[derive(Debug, Default, Clone)]
pub struct Report {
    metrics: HashMap<String, Metric>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "-------------------------Navigation report-------------------------"
        )?;

        let mut names: Vec<_> = self.metrics.keys().collect();
        names.sort_unstable();
        for name in names {
            writeln!(f, "\t{name}: {}", self.metrics[name])?;
        }
        Ok(())
    }
}

impl Index<&str> for Report {
    type Output = Metric;

    fn index(&self, name: &str) -> &Self::Output {
        &self.metrics[name]
    }
}

impl IndexMut<&str> for Report {
    fn index_mut(&mut self, name: &str) -> &mut Self::Output {
        self.metrics.entry(name.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_values_and_means() {
        let mut report = Report::default();
        report["Episodes"] += 1u64.into();
        report["Episodes"] += 1u64.into();
        report["Survive ticks"] += AvgTracker::new(30.0, 2).into();
        report["Survive ticks"] += AvgTracker::new(10.0, 2).into();

        assert_eq!(report["Episodes"].value(), 2.0);
        assert_eq!(report["Survive ticks"].value(), 10.0);
    }

    #[test]
    fn display_is_sorted() {
        let mut report = Report::default();
        report["Step time"] += AvgTracker::sample(0.5).into();
        report["Collision"] = 2u64.into();

        let text = report.to_string();
        assert!(text.starts_with("---"));
        let collision = text.find("\tCollision: 2\n").unwrap();
        let step = text.find("\tStep time: 0.5000 (n=1)\n").unwrap();
        assert!(collision < step);
    }
}
