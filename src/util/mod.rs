pub mod avg_tracker;
pub mod report;

pub use avg_tracker::AvgTracker;
pub use report::{Metric, Report};
