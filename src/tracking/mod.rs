pub mod episode;
pub mod results;
pub mod trajectory;

pub use episode::{EpisodeTracker, NavigationStats};
pub use results::ResultsFile;
pub use trajectory::{TrajectoryLog, TrajectoryPoint};
