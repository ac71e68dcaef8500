mod ancillary;
mod jobs;
mod performance;

pub use ancillary::SqliteAncillaryRepo;
pub use jobs::SqliteJobRepo;
pub use performance::SqlitePerformanceDatumRepo;
