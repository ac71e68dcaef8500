mod ancillary;
mod jobs;
mod performance;

pub use ancillary::PostgresAncillaryRepo;
pub use jobs::PostgresJobRepo;
pub use performance::PostgresPerformanceDatumRepo;
