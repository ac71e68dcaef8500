mod ancillary;
mod jobs;
mod performance;

pub use ancillary::*;
pub use jobs::*;
pub use performance::*;
