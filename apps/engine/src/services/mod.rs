//! Business logic services.

pub mod aggregation;
pub mod classifier;
pub mod defect;
pub mod defect_sync;
pub mod matcher;
pub mod problems;
pub mod stability;

pub use defect::{Defect, DefectAdapter, DefectFetchError};
pub use defect_sync::{DefectSynchronizer, start_defect_sync_task};
pub use problems::ProblemService;
