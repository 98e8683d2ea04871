mod content;
mod surveys;

pub use content::{
    CategoryBuckets, ContentPatch, ContentStats, ContentStore, NewContentItem, StatusBuckets,
};
pub use surveys::{DashboardStats, NewResponse, NewSurvey, SurveyPatch, SurveyStats, SurveyStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidInput(String),
}

/// Ids are one greater than the current maximum, so the id of a deleted
/// non-maximum record is never reused while the maximum survives.
fn next_id(taken: impl Iterator<Item = u64>) -> u64 {
    taken.max().unwrap_or(0) + 1
}
