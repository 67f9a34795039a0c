//! Document store for submission records
//!
//! Persists submissions in a single MongoDB collection and lists them back
//! in insertion order.

pub mod client;
pub mod mock;

pub use client::MongoSubmissionStore;
pub use mock::MockSubmissionStore;

use crate::models::{Submission, SubmissionRecord};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Append a submission and return it with its generated metadata.
    async fn insert(&self, submission: Submission) -> Result<SubmissionRecord>;
    /// Every stored record in natural order.
    async fn list(&self) -> Result<Vec<SubmissionRecord>>;
}
