use super::SubmissionStore;
use crate::models::{Submission, SubmissionRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// In-memory submission store. Failure can be toggled after construction to
/// simulate the database going away while the server is running.
#[derive(Clone)]
pub struct MockSubmissionStore {
    records: Arc<Mutex<Vec<SubmissionRecord>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockSubmissionStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            should_fail: Arc::new(Mutex::new(false)),
        }
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        self.set_failure(should_fail);
        self
    }

    pub fn set_failure(&self, should_fail: bool) {
        *self.should_fail.lock().unwrap() = should_fail;
    }

    pub fn get_records(&self) -> Vec<SubmissionRecord> {
        self.records.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<()> {
        if *self.should_fail.lock().unwrap() {
            return Err(Error::Database(
                "Server selection timeout: no available servers".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for MockSubmissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubmissionStore for MockSubmissionStore {
    async fn insert(&self, submission: Submission) -> Result<SubmissionRecord> {
        self.check_available()?;

        let record = SubmissionRecord {
            id: Uuid::new_v4().simple().to_string(),
            submission,
            version: 0,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<SubmissionRecord>> {
        self.check_available()?;
        Ok(self.get_records())
    }
}
