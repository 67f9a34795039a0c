use super::ObjectStore;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory object store used for dry runs and tests.
///
/// Returned URLs point at `base_url` and are never served. Dry runs are
/// meant for local use; pair them with a throwaway database.
#[derive(Clone)]
pub struct MockObjectStore {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    base_url: String,
    upload_count: Arc<Mutex<usize>>,
    should_fail: Arc<Mutex<bool>>,
    keep_contents: bool,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            base_url: "https://mock-objects.example.com".to_string(),
            upload_count: Arc::new(Mutex::new(0)),
            should_fail: Arc::new(Mutex::new(false)),
            keep_contents: true,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Record uploaded keys only, dropping the bytes.
    pub fn without_contents(mut self) -> Self {
        self.keep_contents = false;
        self
    }

    pub fn with_failure(self, should_fail: bool) -> Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    pub fn get_upload_count(&self) -> usize {
        *self.upload_count.lock().unwrap()
    }

    pub fn get_files(&self) -> HashMap<String, Vec<u8>> {
        self.files.lock().unwrap().clone()
    }
}

impl Default for MockObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn upload_file(&self, key: &str, data: &[u8], _content_type: &str) -> Result<String> {
        if *self.should_fail.lock().unwrap() {
            return Err(Error::ObjectStore("Mock upload failure".to_string()));
        }

        *self.upload_count.lock().unwrap() += 1;
        let contents = if self.keep_contents {
            data.to_vec()
        } else {
            Vec::new()
        };
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), contents);
        Ok(format!("{}/{}", self.base_url, key))
    }
}
