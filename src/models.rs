//! Data models and structures
//!
//! Defines the submission record, the HTTP response bodies, and the
//! environment-driven configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Form fields plus the uploaded image reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<f64>,
    /// Public URL of the uploaded image, empty when no file was attached.
    #[serde(default)]
    pub image: String,
}

impl Submission {
    /// Coerce raw form values into a typed submission.
    ///
    /// Unknown keys are ignored. Numeric fields accept surrounding
    /// whitespace and treat empty text as absent.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            name: fields.get("name").cloned(),
            age: number_field(fields, "age")?,
            team: fields.get("team").cloned(),
            gender: fields.get("gender").cloned(),
            language: fields.get("language").cloned(),
            experience: number_field(fields, "experience")?,
            image: String::new(),
        })
    }

    pub fn with_image(mut self, image: String) -> Self {
        self.image = image;
        self
    }
}

fn number_field(fields: &HashMap<String, String>, path: &str) -> Result<Option<f64>> {
    let Some(raw) = fields.get(path) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(Error::Cast {
            kind: "Number",
            path: path.to_string(),
            value: raw.clone(),
        }),
    }
}

/// A persisted submission with its store-generated metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub submission: Submission,
    #[serde(rename = "__v", default)]
    pub version: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub message: String,
    pub data: SubmissionRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: String,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub mongodb_uri: String,
    pub mongodb_db_name: String,
    pub object_store_access_key_id: Option<String>,
    pub object_store_secret_access_key: Option<String>,
    pub object_store_bucket: Option<String>,
    pub object_store_endpoint: String,
    pub object_store_region: String,
    pub object_store_base_url: Option<String>,
    pub object_store_folder: String,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
    pub dry_run: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                Error::Config(format!("MAX_UPLOAD_BYTES is not a byte count: {}", raw))
            })?,
            None => 10 * 1024 * 1024,
        };

        Ok(Self {
            mongodb_uri: lookup("MONGODB_URI")
                .ok_or_else(|| Error::Config("MONGODB_URI not set".to_string()))?,
            mongodb_db_name: lookup("MONGODB_DB_NAME").unwrap_or_else(|| "formdata".to_string()),
            object_store_access_key_id: lookup("OBJECT_STORE_ACCESS_KEY_ID"),
            object_store_secret_access_key: lookup("OBJECT_STORE_SECRET_ACCESS_KEY"),
            object_store_bucket: lookup("OBJECT_STORE_BUCKET"),
            object_store_endpoint: lookup("OBJECT_STORE_ENDPOINT")
                .unwrap_or_else(|| "https://s3.amazonaws.com".to_string()),
            object_store_region: lookup("OBJECT_STORE_REGION")
                .unwrap_or_else(|| "us-east-1".to_string()),
            object_store_base_url: lookup("OBJECT_STORE_BASE_URL"),
            object_store_folder: lookup("OBJECT_STORE_FOLDER")
                .unwrap_or_else(|| "user_images".to_string()),
            cors_origin: lookup("CORS_ORIGIN")
                .unwrap_or_else(|| "http://127.0.0.1:5500".to_string()),
            max_upload_bytes,
            dry_run: lookup("DRY_RUN")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }

    /// Credentials that were not configured, by variable name.
    pub fn missing_object_store_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.object_store_access_key_id.is_none() {
            missing.push("OBJECT_STORE_ACCESS_KEY_ID");
        }
        if self.object_store_secret_access_key.is_none() {
            missing.push("OBJECT_STORE_SECRET_ACCESS_KEY");
        }
        if self.object_store_bucket.is_none() {
            missing.push("OBJECT_STORE_BUCKET");
        }
        missing
    }
}
