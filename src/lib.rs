//! Form submission service
//!
//! Accepts form data with an optional image, uploads the image to an
//! S3-compatible object store, and persists the record in MongoDB.

pub mod app;
pub mod docstore;
pub mod error;
pub mod handlers;
pub mod models;
pub mod objectstore;
pub mod upload;

pub use error::{Error, Result};
