use super::ObjectStore;
use crate::{Error, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{config::Region, types::ObjectCannedAcl, Client as S3Client};
use tracing::debug;

pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    base_url: String,
}

/// Connection settings for an S3-compatible store.
#[derive(Debug, Clone)]
pub struct S3Settings {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    /// Public URL prefix; defaults to `<endpoint>/<bucket>`.
    pub base_url: Option<String>,
}

impl S3ObjectStore {
    pub async fn new(settings: S3Settings) -> Result<Self> {
        let credentials = aws_sdk_s3::config::Credentials::new(
            settings.access_key_id,
            settings.secret_access_key,
            None,
            None,
            "submission-server",
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(settings.region))
            .endpoint_url(settings.endpoint.clone())
            .load()
            .await;

        // Path-style addressing keeps the bucket out of the hostname, which
        // self-hosted S3 implementations require.
        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();

        let base_url = settings.base_url.unwrap_or_else(|| {
            format!(
                "{}/{}",
                settings.endpoint.trim_end_matches('/'),
                settings.bucket
            )
        });

        Ok(Self {
            client: S3Client::from_conf(config),
            bucket: settings.bucket,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload_file(&self, key: &str, data: &[u8], content_type: &str) -> Result<String> {
        debug!(
            "Putting {} ({} bytes, {}) into bucket {}",
            key,
            data.len(),
            content_type,
            self.bucket
        );
        let body = ByteStream::from(data.to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| Error::ObjectStore(format!("Failed to upload file: {}", e)))?;

        Ok(self.get_public_url(key))
    }
}
