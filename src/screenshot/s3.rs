//! Screenshots uploaded to an S3-compatible object store.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use super::{ScreenshotStore, StoreError};
use crate::config::S3Config;
use crate::error::{Error, Result};

/// Uploads screenshots to `<bucket>/<folder>/<file name>`.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    folder: String,
    endpoint: String,
    acl: Option<ObjectCannedAcl>,
}

impl S3Store {
    /// Build a store from the `[s3]` configuration section.
    pub fn from_config(config: &S3Config) -> Result<Self> {
        if config.bucket.is_empty() {
            return Err(Error::config("s3.bucket must be set when s3 is enabled"));
        }
        if config.endpoint.is_empty() {
            return Err(Error::config("s3.endpoint must be set when s3 is enabled"));
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "bmc-actor",
        );
        let sdk_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let acl = (!config.acl.is_empty()).then(|| ObjectCannedAcl::from(config.acl.as_str()));

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket.clone(),
            folder: config.folder.trim_matches('/').to_string(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            acl,
        })
    }

    fn key(&self, file_name: &str) -> String {
        if self.folder.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.folder, file_name)
        }
    }
}

/// MIME type for an object, from its file extension.
fn content_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

#[async_trait]
impl ScreenshotStore for S3Store {
    async fn persist(&self, payload: Vec<u8>, file_name: &str) -> std::result::Result<String, StoreError> {
        let key = self.key(file_name);
        let upload_error = |message: String| StoreError::Upload {
            bucket: self.bucket.clone(),
            key: key.clone(),
            message,
        };

        // The bucket may already exist; only the upload decides success.
        if let Err(err) = self.client.create_bucket().bucket(&self.bucket).send().await {
            debug!(bucket = %self.bucket, error = %err, "create bucket failed");
        }

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type(file_name))
            .content_length(payload.len() as i64)
            .body(ByteStream::from(payload));
        if let Some(acl) = &self.acl {
            request = request.acl(acl.clone());
        }
        request
            .send()
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        let url = format!("{}/{}/{}", self.endpoint, self.bucket, key);
        info!(url = %url, "uploaded screenshot");
        Ok(url)
    }
}
