//! Screenshot persistence.
//!
//! A captured console image is stored under a generated file name and the
//! action's message becomes a reference to it: a URL path served by the HTTP
//! surface for [`LocalStore`], or an object URL for the S3 store.

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::Config;
use crate::error::Result;

pub use local::LocalStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

/// Errors raised while persisting a screenshot.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Writing to the local directory failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Target file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The object store rejected the upload.
    #[error("failed to upload data to {bucket}/{key}: {message}")]
    Upload {
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
        /// Error message
        message: String,
    },
}

/// Somewhere to keep screenshots.
#[async_trait]
pub trait ScreenshotStore: Send + Sync {
    /// Persist `payload` as `file_name` and return a reference to it.
    async fn persist(&self, payload: Vec<u8>, file_name: &str)
        -> std::result::Result<String, StoreError>;
}

/// `<host>-<hardware type>-<unix seconds>.<extension>`
pub fn file_name(host: &str, hardware_type: &str, extension: &str, at: DateTime<Utc>) -> String {
    format!("{host}-{hardware_type}-{}.{extension}", at.timestamp())
}

/// Build the store selected by configuration.
pub fn store_from_config(config: &Config) -> Result<Arc<dyn ScreenshotStore>> {
    if config.s3.enabled {
        #[cfg(feature = "s3")]
        {
            return Ok(Arc::new(S3Store::from_config(&config.s3)?));
        }
        #[cfg(not(feature = "s3"))]
        {
            return Err(crate::error::Error::config(
                "s3.enabled is set but bmc-actor was built without the `s3` feature",
            ));
        }
    }
    Ok(Arc::new(LocalStore::new(
        &config.screenshot.storage,
        &config.screenshot.url_prefix,
    )))
}
