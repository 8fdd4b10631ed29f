//! Object storage for studio logos and estimate PDFs.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use aws_sdk_s3::{config::Region, primitives::ByteStream};
use axum::body::Bytes;

use crate::{config::StorageConfig, error::AppError};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` and return its public URL.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, AppError>;
}

pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base_url: String,
}

impl S3Store {
    pub async fn from_config(config: &StorageConfig, bucket: &str) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            // MinIO and friends only speak path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = aws_sdk_s3::Client::from_conf(builder.build());

        let public_base_url = config.public_base_url.clone().unwrap_or_else(|| {
            match &config.endpoint {
                Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
                None => format!("https://{}.s3.{}.amazonaws.com", bucket, config.region),
            }
        });

        Self {
            client,
            bucket: bucket.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, AppError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("S3 upload failed: {e}")))?;

        tracing::info!(bucket = %self.bucket, key, size, "object stored");
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

/// Process-local store used when no bucket is configured, and in tests.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, (String, Bytes)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type and body stored under `key`.
    pub fn get(&self, key: &str) -> Option<(String, Bytes)> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<String, AppError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory store poisoned")))?;
        objects.insert(key.to_string(), (content_type.to_string(), body));
        Ok(format!("memory://{key}"))
    }
}
