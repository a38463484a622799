//! services/portal/src/adapters/storage.rs
//!
//! This module contains the object-store adapter, the concrete implementation
//! of the `ObjectStorage` port over the hosted bucket API.

use async_trait::async_trait;
use bytes::Bytes;
use mentorship_core::ports::{ObjectStorage, PortResult};
use reqwest::Method;
use serde_json::json;

use crate::adapters::supabase::SupabaseClient;

/// An adapter that implements the `ObjectStorage` port.
#[derive(Clone)]
pub struct SupabaseStorageAdapter {
    client: SupabaseClient,
}

impl SupabaseStorageAdapter {
    /// Creates a new `SupabaseStorageAdapter`.
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorageAdapter {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> PortResult<()> {
        let url = self
            .client
            .endpoint(&["storage", "v1", "object", bucket, path])?;
        let request = self
            .client
            .request(Method::POST, url)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(body);
        self.client.send(request).await.map(|_| ())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        match self
            .client
            .endpoint(&["storage", "v1", "object", "public", bucket, path])
        {
            Ok(url) => url.into(),
            Err(_) => format!(
                "{}/storage/v1/object/public/{}/{}",
                self.client.base().as_str().trim_end_matches('/'),
                bucket,
                path
            ),
        }
    }

    async fn remove(&self, bucket: &str, paths: &[String]) -> PortResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.client.endpoint(&["storage", "v1", "object", bucket])?;
        let request = self
            .client
            .request(Method::DELETE, url)
            .json(&json!({ "prefixes": paths }));
        self.client.send(request).await.map(|_| ())
    }
}
