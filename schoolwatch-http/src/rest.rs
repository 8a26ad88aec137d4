//! REST client for a PostgREST-style record API and its object storage.
//!
//! ```text
//! GET    {base}/rest/v1/{collection}?select=*&{column}=eq.{value}
//! POST   {base}/rest/v1/{collection}            Prefer: return=representation
//! PATCH  {base}/rest/v1/{collection}?{filters}  Prefer: return=representation
//! POST   {base}/storage/v1/object/{bucket}/{path}
//! public {base}/storage/v1/object/public/{bucket}/{path}
//! ```

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use schoolwatch_core::models::camera::CameraDescriptor;
use schoolwatch_core::models::error::{StoreError, StreamError};
use schoolwatch_core::models::pickup::{AssetReference, MediaAsset};
use schoolwatch_core::traits::asset_store::AssetStore;
use schoolwatch_core::traits::camera_registry::CameraRegistry;
use schoolwatch_core::traits::record_store::{RecordQuery, RecordStore};

use crate::config::{parse_http_url, RestConfiguration};
use crate::error::BackendError;

const CAMERAS_COLLECTION: &str = "cameras";

/// Camera registry, asset store and record store over one HTTP client.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base: Url,
    api_key: String,
}

impl RestClient {
    pub fn new(config: &RestConfiguration) -> Result<Self, BackendError> {
        config.validate().map_err(BackendError::InvalidConfiguration)?;
        let base = parse_http_url(&config.base_url).map_err(BackendError::InvalidConfiguration)?;
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            base,
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Record endpoint for `collection` with the query encoded as
    /// PostgREST parameters.
    pub fn collection_url(&self, collection: &str, query: &RecordQuery) -> Result<Url, StoreError> {
        let mut url = self.endpoint(&["rest", "v1", collection])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for (column, value) in &query.filters {
                pairs.append_pair(column, &format!("eq.{}", value));
            }
            if let Some((column, descending)) = &query.order_by {
                let direction = if *descending { "desc" } else { "asc" };
                pairs.append_pair("order", &format!("{}.{}", column, direction));
            }
            if let Some(limit) = query.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    /// Upload endpoint for an object.
    pub fn object_url(&self, bucket: &str, path: &str) -> Result<Url, StoreError> {
        let mut segments = vec!["storage", "v1", "object", bucket];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(&segments)
    }

    /// Publicly readable address of an uploaded object.
    pub fn public_url(&self, bucket: &str, path: &str) -> Result<Url, StoreError> {
        let mut segments = vec!["storage", "v1", "object", "public", bucket];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(&segments)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Transport(format!("{} cannot be a base url", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch_rows(
        &self,
        collection: &str,
        query: &RecordQuery,
    ) -> Result<Vec<Value>, StoreError> {
        let url = self.collection_url(collection, query)?;
        log::debug!("GET {}", url);
        let response = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(transport)?;
        rows(read_json(response).await?)
    }
}

#[async_trait]
impl CameraRegistry for RestClient {
    async fn list(&self, school_id: &str) -> Result<Vec<CameraDescriptor>, StreamError> {
        let query = RecordQuery::new().eq("school_id", school_id);
        let rows = self
            .fetch_rows(CAMERAS_COLLECTION, &query)
            .await
            .map_err(|e| StreamError::Registry(e.to_string()))?;
        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| StreamError::Registry(format!("malformed camera row: {}", e)))
            })
            .collect()
    }
}

#[async_trait]
impl AssetStore for RestClient {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        asset: &MediaAsset,
    ) -> Result<AssetReference, StoreError> {
        let url = self.object_url(bucket, path)?;
        log::debug!("uploading {} bytes to {}", asset.data.len(), url);
        let response = self
            .authorized(self.http.post(url))
            .header(CONTENT_TYPE, &asset.content_type)
            .body(asset.data.clone())
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await?;

        Ok(AssetReference {
            bucket: bucket.to_string(),
            path: path.to_string(),
            public_url: self.public_url(bucket, path)?.to_string(),
        })
    }
}

#[async_trait]
impl RecordStore for RestClient {
    async fn insert(&self, collection: &str, record: Value) -> Result<Value, StoreError> {
        let url = self.endpoint(&["rest", "v1", collection])?;
        let response = self
            .authorized(self.http.post(url))
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await
            .map_err(transport)?;
        let stored = rows(read_json(response).await?)?;
        Ok(stored.into_iter().next().unwrap_or(record))
    }

    async fn update(
        &self,
        collection: &str,
        query: &RecordQuery,
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        if query.filters.is_empty() {
            return Err(StoreError::Transport(
                "refusing to update without a filter".into(),
            ));
        }
        let url = self.collection_url(collection, query)?;
        let response = self
            .authorized(self.http.patch(url))
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await
            .map_err(transport)?;
        rows(read_json(response).await?)
    }

    async fn select(
        &self,
        collection: &str,
        query: &RecordQuery,
    ) -> Result<Vec<Value>, StoreError> {
        self.fetch_rows(collection, query).await
    }
}

fn transport(error: reqwest::Error) -> StoreError {
    StoreError::Transport(error.to_string())
}

/// Check the status and decode the body. An empty body decodes to `null`.
async fn read_json(response: Response) -> Result<Value, StoreError> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;
    if !status.is_success() {
        return Err(StoreError::Status {
            code: status.as_u16(),
            body,
        });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
}

fn rows(value: Value) -> Result<Vec<Value>, StoreError> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        Value::Object(_) => Ok(vec![value]),
        other => Err(StoreError::Decode(format!("expected rows, got {}", other))),
    }
}
