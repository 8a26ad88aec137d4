use async_trait::async_trait;

use crate::models::error::StoreError;
use crate::models::pickup::{AssetReference, MediaAsset};

/// Binary object storage returning publicly resolvable references.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload `asset` to `bucket` at `path`, using the asset's content type.
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        asset: &MediaAsset,
    ) -> Result<AssetReference, StoreError>;
}
