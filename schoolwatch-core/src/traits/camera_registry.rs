use async_trait::async_trait;

use crate::models::camera::CameraDescriptor;
use crate::models::error::StreamError;

/// Source of the cameras installed at a school.
#[async_trait]
pub trait CameraRegistry: Send + Sync {
    async fn list(&self, school_id: &str) -> Result<Vec<CameraDescriptor>, StreamError>;
}
