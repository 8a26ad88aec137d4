use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::config::PickupConfiguration;
use crate::models::error::{PickupError, StoreError, UploadStage};
use crate::models::pickup::{
    AssetReference, MediaAsset, PickupRequest, PickupStatus, PickupSubmission, RecordedAsset,
};
use crate::traits::asset_store::AssetStore;
use crate::traits::record_store::{RecordQuery, RecordStore};

/// Borrowed view of a submission that passed validation.
struct ValidSubmission<'a> {
    requester_name: &'a str,
    requester_document: &'a str,
    photo: &'a MediaAsset,
    video: &'a RecordedAsset,
    student_id: &'a str,
}

/// Turns a completed pickup form into a pending consent record.
///
/// ```text
/// validate → upload photo → upload video → insert pending record
/// ```
///
/// Steps run strictly in order and stop at the first failure. Nothing is
/// rolled back; assets uploaded before a failure are reported as orphaned.
pub struct UploadPipeline<A: AssetStore, R: RecordStore> {
    assets: A,
    records: R,
    config: PickupConfiguration,
}

impl<A: AssetStore, R: RecordStore> UploadPipeline<A, R> {
    pub fn new(assets: A, records: R, config: PickupConfiguration) -> Result<Self, PickupError> {
        config.validate().map_err(PickupError::ConfigurationFailed)?;
        Ok(Self {
            assets,
            records,
            config,
        })
    }

    pub fn asset_store(&self) -> &A {
        &self.assets
    }

    pub fn record_store(&self) -> &R {
        &self.records
    }

    pub fn config(&self) -> &PickupConfiguration {
        &self.config
    }

    /// Validate, upload both assets, then persist the request as `pending`.
    ///
    /// The submission is only borrowed, so the caller still has every field
    /// after a failure and can resubmit.
    pub async fn submit(
        &self,
        submission: &PickupSubmission,
    ) -> Result<PickupRequest, PickupError> {
        let valid = validate(submission)?;
        let created_at = Utc::now();

        let photo_path = object_path(
            &self.config.photo_prefix,
            valid.student_id,
            created_at,
            valid.photo.extension(),
        );
        let photo_ref = self
            .assets
            .upload(&self.config.photo_bucket, &photo_path, valid.photo)
            .await
            .map_err(|source| upload_failed(UploadStage::Photo, Vec::new(), source))?;
        log::debug!("pickup photo stored at {}", photo_ref.path);

        // Tagged with the type the recorder actually produced.
        let video = valid.video.to_media_asset();
        let video_path = object_path(
            &self.config.video_prefix,
            valid.student_id,
            created_at,
            video.extension(),
        );
        let video_ref = self
            .assets
            .upload(&self.config.video_bucket, &video_path, &video)
            .await
            .map_err(|source| upload_failed(UploadStage::Video, vec![photo_ref.clone()], source))?;
        log::debug!("pickup video stored at {}", video_ref.path);

        let request = PickupRequest {
            id: Uuid::new_v4().to_string(),
            requester_name: valid.requester_name.to_string(),
            requester_document: valid.requester_document.to_string(),
            photo_url: photo_ref.public_url.clone(),
            video_url: video_ref.public_url.clone(),
            student_id: valid.student_id.to_string(),
            status: PickupStatus::Pending,
            created_at,
            video_sha256: Some(valid.video.checksum.clone()),
        };
        let record =
            serde_json::to_value(&request).map_err(|e| PickupError::Encoding(e.to_string()))?;

        let stored = self
            .records
            .insert(&self.config.requests_collection, record)
            .await
            .map_err(|source| {
                upload_failed(UploadStage::Record, vec![photo_ref, video_ref], source)
            })?;

        log::info!(
            "pickup request {} created for student {}",
            request.id,
            request.student_id
        );
        // Prefer the stored row; fall back to what was sent when the store
        // returns a partial representation.
        match serde_json::from_value(stored) {
            Ok(stored) => Ok(stored),
            Err(e) => {
                log::debug!(
                    "stored pickup request {} did not decode, keeping submitted fields: {}",
                    request.id,
                    e
                );
                Ok(request)
            }
        }
    }

    /// Existing consent requests for a student, newest first.
    pub async fn requests_for_student(
        &self,
        student_id: &str,
    ) -> Result<Vec<PickupRequest>, StoreError> {
        let query = RecordQuery::new()
            .eq("student_id", student_id)
            .order_desc("created_at");
        self.records
            .select(&self.config.requests_collection, &query)
            .await?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| StoreError::Decode(e.to_string())))
            .collect()
    }
}

fn validate(submission: &PickupSubmission) -> Result<ValidSubmission<'_>, PickupError> {
    let requester_name = non_blank(&submission.requester_name);
    let requester_document = non_blank(&submission.requester_document);
    let photo = submission.photo.as_ref().filter(|p| !p.is_empty());
    let video = submission.video.as_ref().filter(|v| !v.data.is_empty());
    let student_id = non_blank(&submission.student_id);

    match (requester_name, requester_document, photo, video, student_id) {
        (
            Some(requester_name),
            Some(requester_document),
            Some(photo),
            Some(video),
            Some(student_id),
        ) => Ok(ValidSubmission {
            requester_name,
            requester_document,
            photo,
            video,
            student_id,
        }),
        _ => {
            let missing = [
                ("requester_name", requester_name.is_none()),
                ("requester_document", requester_document.is_none()),
                ("photo", photo.is_none()),
                ("video", video.is_none()),
                ("student_id", student_id.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            Err(PickupError::Validation { missing })
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `{prefix}/{student}/{unix_millis}-{uuid}.{ext}`; an empty prefix is left out.
fn object_path(prefix: &str, student_id: &str, at: DateTime<Utc>, extension: &str) -> String {
    let name = format!("{}-{}.{}", at.timestamp_millis(), Uuid::new_v4(), extension);
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}/{}", student_id, name)
    } else {
        format!("{}/{}/{}", prefix, student_id, name)
    }
}

fn upload_failed(
    stage: UploadStage,
    orphaned: Vec<AssetReference>,
    source: StoreError,
) -> PickupError {
    if orphaned.is_empty() {
        log::warn!("pickup {} failed: {}", stage, source);
    } else {
        let paths: Vec<&str> = orphaned.iter().map(|r| r.path.as_str()).collect();
        log::warn!(
            "pickup {} failed: {}; left orphaned: {}",
            stage,
            source,
            paths.join(", ")
        );
    }
    PickupError::Upload {
        stage,
        orphaned,
        source,
    }
}
