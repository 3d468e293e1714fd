//! Attachments service
//!
//! Upload validation, uploading selected files and staging of attachment
//! deletions while an entry is being edited. Staged deletions are only
//! committed together with a successful entry update.

use crate::api::{DiaryApi, ObjectStorage};
use crate::config::{ALLOWED_ATTACHMENT_MIME_TYPES, MAX_ATTACHMENT_SIZE_BYTES, MAX_FILENAME_LENGTH};
use crate::database::{Attachment, CreateAttachmentRequest, MediaKind, PendingFile};
use crate::error::{AppError, Result};
use std::collections::BTreeSet;

/// Check a selected file against the size ceiling and MIME allow-list
pub fn validate_upload(file: &PendingFile) -> Result<MediaKind> {
    if file.size() > MAX_ATTACHMENT_SIZE_BYTES {
        return Err(AppError::AttachmentRejected {
            filename: file.filename.clone(),
            reason: format!(
                "file is {} bytes, the limit is {} bytes",
                file.size(),
                MAX_ATTACHMENT_SIZE_BYTES
            ),
        });
    }

    let mime_type = file.mime_type.trim().to_ascii_lowercase();
    if !ALLOWED_ATTACHMENT_MIME_TYPES.contains(&mime_type.as_str()) {
        return Err(AppError::AttachmentRejected {
            filename: file.filename.clone(),
            reason: format!("type {} is not allowed", file.mime_type),
        });
    }

    MediaKind::from_mime(&mime_type).ok_or_else(|| AppError::AttachmentRejected {
        filename: file.filename.clone(),
        reason: format!("type {} is not an image or video", file.mime_type),
    })
}

/// Upload one file for an entry and record the attachment.
///
/// The file is validated again before it reaches storage.
pub async fn upload_file(
    api: &dyn DiaryApi,
    storage: &dyn ObjectStorage,
    entry_id: i64,
    file: &PendingFile,
) -> Result<Attachment> {
    validate_upload(file)?;

    let url = storage.upload(file).await?;
    let size = i64::try_from(file.size())
        .map_err(|_| AppError::Validation(format!("{} is too large", file.filename)))?;

    let attachment = api
        .create_attachment(CreateAttachmentRequest {
            entry_id,
            url,
            filename: sanitize_filename(&file.filename),
            mime_type: file.mime_type.trim().to_ascii_lowercase(),
            size,
        })
        .await?;

    tracing::info!("Attachment {} created for entry {}", attachment.id, entry_id);
    Ok(attachment)
}

/// Strip path separators and cap the length of a client-supplied filename
fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| *c != '/' && *c != '\\' && *c != '\0')
        .take(MAX_FILENAME_LENGTH)
        .collect()
}

/// Result of a delete request on an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRequest {
    /// Held until the owning entry update is committed
    Staged,
    /// Applied right away because no update is pending
    Deleted,
}

/// Visible attachments of one entry plus the deletions staged against them
#[derive(Debug, Clone, Default)]
pub struct AttachmentStaging {
    visible: Vec<Attachment>,
    staged: BTreeSet<i64>,
    editing: bool,
}

impl AttachmentStaging {
    /// Staging for an entry opened in the editor
    pub fn editing(attachments: Vec<Attachment>) -> Self {
        Self {
            visible: attachments,
            staged: BTreeSet::new(),
            editing: true,
        }
    }

    /// Attachments shown outside the editor; deletions apply immediately
    pub fn viewing(attachments: Vec<Attachment>) -> Self {
        Self {
            visible: attachments,
            staged: BTreeSet::new(),
            editing: false,
        }
    }

    pub fn visible(&self) -> &[Attachment] {
        &self.visible
    }

    pub fn staged(&self) -> impl Iterator<Item = i64> + '_ {
        self.staged.iter().copied()
    }

    pub fn is_staged(&self, id: i64) -> bool {
        self.staged.contains(&id)
    }

    pub fn has_staged(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    fn contains(&self, id: i64) -> bool {
        self.visible.iter().any(|a| a.id == id)
    }

    /// Stage one of the visible attachments for deletion
    pub fn mark_for_deletion(&mut self, id: i64) -> Result<()> {
        if !self.contains(id) {
            return Err(AppError::AttachmentNotFound(id));
        }

        if self.staged.insert(id) {
            tracing::debug!("Attachment {} staged for deletion", id);
        }
        Ok(())
    }

    pub fn unmark_for_deletion(&mut self, id: i64) {
        if self.staged.remove(&id) {
            tracing::debug!("Attachment {} unstaged", id);
        }
    }

    /// Stage the deletion in edit mode, otherwise delete immediately.
    ///
    /// Only attachments in `visible` can be deleted through the staging.
    pub async fn request_delete(&mut self, api: &dyn DiaryApi, id: i64) -> Result<DeleteRequest> {
        if self.editing {
            self.mark_for_deletion(id)?;
            return Ok(DeleteRequest::Staged);
        }

        if !self.contains(id) {
            return Err(AppError::AttachmentNotFound(id));
        }

        api.delete_attachment(id).await?;
        self.visible.retain(|a| a.id != id);

        tracing::info!("Attachment {} deleted", id);
        Ok(DeleteRequest::Deleted)
    }

    /// Delete every staged attachment of `entry_id`.
    ///
    /// Any failure aborts and leaves `visible` and the staged set untouched.
    /// An attachment the collaborator no longer knows counts as deleted, so
    /// a retry after a partial failure goes through.
    pub async fn commit(&mut self, api: &dyn DiaryApi, entry_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = self
            .visible
            .iter()
            .filter(|a| a.entry_id == entry_id && self.staged.contains(&a.id))
            .map(|a| a.id)
            .collect();
        if ids.is_empty() {
            return Ok(ids);
        }

        tracing::info!(
            "Committing {} staged attachment deletions for entry {}",
            ids.len(),
            entry_id
        );

        for id in &ids {
            match api.delete_attachment(*id).await {
                Ok(()) => {}
                Err(AppError::AttachmentNotFound(_)) => {
                    tracing::debug!("Attachment {} was already deleted", id);
                }
                Err(e) => {
                    tracing::warn!("Failed to delete attachment {}: {}", id, e);
                    return Err(e);
                }
            }
        }

        self.visible.retain(|a| !ids.contains(&a.id));
        for id in &ids {
            self.staged.remove(id);
        }

        Ok(ids)
    }

    /// Append an attachment uploaded after a commit
    pub fn push_visible(&mut self, attachment: Attachment) {
        self.visible.push(attachment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, CreateEntryRequest, Repository, TemplateFields};
    use crate::services::local_api::LocalDiaryApi;
    use crate::storage::BlobStore;
    use chrono::NaiveDate;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    async fn create_test_api() -> (LocalDiaryApi, SqlitePool) {
        let pool = create_memory_pool().await.unwrap();
        let api = LocalDiaryApi::with_statistics_generator(Repository::new(pool.clone()));
        (api, pool)
    }

    async fn create_test_store() -> (BlobStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = BlobStore::new(temp_dir.path().join("blobs"), "https://media.example");
        store.initialize().await.unwrap();
        (store, temp_dir)
    }

    async fn entry_with_attachments(
        api: &LocalDiaryApi,
        store: &BlobStore,
        count: usize,
    ) -> (i64, Vec<Attachment>) {
        let entry = api
            .create_entry(CreateEntryRequest {
                child_id: None,
                entry_date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
                title: "Beach".to_string(),
                guardian_mood: None,
                child_mood: None,
                tags: vec![],
                fields: TemplateFields::FreeForm {
                    content: "Sand".to_string(),
                },
            })
            .await
            .unwrap();

        let mut attachments = Vec::with_capacity(count);
        for i in 0..count {
            let file = PendingFile::new(format!("photo{}.jpg", i), "image/jpeg", vec![i as u8; 16]);
            attachments.push(upload_file(api, store, entry.id, &file).await.unwrap());
        }

        (entry.id, attachments)
    }

    /// Make the database refuse deleting one attachment row
    async fn lock_attachment(pool: &SqlitePool, id: i64) {
        sqlx::query(&format!(
            "CREATE TRIGGER lock_attachment BEFORE DELETE ON attachments WHEN OLD.id = {} \
             BEGIN SELECT RAISE(ABORT, 'attachment locked'); END",
            id
        ))
        .execute(pool)
        .await
        .unwrap();
    }

    async fn unlock_attachment(pool: &SqlitePool) {
        sqlx::query("DROP TRIGGER lock_attachment")
            .execute(pool)
            .await
            .unwrap();
    }

    fn visible_ids(staging: &AttachmentStaging) -> Vec<i64> {
        staging.visible().iter().map(|x| x.id).collect()
    }

    async fn stored_ids(api: &LocalDiaryApi, entry_id: i64) -> Vec<i64> {
        api.list_attachments(entry_id)
            .await
            .unwrap()
            .iter()
            .map(|x| x.id)
            .collect()
    }

    #[test]
    fn test_validate_upload_limits() {
        let ok = PendingFile::new("a.png", "image/png", vec![0; 10]);
        assert_eq!(validate_upload(&ok).unwrap(), MediaKind::Image);

        let video = PendingFile::new("a.mov", "Video/QuickTime", vec![0; 10]);
        assert_eq!(validate_upload(&video).unwrap(), MediaKind::Video);

        let at_limit = PendingFile::new("big.mp4", "video/mp4", vec![0; MAX_ATTACHMENT_SIZE_BYTES]);
        assert!(validate_upload(&at_limit).is_ok());

        let too_big =
            PendingFile::new("huge.mp4", "video/mp4", vec![0; MAX_ATTACHMENT_SIZE_BYTES + 1]);
        assert!(matches!(
            validate_upload(&too_big),
            Err(AppError::AttachmentRejected { .. })
        ));

        let wrong_type = PendingFile::new("notes.pdf", "application/pdf", vec![0; 10]);
        let err = validate_upload(&wrong_type).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("notes.pdf"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("normal.jpg"), "normal.jpg");
        assert_eq!(sanitize_filename("../../../etc/passwd"), "......etcpasswd");
        assert_eq!(sanitize_filename("file\\name.png"), "filename.png");
    }

    #[tokio::test]
    async fn test_unmarked_attachment_survives_commit() {
        let (api, _pool) = create_test_api().await;
        let (store, _temp) = create_test_store().await;
        let (entry_id, attachments) = entry_with_attachments(&api, &store, 2).await;
        let (a, b) = (attachments[0].id, attachments[1].id);

        let mut staging = AttachmentStaging::editing(attachments);
        staging.mark_for_deletion(a).unwrap();
        staging.mark_for_deletion(b).unwrap();
        staging.mark_for_deletion(b).unwrap();
        staging.unmark_for_deletion(a);
        staging.unmark_for_deletion(a);

        let committed = staging.commit(&api, entry_id).await.unwrap();
        assert_eq!(committed, vec![b]);

        assert_eq!(visible_ids(&staging), vec![a]);
        assert!(!staging.has_staged());
        assert_eq!(stored_ids(&api, entry_id).await, vec![a]);
    }

    #[tokio::test]
    async fn test_failed_commit_can_be_retried() {
        let (api, pool) = create_test_api().await;
        let (store, _temp) = create_test_store().await;
        let (entry_id, attachments) = entry_with_attachments(&api, &store, 3).await;
        let (a, b, c) = (attachments[0].id, attachments[1].id, attachments[2].id);

        let mut staging = AttachmentStaging::editing(attachments);
        staging.mark_for_deletion(a).unwrap();
        staging.mark_for_deletion(b).unwrap();
        lock_attachment(&pool, b).await;

        let result = staging.commit(&api, entry_id).await;
        assert!(matches!(result, Err(AppError::Database(_))));

        assert_eq!(visible_ids(&staging), vec![a, b, c]);
        assert!(staging.is_staged(a));
        assert!(staging.is_staged(b));
        assert_eq!(stored_ids(&api, entry_id).await, vec![b, c]);

        unlock_attachment(&pool).await;
        let committed = staging.commit(&api, entry_id).await.unwrap();

        assert_eq!(committed, vec![a, b]);
        assert_eq!(visible_ids(&staging), vec![c]);
        assert_eq!(stored_ids(&api, entry_id).await, vec![c]);
    }

    #[tokio::test]
    async fn test_commit_treats_missing_attachment_as_deleted() {
        let (api, _pool) = create_test_api().await;
        let (store, _temp) = create_test_store().await;
        let (entry_id, attachments) = entry_with_attachments(&api, &store, 2).await;
        let (a, b) = (attachments[0].id, attachments[1].id);

        let mut staging = AttachmentStaging::editing(attachments);
        staging.mark_for_deletion(a).unwrap();
        staging.mark_for_deletion(b).unwrap();

        // Removed elsewhere while the editor was open
        api.delete_attachment(a).await.unwrap();

        let committed = staging.commit(&api, entry_id).await.unwrap();
        assert_eq!(committed, vec![a, b]);
        assert!(staging.visible().is_empty());
        assert!(stored_ids(&api, entry_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_staging_is_limited_to_visible_attachments() {
        let (api, _pool) = create_test_api().await;
        let (store, _temp) = create_test_store().await;
        let (entry_id, attachments) = entry_with_attachments(&api, &store, 1).await;
        let (other_entry, other) = entry_with_attachments(&api, &store, 1).await;
        let foreign = other[0].id;

        let mut staging = AttachmentStaging::editing(attachments);
        assert!(matches!(
            staging.mark_for_deletion(foreign),
            Err(AppError::AttachmentNotFound(id)) if id == foreign
        ));
        assert!(matches!(
            staging.request_delete(&api, foreign).await,
            Err(AppError::AttachmentNotFound(_))
        ));
        assert!(!staging.has_staged());

        let committed = staging.commit(&api, entry_id).await.unwrap();
        assert!(committed.is_empty());
        assert_eq!(stored_ids(&api, other_entry).await, vec![foreign]);
    }

    #[tokio::test]
    async fn test_commit_ignores_attachments_of_other_entries() {
        let (api, _pool) = create_test_api().await;
        let (store, _temp) = create_test_store().await;
        let (entry_id, attachments) = entry_with_attachments(&api, &store, 1).await;
        let (other_entry, _) = entry_with_attachments(&api, &store, 0).await;
        let a = attachments[0].id;

        let mut staging = AttachmentStaging::editing(attachments);
        staging.mark_for_deletion(a).unwrap();

        let committed = staging.commit(&api, other_entry).await.unwrap();
        assert!(committed.is_empty());
        assert!(staging.is_staged(a));
        assert_eq!(stored_ids(&api, entry_id).await, vec![a]);
    }

    #[tokio::test]
    async fn test_delete_outside_edit_mode_is_immediate() {
        let (api, _pool) = create_test_api().await;
        let (store, _temp) = create_test_store().await;
        let (entry_id, attachments) = entry_with_attachments(&api, &store, 1).await;
        let a = attachments[0].id;

        let mut staging = AttachmentStaging::viewing(attachments);
        let outcome = staging.request_delete(&api, a).await.unwrap();

        assert_eq!(outcome, DeleteRequest::Deleted);
        assert!(staging.visible().is_empty());
        assert!(!staging.has_staged());
        assert!(api.list_attachments(entry_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_immediate_delete_refuses_unknown_attachment() {
        let (api, _pool) = create_test_api().await;
        let (store, _temp) = create_test_store().await;
        let (_, attachments) = entry_with_attachments(&api, &store, 1).await;
        let (other_entry, other) = entry_with_attachments(&api, &store, 1).await;

        let mut staging = AttachmentStaging::viewing(attachments);
        let result = staging.request_delete(&api, other[0].id).await;

        assert!(matches!(result, Err(AppError::AttachmentNotFound(_))));
        assert_eq!(staging.visible().len(), 1);
        assert_eq!(stored_ids(&api, other_entry).await, vec![other[0].id]);
    }

    #[tokio::test]
    async fn test_delete_in_edit_mode_is_staged() {
        let (api, _pool) = create_test_api().await;
        let (store, _temp) = create_test_store().await;
        let (entry_id, attachments) = entry_with_attachments(&api, &store, 1).await;
        let a = attachments[0].id;

        let mut staging = AttachmentStaging::editing(attachments);
        let outcome = staging.request_delete(&api, a).await.unwrap();

        assert_eq!(outcome, DeleteRequest::Staged);
        assert_eq!(staging.visible().len(), 1);
        assert_eq!(api.list_attachments(entry_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_before_network() {
        let (api, _pool) = create_test_api().await;
        let (store, _temp) = create_test_store().await;
        let (entry_id, _) = entry_with_attachments(&api, &store, 0).await;

        let file = PendingFile::new("doc.txt", "text/plain", b"hi".to_vec());
        let result = upload_file(&api, &store, entry_id, &file).await;

        assert!(matches!(result, Err(AppError::AttachmentRejected { .. })));
        assert!(api.list_attachments(entry_id).await.unwrap().is_empty());
    }
}
