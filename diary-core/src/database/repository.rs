//! Repository layer for database operations
//!
//! CRUD operations for entries, drafts, attachments and insights.
//! Rows are decoded into domain models before leaving this module.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::SqlitePool;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ===== Entries =====

    /// Create a new entry
    pub async fn create_entry(&self, req: CreateEntryRequest) -> Result<Entry> {
        let now = Utc::now();

        let row = sqlx::query_as::<_, EntryRow>(
            r#"
            INSERT INTO entries (child_id, entry_date, title, template_kind, guardian_mood,
                                 child_mood, tags_json, fields_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(req.child_id)
        .bind(req.entry_date)
        .bind(&req.title)
        .bind(req.fields.kind().as_str())
        .bind(req.guardian_mood.map(|m| m.as_str()))
        .bind(req.child_mood.map(|m| m.as_str()))
        .bind(serde_json::to_string(&req.tags)?)
        .bind(serde_json::to_string(&req.fields)?)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created entry: {}", row.id);
        row.try_into()
    }

    /// Get an entry by ID
    pub async fn get_entry(&self, id: i64) -> Result<Entry> {
        sqlx::query_as::<_, EntryRow>("SELECT * FROM entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::EntryNotFound(id))?
            .try_into()
    }

    /// List entries, newest date first, optionally limited to a date span
    pub async fn list_entries(&self, span: Option<DateSpan>) -> Result<Vec<Entry>> {
        let rows = match span {
            Some(span) => {
                sqlx::query_as::<_, EntryRow>(
                    r#"
                    SELECT * FROM entries
                    WHERE entry_date >= ? AND entry_date <= ?
                    ORDER BY entry_date DESC, id DESC
                    "#,
                )
                .bind(span.start)
                .bind(span.end)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, EntryRow>(
                    "SELECT * FROM entries ORDER BY entry_date DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Entry::try_from).collect()
    }

    /// Update an entry. The template kind is fixed at creation.
    pub async fn update_entry(&self, req: UpdateEntryRequest) -> Result<Entry> {
        let existing = self.get_entry(req.id).await?;
        if existing.template_kind() != req.fields.kind() {
            return Err(AppError::TemplateLocked);
        }

        let rows_affected = sqlx::query(
            r#"
            UPDATE entries
            SET child_id = ?, entry_date = ?, title = ?, guardian_mood = ?, child_mood = ?,
                tags_json = ?, fields_json = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(req.child_id)
        .bind(req.entry_date)
        .bind(&req.title)
        .bind(req.guardian_mood.map(|m| m.as_str()))
        .bind(req.child_mood.map(|m| m.as_str()))
        .bind(serde_json::to_string(&req.tags)?)
        .bind(serde_json::to_string(&req.fields)?)
        .bind(Utc::now())
        .bind(req.id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::EntryNotFound(req.id));
        }

        tracing::debug!("Updated entry: {}", req.id);
        self.get_entry(req.id).await
    }

    /// Delete an entry together with its attachment records
    pub async fn delete_entry(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let attachments = sqlx::query("DELETE FROM attachments WHERE entry_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let rows = sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if rows == 0 {
            tx.rollback().await?;
            return Err(AppError::EntryNotFound(id));
        }

        tx.commit().await?;

        tracing::debug!("Deleted entry: {} ({} attachments)", id, attachments);
        Ok(())
    }

    // ===== Drafts =====

    /// Create a draft
    pub async fn create_draft(&self, req: CreateDraftRequest) -> Result<Draft> {
        let now = Utc::now();

        let row = sqlx::query_as::<_, DraftRow>(
            r#"
            INSERT INTO drafts (title, entry_type, child_id, entry_date, guardian_mood,
                                child_mood, tags_json, fields_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&req.title)
        .bind(req.fields.kind().as_str())
        .bind(req.child_id)
        .bind(req.entry_date)
        .bind(req.guardian_mood.map(|m| m.as_str()))
        .bind(req.child_mood.map(|m| m.as_str()))
        .bind(serde_json::to_string(&req.tags)?)
        .bind(serde_json::to_string(&req.fields)?)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created draft: {}", row.id);
        row.try_into()
    }

    /// Get a draft by ID
    pub async fn get_draft(&self, id: i64) -> Result<Draft> {
        sqlx::query_as::<_, DraftRow>("SELECT * FROM drafts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::DraftNotFound(id))?
            .try_into()
    }

    /// List drafts, most recently touched first
    pub async fn list_drafts(&self) -> Result<Vec<Draft>> {
        let rows = sqlx::query_as::<_, DraftRow>(
            "SELECT * FROM drafts ORDER BY updated_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Draft::try_from).collect()
    }

    /// Delete a draft
    pub async fn delete_draft(&self, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM drafts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::DraftNotFound(id));
        }

        tracing::debug!("Deleted draft: {}", id);
        Ok(())
    }

    // ===== Attachments =====

    /// Create an attachment record for an uploaded file
    pub async fn create_attachment(&self, req: CreateAttachmentRequest) -> Result<Attachment> {
        let media_kind = MediaKind::from_mime(&req.mime_type).ok_or_else(|| {
            AppError::Validation(format!("Unsupported media type: {}", req.mime_type))
        })?;

        let row = sqlx::query_as::<_, AttachmentRow>(
            r#"
            INSERT INTO attachments
                (entry_id, url, filename, mime_type, media_kind, size, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(req.entry_id)
        .bind(&req.url)
        .bind(&req.filename)
        .bind(&req.mime_type)
        .bind(media_kind.as_str())
        .bind(req.size)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created attachment: {} for entry: {}", row.id, req.entry_id);
        row.try_into()
    }

    /// List attachments for an entry in upload order
    pub async fn list_attachments(&self, entry_id: i64) -> Result<Vec<Attachment>> {
        let rows = sqlx::query_as::<_, AttachmentRow>(
            "SELECT * FROM attachments WHERE entry_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Attachment::try_from).collect()
    }

    /// Delete an attachment, returning the removed record
    pub async fn delete_attachment(&self, id: i64) -> Result<Attachment> {
        let attachment: Attachment =
            sqlx::query_as::<_, AttachmentRow>("SELECT * FROM attachments WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(AppError::AttachmentNotFound(id))?
                .try_into()?;

        sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Deleted attachment: {}", id);
        Ok(attachment)
    }

    // ===== Insights =====

    /// Store a freshly generated insight. The requester is viewing it, so it
    /// starts out read and unsaved.
    pub async fn insert_insight(&self, insight: NewInsight) -> Result<Insight> {
        let (month, year, week_start, week_end) = match insight.period {
            InsightPeriod::Month { month, year } => {
                (Some(i64::from(month)), Some(i64::from(year)), None, None)
            }
            InsightPeriod::Week { start, end } => (None, None, Some(start), Some(end)),
        };

        let row = sqlx::query_as::<_, InsightRow>(
            r#"
            INSERT INTO insights (child_id, granularity, month, year, week_start, week_end,
                                  content, sections_json, saved, read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 1, ?)
            RETURNING *
            "#,
        )
        .bind(insight.child_id)
        .bind(insight.period.granularity().as_str())
        .bind(month)
        .bind(year)
        .bind(week_start)
        .bind(week_end)
        .bind(&insight.content)
        .bind(serde_json::to_string(&insight.sections)?)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Stored insight: {}", row.id);
        row.try_into()
    }

    /// Get an insight by ID
    pub async fn get_insight(&self, id: i64) -> Result<Insight> {
        sqlx::query_as::<_, InsightRow>("SELECT * FROM insights WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::InsightNotFound(id))?
            .try_into()
    }

    /// List insights of one granularity, newest first.
    ///
    /// `child_id = None` lists insights for every child and the aggregates.
    pub async fn list_insights(
        &self,
        granularity: Granularity,
        child_id: Option<i64>,
        saved_only: bool,
    ) -> Result<Vec<Insight>> {
        let mut query = "SELECT * FROM insights WHERE granularity = ?".to_string();

        if child_id.is_some() {
            query.push_str(" AND child_id = ?");
        }
        if saved_only {
            query.push_str(" AND saved = 1");
        }
        query.push_str(" ORDER BY created_at DESC, id DESC");

        let mut q = sqlx::query_as::<_, InsightRow>(&query).bind(granularity.as_str());
        if let Some(child_id) = child_id {
            q = q.bind(child_id);
        }

        let rows = q.fetch_all(&self.pool).await?;

        rows.into_iter().map(Insight::try_from).collect()
    }

    /// Mark an insight as read
    pub async fn mark_insight_read(&self, id: i64) -> Result<()> {
        self.set_insight_flag(id, "read").await
    }

    /// Mark an insight as saved and return it
    pub async fn save_insight(&self, id: i64) -> Result<Insight> {
        self.set_insight_flag(id, "saved").await?;
        self.get_insight(id).await
    }

    /// Delete an insight
    pub async fn delete_insight(&self, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM insights WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::InsightNotFound(id));
        }

        tracing::debug!("Deleted insight: {}", id);
        Ok(())
    }

    async fn set_insight_flag(&self, id: i64, column: &'static str) -> Result<()> {
        let query = format!("UPDATE insights SET {} = 1 WHERE id = ?", column);

        let rows = sqlx::query(&query)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::InsightNotFound(id));
        }

        tracing::debug!("Set insight {} flag: {}", id, column);
        Ok(())
    }
}
