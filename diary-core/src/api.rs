//! Collaborator interfaces
//!
//! The engine never talks to a transport directly. Persistence, object
//! storage and summary generation are reached through these traits so the
//! same workflows run against a remote API, the bundled SQLite store, or a
//! test double.

use crate::database::{
    Attachment, CreateAttachmentRequest, CreateDraftRequest, CreateEntryRequest, DateSpan, Draft,
    Entry, EntryStatistics, Insight, InsightPeriod, PendingFile, UpdateEntryRequest,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Persistence collaborator for entries, drafts, attachments and insights
#[async_trait]
pub trait DiaryApi: Send + Sync {
    /// List entries, optionally limited to a date span
    async fn list_entries(&self, span: Option<DateSpan>) -> Result<Vec<Entry>>;

    async fn create_entry(&self, req: CreateEntryRequest) -> Result<Entry>;

    async fn update_entry(&self, req: UpdateEntryRequest) -> Result<Entry>;

    /// Delete an entry and its attachments
    async fn delete_entry(&self, id: i64) -> Result<()>;

    async fn list_drafts(&self) -> Result<Vec<Draft>>;

    async fn create_draft(&self, req: CreateDraftRequest) -> Result<Draft>;

    async fn delete_draft(&self, id: i64) -> Result<()>;

    async fn list_attachments(&self, entry_id: i64) -> Result<Vec<Attachment>>;

    /// Record an attachment whose file already sits at `req.url`
    async fn create_attachment(&self, req: CreateAttachmentRequest) -> Result<Attachment>;

    async fn delete_attachment(&self, id: i64) -> Result<()>;

    /// Generate a new, unsaved insight for a calendar month
    async fn generate_monthly_insight(
        &self,
        child_id: Option<i64>,
        month: u32,
        year: i32,
    ) -> Result<Insight>;

    /// Generate a new, unsaved insight for the week `[start, end]`
    async fn generate_weekly_insight(
        &self,
        child_id: Option<i64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Insight>;

    async fn list_monthly_insights(&self, child_id: Option<i64>, saved_only: bool)
        -> Result<Vec<Insight>>;

    async fn list_weekly_insights(&self, child_id: Option<i64>, saved_only: bool)
        -> Result<Vec<Insight>>;

    async fn get_insight(&self, id: i64) -> Result<Insight>;

    async fn mark_insight_read(&self, id: i64) -> Result<()>;

    async fn save_insight(&self, id: i64) -> Result<Insight>;

    async fn delete_insight(&self, id: i64) -> Result<()>;
}

/// Binary object storage: accepts a raw file, returns a resolvable URL
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, file: &PendingFile) -> Result<String>;
}

/// Input handed to a summary generator
#[derive(Debug, Clone)]
pub struct SummaryRequest<'a> {
    pub child_id: Option<i64>,
    pub period: InsightPeriod,
    /// Entries dated inside the period, already narrowed to the child
    pub entries: &'a [Entry],
    pub statistics: EntryStatistics,
}

/// Structured result of a summary generation call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryContent {
    pub content: String,
    pub achievements: Vec<String>,
    pub focus_areas: Vec<String>,
    pub progress_flags: Vec<String>,
}

/// The opaque call that writes the narrative for an insight
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn generate(&self, request: SummaryRequest<'_>) -> Result<SummaryContent>;
}
