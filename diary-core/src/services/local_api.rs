//! Local diary collaborator
//!
//! Implements [`DiaryApi`] over the SQLite [`Repository`], delegating the
//! narrative of each insight to a [`SummaryGenerator`].

use crate::api::{DiaryApi, SummaryGenerator, SummaryRequest};
use crate::database::{
    Attachment, CreateAttachmentRequest, CreateDraftRequest, CreateEntryRequest, DateSpan, Draft,
    Entry, EntryStatistics, Granularity, Insight, InsightPeriod, InsightSections, NewInsight,
    Repository, UpdateEntryRequest,
};
use crate::error::Result;
use crate::services::summary_generator::StatisticsSummaryGenerator;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

#[derive(Clone)]
pub struct LocalDiaryApi {
    repo: Repository,
    generator: Arc<dyn SummaryGenerator>,
}

impl LocalDiaryApi {
    pub fn new(repo: Repository, generator: Arc<dyn SummaryGenerator>) -> Self {
        Self { repo, generator }
    }

    pub fn with_statistics_generator(repo: Repository) -> Self {
        Self::new(repo, Arc::new(StatisticsSummaryGenerator))
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    async fn generate(&self, child_id: Option<i64>, period: InsightPeriod) -> Result<Insight> {
        let span = period.span()?;

        tracing::info!(
            "Generating {} insight for child {:?} ({} to {})",
            period.granularity().as_str(),
            child_id,
            span.start,
            span.end
        );

        let mut entries = self.repo.list_entries(Some(span)).await?;
        if let Some(child_id) = child_id {
            entries.retain(|e| e.child_id == Some(child_id));
        }
        let statistics = EntryStatistics::from_entries(&entries);

        let summary = self
            .generator
            .generate(SummaryRequest {
                child_id,
                period,
                entries: &entries,
                statistics: statistics.clone(),
            })
            .await?;

        let insight = self
            .repo
            .insert_insight(NewInsight {
                child_id,
                period,
                content: summary.content,
                sections: InsightSections {
                    achievements: summary.achievements,
                    focus_areas: summary.focus_areas,
                    progress_flags: summary.progress_flags,
                    statistics,
                },
            })
            .await?;

        tracing::info!("Insight generated: {}", insight.id);

        Ok(insight)
    }
}

#[async_trait]
impl DiaryApi for LocalDiaryApi {
    async fn list_entries(&self, span: Option<DateSpan>) -> Result<Vec<Entry>> {
        self.repo.list_entries(span).await
    }

    async fn create_entry(&self, req: CreateEntryRequest) -> Result<Entry> {
        self.repo.create_entry(req).await
    }

    async fn update_entry(&self, req: UpdateEntryRequest) -> Result<Entry> {
        self.repo.update_entry(req).await
    }

    async fn delete_entry(&self, id: i64) -> Result<()> {
        self.repo.delete_entry(id).await
    }

    async fn list_drafts(&self) -> Result<Vec<Draft>> {
        self.repo.list_drafts().await
    }

    async fn create_draft(&self, req: CreateDraftRequest) -> Result<Draft> {
        self.repo.create_draft(req).await
    }

    async fn delete_draft(&self, id: i64) -> Result<()> {
        self.repo.delete_draft(id).await
    }

    async fn list_attachments(&self, entry_id: i64) -> Result<Vec<Attachment>> {
        self.repo.list_attachments(entry_id).await
    }

    async fn create_attachment(&self, req: CreateAttachmentRequest) -> Result<Attachment> {
        self.repo.create_attachment(req).await
    }

    async fn delete_attachment(&self, id: i64) -> Result<()> {
        self.repo.delete_attachment(id).await.map(|_| ())
    }

    async fn generate_monthly_insight(
        &self,
        child_id: Option<i64>,
        month: u32,
        year: i32,
    ) -> Result<Insight> {
        self.generate(child_id, InsightPeriod::Month { month, year })
            .await
    }

    async fn generate_weekly_insight(
        &self,
        child_id: Option<i64>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Insight> {
        self.generate(child_id, InsightPeriod::Week { start, end })
            .await
    }

    async fn list_monthly_insights(
        &self,
        child_id: Option<i64>,
        saved_only: bool,
    ) -> Result<Vec<Insight>> {
        self.repo
            .list_insights(Granularity::Month, child_id, saved_only)
            .await
    }

    async fn list_weekly_insights(
        &self,
        child_id: Option<i64>,
        saved_only: bool,
    ) -> Result<Vec<Insight>> {
        self.repo
            .list_insights(Granularity::Week, child_id, saved_only)
            .await
    }

    async fn get_insight(&self, id: i64) -> Result<Insight> {
        self.repo.get_insight(id).await
    }

    async fn mark_insight_read(&self, id: i64) -> Result<()> {
        self.repo.mark_insight_read(id).await
    }

    async fn save_insight(&self, id: i64) -> Result<Insight> {
        self.repo.save_insight(id).await
    }

    async fn delete_insight(&self, id: i64) -> Result<()> {
        self.repo.delete_insight(id).await
    }
}
