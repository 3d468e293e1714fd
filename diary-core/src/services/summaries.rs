//! Summary workflow
//!
//! One state machine per period granularity governing generation, saving,
//! browsing and detail viewing of insights. View transitions are a pure
//! reducer over [`SummaryEvent`]s; [`SummaryWorkflow`] performs the
//! collaborator calls and applies the reducer only after they succeed.

use crate::api::DiaryApi;
use crate::config::WEEK_SPAN_DAYS;
use crate::database::{Granularity, Insight, InsightPeriod};
use crate::error::{AppError, Result};
use crate::services::filters::week_start;
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A period an insight can be generated for
pub trait SummaryPeriod: Copy + PartialEq + fmt::Debug + Send + Sync {
    const GRANULARITY: Granularity;

    /// The period containing `today`
    fn current(today: NaiveDate) -> Self;

    fn to_insight_period(&self) -> InsightPeriod;

    fn from_insight_period(period: &InsightPeriod) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthPeriod {
    pub month: u32,
    pub year: i32,
}

impl MonthPeriod {
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::Validation(format!("Invalid month: {}", month)));
        }
        Ok(Self { month, year })
    }
}

impl SummaryPeriod for MonthPeriod {
    const GRANULARITY: Granularity = Granularity::Month;

    fn current(today: NaiveDate) -> Self {
        Self {
            month: today.month(),
            year: today.year(),
        }
    }

    fn to_insight_period(&self) -> InsightPeriod {
        InsightPeriod::Month {
            month: self.month,
            year: self.year,
        }
    }

    fn from_insight_period(period: &InsightPeriod) -> Option<Self> {
        match *period {
            InsightPeriod::Month { month, year } => Some(Self { month, year }),
            InsightPeriod::Week { .. } => None,
        }
    }
}

/// Seven consecutive days. Only constructible from its start, so the end
/// is always `start + 6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl WeekPeriod {
    pub fn starting(start: NaiveDate) -> Self {
        Self {
            start,
            end: start + Duration::days(WEEK_SPAN_DAYS),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl SummaryPeriod for WeekPeriod {
    const GRANULARITY: Granularity = Granularity::Week;

    fn current(today: NaiveDate) -> Self {
        Self::starting(week_start(today))
    }

    fn to_insight_period(&self) -> InsightPeriod {
        InsightPeriod::Week {
            start: self.start,
            end: self.end,
        }
    }

    fn from_insight_period(period: &InsightPeriod) -> Option<Self> {
        match *period {
            InsightPeriod::Week { start, .. } => Some(Self::starting(start)),
            InsightPeriod::Month { .. } => None,
        }
    }
}

/// State restored when leaving the saved list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnTo {
    Initial,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum SummaryView {
    Initial,
    Generated,
    SavedList { return_to: ReturnTo },
    SavedDetail { return_to: ReturnTo, insight: Insight },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryEvent {
    Generated,
    OpenSaved,
    OpenDetail(Insight),
    Back,
    Deleted(i64),
    /// The held result was dropped outside the workflow
    Reset,
}

impl SummaryView {
    /// Next view for `event`, or `None` when the event is not valid here.
    ///
    /// `has_generated` is whether a generated result is held once the event
    /// has been applied.
    pub fn reduce(&self, event: &SummaryEvent, has_generated: bool) -> Option<SummaryView> {
        let next = match (self, event) {
            (Self::Initial | Self::Generated, SummaryEvent::Generated) => Self::Generated,

            (Self::Initial, SummaryEvent::OpenSaved) => Self::SavedList {
                return_to: ReturnTo::Initial,
            },
            (Self::Generated, SummaryEvent::OpenSaved) => Self::SavedList {
                return_to: ReturnTo::Generated,
            },
            (Self::SavedList { return_to }, SummaryEvent::OpenSaved) => Self::SavedList {
                return_to: *return_to,
            },

            (Self::SavedList { return_to }, SummaryEvent::OpenDetail(insight)) => {
                Self::SavedDetail {
                    return_to: *return_to,
                    insight: insight.clone(),
                }
            }

            (Self::SavedDetail { return_to, .. }, SummaryEvent::Back) => Self::SavedList {
                return_to: *return_to,
            },
            (Self::SavedList { return_to }, SummaryEvent::Back) => match return_to {
                ReturnTo::Generated if has_generated => Self::Generated,
                _ => Self::Initial,
            },

            (Self::SavedDetail { return_to, insight }, SummaryEvent::Deleted(id)) => {
                if insight.id == *id {
                    Self::SavedList {
                        return_to: *return_to,
                    }
                } else {
                    self.clone()
                }
            }
            (_, SummaryEvent::Deleted(_)) | (_, SummaryEvent::Reset) => self.clone(),

            _ => return None,
        };

        Some(next.corrected(has_generated))
    }

    /// `Generated` with nothing held falls back to `Initial`
    pub fn corrected(self, has_generated: bool) -> SummaryView {
        match self {
            Self::Generated if !has_generated => Self::Initial,
            other => other,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Generated => "generated",
            Self::SavedList { .. } => "saved_list",
            Self::SavedDetail { .. } => "saved_detail",
        }
    }
}

/// Filters of the saved list, independent of the generation filters.
/// `None` means all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavedListFilter<P> {
    pub child_id: Option<i64>,
    pub period: Option<P>,
}

impl<P> Default for SavedListFilter<P> {
    fn default() -> Self {
        Self {
            child_id: None,
            period: None,
        }
    }
}

pub struct SummaryWorkflow<P: SummaryPeriod> {
    api: Arc<dyn DiaryApi>,
    view: SummaryView,
    generated: Option<Insight>,
    child_filter: Option<i64>,
    period: P,
    saved_filter: SavedListFilter<P>,
    saved: Vec<Insight>,
    saved_count: usize,
}

pub type MonthlySummaries = SummaryWorkflow<MonthPeriod>;
pub type WeeklySummaries = SummaryWorkflow<WeekPeriod>;

impl<P: SummaryPeriod> SummaryWorkflow<P> {
    pub fn new(api: Arc<dyn DiaryApi>, today: NaiveDate) -> Self {
        Self {
            api,
            view: SummaryView::Initial,
            generated: None,
            child_filter: None,
            period: P::current(today),
            saved_filter: SavedListFilter::default(),
            saved: Vec::new(),
            saved_count: 0,
        }
    }

    pub fn view(&self) -> &SummaryView {
        &self.view
    }

    pub fn generated(&self) -> Option<&Insight> {
        self.generated.as_ref()
    }

    /// The insight on screen, if any
    pub fn displayed(&self) -> Option<&Insight> {
        match &self.view {
            SummaryView::Generated => self.generated.as_ref(),
            SummaryView::SavedDetail { insight, .. } => Some(insight),
            _ => None,
        }
    }

    pub fn child_filter(&self) -> Option<i64> {
        self.child_filter
    }

    pub fn period(&self) -> P {
        self.period
    }

    pub fn saved_filter(&self) -> &SavedListFilter<P> {
        &self.saved_filter
    }

    pub fn saved_insights(&self) -> &[Insight] {
        &self.saved
    }

    /// Saved insights for the generation child filter, across all periods
    pub fn saved_count(&self) -> usize {
        self.saved_count
    }

    /// Generate a fresh insight for the current generation filters.
    ///
    /// Refused without a collaborator call when there are no entries.
    pub async fn generate(&mut self, entry_count: usize) -> Result<&Insight> {
        if entry_count == 0 {
            return Err(AppError::NoEntries);
        }
        let next = self.transition(&SummaryEvent::Generated, true)?;

        let insight = match self.period.to_insight_period() {
            InsightPeriod::Month { month, year } => {
                self.api
                    .generate_monthly_insight(self.child_filter, month, year)
                    .await?
            }
            InsightPeriod::Week { start, end } => {
                self.api
                    .generate_weekly_insight(self.child_filter, start, end)
                    .await?
            }
        };

        tracing::info!(
            "Generated {} insight {} ({} entries in view)",
            P::GRANULARITY.as_str(),
            insight.id,
            entry_count
        );

        self.set_view(next);
        Ok(&*self.generated.insert(insight))
    }

    /// Mark the held result saved; the view does not change
    pub async fn save_generated(&mut self) -> Result<&Insight> {
        let id = self
            .generated
            .as_ref()
            .map(|i| i.id)
            .ok_or_else(|| {
                AppError::InvalidTransition("No generated insight to save".to_string())
            })?;

        let saved = self.api.save_insight(id).await?;
        tracing::info!("Saved {} insight {}", P::GRANULARITY.as_str(), id);

        self.generated = Some(saved);
        self.reload_saved_count().await;

        self.generated
            .as_ref()
            .ok_or_else(|| AppError::Generic("Generated insight missing after save".to_string()))
    }

    /// Enter the saved list with its filters reset to defaults
    pub async fn open_saved(&mut self) -> Result<()> {
        let next = self.transition(&SummaryEvent::OpenSaved, self.generated.is_some())?;

        let filter = SavedListFilter::default();
        let saved = self.load_saved(&filter).await?;

        self.saved_filter = filter;
        self.saved = saved;
        self.set_view(next);
        Ok(())
    }

    /// Show one saved insight, marking it read on first view
    pub async fn open_detail(&mut self, id: i64) -> Result<&Insight> {
        if !matches!(self.view, SummaryView::SavedList { .. }) {
            return Err(AppError::InvalidTransition(format!(
                "Cannot open insight {} from {}",
                id,
                self.view.name()
            )));
        }

        let mut insight = self.api.get_insight(id).await?;
        if !insight.read {
            self.api.mark_insight_read(id).await?;
            insight.read = true;
            if let Some(listed) = self.saved.iter_mut().find(|i| i.id == id) {
                listed.read = true;
            }
        }

        let next = self.transition(&SummaryEvent::OpenDetail(insight), self.generated.is_some())?;
        self.set_view(next);

        self.displayed()
            .ok_or_else(|| AppError::Generic(format!("Insight {} missing from detail view", id)))
    }

    pub async fn back(&mut self) -> Result<()> {
        let next = self.transition(&SummaryEvent::Back, self.generated.is_some())?;

        if !matches!(next, SummaryView::SavedList { .. }) {
            self.reload_saved_count().await;
        }

        self.set_view(next);
        Ok(())
    }

    /// Delete an insight. Deleting the result on screen clears it; deleting
    /// the insight in the detail view returns to the list.
    pub async fn delete(&mut self, id: i64) -> Result<()> {
        self.api.delete_insight(id).await?;
        tracing::info!("Deleted {} insight {}", P::GRANULARITY.as_str(), id);

        if self.generated.as_ref().is_some_and(|i| i.id == id) {
            self.generated = None;
        }
        self.saved.retain(|i| i.id != id);

        let next = self.transition(&SummaryEvent::Deleted(id), self.generated.is_some())?;
        self.set_view(next);

        if !self.in_saved_list() {
            self.reload_saved_count().await;
        }
        Ok(())
    }

    /// Drop the held result, e.g. after an external reset
    pub fn reset_generated(&mut self) {
        self.generated = None;
        if let Some(next) = self.view.reduce(&SummaryEvent::Reset, false) {
            self.set_view(next);
        }
    }

    /// Change the generation child filter. Outside the saved list this
    /// reloads the saved count.
    pub async fn set_child_filter(&mut self, child_id: Option<i64>) -> Result<()> {
        if !self.in_saved_list() {
            self.saved_count = self.count_saved(child_id).await?;
        }
        self.child_filter = child_id;
        Ok(())
    }

    pub async fn set_period(&mut self, period: P) -> Result<()> {
        if !self.in_saved_list() {
            self.saved_count = self.count_saved(self.child_filter).await?;
        }
        self.period = period;
        Ok(())
    }

    /// Change the saved-list child filter, reloading the list when shown
    pub async fn set_saved_child(&mut self, child_id: Option<i64>) -> Result<()> {
        let filter = SavedListFilter {
            child_id,
            ..self.saved_filter
        };
        self.apply_saved_filter(filter).await
    }

    pub async fn set_saved_period(&mut self, period: Option<P>) -> Result<()> {
        let filter = SavedListFilter {
            period,
            ..self.saved_filter
        };
        self.apply_saved_filter(filter).await
    }

    async fn apply_saved_filter(&mut self, filter: SavedListFilter<P>) -> Result<()> {
        if matches!(self.view, SummaryView::SavedList { .. }) {
            self.saved = self.load_saved(&filter).await?;
        }
        self.saved_filter = filter;
        Ok(())
    }

    pub async fn refresh_saved_count(&mut self) -> Result<()> {
        self.saved_count = self.count_saved(self.child_filter).await?;
        Ok(())
    }

    /// Refresh the saved count after a change that already happened. A
    /// failure keeps the previous count.
    async fn reload_saved_count(&mut self) {
        if let Err(e) = self.refresh_saved_count().await {
            tracing::warn!(
                "Failed to reload saved {} insight count: {}",
                P::GRANULARITY.as_str(),
                e
            );
        }
    }

    async fn count_saved(&self, child_id: Option<i64>) -> Result<usize> {
        Ok(self.list_insights(child_id, true).await?.len())
    }

    async fn load_saved(&self, filter: &SavedListFilter<P>) -> Result<Vec<Insight>> {
        let mut saved = self.list_insights(filter.child_id, true).await?;
        if let Some(period) = filter.period {
            saved.retain(|i| P::from_insight_period(&i.period) == Some(period));
        }
        Ok(saved)
    }

    async fn list_insights(&self, child_id: Option<i64>, saved_only: bool) -> Result<Vec<Insight>> {
        match P::GRANULARITY {
            Granularity::Month => self.api.list_monthly_insights(child_id, saved_only).await,
            Granularity::Week => self.api.list_weekly_insights(child_id, saved_only).await,
        }
    }

    fn in_saved_list(&self) -> bool {
        matches!(
            self.view,
            SummaryView::SavedList { .. } | SummaryView::SavedDetail { .. }
        )
    }

    fn transition(&self, event: &SummaryEvent, has_generated: bool) -> Result<SummaryView> {
        self.view.reduce(event, has_generated).ok_or_else(|| {
            AppError::InvalidTransition(format!(
                "{:?} is not allowed from {}",
                event,
                self.view.name()
            ))
        })
    }

    fn set_view(&mut self, next: SummaryView) {
        if next.name() != self.view.name() {
            tracing::debug!(
                "{} summaries: {} -> {}",
                P::GRANULARITY.as_str(),
                self.view.name(),
                next.name()
            );
        }
        self.view = next;
    }
}

impl SummaryWorkflow<WeekPeriod> {
    /// Move the generation week; the end follows the start
    pub async fn set_week_start(&mut self, start: NaiveDate) -> Result<()> {
        self.set_period(WeekPeriod::starting(start)).await
    }

    pub async fn set_saved_week_start(&mut self, start: Option<NaiveDate>) -> Result<()> {
        self.set_saved_period(start.map(WeekPeriod::starting)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_memory_pool, CreateEntryRequest, Repository, TemplateFields};
    use crate::services::local_api::LocalDiaryApi;
    use sqlx::SqlitePool;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn create_test_api() -> (Arc<LocalDiaryApi>, SqlitePool) {
        let pool = create_memory_pool().await.unwrap();
        let api = Arc::new(LocalDiaryApi::with_statistics_generator(Repository::new(
            pool.clone(),
        )));

        for (child, day) in [(Some(1), 3), (Some(1), 18), (Some(2), 19)] {
            api.create_entry(CreateEntryRequest {
                child_id: child,
                entry_date: date(2025, 6, day),
                title: "Day".to_string(),
                guardian_mood: None,
                child_mood: None,
                tags: vec![],
                fields: TemplateFields::FreeForm {
                    content: "Notes".to_string(),
                },
            })
            .await
            .unwrap();
        }

        (api, pool)
    }

    async fn monthly() -> (MonthlySummaries, Arc<LocalDiaryApi>, SqlitePool) {
        let (api, pool) = create_test_api().await;
        let workflow = MonthlySummaries::new(api.clone(), date(2025, 6, 20));
        (workflow, api, pool)
    }

    #[tokio::test]
    async fn test_back_from_saved_list_returns_to_generated() {
        let (mut workflow, _, _) = monthly().await;

        let generated = workflow.generate(3).await.unwrap().clone();
        assert_eq!(workflow.view(), &SummaryView::Generated);
        assert!(generated.read && !generated.saved);

        workflow.save_generated().await.unwrap();
        assert_eq!(workflow.view(), &SummaryView::Generated);
        assert_eq!(workflow.saved_count(), 1);

        workflow.open_saved().await.unwrap();
        assert_eq!(
            workflow.view(),
            &SummaryView::SavedList {
                return_to: ReturnTo::Generated
            }
        );
        assert_eq!(workflow.saved_insights().len(), 1);

        workflow.back().await.unwrap();
        assert_eq!(workflow.view(), &SummaryView::Generated);
        let shown = workflow.displayed().unwrap();
        assert_eq!(shown.id, generated.id);
        assert!(shown.saved);
    }

    #[tokio::test]
    async fn test_count_reload_failure_keeps_completed_changes() {
        let (mut workflow, api, pool) = monthly().await;

        let id = workflow.generate(3).await.unwrap().id;
        workflow.open_saved().await.unwrap();

        // A saved row that cannot be decoded breaks every saved-list query
        sqlx::query(
            "INSERT INTO insights (granularity, content, sections_json, saved, read, created_at) \
             VALUES ('month', '', '{}', 1, 1, '2025-06-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .unwrap();
        assert!(api.list_monthly_insights(None, true).await.is_err());

        workflow.back().await.unwrap();
        assert_eq!(workflow.view(), &SummaryView::Generated);

        let saved = workflow.save_generated().await.unwrap();
        assert!(saved.saved);
        assert_eq!(workflow.saved_count(), 0);
        assert!(api.get_insight(id).await.unwrap().saved);

        workflow.delete(id).await.unwrap();
        assert_eq!(workflow.view(), &SummaryView::Initial);
        assert!(workflow.generated().is_none());
        assert!(matches!(
            api.get_insight(id).await,
            Err(AppError::InsightNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_without_entries_is_refused() {
        let (mut workflow, api, _) = monthly().await;

        let result = workflow.generate(0).await;

        assert!(matches!(result, Err(AppError::NoEntries)));
        assert_eq!(workflow.view(), &SummaryView::Initial);
        assert!(workflow.generated().is_none());
        assert!(api.list_monthly_insights(None, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_regenerate_replaces_held_result() {
        let (mut workflow, _, _) = monthly().await;

        let first = workflow.generate(3).await.unwrap().id;
        workflow.set_child_filter(Some(1)).await.unwrap();
        let second = workflow.generate(2).await.unwrap().clone();

        assert_ne!(first, second);
        assert_eq!(second.child_id, Some(1));
        assert_eq!(second.sections.statistics.total_entries, 2);
        assert_eq!(workflow.displayed().map(|i| i.id), Some(second.id));
    }

    #[tokio::test]
    async fn test_back_without_result_goes_to_initial() {
        let (mut workflow, _, _) = monthly().await;

        workflow.open_saved().await.unwrap();
        workflow.back().await.unwrap();
        assert_eq!(workflow.view(), &SummaryView::Initial);

        workflow.generate(3).await.unwrap();
        workflow.open_saved().await.unwrap();
        workflow.reset_generated();
        workflow.back().await.unwrap();
        assert_eq!(workflow.view(), &SummaryView::Initial);
    }

    #[tokio::test]
    async fn test_reset_self_corrects_generated_view() {
        let (mut workflow, _, _) = monthly().await;

        workflow.generate(3).await.unwrap();
        workflow.reset_generated();

        assert_eq!(workflow.view(), &SummaryView::Initial);
        assert!(workflow.displayed().is_none());
    }

    #[tokio::test]
    async fn test_open_detail_marks_read_and_delete_returns_to_list() {
        let (mut workflow, _, pool) = monthly().await;

        let a = workflow.generate(3).await.unwrap().id;
        workflow.save_generated().await.unwrap();
        let b = workflow.generate(3).await.unwrap().id;
        workflow.save_generated().await.unwrap();
        sqlx::query("UPDATE insights SET read = 0")
            .execute(&pool)
            .await
            .unwrap();

        workflow.open_saved().await.unwrap();
        assert_eq!(workflow.saved_insights().len(), 2);
        assert!(workflow.saved_insights().iter().all(|i| !i.read));

        let shown = workflow.open_detail(a).await.unwrap();
        assert!(shown.read);
        assert!(workflow.saved_insights().iter().find(|i| i.id == a).unwrap().read);

        workflow.delete(a).await.unwrap();
        assert_eq!(
            workflow.view(),
            &SummaryView::SavedList {
                return_to: ReturnTo::Generated
            }
        );
        let remaining: Vec<i64> = workflow.saved_insights().iter().map(|i| i.id).collect();
        assert_eq!(remaining, vec![b]);

        workflow.open_detail(b).await.unwrap();
        workflow.back().await.unwrap();
        assert!(matches!(workflow.view(), SummaryView::SavedList { .. }));
    }

    #[tokio::test]
    async fn test_deleting_generated_result_clears_it() {
        let (mut workflow, _, _) = monthly().await;

        let id = workflow.generate(3).await.unwrap().id;
        workflow.delete(id).await.unwrap();

        assert_eq!(workflow.view(), &SummaryView::Initial);
        assert!(workflow.generated().is_none());
    }

    #[tokio::test]
    async fn test_open_saved_resets_saved_filters() {
        let (mut workflow, _, _) = monthly().await;
        workflow.set_child_filter(Some(1)).await.unwrap();
        workflow.generate(2).await.unwrap();
        workflow.save_generated().await.unwrap();
        workflow.set_child_filter(Some(2)).await.unwrap();
        workflow.generate(1).await.unwrap();
        workflow.save_generated().await.unwrap();

        workflow.open_saved().await.unwrap();
        workflow.set_saved_child(Some(2)).await.unwrap();
        assert_eq!(workflow.saved_insights().len(), 1);
        workflow
            .set_saved_period(Some(MonthPeriod::new(5, 2025).unwrap()))
            .await
            .unwrap();
        assert!(workflow.saved_insights().is_empty());

        workflow.back().await.unwrap();
        workflow.open_saved().await.unwrap();
        assert_eq!(workflow.saved_filter(), &SavedListFilter::default());
        assert_eq!(workflow.saved_insights().len(), 2);
    }

    #[tokio::test]
    async fn test_child_filter_reloads_saved_count() {
        let (mut workflow, _, _) = monthly().await;
        workflow.set_child_filter(Some(1)).await.unwrap();
        workflow.generate(2).await.unwrap();
        workflow.save_generated().await.unwrap();
        assert_eq!(workflow.saved_count(), 1);

        workflow.set_child_filter(Some(2)).await.unwrap();
        assert_eq!(workflow.saved_count(), 0);

        workflow.set_child_filter(None).await.unwrap();
        assert_eq!(workflow.saved_count(), 1);
    }

    #[tokio::test]
    async fn test_generate_refused_from_saved_list() {
        let (mut workflow, api, _) = monthly().await;
        workflow.open_saved().await.unwrap();

        let result = workflow.generate(3).await;

        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        assert!(api.list_monthly_insights(None, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_week_end_follows_start() {
        let (api, _) = create_test_api().await;
        let mut workflow = WeeklySummaries::new(api.clone(), date(2025, 6, 20));
        assert_eq!(workflow.period().start(), date(2025, 6, 15));
        assert_eq!(workflow.period().end(), date(2025, 6, 21));

        // 2025-06-18 is a Wednesday
        workflow.set_week_start(date(2025, 6, 18)).await.unwrap();
        assert_eq!(workflow.period().end(), date(2025, 6, 24));
        assert_eq!(workflow.saved_filter().period, None);

        workflow.set_saved_week_start(Some(date(2025, 6, 1))).await.unwrap();
        assert_eq!(
            workflow.saved_filter().period.map(|p| p.end()),
            Some(date(2025, 6, 7))
        );
        assert_eq!(workflow.period().start(), date(2025, 6, 18));

        let insight = workflow.generate(3).await.unwrap();
        assert_eq!(
            insight.period,
            InsightPeriod::Week {
                start: date(2025, 6, 18),
                end: date(2025, 6, 24)
            }
        );
        assert_eq!(insight.sections.statistics.total_entries, 2);
    }

    #[test]
    fn test_reducer_rejects_invalid_events() {
        let detail = SummaryView::SavedDetail {
            return_to: ReturnTo::Initial,
            insight: Insight {
                id: 1,
                child_id: None,
                period: InsightPeriod::Month { month: 6, year: 2025 },
                content: String::new(),
                sections: Default::default(),
                saved: true,
                read: true,
                created_at: chrono::Utc::now(),
            },
        };

        assert_eq!(detail.reduce(&SummaryEvent::OpenSaved, false), None);
        assert_eq!(detail.reduce(&SummaryEvent::Generated, false), None);
        assert_eq!(SummaryView::Initial.reduce(&SummaryEvent::Back, false), None);
        assert_eq!(SummaryView::Generated.reduce(&SummaryEvent::Back, true), None);
        assert_eq!(
            detail.reduce(&SummaryEvent::Deleted(2), false),
            Some(detail.clone())
        );
        assert_eq!(
            SummaryView::Generated.reduce(&SummaryEvent::Reset, false),
            Some(SummaryView::Initial)
        );
    }
}
