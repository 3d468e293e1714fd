//! View mode controller
//!
//! Top-level state of the diary screen: the active mode, the shared filter,
//! the selected date and entry, the loaded collections, the open editor and
//! one summary workflow per granularity.

use crate::api::{DiaryApi, ObjectStorage};
use crate::database::{Draft, Entry, EntryStatistics, Insight, PendingFile, TemplateKind};
use crate::error::{AppError, Result};
use crate::services::attachments::{AttachmentStaging, DeleteRequest};
use crate::services::drafts::{
    CloseOutcome, CloseRequest, DraftReconciliationService, EditSession, SwitchChoice,
    SwitchOutcome, TemplateSwitch,
};
use crate::services::entries::{EntriesService, SubmitOutcome};
use crate::services::filters::{FilterEngine, FilterState};
use crate::services::form::EntryForm;
use crate::services::summaries::{MonthlySummaries, WeeklySummaries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    #[default]
    Calendar,
    List,
    Insights,
    Drafts,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::List => "list",
            Self::Insights => "insights",
            Self::Drafts => "drafts",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "calendar" => Some(Self::Calendar),
            "list" => Some(Self::List),
            "insights" => Some(Self::Insights),
            "drafts" => Some(Self::Drafts),
            _ => None,
        }
    }
}

pub struct ViewModeController {
    entries_service: EntriesService,
    drafts_service: DraftReconciliationService,
    filter: FilterState,
    mode: ViewMode,
    today: NaiveDate,
    selected_date: NaiveDate,
    selected_entry: Option<i64>,
    entries: Vec<Entry>,
    drafts: Vec<Draft>,
    session: Option<EditSession>,
    monthly: MonthlySummaries,
    weekly: WeeklySummaries,
}

impl ViewModeController {
    pub fn new(api: Arc<dyn DiaryApi>, storage: Arc<dyn ObjectStorage>, today: NaiveDate) -> Self {
        Self {
            entries_service: EntriesService::new(api.clone(), storage),
            drafts_service: DraftReconciliationService::new(api.clone()),
            filter: FilterState::default(),
            mode: ViewMode::default(),
            today,
            selected_date: today,
            selected_entry: None,
            entries: Vec::new(),
            drafts: Vec::new(),
            session: None,
            monthly: MonthlySummaries::new(api.clone(), today),
            weekly: WeeklySummaries::new(api, today),
        }
    }

    /// Reload entries and drafts
    pub async fn refresh(&mut self) -> Result<()> {
        let entries = self.entries_service.list_entries(None).await?;
        let drafts = self.entries_service.list_drafts().await?;

        tracing::debug!("Loaded {} entries and {} drafts", entries.len(), drafts.len());

        self.entries = entries;
        self.drafts = drafts;
        Ok(())
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ViewMode) {
        if mode != self.mode {
            tracing::debug!("View mode {} -> {}", self.mode.as_str(), mode.as_str());
            self.mode = mode;
        }
    }

    /// Apply a remembered mode name; unknown names fall back to the calendar
    pub fn restore_mode(&mut self, stored: &str) {
        let mode = ViewMode::parse(stored).unwrap_or_else(|| {
            tracing::debug!("Unknown stored view mode '{}', using calendar", stored);
            ViewMode::Calendar
        });
        self.set_mode(mode);
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut FilterState {
        &mut self.filter
    }

    pub fn clear_filter(&mut self) {
        self.filter = FilterState::default();
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        self.selected_entry = None;
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        let id = self.selected_entry?;
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn select_entry(&mut self, id: i64) -> Result<()> {
        let entry = self.find_entry(id)?;
        self.selected_date = entry.entry_date;
        self.selected_entry = Some(id);
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn drafts(&self) -> &[Draft] {
        &self.drafts
    }

    /// Entries for the list view
    pub fn visible_entries(&self) -> Vec<&Entry> {
        FilterEngine::filter_entries(&self.entries, &self.filter, self.today)
    }

    /// Drafts for the drafts view
    pub fn visible_drafts(&self) -> Vec<&Draft> {
        FilterEngine::filter_drafts(&self.drafts, &self.filter, self.today)
    }

    /// Entries for one calendar cell
    pub fn entries_for_day(&self, day: NaiveDate) -> Vec<&Entry> {
        FilterEngine::entries_for_day(&self.entries, day, &self.filter)
    }

    /// Statistics panel of the insights view: child and date range only
    pub fn insight_statistics(&self) -> EntryStatistics {
        EntryStatistics::from_entries(FilterEngine::entries_for_statistics(
            &self.entries,
            &self.filter,
            self.today,
        ))
    }

    pub fn monthly(&self) -> &MonthlySummaries {
        &self.monthly
    }

    pub fn monthly_mut(&mut self) -> &mut MonthlySummaries {
        &mut self.monthly
    }

    pub fn weekly(&self) -> &WeeklySummaries {
        &self.weekly
    }

    pub fn weekly_mut(&mut self) -> &mut WeeklySummaries {
        &mut self.weekly
    }

    pub async fn generate_monthly(&mut self) -> Result<&Insight> {
        self.monthly.generate(self.entries.len()).await
    }

    pub async fn generate_weekly(&mut self) -> Result<&Insight> {
        self.weekly.generate(self.entries.len()).await
    }

    // ===== Editor =====

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        self.session.as_mut()
    }

    /// Open a blank editor on the selected date for the filtered child
    pub fn open_new_entry(&mut self, kind: TemplateKind) -> Result<&mut EditSession> {
        self.ensure_editor_closed()?;

        let form = EntryForm::blank(kind, self.selected_date, self.filter.child);
        Ok(self.session.insert(EditSession::create(form)))
    }

    pub async fn open_entry(&mut self, id: i64) -> Result<&mut EditSession> {
        self.ensure_editor_closed()?;

        let entry = self.find_entry(id)?.clone();
        let session = self.entries_service.open_entry(&entry).await?;

        self.selected_date = entry.entry_date;
        self.selected_entry = Some(id);
        Ok(self.session.insert(session))
    }

    pub fn resume_draft(&mut self, id: i64) -> Result<&mut EditSession> {
        self.ensure_editor_closed()?;

        let draft = self
            .drafts
            .iter()
            .find(|d| d.id == id)
            .ok_or(AppError::DraftNotFound(id))?;
        let session = self.drafts_service.resume_draft(draft, self.selected_date);

        Ok(self.session.insert(session))
    }

    pub fn request_template_switch(&mut self, kind: TemplateKind) -> Result<TemplateSwitch> {
        let session = self.session.as_mut().ok_or_else(no_editor)?;
        self.drafts_service.request_template_switch(session, kind)
    }

    pub async fn resolve_template_switch(&mut self, choice: SwitchChoice) -> Result<SwitchOutcome> {
        let session = self.session.as_mut().ok_or_else(no_editor)?;
        let outcome = self
            .drafts_service
            .resolve_template_switch(session, choice)
            .await?;

        if let SwitchOutcome::Switched { draft: Some(draft) } = &outcome {
            self.drafts.insert(0, draft.clone());
        }
        Ok(outcome)
    }

    /// Queue files on the open editor, returning per-file rejections
    pub fn add_files(&mut self, files: Vec<PendingFile>) -> Result<Vec<AppError>> {
        let session = self.session.as_mut().ok_or_else(no_editor)?;
        Ok(session.add_files(files))
    }

    /// Delete or stage an attachment shown in the open editor
    pub async fn request_delete_attachment(&mut self, id: i64) -> Result<DeleteRequest> {
        let session = self.session.as_mut().ok_or_else(no_editor)?;
        let api = self.entries_service.api();
        session.attachments_mut().request_delete(api, id).await
    }

    /// Delete an attachment of the selected entry right away.
    ///
    /// Refused while the editor is open, where deletions are staged instead.
    pub async fn delete_attachment(&mut self, id: i64) -> Result<()> {
        self.ensure_editor_closed()?;

        let entry_id = self
            .selected_entry
            .ok_or_else(|| AppError::InvalidTransition("No entry is selected".to_string()))?;
        let api = self.entries_service.api();
        let mut staging = AttachmentStaging::viewing(api.list_attachments(entry_id).await?);

        staging.request_delete(api, id).await?;
        Ok(())
    }

    pub fn undo_delete_attachment(&mut self, id: i64) -> Result<()> {
        let session = self.session.as_mut().ok_or_else(no_editor)?;
        session.attachments_mut().unmark_for_deletion(id);
        Ok(())
    }

    /// Submit the open editor and close it on success.
    ///
    /// A failed submit keeps the editor open. Whatever the collaborator
    /// already accepted still shows up in the loaded entries and drafts.
    pub async fn submit(&mut self) -> Result<SubmitOutcome> {
        let session = self.session.as_mut().ok_or_else(no_editor)?;
        let source_draft = session.source_draft();

        let result = self.entries_service.submit(session).await;

        let converted_draft = source_draft.filter(|_| session.source_draft().is_none());
        let saved = session.saved_entry().cloned();
        if let Some(draft_id) = converted_draft {
            self.drafts.retain(|d| d.id != draft_id);
        }
        if let Some(entry) = saved {
            self.upsert_entry(entry);
        }

        let outcome = result?;

        self.session = None;
        self.selected_date = outcome.entry.entry_date;
        self.selected_entry = Some(outcome.entry.id);

        Ok(outcome)
    }

    pub fn request_close(&self) -> CloseRequest {
        match &self.session {
            Some(session) => self.drafts_service.request_close(session),
            None => CloseRequest::Close,
        }
    }

    pub async fn resolve_close(&mut self, choice: SwitchChoice) -> Result<CloseOutcome> {
        let session = self.session.as_ref().ok_or_else(no_editor)?;
        let outcome = self.drafts_service.resolve_close(session, choice).await?;

        if let CloseOutcome::Closed { draft } = &outcome {
            if let Some(draft) = draft {
                self.drafts.insert(0, draft.clone());
            }
            self.session = None;
        }
        Ok(outcome)
    }

    /// Drop the editor without prompting
    pub fn close_editor(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("Editor closed");
        }
    }

    pub async fn delete_entry(&mut self, id: i64) -> Result<()> {
        self.entries_service.delete_entry(id).await?;

        self.entries.retain(|e| e.id != id);
        if self.selected_entry == Some(id) {
            self.selected_entry = None;
        }
        if self.session.as_ref().and_then(|s| s.entry_id()) == Some(id) {
            self.session = None;
        }
        Ok(())
    }

    pub async fn delete_draft(&mut self, id: i64) -> Result<()> {
        self.entries_service.delete_draft(id).await?;
        self.drafts.retain(|d| d.id != id);
        Ok(())
    }

    fn upsert_entry(&mut self, entry: Entry) {
        match self.entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => self.entries.insert(0, entry),
        }
    }

    fn find_entry(&self, id: i64) -> Result<&Entry> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .ok_or(AppError::EntryNotFound(id))
    }

    fn ensure_editor_closed(&self) -> Result<()> {
        if self.session.is_some() {
            return Err(AppError::InvalidTransition(
                "An entry is already open in the editor".to_string(),
            ));
        }
        Ok(())
    }
}

fn no_editor() -> AppError {
    AppError::InvalidTransition("No entry is open in the editor".to_string())
}
