//! Draft reconciliation
//!
//! Decides when a template switch or closing the editor would throw away
//! user input, and performs the field-preserving reset afterwards. The
//! editor state travels as an explicit [`EditSession`] value.

use crate::api::DiaryApi;
use crate::config::UNTITLED_DRAFT_TITLE;
use crate::database::{Attachment, Draft, Entry, PendingFile, TemplateKind};
use crate::error::{AppError, Result};
use crate::services::attachments::{validate_upload, AttachmentStaging};
use crate::services::form::EntryForm;
use chrono::NaiveDate;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    Create,
    Edit { entry_id: i64 },
}

/// One open editor: the form, files selected for upload, staged attachment
/// deletions and the draft it was resumed from.
#[derive(Debug, Clone)]
pub struct EditSession {
    mode: EditMode,
    /// Latest version of the entry the collaborator confirmed
    saved: Option<Entry>,
    form: EntryForm,
    pending_files: Vec<PendingFile>,
    attachments: AttachmentStaging,
    source_draft: Option<i64>,
    pending_switch: Option<TemplateKind>,
}

impl EditSession {
    pub fn create(form: EntryForm) -> Self {
        Self {
            mode: EditMode::Create,
            saved: None,
            form,
            pending_files: Vec::new(),
            attachments: AttachmentStaging::editing(Vec::new()),
            source_draft: None,
            pending_switch: None,
        }
    }

    pub fn edit(entry: &Entry, attachments: Vec<Attachment>) -> Self {
        Self {
            mode: EditMode::Edit { entry_id: entry.id },
            saved: Some(entry.clone()),
            form: EntryForm::from_entry(entry),
            pending_files: Vec::new(),
            attachments: AttachmentStaging::editing(attachments),
            source_draft: None,
            pending_switch: None,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn entry_id(&self) -> Option<i64> {
        match self.mode {
            EditMode::Create => None,
            EditMode::Edit { entry_id } => Some(entry_id),
        }
    }

    pub fn saved_entry(&self) -> Option<&Entry> {
        self.saved.as_ref()
    }

    pub fn form(&self) -> &EntryForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut EntryForm {
        &mut self.form
    }

    pub fn pending_files(&self) -> &[PendingFile] {
        &self.pending_files
    }

    /// Queue files for upload. Files failing validation are left out and
    /// returned as one rejection each.
    pub fn add_files(&mut self, files: Vec<PendingFile>) -> Vec<AppError> {
        let mut rejected = Vec::new();

        for file in files {
            match validate_upload(&file) {
                Ok(_) => self.pending_files.push(file),
                Err(e) => {
                    tracing::debug!("Rejected file selection: {}", e);
                    rejected.push(e);
                }
            }
        }

        rejected
    }

    pub fn remove_pending_file(&mut self, index: usize) -> Option<PendingFile> {
        if index < self.pending_files.len() {
            Some(self.pending_files.remove(index))
        } else {
            None
        }
    }

    pub fn attachments(&self) -> &AttachmentStaging {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut AttachmentStaging {
        &mut self.attachments
    }

    pub fn source_draft(&self) -> Option<i64> {
        self.source_draft
    }

    pub fn pending_switch(&self) -> Option<TemplateKind> {
        self.pending_switch
    }

    /// Moods, tags or selected files
    pub fn has_common_data(&self) -> bool {
        self.form.has_common_data() || !self.pending_files.is_empty()
    }

    /// Turn a create-mode session into an edit session of the new entry
    pub(crate) fn mark_created(&mut self, entry: &Entry) {
        self.mode = EditMode::Edit { entry_id: entry.id };
        self.saved = Some(entry.clone());
        self.attachments = AttachmentStaging::editing(Vec::new());
        self.pending_switch = None;
    }

    pub(crate) fn mark_saved(&mut self, entry: &Entry) {
        self.saved = Some(entry.clone());
    }

    pub(crate) fn take_source_draft(&mut self) -> Option<i64> {
        self.source_draft.take()
    }

    fn needs_confirmation(&self) -> bool {
        self.form.has_meaningful_data() || self.has_common_data()
    }

    fn apply_switch(&mut self, kind: TemplateKind) {
        self.form.reset_to(kind);
        self.pending_switch = None;
    }
}

/// Outcome of asking for a different template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSwitch {
    Unchanged,
    Switched,
    NeedsConfirmation,
}

/// User answer to the destructive-change prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchChoice {
    SaveDraft,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    Switched { draft: Option<Draft> },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRequest {
    Close,
    NeedsConfirmation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    Closed { draft: Option<Draft> },
    Kept,
}

#[derive(Clone)]
pub struct DraftReconciliationService {
    api: Arc<dyn DiaryApi>,
}

impl DraftReconciliationService {
    pub fn new(api: Arc<dyn DiaryApi>) -> Self {
        Self { api }
    }

    /// Switch templates right away when nothing would be lost, otherwise
    /// hold the switch until [`Self::resolve_template_switch`].
    pub fn request_template_switch(
        &self,
        session: &mut EditSession,
        new_kind: TemplateKind,
    ) -> Result<TemplateSwitch> {
        if session.entry_id().is_some() {
            return Err(AppError::TemplateLocked);
        }

        if session.form.template_kind() == new_kind {
            session.pending_switch = None;
            return Ok(TemplateSwitch::Unchanged);
        }

        if !session.needs_confirmation() {
            tracing::debug!("Switching template to {}", new_kind.as_str());
            session.apply_switch(new_kind);
            return Ok(TemplateSwitch::Switched);
        }

        session.pending_switch = Some(new_kind);
        Ok(TemplateSwitch::NeedsConfirmation)
    }

    pub async fn resolve_template_switch(
        &self,
        session: &mut EditSession,
        choice: SwitchChoice,
    ) -> Result<SwitchOutcome> {
        let kind = session.pending_switch.ok_or_else(|| {
            AppError::InvalidTransition("No template switch is pending".to_string())
        })?;

        match choice {
            SwitchChoice::Cancel => {
                session.pending_switch = None;
                Ok(SwitchOutcome::Cancelled)
            }
            SwitchChoice::Discard => {
                tracing::debug!("Discarding form and switching to {}", kind.as_str());
                session.apply_switch(kind);
                Ok(SwitchOutcome::Switched { draft: None })
            }
            SwitchChoice::SaveDraft => {
                let draft = self.save_draft(session).await?;
                session.apply_switch(kind);
                Ok(SwitchOutcome::Switched { draft: Some(draft) })
            }
        }
    }

    /// Open a draft in a create-mode session marked as draft-derived
    pub fn resume_draft(&self, draft: &Draft, today: NaiveDate) -> EditSession {
        tracing::debug!("Resuming draft {}", draft.id);

        let mut session = EditSession::create(EntryForm::from_draft(draft, today));
        session.source_draft = Some(draft.id);
        session
    }

    /// Closing an edit-mode session never prompts; its changes live only in
    /// the pending update.
    pub fn request_close(&self, session: &EditSession) -> CloseRequest {
        if session.entry_id().is_none() && session.needs_confirmation() {
            CloseRequest::NeedsConfirmation
        } else {
            CloseRequest::Close
        }
    }

    pub async fn resolve_close(
        &self,
        session: &EditSession,
        choice: SwitchChoice,
    ) -> Result<CloseOutcome> {
        match choice {
            SwitchChoice::Cancel => Ok(CloseOutcome::Kept),
            SwitchChoice::Discard => Ok(CloseOutcome::Closed { draft: None }),
            SwitchChoice::SaveDraft => {
                let draft = self.save_draft(session).await?;
                Ok(CloseOutcome::Closed { draft: Some(draft) })
            }
        }
    }

    async fn save_draft(&self, session: &EditSession) -> Result<Draft> {
        let req = session.form.to_draft_request(UNTITLED_DRAFT_TITLE);
        let draft = self.api.create_draft(req).await?;

        tracing::info!("Draft saved: {} ({})", draft.id, draft.title);

        Ok(draft)
    }
}
