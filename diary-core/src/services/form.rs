//! Entry form model
//!
//! The in-progress editor state. Template-specific fields live in a
//! [`TemplateFields`] variant, so each template only carries its own data.
//! Common fields (moods, tags) sit next to it and survive template resets.

use crate::config::{DEFAULT_RATING, MAX_RATING, MIN_RATING};
use crate::database::{
    CreateDraftRequest, CreateEntryRequest, Draft, Entry, Mood, TemplateFields, TemplateKind,
    UpdateEntryRequest,
};
use crate::error::{AppError, Result};
use crate::services::tags::normalize_tags;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryForm {
    pub child_id: Option<i64>,
    pub entry_date: NaiveDate,
    pub title: String,
    pub guardian_mood: Option<Mood>,
    pub child_mood: Option<Mood>,
    pub tags: Vec<String>,
    pub fields: TemplateFields,
}

impl EntryForm {
    pub fn blank(kind: TemplateKind, entry_date: NaiveDate, child_id: Option<i64>) -> Self {
        Self {
            child_id,
            entry_date,
            title: String::new(),
            guardian_mood: None,
            child_mood: None,
            tags: Vec::new(),
            fields: TemplateFields::blank(kind),
        }
    }

    pub fn template_kind(&self) -> TemplateKind {
        self.fields.kind()
    }

    /// Whether the template-specific part of the form holds user input
    pub fn has_meaningful_data(&self) -> bool {
        self.fields.has_meaningful_data(&self.title)
    }

    /// Whether any template-agnostic field differs from a blank form
    pub fn has_common_data(&self) -> bool {
        self.guardian_mood.is_some() || self.child_mood.is_some() || !self.tags.is_empty()
    }

    /// Replace the form with a blank one of `kind`.
    ///
    /// Moods, tags, child and date carry over; title and every
    /// template-specific field are cleared.
    pub fn reset_to(&mut self, kind: TemplateKind) {
        self.title.clear();
        self.fields = TemplateFields::blank(kind);
    }

    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            child_id: entry.child_id,
            entry_date: entry.entry_date,
            title: entry.title.clone(),
            guardian_mood: entry.guardian_mood,
            child_mood: entry.child_mood,
            tags: entry.tags.clone(),
            fields: entry.fields.clone(),
        }
    }

    /// Load a draft verbatim. Drafts saved without a date land on `fallback_date`.
    pub fn from_draft(draft: &Draft, fallback_date: NaiveDate) -> Self {
        Self {
            child_id: draft.child_id,
            entry_date: draft.entry_date.unwrap_or(fallback_date),
            title: draft.title.clone(),
            guardian_mood: draft.guardian_mood,
            child_mood: draft.child_mood,
            tags: draft.tags.clone(),
            fields: draft.fields.clone(),
        }
    }

    pub fn to_create_request(&self) -> Result<CreateEntryRequest> {
        self.fields.validate()?;

        Ok(CreateEntryRequest {
            child_id: self.child_id,
            entry_date: self.entry_date,
            title: self.title.trim().to_string(),
            guardian_mood: self.guardian_mood,
            child_mood: self.child_mood,
            tags: normalize_tags(&self.tags),
            fields: self.fields.clone(),
        })
    }

    pub fn to_update_request(&self, id: i64) -> Result<UpdateEntryRequest> {
        let req = self.to_create_request()?;

        Ok(UpdateEntryRequest {
            id,
            child_id: req.child_id,
            entry_date: req.entry_date,
            title: req.title,
            guardian_mood: req.guardian_mood,
            child_mood: req.child_mood,
            tags: req.tags,
            fields: req.fields,
        })
    }

    /// Draft request for the current form; a blank title becomes `untitled`
    pub fn to_draft_request(&self, untitled: &str) -> CreateDraftRequest {
        let title = self.title.trim();

        CreateDraftRequest {
            title: if title.is_empty() {
                untitled.to_string()
            } else {
                title.to_string()
            },
            child_id: self.child_id,
            entry_date: Some(self.entry_date),
            guardian_mood: self.guardian_mood,
            child_mood: self.child_mood,
            tags: normalize_tags(&self.tags),
            fields: self.fields.clone(),
        }
    }
}

impl TemplateFields {
    /// Per-template "has the user typed anything" rule.
    ///
    /// Free-form counts the title and content. Rating templates count any
    /// non-empty list or any rating moved off the midpoint. Milestones count
    /// their text fields and skills.
    pub fn has_meaningful_data(&self, title: &str) -> bool {
        match self {
            TemplateFields::FreeForm { content } => !is_blank(title) || !is_blank(content),
            TemplateFields::DailyBehavior(f) => {
                !f.behaviors.is_empty()
                    || !f.triggers.is_empty()
                    || !f.strategies.is_empty()
                    || f.behavior_rating != DEFAULT_RATING
            }
            TemplateFields::EmotionCheckIn(f) => {
                !f.emotions.is_empty()
                    || !f.coping_strategies.is_empty()
                    || f.intensity != DEFAULT_RATING
                    || f.regulation != DEFAULT_RATING
            }
            TemplateFields::Intervention(f) => {
                !f.interventions.is_empty()
                    || !f.responses.is_empty()
                    || f.effectiveness != DEFAULT_RATING
            }
            TemplateFields::Milestone(f) => {
                !is_blank(&f.milestone) || !is_blank(&f.description) || !f.skills.is_empty()
            }
        }
    }

    /// Reject ratings outside the accepted scale
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.ratings() {
            if !(MIN_RATING..=MAX_RATING).contains(&value) {
                return Err(AppError::Validation(format!(
                    "{} must be between {} and {} (got {})",
                    name, MIN_RATING, MAX_RATING, value
                )));
            }
        }
        Ok(())
    }

    fn ratings(&self) -> Vec<(&'static str, u8)> {
        match self {
            TemplateFields::DailyBehavior(f) => vec![("behavior_rating", f.behavior_rating)],
            TemplateFields::EmotionCheckIn(f) => {
                vec![("intensity", f.intensity), ("regulation", f.regulation)]
            }
            TemplateFields::Intervention(f) => vec![("effectiveness", f.effectiveness)],
            TemplateFields::FreeForm { .. } | TemplateFields::Milestone(_) => Vec::new(),
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
