//! Database models
//!
//! Rust structs representing diary entities.
//! All models use serde for serialization to the presentation layer.
//! Row structs mirror the SQLite columns and convert into the domain
//! models, decoding JSON and enum columns on the way.

use crate::config::DEFAULT_RATING;
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Mood tag recorded for the guardian and for the child
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Happy,
    Calm,
    Neutral,
    Tired,
    Anxious,
    Frustrated,
    Sad,
    Overwhelmed,
}

impl Mood {
    pub const ALL: [Mood; 8] = [
        Mood::Happy,
        Mood::Calm,
        Mood::Neutral,
        Mood::Tired,
        Mood::Anxious,
        Mood::Frustrated,
        Mood::Sad,
        Mood::Overwhelmed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Calm => "calm",
            Self::Neutral => "neutral",
            Self::Tired => "tired",
            Self::Anxious => "anxious",
            Self::Frustrated => "frustrated",
            Self::Sad => "sad",
            Self::Overwhelmed => "overwhelmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mood| mood.as_str() == s)
    }
}

/// The structured field shape an entry uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    FreeForm,
    DailyBehavior,
    EmotionCheckIn,
    Intervention,
    Milestone,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 5] = [
        TemplateKind::FreeForm,
        TemplateKind::DailyBehavior,
        TemplateKind::EmotionCheckIn,
        TemplateKind::Intervention,
        TemplateKind::Milestone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FreeForm => "free_form",
            Self::DailyBehavior => "daily_behavior",
            Self::EmotionCheckIn => "emotion_check_in",
            Self::Intervention => "intervention",
            Self::Milestone => "milestone",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBehaviorFields {
    /// Behaviour chips observed during the day
    pub behaviors: Vec<String>,
    pub triggers: Vec<String>,
    pub strategies: Vec<String>,
    pub behavior_rating: u8,
    pub notes: String,
}

impl Default for DailyBehaviorFields {
    fn default() -> Self {
        Self {
            behaviors: Vec::new(),
            triggers: Vec::new(),
            strategies: Vec::new(),
            behavior_rating: DEFAULT_RATING,
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionCheckInFields {
    pub emotions: Vec<String>,
    pub coping_strategies: Vec<String>,
    pub intensity: u8,
    pub regulation: u8,
    pub notes: String,
}

impl Default for EmotionCheckInFields {
    fn default() -> Self {
        Self {
            emotions: Vec::new(),
            coping_strategies: Vec::new(),
            intensity: DEFAULT_RATING,
            regulation: DEFAULT_RATING,
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionFields {
    pub interventions: Vec<String>,
    pub responses: Vec<String>,
    pub effectiveness: u8,
    pub notes: String,
}

impl Default for InterventionFields {
    fn default() -> Self {
        Self {
            interventions: Vec::new(),
            responses: Vec::new(),
            effectiveness: DEFAULT_RATING,
            notes: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneFields {
    pub milestone: String,
    pub description: String,
    pub skills: Vec<String>,
}

/// Template-specific fields, one variant per template kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum TemplateFields {
    FreeForm { content: String },
    DailyBehavior(DailyBehaviorFields),
    EmotionCheckIn(EmotionCheckInFields),
    Intervention(InterventionFields),
    Milestone(MilestoneFields),
}

impl TemplateFields {
    /// Fresh fields for a template kind, ratings at their midpoint
    pub fn blank(kind: TemplateKind) -> Self {
        match kind {
            TemplateKind::FreeForm => Self::FreeForm {
                content: String::new(),
            },
            TemplateKind::DailyBehavior => Self::DailyBehavior(DailyBehaviorFields::default()),
            TemplateKind::EmotionCheckIn => Self::EmotionCheckIn(EmotionCheckInFields::default()),
            TemplateKind::Intervention => Self::Intervention(InterventionFields::default()),
            TemplateKind::Milestone => Self::Milestone(MilestoneFields::default()),
        }
    }

    pub fn kind(&self) -> TemplateKind {
        match self {
            Self::FreeForm { .. } => TemplateKind::FreeForm,
            Self::DailyBehavior(_) => TemplateKind::DailyBehavior,
            Self::EmotionCheckIn(_) => TemplateKind::EmotionCheckIn,
            Self::Intervention(_) => TemplateKind::Intervention,
            Self::Milestone(_) => TemplateKind::Milestone,
        }
    }

    /// The free-text narrative carried by the template
    pub fn narrative(&self) -> &str {
        match self {
            Self::FreeForm { content } => content,
            Self::DailyBehavior(fields) => &fields.notes,
            Self::EmotionCheckIn(fields) => &fields.notes,
            Self::Intervention(fields) => &fields.notes,
            Self::Milestone(fields) => &fields.description,
        }
    }
}

/// A committed diary record for a given date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    /// `None` for general entries not scoped to a child
    pub child_id: Option<i64>,
    pub entry_date: NaiveDate,
    pub title: String,
    pub guardian_mood: Option<Mood>,
    pub child_mood: Option<Mood>,
    pub tags: Vec<String>,
    pub fields: TemplateFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn template_kind(&self) -> TemplateKind {
        self.fields.kind()
    }

    pub fn content(&self) -> &str {
        self.fields.narrative()
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct EntryRow {
    pub id: i64,
    pub child_id: Option<i64>,
    pub entry_date: NaiveDate,
    pub title: String,
    pub template_kind: String,
    pub guardian_mood: Option<String>,
    pub child_mood: Option<String>,
    pub tags_json: String,
    pub fields_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for Entry {
    type Error = AppError;

    fn try_from(row: EntryRow) -> Result<Self> {
        let fields: TemplateFields = serde_json::from_str(&row.fields_json)?;
        check_template_column(&row.template_kind, &fields)?;

        Ok(Entry {
            id: row.id,
            child_id: row.child_id,
            entry_date: row.entry_date,
            title: row.title,
            guardian_mood: parse_mood_column(row.guardian_mood)?,
            child_mood: parse_mood_column(row.child_mood)?,
            tags: serde_json::from_str(&row.tags_json)?,
            fields,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Create entry request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEntryRequest {
    pub child_id: Option<i64>,
    pub entry_date: NaiveDate,
    pub title: String,
    pub guardian_mood: Option<Mood>,
    pub child_mood: Option<Mood>,
    pub tags: Vec<String>,
    pub fields: TemplateFields,
}

/// Update entry request. Replaces every editable field; the template kind
/// carried by `fields` must match the stored entry.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEntryRequest {
    pub id: i64,
    pub child_id: Option<i64>,
    pub entry_date: NaiveDate,
    pub title: String,
    pub guardian_mood: Option<Mood>,
    pub child_mood: Option<Mood>,
    pub tags: Vec<String>,
    pub fields: TemplateFields,
}

/// Inclusive calendar date span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateSpan {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// An uncommitted, resumable in-progress entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: i64,
    pub title: String,
    /// Denormalized from `fields` for filtering
    pub entry_type: TemplateKind,
    pub child_id: Option<i64>,
    pub entry_date: Option<NaiveDate>,
    pub guardian_mood: Option<Mood>,
    pub child_mood: Option<Mood>,
    pub tags: Vec<String>,
    pub fields: TemplateFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub(crate) struct DraftRow {
    pub id: i64,
    pub title: String,
    pub entry_type: String,
    pub child_id: Option<i64>,
    pub entry_date: Option<NaiveDate>,
    pub guardian_mood: Option<String>,
    pub child_mood: Option<String>,
    pub tags_json: String,
    pub fields_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DraftRow> for Draft {
    type Error = AppError;

    fn try_from(row: DraftRow) -> Result<Self> {
        let fields: TemplateFields = serde_json::from_str(&row.fields_json)?;
        check_template_column(&row.entry_type, &fields)?;

        Ok(Draft {
            id: row.id,
            title: row.title,
            entry_type: fields.kind(),
            child_id: row.child_id,
            entry_date: row.entry_date,
            guardian_mood: parse_mood_column(row.guardian_mood)?,
            child_mood: parse_mood_column(row.child_mood)?,
            tags: serde_json::from_str(&row.tags_json)?,
            fields,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Create draft request
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDraftRequest {
    pub title: String,
    pub child_id: Option<i64>,
    pub entry_date: Option<NaiveDate>,
    pub guardian_mood: Option<Mood>,
    pub child_mood: Option<Mood>,
    pub tags: Vec<String>,
    pub fields: TemplateFields,
}

/// Declared media kind of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            _ => None,
        }
    }

    /// Infer the media kind from a MIME type string
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let parsed: mime::Mime = mime_type.parse().ok()?;
        match parsed.type_() {
            mime::IMAGE => Some(Self::Image),
            mime::VIDEO => Some(Self::Video),
            _ => None,
        }
    }
}

/// Media file linked to an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub entry_id: i64,
    /// Publicly resolvable location returned by object storage
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    pub media_kind: MediaKind,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub(crate) struct AttachmentRow {
    pub id: i64,
    pub entry_id: i64,
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    pub media_kind: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AttachmentRow> for Attachment {
    type Error = AppError;

    fn try_from(row: AttachmentRow) -> Result<Self> {
        let media_kind = MediaKind::parse(&row.media_kind)
            .ok_or_else(|| AppError::Generic(format!("Unknown media kind: {}", row.media_kind)))?;

        Ok(Attachment {
            id: row.id,
            entry_id: row.entry_id,
            url: row.url,
            filename: row.filename,
            mime_type: row.mime_type,
            media_kind,
            size: row.size,
            created_at: row.created_at,
        })
    }
}

/// Create attachment request: metadata recorded after a successful upload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAttachmentRequest {
    pub entry_id: i64,
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
}

/// A file selected in the editor but not uploaded yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl PendingFile {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Period granularity of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Month,
    Week,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Week => "week",
        }
    }
}

/// The period an insight summarizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "granularity", rename_all = "snake_case")]
pub enum InsightPeriod {
    Month { month: u32, year: i32 },
    Week { start: NaiveDate, end: NaiveDate },
}

impl InsightPeriod {
    pub fn granularity(&self) -> Granularity {
        match self {
            Self::Month { .. } => Granularity::Month,
            Self::Week { .. } => Granularity::Week,
        }
    }

    /// Calendar days covered by the period
    pub fn span(&self) -> Result<DateSpan> {
        match *self {
            Self::Month { month, year } => {
                let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
                    AppError::Validation(format!("Invalid month: {}-{}", year, month))
                })?;
                let (next_year, next_month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
                    .and_then(|d| d.pred_opt())
                    .ok_or_else(|| {
                        AppError::Validation(format!("Invalid month: {}-{}", year, month))
                    })?;
                Ok(DateSpan::new(start, end))
            }
            Self::Week { start, end } => {
                if end < start {
                    return Err(AppError::Validation(format!(
                        "Week ends ({}) before it starts ({})",
                        end, start
                    )));
                }
                Ok(DateSpan::new(start, end))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodCount {
    pub mood: Mood,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCount {
    pub template: TemplateKind,
    pub count: usize,
}

/// Aggregate counts over a set of entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStatistics {
    pub total_entries: usize,
    /// Distinct days with at least one entry
    pub active_days: usize,
    pub guardian_moods: Vec<MoodCount>,
    pub child_moods: Vec<MoodCount>,
    pub top_tags: Vec<TagCount>,
    pub templates: Vec<TemplateCount>,
}

/// Structured sub-sections of a generated insight
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightSections {
    pub achievements: Vec<String>,
    pub focus_areas: Vec<String>,
    pub progress_flags: Vec<String>,
    pub statistics: EntryStatistics,
}

/// A generated summary over a week or month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: i64,
    /// `None` for an aggregate across all children
    pub child_id: Option<i64>,
    pub period: InsightPeriod,
    pub content: String,
    pub sections: InsightSections,
    pub saved: bool,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub(crate) struct InsightRow {
    pub id: i64,
    pub child_id: Option<i64>,
    pub granularity: String,
    pub month: Option<i64>,
    pub year: Option<i64>,
    pub week_start: Option<NaiveDate>,
    pub week_end: Option<NaiveDate>,
    pub content: String,
    pub sections_json: String,
    pub saved: bool,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<InsightRow> for Insight {
    type Error = AppError;

    fn try_from(row: InsightRow) -> Result<Self> {
        let period = match (
            row.granularity.as_str(),
            row.month,
            row.year,
            row.week_start,
            row.week_end,
        ) {
            ("month", Some(month), Some(year), _, _) => InsightPeriod::Month {
                month: u32::try_from(month)
                    .map_err(|_| AppError::Generic(format!("Invalid insight month: {}", month)))?,
                year: i32::try_from(year)
                    .map_err(|_| AppError::Generic(format!("Invalid insight year: {}", year)))?,
            },
            ("week", _, _, Some(start), Some(end)) => InsightPeriod::Week { start, end },
            (other, ..) => {
                return Err(AppError::Generic(format!(
                    "Malformed insight period for insight {}: {}",
                    row.id, other
                )))
            }
        };

        Ok(Insight {
            id: row.id,
            child_id: row.child_id,
            period,
            content: row.content,
            sections: serde_json::from_str(&row.sections_json)?,
            saved: row.saved,
            read: row.read,
            created_at: row.created_at,
        })
    }
}

/// Generated insight content ready to be stored
#[derive(Debug, Clone)]
pub struct NewInsight {
    pub child_id: Option<i64>,
    pub period: InsightPeriod,
    pub content: String,
    pub sections: InsightSections,
}

fn parse_mood_column(value: Option<String>) -> Result<Option<Mood>> {
    value
        .map(|s| Mood::parse(&s).ok_or_else(|| AppError::Generic(format!("Unknown mood: {}", s))))
        .transpose()
}

fn check_template_column(column: &str, fields: &TemplateFields) -> Result<()> {
    match TemplateKind::parse(column) {
        Some(kind) if kind == fields.kind() => Ok(()),
        _ => Err(AppError::Generic(format!(
            "Template column '{}' does not match stored fields ({})",
            column,
            fields.kind().as_str()
        ))),
    }
}
