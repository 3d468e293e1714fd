//! Services module
//!
//! Business logic that coordinates between the presentation layer and the
//! collaborators in [`crate::api`].

pub mod attachments;
pub mod drafts;
pub mod entries;
pub mod filters;
pub mod form;
pub mod local_api;
pub mod statistics;
pub mod summaries;
pub mod summary_generator;
pub mod tags;
pub mod view_mode;

pub use attachments::{AttachmentStaging, DeleteRequest};
pub use drafts::{DraftReconciliationService, EditMode, EditSession, SwitchChoice, TemplateSwitch};
pub use entries::{EntriesService, SubmitOutcome};
pub use filters::{DateRange, FilterEngine, FilterScope, FilterState};
pub use form::EntryForm;
pub use local_api::LocalDiaryApi;
pub use summaries::{
    MonthPeriod, MonthlySummaries, SummaryView, SummaryWorkflow, WeekPeriod, WeeklySummaries,
};
pub use summary_generator::StatisticsSummaryGenerator;
pub use tags::normalize_tags;
pub use view_mode::{ViewMode, ViewModeController};
