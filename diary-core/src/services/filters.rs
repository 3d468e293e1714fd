//! Filter engine
//!
//! One predicate evaluator shared by the calendar, list/drafts and insights
//! views. Each view applies a different subset of the criteria, chosen with
//! [`FilterScope`].

use crate::database::{Draft, Entry, Mood, TemplateKind};
use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Relative date-range bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateRange {
    #[default]
    All,
    Today,
    ThisWeek,
    ThisMonth,
    LastWeek,
    LastMonth,
}

impl DateRange {
    /// Whether `date` falls in the bucket, evaluated relative to `today`
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            DateRange::All => true,
            DateRange::Today => date == today,
            DateRange::ThisWeek => date >= week_start(today),
            DateRange::ThisMonth => date >= month_start(today),
            DateRange::LastWeek => {
                let this_week = week_start(today);
                date >= this_week - Duration::days(7) && date < this_week
            }
            DateRange::LastMonth => {
                let this_month = month_start(today);
                let last_month = month_start(this_month - Duration::days(1));
                date >= last_month && date < this_month
            }
        }
    }
}

/// Most recent Sunday on or before `today`
pub(crate) fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
}

fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

/// Shared filter criteria. `None` selectors mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    pub mood: Option<Mood>,
    pub child: Option<i64>,
    pub entry_type: Option<TemplateKind>,
    pub date_range: DateRange,
    /// Matched if a candidate carries any of these
    pub tags: Vec<String>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        *self == FilterState::default()
    }
}

/// Which criteria a view applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScope {
    /// Calendar cell lookup: the cell fixes the date, so the date range is skipped
    Calendar,
    /// List and drafts browsing: every criterion
    Browse,
    /// Insights aggregate statistics: child and date range only
    InsightStatistics,
}

impl FilterScope {
    fn applies_content_criteria(&self) -> bool {
        !matches!(self, FilterScope::InsightStatistics)
    }

    fn applies_date_range(&self) -> bool {
        !matches!(self, FilterScope::Calendar)
    }
}

/// Common view of an entry or draft for filtering
#[derive(Debug, Clone, Copy)]
pub struct FilterCandidate<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub tags: &'a [String],
    pub guardian_mood: Option<Mood>,
    pub child_mood: Option<Mood>,
    pub child_id: Option<i64>,
    pub template_kind: TemplateKind,
    pub date: Option<NaiveDate>,
}

pub trait Filterable {
    fn candidate(&self) -> FilterCandidate<'_>;
}

impl Filterable for Entry {
    fn candidate(&self) -> FilterCandidate<'_> {
        FilterCandidate {
            title: &self.title,
            content: self.content(),
            tags: &self.tags,
            guardian_mood: self.guardian_mood,
            child_mood: self.child_mood,
            child_id: self.child_id,
            template_kind: self.template_kind(),
            date: Some(self.entry_date),
        }
    }
}

impl Filterable for Draft {
    fn candidate(&self) -> FilterCandidate<'_> {
        FilterCandidate {
            title: &self.title,
            content: self.fields.narrative(),
            tags: &self.tags,
            guardian_mood: self.guardian_mood,
            child_mood: self.child_mood,
            child_id: self.child_id,
            template_kind: self.entry_type,
            date: self.entry_date,
        }
    }
}

/// Stateless predicate evaluator
pub struct FilterEngine;

impl FilterEngine {
    /// Evaluate `state` against one candidate
    pub fn matches(
        state: &FilterState,
        candidate: &FilterCandidate<'_>,
        scope: FilterScope,
        today: NaiveDate,
    ) -> bool {
        if let Some(child) = state.child {
            if candidate.child_id != Some(child) {
                return false;
            }
        }

        if scope.applies_date_range() && state.date_range != DateRange::All {
            match candidate.date {
                Some(date) if state.date_range.contains(date, today) => {}
                _ => return false,
            }
        }

        if !scope.applies_content_criteria() {
            return true;
        }

        matches_search(&state.search, candidate)
            && state.mood.map_or(true, |mood| {
                candidate.guardian_mood == Some(mood) || candidate.child_mood == Some(mood)
            })
            && state
                .entry_type
                .map_or(true, |kind| candidate.template_kind == kind)
            && (state.tags.is_empty() || candidate.tags.iter().any(|t| state.tags.contains(t)))
    }

    /// Items matching `state` in `scope`, in their original order
    pub fn filter<'a, T: Filterable>(
        items: &'a [T],
        state: &FilterState,
        scope: FilterScope,
        today: NaiveDate,
    ) -> Vec<&'a T> {
        items
            .iter()
            .filter(|item| Self::matches(state, &item.candidate(), scope, today))
            .collect()
    }

    pub fn filter_entries<'a>(
        entries: &'a [Entry],
        state: &FilterState,
        today: NaiveDate,
    ) -> Vec<&'a Entry> {
        Self::filter(entries, state, FilterScope::Browse, today)
    }

    pub fn filter_drafts<'a>(
        drafts: &'a [Draft],
        state: &FilterState,
        today: NaiveDate,
    ) -> Vec<&'a Draft> {
        Self::filter(drafts, state, FilterScope::Browse, today)
    }

    /// Entries for one calendar cell
    pub fn entries_for_day<'a>(
        entries: &'a [Entry],
        day: NaiveDate,
        state: &FilterState,
    ) -> Vec<&'a Entry> {
        entries
            .iter()
            .filter(|entry| entry.entry_date == day)
            .filter(|entry| Self::matches(state, &entry.candidate(), FilterScope::Calendar, day))
            .collect()
    }

    /// Entries feeding the insights statistics panel
    pub fn entries_for_statistics<'a>(
        entries: &'a [Entry],
        state: &FilterState,
        today: NaiveDate,
    ) -> Vec<&'a Entry> {
        Self::filter(entries, state, FilterScope::InsightStatistics, today)
    }

    /// Today's date in local time
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }
}

fn matches_search(search: &str, candidate: &FilterCandidate<'_>) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    candidate.title.to_lowercase().contains(&needle)
        || candidate.content.to_lowercase().contains(&needle)
        || candidate
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}
