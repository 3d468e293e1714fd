//! Statistics summary generator
//!
//! A deterministic [`SummaryGenerator`] that writes insight content from
//! entry statistics alone. Used by the local collaborator when no remote
//! generation service is configured.

use crate::api::{SummaryContent, SummaryGenerator, SummaryRequest};
use crate::config::DEFAULT_RATING;
use crate::database::{Mood, TemplateFields};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

const MAX_FOCUS_AREAS: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsSummaryGenerator;

#[async_trait]
impl SummaryGenerator for StatisticsSummaryGenerator {
    async fn generate(&self, request: SummaryRequest<'_>) -> Result<SummaryContent> {
        let stats = &request.statistics;
        let span = request.period.span()?;

        let mut content = format!(
            "{} {} across {} {} between {} and {}.",
            stats.total_entries,
            plural(stats.total_entries, "entry", "entries"),
            stats.active_days,
            plural(stats.active_days, "day", "days"),
            span.start,
            span.end
        );
        if let Some(mood) = stats.dominant_mood() {
            content.push_str(&format!(" The most common mood was {}.", mood.as_str()));
        }

        let mut achievements = Vec::new();
        let mut triggers: HashMap<&str, usize> = HashMap::new();
        let mut effectiveness = Vec::new();

        for entry in request.entries {
            match &entry.fields {
                TemplateFields::Milestone(fields) if !fields.milestone.trim().is_empty() => {
                    achievements.push(fields.milestone.trim().to_string());
                }
                TemplateFields::DailyBehavior(fields) => {
                    for trigger in &fields.triggers {
                        *triggers.entry(trigger.as_str()).or_default() += 1;
                    }
                }
                TemplateFields::Intervention(fields) => effectiveness.push(fields.effectiveness),
                _ => {}
            }
        }

        let mut focus_areas: Vec<(&str, usize)> = triggers.into_iter().collect();
        focus_areas.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        let mut progress_flags = Vec::new();
        if !effectiveness.is_empty() {
            let total: u32 = effectiveness.iter().map(|v| u32::from(*v)).sum();
            if total < u32::from(DEFAULT_RATING) * effectiveness.len() as u32 {
                progress_flags.push("interventions_below_midpoint".to_string());
            }
        }
        let difficult: usize = stats
            .child_moods
            .iter()
            .filter(|c| is_difficult(c.mood))
            .map(|c| c.count)
            .sum();
        let recorded: usize = stats.child_moods.iter().map(|c| c.count).sum();
        if recorded > 0 && difficult * 2 > recorded {
            progress_flags.push("mostly_difficult_moods".to_string());
        }

        Ok(SummaryContent {
            content,
            achievements,
            focus_areas: focus_areas
                .into_iter()
                .take(MAX_FOCUS_AREAS)
                .map(|(trigger, _)| trigger.to_string())
                .collect(),
            progress_flags,
        })
    }
}

fn is_difficult(mood: Mood) -> bool {
    matches!(
        mood,
        Mood::Anxious | Mood::Frustrated | Mood::Sad | Mood::Overwhelmed
    )
}

fn plural(count: usize, one: &'static str, many: &'static str) -> &'static str {
    if count == 1 {
        one
    } else {
        many
    }
}
