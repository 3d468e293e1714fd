//! Entry statistics
//!
//! Aggregate counts shown on the insights panel and embedded in generated
//! insights.

use crate::config::TOP_TAG_COUNT;
use crate::database::{
    Entry, EntryStatistics, Mood, MoodCount, TagCount, TemplateCount, TemplateKind,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

impl EntryStatistics {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let mut total_entries = 0;
        let mut days = BTreeSet::new();
        let mut guardian: BTreeMap<Mood, usize> = BTreeMap::new();
        let mut child: BTreeMap<Mood, usize> = BTreeMap::new();
        let mut templates: BTreeMap<TemplateKind, usize> = BTreeMap::new();
        // lowercased tag -> (first-seen casing, count, first position)
        let mut tags: HashMap<String, (String, usize, usize)> = HashMap::new();

        for entry in entries {
            total_entries += 1;
            days.insert(entry.entry_date);

            if let Some(mood) = entry.guardian_mood {
                *guardian.entry(mood).or_default() += 1;
            }
            if let Some(mood) = entry.child_mood {
                *child.entry(mood).or_default() += 1;
            }
            *templates.entry(entry.template_kind()).or_default() += 1;

            for tag in &entry.tags {
                let position = tags.len();
                tags.entry(tag.to_lowercase())
                    .or_insert_with(|| (tag.clone(), 0, position))
                    .1 += 1;
            }
        }

        let mut top_tags: Vec<(String, usize, usize)> = tags.into_values().collect();
        top_tags.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        Self {
            total_entries,
            active_days: days.len(),
            guardian_moods: mood_counts(guardian),
            child_moods: mood_counts(child),
            top_tags: top_tags
                .into_iter()
                .take(TOP_TAG_COUNT)
                .map(|(tag, count, _)| TagCount { tag, count })
                .collect(),
            templates: templates
                .into_iter()
                .map(|(template, count)| TemplateCount { template, count })
                .collect(),
        }
    }

    /// Most frequent mood across both roles. Ties go to the earlier mood in
    /// [`Mood::ALL`] order.
    pub fn dominant_mood(&self) -> Option<Mood> {
        let mut totals: BTreeMap<Mood, usize> = BTreeMap::new();
        for count in self.guardian_moods.iter().chain(&self.child_moods) {
            *totals.entry(count.mood).or_default() += count.count;
        }

        totals
            .into_iter()
            .fold(None, |best: Option<(Mood, usize)>, (mood, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((mood, count)),
            })
            .map(|(mood, _)| mood)
    }
}

fn mood_counts(counts: BTreeMap<Mood, usize>) -> Vec<MoodCount> {
    counts
        .into_iter()
        .map(|(mood, count)| MoodCount { mood, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::TemplateFields;
    use chrono::{NaiveDate, Utc};

    fn entry(day: u32, tags: &[&str], guardian: Option<Mood>, child: Option<Mood>) -> Entry {
        Entry {
            id: i64::from(day),
            child_id: None,
            entry_date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            title: String::new(),
            guardian_mood: guardian,
            child_mood: child,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            fields: TemplateFields::blank(TemplateKind::FreeForm),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts() {
        let entries = vec![
            entry(1, &["park", "sun"], Some(Mood::Happy), Some(Mood::Happy)),
            entry(1, &["Park"], Some(Mood::Tired), None),
            entry(3, &["rain"], None, Some(Mood::Sad)),
        ];

        let stats = EntryStatistics::from_entries(&entries);

        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.active_days, 2);
        assert_eq!(stats.top_tags[0], TagCount { tag: "park".to_string(), count: 2 });
        assert_eq!(stats.top_tags.len(), 3);
        assert_eq!(
            stats.templates,
            vec![TemplateCount { template: TemplateKind::FreeForm, count: 3 }]
        );
        assert_eq!(stats.dominant_mood(), Some(Mood::Happy));
    }

    #[test]
    fn test_empty() {
        let entries: Vec<Entry> = Vec::new();
        let stats = EntryStatistics::from_entries(&entries);
        assert_eq!(stats, EntryStatistics::default());
        assert_eq!(stats.dominant_mood(), None);
    }
}
