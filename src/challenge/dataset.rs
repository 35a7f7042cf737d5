use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;

use crate::challenge::clock::TOTAL_DAYS;
use crate::models::{DayDescriptor, DayStatus};

/// The syllabus, loaded once before anything is served and never reloaded.
#[derive(Debug, Clone)]
pub struct ChallengeDataset {
    days: Vec<DayDescriptor>,
}

/// Narrowing applied to the list of open days.
#[derive(Debug, Clone, Default)]
pub struct DayFilter {
    pub unit: Option<String>,
    pub search: Option<String>,
}

impl DayFilter {
    fn matches(&self, day: &DayDescriptor) -> bool {
        let unit_ok = match &self.unit {
            None => true,
            Some(u) => u.eq_ignore_ascii_case("all") || day.unit.eq_ignore_ascii_case(u),
        };
        let term = self
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default();
        let search_ok = term.is_empty()
            || day.day.to_string().contains(&term)
            || day.question1.title.to_lowercase().contains(&term)
            || day.question2.title.to_lowercase().contains(&term)
            || day.topics.iter().any(|t| t.to_lowercase().contains(&term));
        unit_ok && search_ok
    }
}

impl ChallengeDataset {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Reading challenge dataset {:?}", path))?;
        let days: Vec<DayDescriptor> =
            serde_json::from_str(&content).context("Parsing challenge dataset")?;
        let dataset = Self::from_days(days)?;
        info!("Loaded {} challenge days from {:?}", dataset.days.len(), path);
        Ok(dataset)
    }

    /// Days must be exactly 1..=TOTAL_DAYS, in order.
    pub fn from_days(days: Vec<DayDescriptor>) -> Result<Self> {
        if days.len() != TOTAL_DAYS as usize {
            bail!("Challenge dataset has {} days, expected {}", days.len(), TOTAL_DAYS);
        }
        for (i, d) in days.iter().enumerate() {
            let expected = i as u32 + 1;
            if d.day != expected {
                bail!("Challenge dataset entry {} is day {}, expected day {}", i, d.day, expected);
            }
        }
        Ok(Self { days })
    }

    pub fn days(&self) -> &[DayDescriptor] {
        &self.days
    }

    pub fn get(&self, day: u32) -> Option<&DayDescriptor> {
        day.checked_sub(1).and_then(|i| self.days.get(i as usize))
    }

    pub fn units(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.days
            .iter()
            .filter(|d| seen.insert(d.unit.clone()))
            .map(|d| d.unit.clone())
            .collect()
    }

    /// Open days matching `filter`, paired with their status.
    pub fn visible<'a>(
        &'a self,
        unlocked_day_count: u32,
        filter: &'a DayFilter,
    ) -> impl Iterator<Item = (&'a DayDescriptor, DayStatus)> + 'a {
        self.days
            .iter()
            .take_while(move |d| d.day <= unlocked_day_count)
            .filter(move |d| filter.matches(d))
            .map(move |d| {
                let status = if d.day == unlocked_day_count {
                    DayStatus::Today
                } else {
                    DayStatus::Unlocked
                };
                (d, status)
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::challenge::Question;

    pub(crate) fn sample_days() -> Vec<DayDescriptor> {
        (1..=TOTAL_DAYS)
            .map(|day| DayDescriptor {
                day,
                unit: format!("Unit {}", (day - 1) / 25 + 1),
                topics: if day % 2 == 0 {
                    vec!["Arrays".to_string()]
                } else {
                    vec!["Strings".to_string(), "Hashing".to_string()]
                },
                question1: Question {
                    title: format!("C warmup {}", day),
                    description: Some("Write a program.".to_string()),
                    difficulty: None,
                    link: None,
                },
                question2: Question {
                    title: if day == 7 { "Two Sum".to_string() } else { format!("Problem {}", day) },
                    description: None,
                    difficulty: Some("Easy".to_string()),
                    link: Some(format!("https://leetcode.com/problems/p{}/", day)),
                },
                solutions: None,
            })
            .collect()
    }

    pub(crate) fn sample_dataset() -> ChallengeDataset {
        ChallengeDataset::from_days(sample_days()).unwrap()
    }

    #[test]
    fn rejects_wrong_length_or_order() {
        let mut days = sample_days();
        days.pop();
        assert!(ChallengeDataset::from_days(days).is_err());

        let mut days = sample_days();
        days.swap(3, 4);
        assert!(ChallengeDataset::from_days(days).is_err());
    }

    #[test]
    fn loads_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("challenge.json");
        std::fs::write(&path, serde_json::to_string(&sample_days()).unwrap()).unwrap();
        let dataset = ChallengeDataset::load(&path).unwrap();
        assert_eq!(dataset.get(7).unwrap().question2.title, "Two Sum");
        assert!(dataset.get(0).is_none());
        assert!(dataset.get(101).is_none());
        assert_eq!(dataset.units(), vec!["Unit 1", "Unit 2", "Unit 3", "Unit 4"]);
    }

    #[test]
    fn only_open_days_are_visible() {
        let dataset = sample_dataset();
        let filter = DayFilter::default();
        let visible: Vec<_> = dataset.visible(10, &filter).collect();
        assert_eq!(visible.len(), 10);
        assert_eq!(visible[9].0.day, 10);
        assert_eq!(visible[9].1, DayStatus::Today);
        assert_eq!(visible[0].1, DayStatus::Unlocked);
        assert_eq!(dataset.visible(0, &filter).count(), 0);
    }

    #[test]
    fn filters_by_unit_and_search_term() {
        let dataset = sample_dataset();
        let by_unit = DayFilter { unit: Some("unit 2".into()), search: None };
        assert_eq!(dataset.visible(100, &by_unit).count(), 25);

        let by_title = DayFilter { unit: None, search: Some("two sum".into()) };
        let hits: Vec<u32> = dataset.visible(100, &by_title).map(|(d, _)| d.day).collect();
        assert_eq!(hits, vec![7]);

        let by_topic = DayFilter { unit: Some("All".into()), search: Some("hashing".into()) };
        assert_eq!(dataset.visible(10, &by_topic).count(), 5);

        let by_number = DayFilter { unit: None, search: Some("42".into()) };
        let hits: Vec<u32> = dataset.visible(100, &by_number).map(|(d, _)| d.day).collect();
        assert_eq!(hits, vec![42]);
    }
}
