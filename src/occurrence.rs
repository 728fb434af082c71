use crate::{fingerprint::OriginKey, template::Template};
use indexmap::IndexMap;
use std::path::PathBuf;

/// One line that matched a template, with enough provenance to find it again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occurrence {
    pub line: String,
    pub loader: Option<char>,
    pub file: PathBuf,
}

/// Occurrences of one delimiter, grouped by template label then origin.
/// Both levels keep first-seen order.
#[derive(Debug, Default)]
pub struct OccurrenceIndex {
    groups: IndexMap<Template, IndexMap<OriginKey, Vec<Occurrence>>>,
}

impl OccurrenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, template: &Template, origin: &OriginKey, occurrence: Occurrence) {
        if !self.groups.contains_key(template) {
            self.groups.insert(template.clone(), IndexMap::new());
        }
        let origins = &mut self.groups[template];
        if !origins.contains_key(origin) {
            origins.insert(origin.clone(), Vec::new());
        }
        origins[origin].push(occurrence);
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Every (template label, origin, occurrences) group in first-seen order.
    pub fn groups(&self) -> impl Iterator<Item = (&Template, &OriginKey, &[Occurrence])> {
        self.groups.iter().flat_map(|(template, origins)| {
            origins
                .iter()
                .map(move |(origin, occurrences)| (template, origin, occurrences.as_slice()))
        })
    }

    pub fn occurrence_count(&self) -> usize {
        self.groups().map(|(_, _, occurrences)| occurrences.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(text: &str) -> Template {
        Template::from_window(&text.split_whitespace().map(String::from).collect::<Vec<_>>())
    }

    fn occurrence(line: &str) -> Occurrence {
        Occurrence {
            line: line.into(),
            loader: Some('3'),
            file: PathBuf::from("loader3-2020-01-03.log"),
        }
    }

    #[test]
    fn groups_keep_encounter_order() {
        let mut index = OccurrenceIndex::new();
        let first = template("a b c d e f g h i");
        let second = template("1 2 3 4 5 6 7 8 9");
        let cme = OriginKey {
            venue: "CME".into(),
            date: "20200103".into(),
        };
        let nym = OriginKey {
            venue: "NYM".into(),
            date: "20200103".into(),
        };
        index.record(&second, &nym, occurrence("l1"));
        index.record(&first, &cme, occurrence("l2"));
        index.record(&second, &cme, occurrence("l3"));
        index.record(&second, &nym, occurrence("l4"));

        let groups: Vec<_> = index
            .groups()
            .map(|(t, o, occ)| (t.clone(), o.venue.clone(), occ.iter().map(|o| o.line.clone()).collect::<Vec<_>>()))
            .collect();
        assert_eq!(
            groups,
            vec![
                (second.clone(), "NYM".to_string(), vec!["l1".to_string(), "l4".to_string()]),
                (second, "CME".to_string(), vec!["l3".to_string()]),
                (first, "CME".to_string(), vec!["l2".to_string()]),
            ]
        );
        assert_eq!(index.occurrence_count(), 4);

        index.clear();
        assert!(index.is_empty());
    }
}
