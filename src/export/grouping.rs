//! Partitioning and ranking participants for export

use crate::mapping::ClassificationTables;
use crate::model::{AgeGenderKey, AgeGenderMapping, BowStyle, Ordinal, ParticipantResult};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Participants of one federation category, ranked
#[derive(Debug, Clone)]
pub struct CategoryGroup<'a> {
    pub category: &'a AgeGenderMapping,
    pub participants: Vec<&'a ParticipantResult>,
}

impl<'a> CategoryGroup<'a> {
    /// `(place, participant)` with places starting at 1
    pub fn ranked(&self) -> impl Iterator<Item = (usize, &'a ParticipantResult)> + '_ {
        self.participants.iter().enumerate().map(|(i, p)| (i + 1, *p))
    }
}

/// Everything exported under one bow-style heading
#[derive(Debug, Clone)]
pub struct BowStyleGroup<'a> {
    pub bow_style: &'a BowStyle,
    /// Ordered by the numeric category code
    pub categories: Vec<CategoryGroup<'a>>,
}

impl BowStyleGroup<'_> {
    pub fn participant_count(&self) -> usize {
        self.categories.iter().map(|c| c.participants.len()).sum()
    }

    /// Rows the block occupies: one per participant plus a separator per category
    pub fn row_count(&self) -> u32 {
        (self.participant_count() + self.categories.len()) as u32
    }
}

/// Result of grouping a tournament's participants
#[derive(Debug, Clone, Default)]
pub struct Grouping<'a> {
    /// One entry per bow style that has participants, in ordinal order
    pub bow_styles: Vec<BowStyleGroup<'a>>,
    /// Participants whose equipment or age group has no mapping
    pub unmapped: Vec<&'a ParticipantResult>,
}

impl<'a> Grouping<'a> {
    pub fn group(&self, ordinal: Ordinal) -> Option<&BowStyleGroup<'a>> {
        self.bow_styles.iter().find(|g| g.bow_style.ordinal == ordinal)
    }
}

/// Higher score first (missing counts as 0), then name ascending
pub fn ranking_order(a: &ParticipantResult, b: &ParticipantResult) -> Ordering {
    b.score_or_zero()
        .cmp(&a.score_or_zero())
        .then_with(|| name_order(&a.name, &b.name))
}

/// Dictionary order for names: base letters first, then accents, then case
/// with lowercase before uppercase.
///
/// `adam < Bartek < Łukasz < Zenon`
pub fn name_order(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(&base_letters(b))
        .then_with(|| accented(a).cmp(&accented(b)))
        .then_with(|| uppercase_marks(a).cmp(&uppercase_marks(b)))
        .then_with(|| a.cmp(b))
}

/// Letters without a canonical decomposition, folded to their base letters
fn fold_letter(c: char) -> Option<&'static str> {
    Some(match c {
        'Ł' | 'ł' => "l",
        'Ø' | 'ø' => "o",
        'Đ' | 'đ' | 'Ð' | 'ð' => "d",
        'Ħ' | 'ħ' => "h",
        'ı' => "i",
        'ß' => "ss",
        'Æ' | 'æ' => "ae",
        'Œ' | 'œ' => "oe",
        'Þ' | 'þ' => "th",
        _ => return None,
    })
}

fn base_letters(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.nfd().filter(|c| !is_combining_mark(*c)) {
        match fold_letter(c) {
            Some(folded) => key.push_str(folded),
            None => key.extend(c.to_lowercase()),
        }
    }
    key
}

fn accented(name: &str) -> String {
    name.nfd().flat_map(char::to_lowercase).collect()
}

fn uppercase_marks(name: &str) -> Vec<bool> {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(char::is_uppercase)
        .collect()
}

/// Group participants by bow style then by age/gender category, ranking each category.
///
/// Participants without a bow style or category mapping are left out of the
/// groups and reported in [`Grouping::unmapped`].
pub fn group_participants<'a>(
    participants: &'a [ParticipantResult],
    tables: &'a ClassificationTables,
) -> Grouping<'a> {
    let mut by_equipment: BTreeMap<&str, Vec<&ParticipantResult>> = BTreeMap::new();
    for participant in participants {
        by_equipment
            .entry(participant.equipment_category_id.as_str())
            .or_default()
            .push(participant);
    }

    let mut unmapped = Vec::new();
    let mut by_style: BTreeMap<Ordinal, (&BowStyle, Vec<&ParticipantResult>)> = BTreeMap::new();
    for (equipment, members) in by_equipment {
        match tables.bow_style_for(equipment) {
            Some(style) => by_style
                .entry(style.ordinal)
                .or_insert_with(|| (style, Vec::new()))
                .1
                .extend(members),
            None => {
                log::warn!(
                    "No bow style mapped for equipment category {}; skipping {} participant(s)",
                    equipment,
                    members.len()
                );
                unmapped.extend(members);
            }
        }
    }

    let mut bow_styles = Vec::with_capacity(by_style.len());
    for (_, (style, members)) in by_style {
        let mut by_category: BTreeMap<AgeGenderKey, Vec<&ParticipantResult>> = BTreeMap::new();
        for participant in members {
            let key = AgeGenderKey::new(participant.age_group_id.clone(), participant.gender);
            by_category.entry(key).or_default().push(participant);
        }

        let mut categories = Vec::new();
        for (key, mut members) in by_category {
            let Some(category) = tables.age_gender_for(&key) else {
                log::warn!(
                    "No category mapped for age group {} / {} in {}; skipping {} participant(s)",
                    key.age_group_id,
                    key.gender,
                    style.code,
                    members.len()
                );
                unmapped.extend(members);
                continue;
            };
            members.sort_by(|a, b| ranking_order(a, b));
            categories.push(CategoryGroup {
                category,
                participants: members,
            });
        }
        categories.sort_by(|a, b| {
            a.category
                .sort_key()
                .cmp(&b.category.sort_key())
                .then_with(|| a.category.category_code.cmp(&b.category.category_code))
        });

        if !categories.is_empty() {
            bow_styles.push(BowStyleGroup {
                bow_style: style,
                categories,
            });
        }
    }

    Grouping {
        bow_styles,
        unmapped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::tests::{bow_style, federation_age_genders, federation_tables};
    use crate::model::Gender;

    fn archer(name: &str, equipment: &str, age: &str, gender: Gender, score: Option<i32>) -> ParticipantResult {
        let p = ParticipantResult::new(name.to_lowercase(), name, equipment, age, gender);
        match score {
            Some(s) => p.with_score(s),
            None => p,
        }
    }

    #[test]
    fn test_ranking_by_score_then_name() {
        let tables = federation_tables();
        let participants = vec![
            archer("Zed", "CU", "ADULT", Gender::Male, Some(280)),
            archer("Amy", "CU", "ADULT", Gender::Male, Some(280)),
            archer("Max", "CU", "ADULT", Gender::Male, Some(300)),
            archer("Noscore", "CU", "ADULT", Gender::Male, None),
            archer("Low", "CU", "ADULT", Gender::Male, Some(1)),
        ];

        let grouping = group_participants(&participants, &tables);
        let category = &grouping.bow_styles[0].categories[0];
        let ranked: Vec<(usize, &str)> = category.ranked().map(|(place, p)| (place, p.name.as_str())).collect();
        assert_eq!(
            ranked,
            vec![(1, "Max"), (2, "Amy"), (3, "Zed"), (4, "Low"), (5, "Noscore")]
        );
    }

    #[test]
    fn test_tied_scores_use_dictionary_name_order() {
        let tables = federation_tables();
        let participants = vec![
            archer("Bartek", "CU", "ADULT", Gender::Male, Some(250)),
            archer("Zenon", "CU", "ADULT", Gender::Male, Some(250)),
            archer("adam", "CU", "ADULT", Gender::Male, Some(250)),
            archer("Łukasz", "CU", "ADULT", Gender::Male, Some(250)),
        ];

        let grouping = group_participants(&participants, &tables);
        let names: Vec<&str> = grouping.bow_styles[0].categories[0]
            .participants
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["adam", "Bartek", "Łukasz", "Zenon"]);
    }

    #[test]
    fn test_name_order() {
        assert_eq!(name_order("Émile", "Eve"), Ordering::Less);
        assert_eq!(name_order("Eve", "Éve"), Ordering::Less);
        assert_eq!(name_order("adam", "Adam"), Ordering::Less);
        assert_eq!(name_order("Olsen", "Ørsted"), Ordering::Less);
        assert_eq!(name_order("Ørsted", "Pedersen"), Ordering::Less);
        assert_eq!(name_order("Świątek", "Szymon"), Ordering::Less);
        assert_eq!(name_order("Sam", "Sam"), Ordering::Equal);
    }

    #[test]
    fn test_identical_entries_keep_input_order() {
        let tables = federation_tables();
        let mut first = archer("Sam", "CU", "ADULT", Gender::Male, Some(250));
        first.id = "first".to_string();
        let mut second = archer("Sam", "CU", "ADULT", Gender::Male, Some(250));
        second.id = "second".to_string();
        let participants = vec![first, second];

        let grouping = group_participants(&participants, &tables);
        let ids: Vec<&str> = grouping.bow_styles[0].categories[0]
            .participants
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_blocks_in_ordinal_and_category_order() {
        let tables = federation_tables();
        let participants = vec![
            archer("A", "LB", "CUB", Gender::Female, Some(100)),
            archer("B", "LB", "ADULT", Gender::Female, Some(100)),
            archer("C", "CU", "CUB", Gender::Male, Some(100)),
            archer("D", "LB", "VETERAN", Gender::Male, Some(100)),
            archer("E", "BBR", "ADULT", Gender::Male, Some(100)),
        ];

        let grouping = group_participants(&participants, &tables);
        let codes: Vec<&str> = grouping.bow_styles.iter().map(|g| g.bow_style.code.as_str()).collect();
        assert_eq!(codes, vec!["CU", "BBR", "LB"]);

        // "11" sorts after "3" numerically
        let longbow = grouping.group(Ordinal::parse("10").unwrap()).unwrap();
        let labels: Vec<&str> = longbow
            .categories
            .iter()
            .map(|c| c.category.category_code.as_str())
            .collect();
        assert_eq!(labels, vec!["2", "3", "11"]);
        assert_eq!(longbow.row_count(), 6);
    }

    #[test]
    fn test_shared_bow_style_merges_equipment() {
        let mut rows = crate::mapping::tests::federation_bow_styles();
        rows.push(bow_style("LB-WOOD", "LB", "Longbow", "10"));
        let tables = ClassificationTables::new(rows, federation_age_genders()).unwrap();
        let participants = vec![
            archer("Ash", "LB-WOOD", "ADULT", Gender::Male, Some(200)),
            archer("Elm", "LB", "ADULT", Gender::Male, Some(210)),
        ];

        let grouping = group_participants(&participants, &tables);
        assert_eq!(grouping.bow_styles.len(), 1);
        let names: Vec<&str> = grouping.bow_styles[0].categories[0]
            .participants
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Elm", "Ash"]);
    }

    #[test]
    fn test_unmapped_participants_are_reported() {
        let tables = federation_tables();
        let participants = vec![
            archer("Kept", "CU", "ADULT", Gender::Male, Some(100)),
            archer("NoStyle", "CROSSBOW", "ADULT", Gender::Male, Some(100)),
            archer("NoCategory", "CU", "MASTER", Gender::Female, Some(100)),
        ];

        let grouping = group_participants(&participants, &tables);
        assert_eq!(grouping.bow_styles.len(), 1);
        assert_eq!(grouping.bow_styles[0].participant_count(), 1);

        let mut dropped: Vec<&str> = grouping.unmapped.iter().map(|p| p.name.as_str()).collect();
        dropped.sort();
        assert_eq!(dropped, vec!["NoCategory", "NoStyle"]);
    }

    #[test]
    fn test_no_participants() {
        let tables = federation_tables();
        let grouping = group_participants(&[], &tables);
        assert!(grouping.bow_styles.is_empty());
        assert!(grouping.unmapped.is_empty());
    }
}
