//! Case-insensitive substring filter over title and description.

use crate::Item;

/// Normalized search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSearch {
    needle: String,
}

impl ItemSearch {
    /// `None` for an absent or empty term: no filtering at all.
    pub fn new(term: Option<&str>) -> Option<Self> {
        let term = term?;
        if term.is_empty() {
            return None;
        }
        Some(Self {
            needle: term.to_lowercase(),
        })
    }

    /// The lowercased term, for stores that push the filter down.
    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn matches(&self, item: &Item) -> bool {
        item.title.to_lowercase().contains(&self.needle)
            || item
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&self.needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::{ItemId, UserId};
    use chrono::Utc;
    use proptest::prelude::*;

    fn item(title: &str, description: Option<&str>) -> Item {
        Item {
            id: ItemId::new(1),
            title: title.to_string(),
            description: description.map(str::to_string),
            price: None,
            is_available: true,
            owner_id: UserId::new(1),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn empty_term_disables_filtering() {
        assert_eq!(ItemSearch::new(None), None);
        assert_eq!(ItemSearch::new(Some("")), None);
    }

    #[test]
    fn whitespace_term_is_matched_literally() {
        let search = ItemSearch::new(Some(" ")).unwrap();
        assert!(search.matches(&item("Desk lamp", None)));
        assert!(!search.matches(&item("Lamp", Some("plain"))));
    }

    #[test]
    fn matches_title_or_description_ignoring_case() {
        let search = ItemSearch::new(Some("FoO")).unwrap();
        assert!(search.matches(&item("Big foo lamp", None)));
        assert!(search.matches(&item("Lamp", Some("contains FOO inside"))));
        assert!(!search.matches(&item("Lamp", Some("nothing here"))));
        assert!(!search.matches(&item("Lamp", None)));
    }

    proptest! {
        #[test]
        fn any_embedded_term_matches(
            prefix in "[a-z ]{0,10}",
            term in "[a-zA-Z]{1,8}",
            suffix in "[a-z ]{0,10}",
        ) {
            let title = format!("{prefix}{}{suffix}", term.to_uppercase());
            let search = ItemSearch::new(Some(&term)).unwrap();
            prop_assert!(search.matches(&item(&title, None)));
        }
    }
}
