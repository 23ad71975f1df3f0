//! Item filtering and ordering for list views.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::models::{Item, Priority, Status};

/// Criteria an item must meet to be listed. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub status: Option<Status>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring over title, notes and tags
    pub search: Option<String>,
    /// Every tag listed here must be present on the item
    pub tags: Vec<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        if self.status.is_some_and(|status| item.status != status) {
            return false;
        }
        if self.priority.is_some_and(|priority| item.priority != priority) {
            return false;
        }
        if let Some(category) = self.category.as_deref() {
            if !item.category.eq_ignore_ascii_case(category.trim()) {
                return false;
            }
        }

        let has_tag = |wanted: &str| item.tags.iter().any(|tag| tag.eq_ignore_ascii_case(wanted));
        if !self.tags.iter().all(|wanted| has_tag(wanted.trim())) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => {
                let query = query.to_lowercase();
                item.title.to_lowercase().contains(&query)
                    || item.notes.to_lowercase().contains(&query)
                    || item
                        .tags
                        .iter()
                        .any(|tag| tag.to_lowercase().contains(&query))
            }
        }
    }

    /// Keep only matching items
    pub fn apply(&self, items: Vec<Item>) -> Vec<Item> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemSort {
    #[default]
    UpdatedDesc,
    UpdatedAsc,
    CreatedDesc,
    CreatedAsc,
    PriorityDesc,
    PriorityAsc,
}

impl ItemSort {
    pub const ALL: [Self; 6] = [
        Self::UpdatedDesc,
        Self::UpdatedAsc,
        Self::CreatedDesc,
        Self::CreatedAsc,
        Self::PriorityDesc,
        Self::PriorityAsc,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpdatedDesc => "updated_desc",
            Self::UpdatedAsc => "updated_asc",
            Self::CreatedDesc => "created_desc",
            Self::CreatedAsc => "created_asc",
            Self::PriorityDesc => "priority_desc",
            Self::PriorityAsc => "priority_asc",
        }
    }

    /// Stable sort in place. Items never updated fall back to `added_at`.
    pub fn sort(self, items: &mut [Item]) {
        let updated = |item: &Item| item.updated_at.unwrap_or(item.added_at);
        match self {
            Self::UpdatedDesc => items.sort_by_key(|item| Reverse(updated(item))),
            Self::UpdatedAsc => items.sort_by_key(updated),
            Self::CreatedDesc => items.sort_by_key(|item| Reverse(item.added_at)),
            Self::CreatedAsc => items.sort_by_key(|item| item.added_at),
            Self::PriorityDesc => {
                items.sort_by_key(|item| (Reverse(item.priority), Reverse(updated(item))));
            }
            Self::PriorityAsc => {
                items.sort_by_key(|item| (item.priority, Reverse(updated(item))));
            }
        }
    }
}

impl fmt::Display for ItemSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemSort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|sort| sort.as_str()).collect();
                format!("Unknown sort '{value}' (expected one of: {})", names.join(", "))
            })
    }
}

/// Sorted set of every tag in use, compared case-insensitively
pub fn unique_tags(items: &[Item]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut tags = Vec::new();
    for tag in items.iter().flat_map(|item| item.tags.iter()) {
        if seen.insert(tag.to_lowercase()) {
            tags.push(tag.clone());
        }
    }
    tags.sort_by_key(|tag| tag.to_lowercase());
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(title: &str, added_at: i64, priority: Priority, tags: &[&str]) -> Item {
        let mut item = Item::new(title, added_at);
        item.priority = priority;
        item.tags = tags.iter().map(ToString::to_string).collect();
        item
    }

    fn titles(items: &[Item]) -> Vec<&str> {
        items.iter().map(|item| item.title.as_str()).collect()
    }

    fn sample() -> Vec<Item> {
        let mut dune = item("Dune", 10, Priority::High, &["scifi", "Books"]);
        dune.notes = "Reread before the film".to_string();
        dune.category = "Book".to_string();
        let mut alien = item("Alien", 20, Priority::Low, &["scifi", "horror"]);
        alien.category = "Movie".to_string();
        alien.mark_done(30);
        let heat = item("Heat", 5, Priority::Medium, &["crime"]);
        vec![dune, alien, heat]
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(ItemFilter::default().apply(sample()).len(), 3);
    }

    #[test]
    fn search_covers_title_notes_and_tags() {
        let search = |query: &str| ItemFilter {
            search: Some(query.to_string()),
            ..ItemFilter::default()
        };

        assert_eq!(titles(&search("DUNE").apply(sample())), vec!["Dune"]);
        assert_eq!(titles(&search("film").apply(sample())), vec!["Dune"]);
        assert_eq!(titles(&search("horr").apply(sample())), vec!["Alien"]);
        assert!(search("nothing").apply(sample()).is_empty());
    }

    #[test]
    fn tag_filter_requires_every_tag() {
        let filter = ItemFilter {
            tags: vec!["SciFi".to_string(), "books".to_string()],
            ..ItemFilter::default()
        };
        assert_eq!(titles(&filter.apply(sample())), vec!["Dune"]);
    }

    #[test]
    fn field_filters_combine() {
        let filter = ItemFilter {
            status: Some(Status::Done),
            category: Some("movie".to_string()),
            ..ItemFilter::default()
        };
        assert_eq!(titles(&filter.apply(sample())), vec!["Alien"]);

        let filter = ItemFilter {
            status: Some(Status::Todo),
            priority: Some(Priority::Low),
            ..ItemFilter::default()
        };
        assert!(filter.apply(sample()).is_empty());
    }

    #[test]
    fn sort_orders() {
        let mut items = sample();

        ItemSort::UpdatedDesc.sort(&mut items);
        assert_eq!(titles(&items), vec!["Alien", "Dune", "Heat"]);

        ItemSort::CreatedAsc.sort(&mut items);
        assert_eq!(titles(&items), vec!["Heat", "Dune", "Alien"]);

        ItemSort::PriorityDesc.sort(&mut items);
        assert_eq!(titles(&items), vec!["Dune", "Heat", "Alien"]);

        ItemSort::PriorityAsc.sort(&mut items);
        assert_eq!(titles(&items), vec!["Alien", "Heat", "Dune"]);
    }

    #[test]
    fn sort_parses_names() {
        assert_eq!("priority-desc".parse(), Ok(ItemSort::PriorityDesc));
        assert_eq!(" Updated_Asc ".parse(), Ok(ItemSort::UpdatedAsc));
        assert!("newest".parse::<ItemSort>().is_err());
    }

    #[test]
    fn unique_tags_are_sorted_and_deduplicated() {
        assert_eq!(
            unique_tags(&sample()),
            vec!["Books", "crime", "horror", "scifi"]
        );
    }
}
