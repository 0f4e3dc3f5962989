use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::Article;

/// Distinct people and organizations across annotated rows, for selection lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityOptions {
    pub people: Vec<String>,
    pub organizations: Vec<String>,
}

pub fn entity_options(articles: &[Article]) -> EntityOptions {
    let people: BTreeSet<&String> = articles.iter().flat_map(Article::people).collect();
    let organizations: BTreeSet<&String> = articles.iter().flat_map(Article::organizations).collect();
    EntityOptions {
        people: people.into_iter().cloned().collect(),
        organizations: organizations.into_iter().cloned().collect(),
    }
}

/// Keeps rows mentioning at least one selected person and at least one
/// selected organization. An empty selection does not constrain.
pub fn filter_by_entities(articles: Vec<Article>, people: &[String], organizations: &[String]) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|a| people.is_empty() || a.people().any(|p| people.contains(p)))
        .filter(|a| organizations.is_empty() || a.organizations().any(|o| organizations.contains(o)))
        .collect()
}
