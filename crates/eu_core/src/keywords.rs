use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;

use crate::types::{Article, ArticleRecord};

/// NLTK's English stopword list
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

static STOPWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STOPWORDS.iter().copied().collect());

/// Clitics split off the way a Treebank tokenizer would ("Trump's" -> "Trump" + "'s").
const CLITICS: &[&str] = &["n't", "'s", "'re", "'ve", "'ll", "'d", "'m"];

pub fn is_stopword(word: &str) -> bool {
    STOPWORD_SET.contains(word)
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().filter_map(|chunk| {
        let chunk = chunk.replace('\u{2019}', "'");
        let trimmed = chunk.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
        let trimmed = trimmed.trim_start_matches('\'');
        let lower = trimmed.to_lowercase();
        let stem = CLITICS
            .iter()
            .find_map(|c| lower.strip_suffix(*c).filter(|s| !s.is_empty()))
            .unwrap_or(lower.as_str());
        let stem = stem.trim_end_matches('\'');
        (!stem.is_empty()).then(|| stem.to_string())
    })
}

/// Lowercased alphabetic tokens of `title` that are not stopwords, in order.
pub fn extract_keywords(title: &str) -> Vec<String> {
    tokenize(title)
        .filter(|t| t.chars().all(char::is_alphabetic))
        .filter(|t| !is_stopword(t))
        .collect()
}

/// Anything with an id and a headline can be indexed.
pub trait Headline {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
}

impl Headline for Article {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

impl Headline for ArticleRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordHit {
    pub keyword: String,
    /// Distinct row ids, in first-seen order
    pub ids: Vec<String>,
    pub count: usize,
}

/// Groups title keywords across rows. Keywords found in a single row are dropped.
/// Ordered by count (highest first), then alphabetically.
pub fn keyword_index<T: Headline>(rows: &[T]) -> Vec<KeywordHit> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();

    for row in rows {
        for keyword in extract_keywords(row.title()) {
            let ids = index.entry(keyword).or_default();
            if !ids.iter().any(|id| id == row.id()) {
                ids.push(row.id().to_string());
            }
        }
    }

    let mut hits: Vec<KeywordHit> = index
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(keyword, ids)| KeywordHit {
            count: ids.len(),
            keyword,
            ids,
        })
        .collect();
    hits.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, title: &str) -> ArticleRecord {
        ArticleRecord {
            id: id.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_keywords() {
        assert_eq!(
            extract_keywords("The EU's new AI rules: what they don't cover, in 2025!"),
            vec!["eu", "new", "ai", "rules", "cover"]
        );
        assert!(extract_keywords("").is_empty());
        assert!(extract_keywords("U.S. 42 AI-driven").is_empty());
    }

    #[test]
    fn test_keyword_index_groups_shared_words() {
        let rows = vec![row("1", "cat dog"), row("2", "dog bird"), row("3", "fish")];
        let hits = keyword_index(&rows);
        assert_eq!(
            hits,
            vec![KeywordHit {
                keyword: "dog".to_string(),
                ids: vec!["1".to_string(), "2".to_string()],
                count: 2,
            }]
        );
    }

    #[test]
    fn test_keyword_index_counts_distinct_ids() {
        let rows = vec![row("1", "dog dog"), row("1", "dog"), row("2", "Dog days")];
        let hits = keyword_index(&rows);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].count, 2);
    }
}
