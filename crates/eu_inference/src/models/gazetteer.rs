use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use eu_core::{Entities, EntityRecognizer, Error, Result};
use regex::Regex;
use serde::Deserialize;

const BUILTIN_ENTITIES: &str = include_str!("../../data/entities.json");

#[derive(Debug, Default, Deserialize)]
struct EntityFile {
    #[serde(default)]
    people: Vec<String>,
    #[serde(default)]
    organizations: Vec<String>,
}

/// Builds one alternation over `names`, longest first so that
/// "European Central Bank" wins over a shorter overlapping entry.
fn name_pattern(names: &[String]) -> Result<Option<Regex>> {
    let mut names: Vec<&str> = names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()).collect();
    if names.is_empty() {
        return Ok(None);
    }
    names.sort_unstable();
    names.dedup();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    let alternation = names.iter().map(|n| regex::escape(n)).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"\b(?:{})\b", alternation))
        .map(Some)
        .map_err(|e| Error::Config(format!("Invalid entity pattern: {}", e)))
}

fn matches(pattern: &Option<Regex>, text: &str) -> BTreeSet<String> {
    pattern
        .iter()
        .flat_map(|re| re.find_iter(text).map(|m| m.as_str().to_string()))
        .collect()
}

/// Finds people and organizations from a fixed list of names.
/// Matching is case-sensitive on word boundaries.
#[derive(Debug, Clone)]
pub struct GazetteerRecognizer {
    people: Option<Regex>,
    organizations: Option<Regex>,
}

impl GazetteerRecognizer {
    pub fn new(people: &[String], organizations: &[String]) -> Result<Self> {
        Ok(Self {
            people: name_pattern(people)?,
            organizations: name_pattern(organizations)?,
        })
    }

    /// The list shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_ENTITIES)
    }

    /// Reads `{"people": [...], "organizations": [...]}`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    fn from_json(raw: &str) -> Result<Self> {
        let file: EntityFile = serde_json::from_str(raw)?;
        Self::new(&file.people, &file.organizations)
    }
}

#[async_trait]
impl EntityRecognizer for GazetteerRecognizer {
    fn name(&self) -> &str {
        "gazetteer"
    }

    async fn recognize(&self, text: &str) -> Result<Entities> {
        if text.trim().is_empty() {
            return Ok(Entities::default());
        }
        Ok(Entities {
            people: matches(&self.people, text),
            organizations: matches(&self.organizations, text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_recognize() {
        let recognizer = GazetteerRecognizer::new(
            &names(&["Ursula von der Leyen", "Keir Starmer"]),
            &names(&["European Commission", "Commission", "OpenAI"]),
        )
        .unwrap();

        let text = "Ursula von der Leyen said the European Commission would meet OpenAI. \
                    Ursula von der Leyen repeated it.";
        let entities = recognizer.recognize(text).await.unwrap();
        assert_eq!(entities.people, BTreeSet::from(["Ursula von der Leyen".to_string()]));
        assert_eq!(
            entities.organizations,
            BTreeSet::from(["European Commission".to_string(), "OpenAI".to_string()])
        );
    }

    #[tokio::test]
    async fn test_word_boundaries_and_blank_text() {
        let recognizer = GazetteerRecognizer::new(&[], &names(&["Meta"])).unwrap();
        assert!(recognizer.recognize("Metadata matters").await.unwrap().is_empty());
        assert!(recognizer.recognize("   ").await.unwrap().is_empty());
        assert_eq!(recognizer.recognize("Meta, again").await.unwrap().organizations.len(), 1);
    }

    #[tokio::test]
    async fn test_builtin_and_file() {
        let builtin = GazetteerRecognizer::builtin().unwrap();
        let found = builtin.recognize("Keir Starmer met the Bank of England").await.unwrap();
        assert!(found.people.contains("Keir Starmer"));
        assert!(found.organizations.contains("Bank of England"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.json");
        fs::write(&path, r#"{"people": ["Ada Lovelace"]}"#).unwrap();
        let custom = GazetteerRecognizer::from_path(&path).unwrap();
        assert_eq!(custom.recognize("Ada Lovelace wrote").await.unwrap().people.len(), 1);

        fs::write(&path, "not json").unwrap();
        assert!(GazetteerRecognizer::from_path(&path).is_err());
    }
}
