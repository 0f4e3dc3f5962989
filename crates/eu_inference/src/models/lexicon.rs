use std::collections::HashMap;
use std::fs;
use std::path::Path;

use eu_core::{Error, Result, SentimentScorer};
use once_cell::sync::Lazy;

static BUILTIN_LEXICON: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../../data/lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).unwrap_or_else(|e| {
        tracing::error!("embedded sentiment lexicon is invalid: {}", e);
        HashMap::new()
    })
});

const BOOST_INCR: f64 = 0.293;
const BOOST_DECR: f64 = -0.293;
const CAPS_INCR: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const NORMALIZE_ALPHA: f64 = 15.0;

const NEGATORS: &[&str] = &[
    "aint", "arent", "cannot", "cant", "couldnt", "darent", "didnt", "doesnt", "dont", "hadnt",
    "hasnt", "havent", "isnt", "mightnt", "mustnt", "neither", "neednt", "never", "none", "nope",
    "nor", "not", "nothing", "nowhere", "oughtnt", "shant", "shouldnt", "wasnt", "werent",
    "without", "wont", "wouldnt", "rarely", "seldom", "despite",
];

const INCREMENTS: &[&str] = &[
    "absolutely", "amazingly", "awfully", "completely", "considerably", "decidedly", "deeply",
    "enormously", "entirely", "especially", "exceptionally", "extremely", "fully", "greatly",
    "highly", "hugely", "incredibly", "intensely", "majorly", "more", "most", "particularly",
    "purely", "quite", "really", "remarkably", "so", "substantially", "thoroughly", "totally",
    "tremendously", "unbelievably", "unusually", "utterly", "very",
];

const DECREMENTS: &[&str] = &[
    "almost", "barely", "hardly", "kinda", "less", "little", "marginally", "occasionally",
    "partly", "scarcely", "slightly", "somewhat",
];

fn is_negator(word: &str) -> bool {
    word.contains("n't") || NEGATORS.contains(&word)
}

fn booster(word: &str) -> Option<f64> {
    if INCREMENTS.contains(&word) {
        Some(BOOST_INCR)
    } else if DECREMENTS.contains(&word) {
        Some(BOOST_DECR)
    } else {
        None
    }
}

fn is_shouting(token: &str) -> bool {
    token.chars().any(char::is_alphabetic) && !token.chars().any(char::is_lowercase)
}

/// Splits on whitespace and trims surrounding punctuation, unless trimming
/// would leave a word of two characters or fewer (keeps emoticons intact).
fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|raw| {
            let stripped = raw.trim_matches(|c: char| c.is_ascii_punctuation());
            if stripped.chars().count() <= 2 {
                raw
            } else {
                stripped
            }
        })
        .filter(|t| t.chars().count() > 1)
        .collect()
}

/// Rule-based compound polarity in the manner of VADER: lexicon valences
/// adjusted for boosters, negation, capitals, "but" and exclamation marks.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    lexicon: HashMap<String, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            lexicon: BUILTIN_LEXICON.clone(),
        }
    }

    /// Loads a `{"word": valence}` JSON file layered over the built-in lexicon.
    pub fn with_overrides(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let extra: HashMap<String, f64> = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid lexicon {}: {}", path.display(), e)))?;
        let mut scorer = Self::new();
        scorer
            .lexicon
            .extend(extra.into_iter().map(|(k, v)| (k.to_lowercase(), v)));
        Ok(scorer)
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }

    fn valences(&self, tokens: &[&str]) -> Vec<f64> {
        let lower: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let shouting = tokens.iter().filter(|t| is_shouting(t)).count();
        let caps_differ = shouting > 0 && shouting < tokens.len();

        let mut valences = Vec::with_capacity(tokens.len());
        for (i, word) in lower.iter().enumerate() {
            let base = match self.lexicon.get(word.as_str()) {
                Some(&base) if booster(word).is_none() => base,
                _ => {
                    valences.push(0.0);
                    continue;
                }
            };

            let mut valence = base;
            if caps_differ && is_shouting(tokens[i]) {
                valence += CAPS_INCR.copysign(base);
            }

            for (distance, damping) in [1.0, 0.95, 0.9].into_iter().enumerate() {
                let Some(j) = i.checked_sub(distance + 1) else { break };
                let prior = lower[j].as_str();
                if let Some(boost) = booster(prior) {
                    let mut scalar = if base < 0.0 { -boost } else { boost };
                    if caps_differ && is_shouting(tokens[j]) {
                        scalar += CAPS_INCR.copysign(base);
                    }
                    valence += scalar * damping;
                }
                if is_negator(prior) {
                    valence *= NEGATION_SCALAR;
                }
            }
            valences.push(valence);
        }

        if let Some(pivot) = lower.iter().position(|w| w == "but") {
            for (i, v) in valences.iter_mut().enumerate() {
                if i < pivot {
                    *v *= 0.5;
                } else if i > pivot {
                    *v *= 1.5;
                }
            }
        }
        valences
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(4) as f64 * 0.292;
    let questions = match text.matches('?').count() {
        0 | 1 => 0.0,
        n @ 2..=3 => n as f64 * 0.18,
        _ => 0.96,
    };
    exclamations + questions
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + NORMALIZE_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

impl SentimentScorer for LexiconScorer {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn compound(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let sum: f64 = self.valences(&tokens).iter().sum();
        if sum == 0.0 {
            return 0.0;
        }
        let emphasis = punctuation_emphasis(text);
        normalize(sum + emphasis.copysign(sum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn score(text: &str) -> f64 {
        LexiconScorer::new().compound(text)
    }

    #[test]
    fn test_builtin_lexicon_loads() {
        assert!(LexiconScorer::new().len() > 100);
    }

    #[test]
    fn test_polarity() {
        assert!(score("Markets rally on good news") > 0.2);
        assert!(score("Deadly attack leaves dozens dead") < -0.6);
        assert_eq!(score(""), 0.0);
        assert_eq!(score("The committee met on Tuesday"), 0.0);
        let s = score("A truly wonderful, brilliant, excellent, perfect victory!!!");
        assert!(s > 0.9 && s <= 1.0);
    }

    #[test]
    fn test_negation_flips_polarity() {
        assert!(score("The plan is good") > 0.0);
        assert!(score("The plan is not good") < 0.0);
        assert!(score("The plan isn't good") < 0.0);
    }

    #[test]
    fn test_intensifiers() {
        assert!(score("The plan is very good") > score("The plan is good"));
        assert!(score("The plan is slightly good") < score("The plan is good"));
        assert!(score("The plan is GOOD") > score("The plan is good"));
        assert!(score("The plan is good!") > score("The plan is good"));
    }

    #[test]
    fn test_but_shifts_weight() {
        assert!(score("The start was good but the ending was terrible") < 0.0);
    }

    #[test]
    fn test_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Regulation": 2.0}}"#).unwrap();
        let scorer = LexiconScorer::with_overrides(file.path()).unwrap();
        assert!(scorer.compound("regulation arrives") > 0.0);
        assert_eq!(score("regulation arrives"), 0.0);
    }
}
