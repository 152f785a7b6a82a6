//! Sentiment scorers.
//!
//! Every scorer maps a text to a compound score in [-1, 1] and classifies it
//! with its own fixed band: `compound >= band` is positive, `compound <= -band`
//! is negative, anything in between is neutral. Several scorers run over the
//! same item and their results are kept side by side.
//!
//! Empty text or a non-finite score never fails a batch; it degrades to
//! `neutral, 0.0` with `degraded = true`.

pub mod lexicon;
pub mod rules;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub use lexicon::LexiconScorer;
pub use rules::RuleScorer;

/// Word valences on the -4..=4 scale.
static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).unwrap_or_else(|e| {
        tracing::error!(error = %e, "sentiment lexicon failed to parse; scoring will be neutral");
        HashMap::new()
    })
});

/// Lexicon valence for a lower-cased word (0 if unknown).
#[inline]
pub(crate) fn valence(word: &str) -> i32 {
    *LEXICON.get(word).unwrap_or(&0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
            Polarity::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub method: String,
    pub polarity: Polarity,
    pub compound: f64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl SentimentScore {
    pub fn degraded(method: &str) -> Self {
        Self {
            method: method.to_string(),
            polarity: Polarity::Neutral,
            compound: 0.0,
            degraded: true,
        }
    }
}

/// Fixed-band classification of a compound score.
pub fn classify(compound: f64, band: f64) -> Polarity {
    if compound >= band {
        Polarity::Positive
    } else if compound <= -band {
        Polarity::Negative
    } else {
        Polarity::Neutral
    }
}

pub trait Scorer: Send + Sync {
    /// Stable method name used as a key in summaries.
    fn method(&self) -> &'static str;

    /// Half-width of the neutral band.
    fn band(&self) -> f64;

    /// Raw compound in [-1, 1]; `None` when the text cannot be scored.
    fn compound(&self, text: &str) -> Option<f64>;

    fn score(&self, text: &str) -> SentimentScore {
        if text.trim().is_empty() {
            return SentimentScore::degraded(self.method());
        }
        match self.compound(text) {
            Some(c) if c.is_finite() => {
                let compound = c.clamp(-1.0, 1.0);
                SentimentScore {
                    method: self.method().to_string(),
                    polarity: classify(compound, self.band()),
                    compound,
                    degraded: false,
                }
            }
            _ => SentimentScore::degraded(self.method()),
        }
    }
}

/// The two built-in methods, lexicon first.
pub fn default_scorers() -> Vec<Arc<dyn Scorer>> {
    vec![Arc::new(LexiconScorer::new()), Arc::new(RuleScorer::new())]
}

/// Tokens keep apostrophes so contractions like "isn't" survive.
pub(crate) fn tokenize(s: &str) -> impl Iterator<Item = &str> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
}

pub(crate) fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "nor"
            | "neither"
            | "nothing"
            | "without"
            | "cannot"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "weren't"
            | "won't"
            | "can't"
            | "don't"
            | "doesn't"
            | "didn't"
            | "shouldn't"
            | "couldn't"
            | "wouldn't"
    )
}
