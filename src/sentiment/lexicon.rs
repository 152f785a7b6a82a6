use super::{is_negator, tokenize, valence, Scorer};

/// Lexicon method: mean polarity of the words found in the lexicon.
///
/// Each hit contributes `valence / 4`; a negator in the 1..=3 preceding
/// tokens flips and halves it. Text without any hit scores 0.0.
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub const METHOD: &'static str = "lexicon";
    pub const BAND: f64 = 0.10;

    pub fn new() -> Self {
        Self
    }
}

impl Scorer for LexiconScorer {
    fn method(&self) -> &'static str {
        Self::METHOD
    }

    fn band(&self) -> f64 {
        Self::BAND
    }

    fn compound(&self, text: &str) -> Option<f64> {
        let tokens: Vec<String> = tokenize(text).map(|t| t.to_lowercase()).collect();
        let mut sum = 0.0f64;
        let mut hits = 0usize;

        for i in 0..tokens.len() {
            let base = valence(&tokens[i]);
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            let polarity = f64::from(base) / 4.0;
            sum += if negated { -0.5 * polarity } else { polarity };
            hits += 1;
        }

        if hits == 0 {
            return Some(0.0);
        }
        Some(sum / hits as f64)
    }
}
