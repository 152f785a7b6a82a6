//! Rule-based method in the spirit of VADER: lexicon valences adjusted by
//! negation, intensity boosters, ALL-CAPS emphasis, contrastive "but" and
//! exclamation marks, then squashed with `x / sqrt(x^2 + alpha)`.

use super::{is_negator, tokenize, valence, Scorer};

const ALPHA: f64 = 15.0;
const NEGATION_SCALAR: f64 = -0.74;
const BOOSTER_INCR: f64 = 0.293;
const CAPS_INCR: f64 = 0.733;
const EXCLAIM_INCR: f64 = 0.292;
const MAX_EXCLAIMS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct RuleScorer;

impl RuleScorer {
    pub const METHOD: &'static str = "rules";
    pub const BAND: f64 = 0.05;

    pub fn new() -> Self {
        Self
    }
}

fn booster(word: &str) -> f64 {
    match word {
        "absolutely" | "completely" | "extremely" | "highly" | "hugely" | "incredibly"
        | "really" | "so" | "totally" | "very" | "remarkably" | "especially" | "deeply"
        | "most" | "more" => BOOSTER_INCR,
        "barely" | "hardly" | "slightly" | "somewhat" | "marginally" | "kinda" | "less"
        | "little" | "partly" => -BOOSTER_INCR,
        _ => 0.0,
    }
}

fn is_shouting(tok: &str) -> bool {
    tok.chars().any(char::is_alphabetic)
        && tok.chars().filter(|c| c.is_alphabetic()).count() > 1
        && !tok.chars().any(char::is_lowercase)
}

pub fn squash(x: f64) -> f64 {
    x / (x * x + ALPHA).sqrt()
}

impl Scorer for RuleScorer {
    fn method(&self) -> &'static str {
        Self::METHOD
    }

    fn band(&self) -> f64 {
        Self::BAND
    }

    fn compound(&self, text: &str) -> Option<f64> {
        let raw: Vec<&str> = tokenize(text).collect();
        let lower: Vec<String> = raw.iter().map(|t| t.to_lowercase()).collect();
        // Emphasis only counts when the text is not shouted as a whole.
        let mixed_case = raw.iter().any(|t| !is_shouting(t)) && raw.iter().any(|t| is_shouting(t));
        let but_at = lower.iter().position(|t| t == "but");

        let mut sum = 0.0f64;
        for (i, word) in lower.iter().enumerate() {
            let base = valence(word);
            if base == 0 {
                continue;
            }
            let mut v = f64::from(base);
            let sign = v.signum();

            if mixed_case && is_shouting(raw[i]) {
                v += sign * CAPS_INCR;
            }
            for (k, decay) in [(1usize, 1.0f64), (2, 0.95), (3, 0.9)] {
                if i >= k {
                    v += sign * booster(&lower[i - k]) * decay;
                }
            }
            if (1..=3).any(|k| i >= k && is_negator(&lower[i - k])) {
                v *= NEGATION_SCALAR;
            }
            if let Some(b) = but_at {
                if i < b {
                    v *= 0.5;
                } else if i > b {
                    v *= 1.5;
                }
            }
            sum += v;
        }

        if sum != 0.0 {
            let bangs = text.matches('!').count().min(MAX_EXCLAIMS) as f64;
            sum += sum.signum() * bangs * EXCLAIM_INCR;
        }

        Some(squash(sum))
    }
}
