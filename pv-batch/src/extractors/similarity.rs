//! String similarity for name/address matching

use super::Similarity;

/// Case-insensitive normalized Levenshtein similarity (`strsim`)
pub struct NormalizedLevenshtein;

impl Similarity for NormalizedLevenshtein {
    fn score(&self, a: &str, b: &str) -> f64 {
        let a = a.trim();
        let b = b.trim();
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
    }
}
