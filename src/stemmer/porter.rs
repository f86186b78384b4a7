use rust_stemmers::{Algorithm, Stemmer as SnowballStemmer};

use super::{is_stopword, split_words, Stemmer};

/// English stemmer with stopword removal.
pub struct PorterStemmer {
    inner: SnowballStemmer,
}

impl PorterStemmer {
    pub fn new() -> Self {
        Self {
            inner: SnowballStemmer::create(Algorithm::English),
        }
    }
}

impl Default for PorterStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl Stemmer for PorterStemmer {
    fn tokenize_and_stem(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        split_words(&lowered)
            .into_iter()
            .filter(|word| !is_stopword(word))
            .map(|word| self.inner.stem(word).into_owned())
            .filter(|stem| !stem.is_empty())
            .collect()
    }
}
