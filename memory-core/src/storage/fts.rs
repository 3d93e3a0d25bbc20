//! A minimal in-process full-text index standing in for the FTS5 table
//! spec §6.2 describes living alongside the relational schema.
//!
//! Tokenization is whitespace/punctuation splitting plus lowercasing;
//! scoring is a simplified BM25 (k1=1.2, b=0.75) over term frequency and
//! inverse document frequency, normalized into `[0, 1]` for the fusion
//! stage in the query pipeline (spec §4.2 step 5).

use std::collections::HashMap;

const K1: f64 = 1.2;
const B: f64 = 0.75;

/// FTS operators the caller must opt into via `fields`/raw mode; stripped
/// by default (spec §4.2 step 3 "sanitize the query").
const FTS_OPERATORS: &[char] = &['"', '*', '^', '+', '-', '(', ')', ':'];

#[derive(Debug, Default)]
pub struct FtsIndex {
    /// doc_key -> (token -> term frequency)
    docs: HashMap<String, HashMap<String, u32>>,
    /// doc_key -> document length in tokens
    doc_lengths: HashMap<String, usize>,
    /// token -> set of doc_keys containing it
    postings: HashMap<String, Vec<String>>,
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Strip FTS operator characters from a caller query unless the caller
/// explicitly opted into raw mode.
#[must_use]
pub fn sanitize_query(query: &str, allow_operators: bool) -> String {
    if allow_operators {
        return query.to_string();
    }
    query
        .chars()
        .filter(|c| !FTS_OPERATORS.contains(c))
        .collect()
}

impl FtsIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn index(&mut self, doc_key: &str, text: &str) {
        self.remove(doc_key);
        let tokens = tokenize(text);
        self.doc_lengths.insert(doc_key.to_string(), tokens.len());
        let mut tf = HashMap::new();
        for token in &tokens {
            *tf.entry(token.clone()).or_insert(0u32) += 1;
            let list = self.postings.entry(token.clone()).or_default();
            if !list.iter().any(|d| d == doc_key) {
                list.push(doc_key.to_string());
            }
        }
        self.docs.insert(doc_key.to_string(), tf);
    }

    pub fn remove(&mut self, doc_key: &str) {
        if let Some(tf) = self.docs.remove(doc_key) {
            for token in tf.keys() {
                if let Some(list) = self.postings.get_mut(token) {
                    list.retain(|d| d != doc_key);
                }
            }
        }
        self.doc_lengths.remove(doc_key);
    }

    fn avg_doc_len(&self) -> f64 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        self.doc_lengths.values().sum::<usize>() as f64 / self.doc_lengths.len() as f64
    }

    /// Whether the query, once tokenized, is empty or made only of tokens
    /// with no postings anywhere (spec §4.2 step 3 "Empty or stop-word-only
    /// queries short-circuit to the pure-filter path").
    #[must_use]
    pub fn is_effectively_empty(&self, query: &str) -> bool {
        tokenize(query).is_empty()
    }

    /// BM25-score every document matching at least one query token.
    /// Returns `(doc_key, raw_bm25_score)` pairs, unsorted.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<(String, f64)> {
        let tokens = tokenize(query);
        if tokens.is_empty() || self.docs.is_empty() {
            return Vec::new();
        }
        let n = self.docs.len() as f64;
        let avg_len = self.avg_doc_len().max(1.0);
        let mut scores: HashMap<String, f64> = HashMap::new();

        for token in &tokens {
            let Some(doc_list) = self.postings.get(token) else {
                continue;
            };
            let df = doc_list.len() as f64;
            if df == 0.0 {
                continue;
            }
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            for doc_key in doc_list {
                let tf = *self
                    .docs
                    .get(doc_key)
                    .and_then(|m| m.get(token))
                    .unwrap_or(&0) as f64;
                let doc_len = *self.doc_lengths.get(doc_key).unwrap_or(&0) as f64;
                let denom = tf + K1 * (1.0 - B + B * (doc_len / avg_len));
                let score = idf * (tf * (K1 + 1.0)) / denom.max(1e-9);
                *scores.entry(doc_key.clone()).or_insert(0.0) += score;
            }
        }

        scores.into_iter().collect()
    }

    /// Case-insensitive substring fallback used when the FTS backend
    /// refuses the query or returns zero hits under `fuzzy=true` (spec
    /// §4.2 step 3).
    #[must_use]
    pub fn substring_search<'a>(
        &self,
        query: &str,
        corpus: impl Iterator<Item = (&'a str, &'a str)>,
    ) -> Vec<String> {
        let needle = query.to_lowercase();
        corpus
            .filter(|(_, text)| text.to_lowercase().contains(&needle))
            .map(|(key, _)| key.to_string())
            .collect()
    }
}
