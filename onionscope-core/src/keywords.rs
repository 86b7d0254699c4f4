//! Keyword table loading and exact/fuzzy keyword detection.

use crate::error::LoadError;
use crate::similarity::{partial_ratio, token_set_ratio};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Keyword table shipped with the binary, `keyword,category` layout.
pub const DEFAULT_KEYWORDS: &str = include_str!("../keywords/default.csv");

pub const DEFAULT_FUZZY_THRESHOLD: u8 = 80;

const WINDOW_WORDS: usize = 100;
const WINDOW_STRIDE: usize = 50;

/// Category name to ordered, lower-cased keywords.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordTable {
    categories: BTreeMap<String, Vec<String>>,
}

impl KeywordTable {
    /// Parse either a `keyword,category` table or a wide table with one
    /// column per category. Blank cells are ignored.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let keyword_col = lowered.iter().position(|h| h == "keyword");
        let category_col = lowered.iter().position(|h| h == "category");

        let mut table = Self::default();
        match (keyword_col, category_col) {
            (Some(k), Some(c)) => {
                for row in csv_reader.records() {
                    let row = row?;
                    let (Some(keyword), Some(category)) = (row.get(k), row.get(c)) else {
                        continue;
                    };
                    table.insert(category, keyword);
                }
            }
            _ => {
                for row in csv_reader.records() {
                    let row = row?;
                    for (idx, cell) in row.iter().enumerate() {
                        if let Some(category) = headers.get(idx) {
                            table.insert(category, cell);
                        }
                    }
                }
            }
        }

        if table.is_empty() {
            return Err(LoadError::Empty);
        }
        Ok(table)
    }

    pub fn from_csv_str(content: &str) -> Result<Self, LoadError> {
        Self::from_reader(content.as_bytes())
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        info!(
            "Loaded {} keywords in {} categories from {}",
            table.keyword_count(),
            table.categories.len(),
            path.display()
        );
        Ok(table)
    }

    /// The bundled table. Empty only if the embedded file is broken, which
    /// the test suite rules out.
    pub fn bundled() -> Self {
        Self::from_csv_str(DEFAULT_KEYWORDS).unwrap_or_default()
    }

    fn insert(&mut self, category: &str, keyword: &str) {
        let category = category.trim();
        let keyword = keyword.trim().to_lowercase();
        if category.is_empty() || keyword.is_empty() {
            return;
        }
        let keywords = self.categories.entry(category.to_string()).or_default();
        if !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.values().all(Vec::is_empty)
    }

    pub fn keyword_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn keywords(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(category, keywords)| (category.as_str(), keywords.as_slice()))
    }
}

/// One keyword found in a text.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordMatch {
    pub keyword: String,
    /// 100 for an exact occurrence, otherwise the best fuzzy score
    pub score: u8,
    /// Sentence that best resembles the keyword
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    table: KeywordTable,
    threshold: u8,
}

impl Default for KeywordMatcher {
    fn default() -> Self {
        Self::new(KeywordTable::bundled(), DEFAULT_FUZZY_THRESHOLD)
    }
}

impl KeywordMatcher {
    pub fn new(table: KeywordTable, threshold: u8) -> Self {
        Self {
            table,
            threshold: threshold.min(100),
        }
    }

    /// A matcher with no keywords; `detect` always returns nothing.
    pub fn empty() -> Self {
        Self::new(KeywordTable::default(), DEFAULT_FUZZY_THRESHOLD)
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: u8) {
        self.threshold = threshold.min(100);
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Loaded category names, sorted.
    pub fn categories(&self) -> Vec<&str> {
        self.table.categories().collect()
    }

    /// Swap in the table at `path`. The current table stays in force when
    /// the new one cannot be loaded.
    pub fn reload(&mut self, path: &Path) -> Result<usize, LoadError> {
        match KeywordTable::load(path) {
            Ok(table) => {
                let count = table.keyword_count();
                self.table = table;
                Ok(count)
            }
            Err(e) => {
                warn!(
                    "Keeping previous keyword table, reload from {} failed: {}",
                    path.display(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Find every keyword whose exact or fuzzy score reaches the threshold.
    ///
    /// Categories without a match are absent from the result.
    pub fn detect(&self, text: &str) -> BTreeMap<String, Vec<KeywordMatch>> {
        let mut results = BTreeMap::new();
        if text.trim().is_empty() || self.table.is_empty() {
            return results;
        }

        let normalized = normalize(text);
        let sentences = split_sentences(text);
        let windows = word_windows(&normalized);

        for (category, keywords) in self.table.iter() {
            let mut matches = Vec::new();
            for keyword in keywords {
                let needle = normalize(keyword);
                let needle = needle.split_whitespace().collect::<Vec<_>>().join(" ");
                if needle.is_empty() {
                    continue;
                }

                let score = if contains_phrase(&normalized, &needle) {
                    100
                } else {
                    best_window_score(&needle, &windows)
                };

                if score >= self.threshold {
                    debug!("Keyword '{}' ({}) scored {}", keyword, category, score);
                    matches.push(KeywordMatch {
                        keyword: keyword.clone(),
                        score,
                        context: best_context(&needle, &sentences),
                    });
                }
            }
            if !matches.is_empty() {
                results.insert(category.to_string(), matches);
            }
        }

        results
    }
}

/// Lower-case and replace everything but word characters and whitespace
/// with spaces.
fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect()
}

fn contains_phrase(normalized: &str, needle: &str) -> bool {
    if !needle.contains(' ') {
        return normalized.contains(needle);
    }
    // Collapse runs of whitespace so "credit  card" still matches.
    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.contains(needle)
}

fn word_windows(normalized: &str) -> Vec<String> {
    let words: Vec<&str> = normalized.split_whitespace().collect();
    (0..words.len())
        .step_by(WINDOW_STRIDE)
        .map(|start| words[start..(start + WINDOW_WORDS).min(words.len())].join(" "))
        .collect()
}

fn best_window_score(needle: &str, windows: &[String]) -> u8 {
    let multi_word = needle.contains(' ');
    let mut best = 0;
    for window in windows {
        let score = if multi_word {
            token_set_ratio(needle, window)
        } else {
            partial_ratio(needle, window)
        };
        if score > best {
            best = score;
        }
    }
    best
}

fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn best_context(needle: &str, sentences: &[&str]) -> String {
    let mut best = "";
    let mut best_score = 0;
    for sentence in sentences {
        let score = partial_ratio(needle, &sentence.to_lowercase());
        if score > best_score {
            best_score = score;
            best = sentence;
        }
    }
    best.to_string()
}
