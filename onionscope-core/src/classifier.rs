//! Pattern rules plus keyword evidence, merged into per-category results.

use crate::error::LoadError;
use crate::keywords::{KeywordMatch, KeywordMatcher};
use onionscope_scanner::page::{ClassificationResult, Evidence, EvidenceSource};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Severity given to a category known only from the keyword table.
pub const KEYWORD_ONLY_SEVERITY: u8 = 2;

/// Severity of a custom category that does not state one.
pub const DEFAULT_CUSTOM_SEVERITY: u8 = 1;

/// Example custom-category file installed by `onionscope init`.
pub const EXAMPLE_CATEGORIES: &str = include_str!("../categories/example.json");

const CONTEXT_CHARS: usize = 40;

/// Built-in seed categories: name, severity, indicator patterns.
const BUILTIN_CATEGORIES: [(&str, u8, [&str; 2]); 6] = [
    (
        "Drugs",
        3,
        [
            r"\b(?:mdma|cocaine|heroin|lsd|meth|marijuana|cannabis|pills|opioids)\b",
            r"\b(?:pharmacy|drug|narcotic|substance|psychedelic|stimulant)\b",
        ],
    ),
    (
        "Weapons",
        4,
        [
            r"\b(?:gun|rifle|pistol|ammunition|firearms|weapons|knives)\b",
            r"\b(?:assault|tactical|military|combat|explosive)\b",
        ],
    ),
    (
        "Fake_IDs",
        3,
        [
            r"\b(?:passport|license|identity|document|certificate|ssn|forgery)\b",
            r"\b(?:fake|forged|counterfeit|false|falsified)\b",
        ],
    ),
    (
        "Hacking",
        3,
        [
            r"\b(?:hack|crack|exploit|vulnerability|malware|trojan|botnet|virus)\b",
            r"\b(?:password|access|breach|backdoor|script|tool|rootkit)\b",
        ],
    ),
    (
        "Financial_Fraud",
        3,
        [
            r"\b(?:credit\s*card|bank\s*account|paypal|bitcoin|crypto|wallet|transfer)\b",
            r"\b(?:carding|skimming|cloning|dump|fullz|cvv|fraud)\b",
        ],
    ),
    (
        "Human_Trafficking",
        5,
        [
            r"\b(?:escort|service|massage|girl|boy|young|teen)\b",
            r"\b(?:trafficking|exploitation|abuse|child|minor)\b",
        ],
    ),
];

/// A category definition as written in a custom category source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    #[serde(default = "default_custom_severity")]
    pub severity: u8,
    pub indicators: Vec<String>,
}

fn default_custom_severity() -> u8 {
    DEFAULT_CUSTOM_SEVERITY
}

#[derive(Debug, Clone)]
struct CompiledRule {
    severity: u8,
    patterns: Vec<Regex>,
}

impl CompiledRule {
    fn compile(category: &str, rule: &CategoryRule) -> Self {
        let patterns = rule
            .indicators
            .iter()
            .filter_map(|pattern| {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        warn!("Skipping invalid indicator for {}: {}", category, e);
                        None
                    }
                }
            })
            .collect();

        Self {
            severity: rule.severity.clamp(1, 5),
            patterns,
        }
    }
}

/// A row of [`CategoryClassifier::category_list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    pub name: String,
    pub severity: u8,
    pub enabled: bool,
}

pub struct CategoryClassifier {
    rules: BTreeMap<String, CompiledRule>,
    disabled: BTreeSet<String>,
    keywords: KeywordMatcher,
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new(KeywordMatcher::empty())
    }
}

impl CategoryClassifier {
    /// Built-in rules, every category enabled.
    pub fn new(keywords: KeywordMatcher) -> Self {
        let rules = BUILTIN_CATEGORIES
            .iter()
            .map(|(name, severity, indicators)| {
                let rule = CategoryRule {
                    severity: *severity,
                    indicators: indicators.iter().map(|p| p.to_string()).collect(),
                };
                (name.to_string(), CompiledRule::compile(name, &rule))
            })
            .collect();

        Self {
            rules,
            disabled: BTreeSet::new(),
            keywords,
        }
    }

    pub fn keywords(&self) -> &KeywordMatcher {
        &self.keywords
    }

    pub fn keywords_mut(&mut self) -> &mut KeywordMatcher {
        &mut self.keywords
    }

    /// Add or replace a category. New categories start enabled.
    pub fn insert_rule(&mut self, name: &str, rule: &CategoryRule) {
        self.rules
            .insert(name.to_string(), CompiledRule::compile(name, rule));
    }

    /// Merge categories from a JSON object of `name -> {severity, indicators}`.
    ///
    /// Entries without an `indicators` list are skipped. Returns how many
    /// categories were added or replaced.
    pub fn apply_custom_json(&mut self, json: &str) -> Result<usize, LoadError> {
        let entries: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;

        let mut applied = 0;
        for (name, value) in entries {
            match serde_json::from_value::<CategoryRule>(value) {
                Ok(rule) => {
                    debug!("Custom category {} ({} indicators)", name, rule.indicators.len());
                    self.insert_rule(&name, &rule);
                    applied += 1;
                }
                Err(e) => warn!("Ignoring malformed custom category {}: {}", name, e),
            }
        }
        Ok(applied)
    }

    pub fn load_custom_categories(&mut self, path: &Path) -> Result<usize, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let applied = self.apply_custom_json(&content)?;
        info!("Loaded {} custom categories from {}", applied, path.display());
        Ok(applied)
    }

    /// Whether the name is a rule or keyword-table category.
    pub fn is_known(&self, category: &str) -> bool {
        self.rules.contains_key(category)
            || self.keywords.table().keywords(category).is_some()
    }

    pub fn is_enabled(&self, category: &str) -> bool {
        self.is_known(category) && !self.disabled.contains(category)
    }

    /// Returns false for unknown categories.
    pub fn enable(&mut self, category: &str) -> bool {
        if !self.is_known(category) {
            return false;
        }
        self.disabled.remove(category);
        true
    }

    /// Returns false when the category was not enabled.
    pub fn disable(&mut self, category: &str) -> bool {
        if !self.is_enabled(category) {
            return false;
        }
        self.disabled.insert(category.to_string());
        true
    }

    /// Enable exactly `categories`, disabling every other known category.
    pub fn restrict_to<S: AsRef<str>>(&mut self, categories: &[S]) {
        let wanted: BTreeSet<&str> = categories.iter().map(AsRef::as_ref).collect();
        for name in &wanted {
            if !self.is_known(name) {
                warn!("Unknown category '{}' in enabled list", name);
            }
        }
        self.disabled = self
            .known_categories()
            .into_iter()
            .filter(|name| !wanted.contains(name.as_str()))
            .collect();
    }

    fn known_categories(&self) -> BTreeSet<String> {
        self.rules
            .keys()
            .map(String::clone)
            .chain(self.keywords.table().categories().map(str::to_string))
            .collect()
    }

    pub fn severity_of(&self, category: &str) -> u8 {
        self.rules
            .get(category)
            .map(|rule| rule.severity)
            .unwrap_or(KEYWORD_ONLY_SEVERITY)
    }

    /// Every known category with its severity and enabled flag, by name.
    pub fn category_list(&self) -> Vec<CategoryInfo> {
        self.known_categories()
            .into_iter()
            .map(|name| CategoryInfo {
                severity: self.severity_of(&name),
                enabled: !self.disabled.contains(&name),
                name,
            })
            .collect()
    }

    /// Classify `text` found at `url` against every enabled category.
    pub fn classify(&self, text: &str, url: &str) -> BTreeMap<String, ClassificationResult> {
        let mut results = BTreeMap::new();

        for (category, rule) in &self.rules {
            if self.disabled.contains(category) {
                continue;
            }
            if let Some(result) = evaluate_rule(category, rule, text, url) {
                results.insert(category.clone(), result);
            }
        }

        for (category, matches) in self.keywords.detect(text) {
            if !self.is_enabled(&category) {
                continue;
            }
            merge_keyword_matches(&mut results, &category, &matches, self.severity_of(&category));
        }

        results
    }
}

/// Pattern and URL evidence for one rule. `None` when nothing matched.
fn evaluate_rule(
    category: &str,
    rule: &CompiledRule,
    text: &str,
    url: &str,
) -> Option<ClassificationResult> {
    let mut evidence = Vec::new();

    for pattern in &rule.patterns {
        for m in pattern.find_iter(text) {
            evidence.push(Evidence {
                source: EvidenceSource::Pattern,
                matched_text: m.as_str().to_string(),
                context: context_window(text, m.start(), m.end()),
            });
        }
    }
    let pattern_matches = evidence.len();

    let mut url_matches = 0;
    if !url.is_empty() {
        for pattern in &rule.patterns {
            if let Some(m) = pattern.find(url) {
                url_matches += 1;
                evidence.push(Evidence {
                    source: EvidenceSource::Url,
                    matched_text: m.as_str().to_string(),
                    context: url.to_string(),
                });
            }
        }
    }

    if evidence.is_empty() {
        return None;
    }

    let confidence = (pattern_matches + url_matches * 2).min(10) as f64 * 10.0;
    Some(ClassificationResult {
        category: category.to_string(),
        severity: rule.severity,
        confidence,
        evidence,
    })
}

fn merge_keyword_matches(
    results: &mut BTreeMap<String, ClassificationResult>,
    category: &str,
    matches: &[KeywordMatch],
    severity: u8,
) {
    let evidence = matches.iter().map(|m| Evidence {
        source: EvidenceSource::Keyword,
        matched_text: m.keyword.clone(),
        context: m.context.clone(),
    });
    let keyword_confidence =
        matches.iter().map(|m| m.score as f64).sum::<f64>() / matches.len() as f64;

    match results.get_mut(category) {
        Some(existing) => {
            existing.evidence.extend(evidence);
            existing.confidence = existing.confidence.max(keyword_confidence);
        }
        None => {
            results.insert(
                category.to_string(),
                ClassificationResult {
                    category: category.to_string(),
                    severity,
                    confidence: keyword_confidence,
                    evidence: evidence.collect(),
                },
            );
        }
    }
}

/// Up to 40 characters either side of a match, trimmed.
fn context_window(text: &str, start: usize, end: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(CONTEXT_CHARS - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map(|(idx, _)| end + idx)
        .unwrap_or(text.len());
    text[from..to].trim().to_string()
}
