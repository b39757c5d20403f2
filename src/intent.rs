//! Pattern-based intent pre-classification.
//!
//! A cheap first pass over the raw request, run before any model call.
//! The detector holds a fixed table of tag → patterns; a tag is emitted
//! the first time any of its patterns matches, so a request can carry
//! several tags. When nothing matches the detector returns the
//! [`IntentTag::Fallback`] sentinel — it never fails and never returns
//! an empty set.
//!
//! Downstream, the first detected tag stands in as the "primary
//! intention" whenever the model does not name one itself.

use regex::Regex;

/// Closed set of intent tags. One vocabulary, no per-caller drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentTag {
    WebSearch,
    FileOps,
    Desktop,
    Vision,
    Knowledge,
    MemoryOps,
    Fallback,
}

impl IntentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentTag::WebSearch => "web_search",
            IntentTag::FileOps => "file_ops",
            IntentTag::Desktop => "desktop",
            IntentTag::Vision => "vision",
            IntentTag::Knowledge => "knowledge",
            IntentTag::MemoryOps => "memory_ops",
            IntentTag::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for IntentTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Table-driven detector, built once and reused for every request.
pub struct IntentDetector {
    table: Vec<(IntentTag, Vec<Regex>)>,
}

impl IntentDetector {
    pub fn new() -> Self {
        let table = vec![
            (
                IntentTag::WebSearch,
                compile(&[
                    r"(?i)\b(search|look up|google|find online|browse)\b",
                    r"(?i)\bwhat('s| is) the (latest|current|weather|news)\b",
                ]),
            ),
            (
                IntentTag::FileOps,
                compile(&[
                    r"(?i)\b(file|folder|directory|save to disk|read from)\b",
                    r"(?i)\b(write|create|delete|open)\b.{0,40}\b(file|document|note)\b",
                ]),
            ),
            (
                IntentTag::Desktop,
                compile(&[
                    r"(?i)\b(click|type|press|keyboard|mouse|window)\b",
                    r"(?i)\b(launch|run|start|kill|close)\b.{0,30}\b(app|application|program|process)\b",
                ]),
            ),
            (
                IntentTag::Vision,
                compile(&[
                    r"(?i)\b(screenshot|screen shot|what('s| is) on (my|the) screen)\b",
                    r"(?i)\b(look at|analyze|describe)\b.{0,30}\b(image|picture|photo|screen)\b",
                ]),
            ),
            (
                IntentTag::Knowledge,
                compile(&[
                    r"(?i)\b(remember that|note that|keep in mind|store this)\b",
                    r"(?i)\b(recall|what do you know about|from (my|your) notes)\b",
                ]),
            ),
            (
                IntentTag::MemoryOps,
                compile(&[
                    r"(?i)\b(forget|clear (the |our )?(conversation|history|session))\b",
                    r"(?i)\bwhat did (i|we) (say|talk about)\b",
                ]),
            ),
        ];

        Self { table }
    }

    /// Classify a request. Infallible; no match yields `[Fallback]`.
    pub fn detect(&self, text: &str) -> Vec<IntentTag> {
        let mut tags = Vec::new();

        for (tag, patterns) in &self.table {
            if patterns.iter().any(|re| re.is_match(text)) {
                tags.push(*tag);
            }
        }

        if tags.is_empty() {
            tags.push(IntentTag::Fallback);
        }
        tags
    }
}

impl Default for IntentDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    // Patterns are compile-time constants; a bad one is a programmer error.
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("invalid intent pattern"))
        .collect()
}
