//! # ContentFilter
//!
//! Validates comment bodies and author names before anything reaches the
//! store. This is a deterrent, not a security boundary: a modified client
//! skips it entirely.

use regex::Regex;
use rg_core::{AppError, FilterVerdict, RejectReason, Result};

use crate::lists::{BANNED_TERMS, RESERVED_NAMES};
use crate::patterns::PatternSet;
use crate::rules::FilterRules;

#[derive(Debug, Clone)]
pub struct ContentFilter {
    rules: FilterRules,
    /// Lowercased substrings rejected in comment bodies
    banned_terms: Vec<String>,
    /// Lowercased, whitespace-free forms of every banned name
    stripped_names: Vec<String>,
    /// Whole-word alternation over every banned name
    name_words: Option<Regex>,
    patterns: PatternSet,
}

impl Default for ContentFilter {
    fn default() -> Self {
        ContentFilter::builder()
            .build()
            .expect("built-in filter lists are valid")
    }
}

impl ContentFilter {
    pub fn builder() -> ContentFilterBuilder {
        ContentFilterBuilder::default()
    }

    pub fn rules(&self) -> &FilterRules {
        &self.rules
    }

    /// Checks a comment body. Rules run in order and the first failure wins.
    pub fn validate_comment_content(&self, text: &str) -> FilterVerdict {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return FilterVerdict::invalid(RejectReason::Empty);
        }
        if trimmed.chars().count() < self.rules.min_comment_chars {
            return FilterVerdict::invalid(RejectReason::TooShort {
                min: self.rules.min_comment_chars,
            });
        }
        if text.chars().count() > self.rules.max_comment_chars {
            return FilterVerdict::invalid(RejectReason::TooLong {
                max: self.rules.max_comment_chars,
            });
        }

        let lower = text.to_lowercase();
        if self.banned_terms.iter().any(|term| lower.contains(term.as_str())) {
            tracing::debug!("comment rejected: banned term");
            return FilterVerdict::invalid(RejectReason::InappropriateLanguage);
        }
        if self.patterns.is_match(text) {
            tracing::debug!("comment rejected: obfuscated term");
            return FilterVerdict::invalid(RejectReason::InappropriateLanguage);
        }

        if longest_run(text) >= self.rules.max_repeated_run {
            return FilterVerdict::invalid(RejectReason::ExcessiveRepetition);
        }
        if self.is_shouting(text) {
            return FilterVerdict::invalid(RejectReason::Shouting);
        }

        FilterVerdict::valid()
    }

    /// Checks a display name. Stricter than comment bodies: whole-word
    /// matches and spaced-out spellings ("p u t a") are both caught.
    pub fn validate_author_name(&self, name: &str) -> FilterVerdict {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return FilterVerdict::invalid(RejectReason::Empty);
        }

        let len = trimmed.chars().count();
        if len < self.rules.min_name_chars {
            return FilterVerdict::invalid(RejectReason::TooShort {
                min: self.rules.min_name_chars,
            });
        }
        if len > self.rules.max_name_chars {
            return FilterVerdict::invalid(RejectReason::TooLong {
                max: self.rules.max_name_chars,
            });
        }

        if self.name_words.as_ref().is_some_and(|re| re.is_match(trimmed)) {
            tracing::debug!("author name rejected: banned word");
            return FilterVerdict::invalid(RejectReason::InappropriateLanguage);
        }

        let stripped = strip_whitespace(&trimmed.to_lowercase());
        if self
            .stripped_names
            .iter()
            .any(|banned| stripped.contains(banned.as_str()))
        {
            tracing::debug!("author name rejected: banned name after stripping spaces");
            return FilterVerdict::invalid(RejectReason::InappropriateLanguage);
        }

        if self.patterns.is_match(trimmed) || self.patterns.is_match(&stripped) {
            tracing::debug!("author name rejected: obfuscated term");
            return FilterVerdict::invalid(RejectReason::InappropriateLanguage);
        }

        FilterVerdict::valid()
    }

    fn is_shouting(&self, text: &str) -> bool {
        let mut total = 0usize;
        let mut shouted = 0usize;
        for token in text.split_whitespace() {
            total += 1;
            if token.chars().count() >= self.rules.shout_min_token_chars
                && token.chars().any(char::is_uppercase)
                && !token.chars().any(char::is_lowercase)
            {
                shouted += 1;
            }
        }
        total > 0 && (shouted as f64 / total as f64) > self.rules.shout_ratio
    }
}

/// Length of the longest run of one repeated character. Newlines break runs.
fn longest_run(text: &str) -> usize {
    let mut best = 0;
    let mut current = 0;
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if c == '\n' {
            prev = None;
            current = 0;
            continue;
        }
        if prev == Some(c) {
            current += 1;
        } else {
            current = 1;
            prev = Some(c);
        }
        best = best.max(current);
    }
    best
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Assembles a `ContentFilter` from the built-in lists plus any overrides.
#[derive(Debug, Default)]
pub struct ContentFilterBuilder {
    rules: FilterRules,
    terms: Option<Vec<String>>,
    extra_terms: Vec<String>,
    reserved_names: Option<Vec<String>>,
    pattern_sources: Option<Vec<String>>,
    extra_pattern_sources: Vec<String>,
}

impl ContentFilterBuilder {
    pub fn rules(mut self, rules: FilterRules) -> Self {
        self.rules = rules;
        self
    }

    /// Replaces the built-in banned-term list.
    pub fn banned_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terms = Some(terms.into_iter().map(Into::into).collect());
        self
    }

    /// Adds terms on top of whichever list is in use.
    pub fn extra_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_terms.extend(terms.into_iter().map(Into::into));
        self
    }

    /// Replaces the built-in reserved staff names.
    pub fn reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Replaces the built-in obfuscation patterns.
    pub fn patterns<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pattern_sources = Some(sources.into_iter().map(Into::into).collect());
        self
    }

    pub fn extra_patterns<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_pattern_sources
            .extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<ContentFilter> {
        let mut banned_terms: Vec<String> = match self.terms {
            Some(terms) => terms,
            None => BANNED_TERMS.iter().map(|t| t.to_string()).collect(),
        };
        banned_terms.extend(self.extra_terms);
        let banned_terms = normalize(banned_terms);

        let reserved = match self.reserved_names {
            Some(names) => names,
            None => RESERVED_NAMES.iter().map(|n| n.to_string()).collect(),
        };
        let mut names = banned_terms.clone();
        names.extend(normalize(reserved));
        names.sort();
        names.dedup();

        let name_words = if names.is_empty() {
            None
        } else {
            let alternation = names
                .iter()
                .map(|n| regex::escape(n))
                .collect::<Vec<_>>()
                .join("|");
            let re = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
                .map_err(|e| AppError::Config(format!("invalid banned-name list: {}", e)))?;
            Some(re)
        };

        let mut stripped_names: Vec<String> = names
            .iter()
            .map(|n| strip_whitespace(n))
            .filter(|n| !n.is_empty())
            .collect();
        stripped_names.dedup();

        let mut patterns = match self.pattern_sources {
            Some(sources) => PatternSet::compile(sources)?,
            None => PatternSet::builtin(),
        };
        patterns.extend(PatternSet::compile(self.extra_pattern_sources)?);

        tracing::debug!(
            terms = banned_terms.len(),
            names = names.len(),
            patterns = patterns.len(),
            "content filter built"
        );

        Ok(ContentFilter {
            rules: self.rules,
            banned_terms,
            stripped_names,
            name_words,
            patterns,
        })
    }
}

fn normalize(list: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = list
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}
