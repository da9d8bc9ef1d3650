//! Obfuscation-tolerant pattern matching.
//!
//! Patterns are data: a `PatternSet` compiles whatever sources it is given,
//! so the list can change without touching control flow.

use once_cell::sync::Lazy;
use regex::Regex;
use rg_core::{AppError, Result};

use crate::lists::OBFUSCATION_PATTERNS;

static BUILTIN: Lazy<PatternSet> = Lazy::new(|| {
    PatternSet::compile(OBFUSCATION_PATTERNS.iter().copied())
        .expect("built-in obfuscation patterns are valid regexes")
});

#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compiles every source, failing on the first invalid one.
    pub fn compile<I, S>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = sources
            .into_iter()
            .map(|src| {
                let src = src.as_ref();
                Regex::new(src).map_err(|e| {
                    AppError::Config(format!("invalid filter pattern '{}': {}", src, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    pub fn extend(&mut self, other: PatternSet) {
        self.patterns.extend(other.patterns);
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catches_leetspeak() {
        let set = PatternSet::builtin();
        for disguised in ["p0ta", "PUT@", "mar1c0n", "c@br0n", "j0d3r", "mi3rd@", "n1gg3r", "f@gg0t", "r3tr4s4d0"] {
            assert!(set.is_match(disguised), "{} should match", disguised);
        }
        assert!(!set.is_match("great soundtrack"));
    }

    #[test]
    fn test_compile_rejects_bad_source() {
        let err = PatternSet::compile(["(unclosed"]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_extend() {
        let mut set = PatternSet::compile([r"(?i)n[o0]ob"]).unwrap();
        set.extend(PatternSet::compile([r"(?i)tr[o0]ll"]).unwrap());
        assert_eq!(set.len(), 2);
        assert!(set.is_match("what a N00B"));
        assert!(set.is_match("tr0ll"));
    }
}
