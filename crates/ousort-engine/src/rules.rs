//! Ordered name-pattern routing rules; first match wins.

use ousort_config::RuleConfig;
use regex::{Regex, RegexBuilder};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    destination: String,
    label: Option<String>,
}

/// Rule that matched a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    /// Position of the rule in declared order.
    pub index: usize,
    /// Destination container.
    pub destination: &'a str,
    /// Optional rule label.
    pub label: Option<&'a str>,
    /// Source pattern.
    pub pattern: &'a str,
}

/// Compiled, ordered rule list.
#[derive(Debug, Clone)]
pub struct RuleMatcher {
    rules: Vec<CompiledRule>,
}

impl RuleMatcher {
    /// Compile rules case-insensitively, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidRule`] for a pattern that does not compile
    /// or an empty destination.
    pub fn compile(rules: &[RuleConfig]) -> EngineResult<Self> {
        let compiled = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| {
                if rule.destination.trim().is_empty() {
                    return Err(EngineError::InvalidRule {
                        index,
                        field: "destination",
                        reason: "empty destination",
                        value: None,
                    });
                }
                let regex = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|_| EngineError::InvalidRule {
                        index,
                        field: "pattern",
                        reason: "invalid regular expression",
                        value: Some(rule.pattern.clone()),
                    })?;
                Ok(CompiledRule {
                    regex,
                    destination: rule.destination.trim().to_string(),
                    label: rule.label.clone(),
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { rules: compiled })
    }

    /// Destination of the first rule matching `name`, if any.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<RuleMatch<'_>> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.regex.is_match(name))
            .map(|(index, rule)| RuleMatch {
                index,
                destination: &rule.destination,
                label: rule.label.as_deref(),
                pattern: rule.regex.as_str(),
            })
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, destination: &str) -> RuleConfig {
        RuleConfig {
            pattern: pattern.into(),
            destination: destination.into(),
            label: None,
        }
    }

    #[test]
    fn first_matching_rule_wins_case_insensitively() -> EngineResult<()> {
        let matcher = RuleMatcher::compile(&[
            rule("^Alpha", "OU-A"),
            rule("^Beta", "OU-B"),
            rule(".*", "OU-Quarantine"),
        ])?;
        let resolved: Vec<_> = ["ALPHA-1", "BETA-2", "ZETA-3"]
            .iter()
            .map(|name| matcher.resolve(name).map(|hit| hit.destination))
            .collect();
        assert_eq!(
            resolved,
            vec![Some("OU-A"), Some("OU-B"), Some("OU-Quarantine")]
        );
        Ok(())
    }

    #[test]
    fn earlier_rule_shadows_later_overlap() -> EngineResult<()> {
        let matcher = RuleMatcher::compile(&[rule("^AL", "OU-First"), rule("^ALPHA", "OU-Second")])?;
        let hit = matcher.resolve("alpha-9").ok_or(EngineError::ObjectNotFound {
            name: "alpha-9".into(),
        })?;
        assert_eq!(hit.index, 0);
        assert_eq!(hit.destination, "OU-First");
        Ok(())
    }

    #[test]
    fn no_match_is_none() -> EngineResult<()> {
        let matcher = RuleMatcher::compile(&[rule("^Alpha", "OU-A")])?;
        assert!(matcher.resolve("GAMMA-1").is_none());
        assert_eq!(matcher.len(), 1);
        assert!(!matcher.is_empty());
        Ok(())
    }

    #[test]
    fn invalid_pattern_reports_index() {
        let result = RuleMatcher::compile(&[rule("^ok", "OU-A"), rule("(", "OU-B")]);
        assert!(matches!(
            result,
            Err(EngineError::InvalidRule {
                index: 1,
                field: "pattern",
                ..
            })
        ));
    }
}
