//! Ordered, named tag-exclusion stages.
//!
//! Three stages come from configuration (regex, exact list, gender regex);
//! a fourth structural stage dropping "counted person" tags such as `1girl`
//! or `2boys` is fixed and always present. Stages are applied in order and
//! short-circuit per token.

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use crate::config::FilterConfig;
use crate::error::Result;

/// Always-on structural exclusion: leading digits followed by boy/girl(s)
const STRUCTURAL_PATTERN: &str = r"^\d+(?:boy|girl)s?$";

enum Rule {
    Pattern(Regex),
    Exact(HashSet<String>),
}

pub struct FilterStage {
    name: &'static str,
    rule: Rule,
}

impl FilterStage {
    fn pattern(name: &'static str, pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            name,
            rule: Rule::Pattern(regex),
        })
    }

    fn exact(name: &'static str, tags: &[String]) -> Self {
        let set = tags
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            name,
            rule: Rule::Exact(set),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this stage drops the given token
    pub fn excludes(&self, token: &str) -> bool {
        match &self.rule {
            Rule::Pattern(regex) => regex.is_match(token),
            Rule::Exact(set) => set.contains(token),
        }
    }
}

/// Build the ordered stage list from configuration.
///
/// Order matters and is part of the normalization contract: configured
/// regex, exact list, gender regex, then the fixed structural rule.
pub fn build_stages(config: &FilterConfig) -> Result<Vec<FilterStage>> {
    let mut stages = Vec::new();

    if let Some(pattern) = config.regex_filter.as_deref().filter(|p| !p.is_empty()) {
        stages.push(FilterStage::pattern("regex-exclusion", pattern)?);
    }
    if !config.exact_tags.is_empty() {
        stages.push(FilterStage::exact("exact-exclusion", &config.exact_tags));
    }
    if let Some(pattern) = config.gender_regex.as_deref().filter(|p| !p.is_empty()) {
        stages.push(FilterStage::pattern("gender-exclusion", pattern)?);
    }
    stages.push(FilterStage::pattern(
        "counted-person",
        STRUCTURAL_PATTERN,
    )?);

    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_stage_is_always_present() {
        let stages = build_stages(&FilterConfig::default()).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].name(), "counted-person");
    }

    #[test]
    fn test_structural_rule_matches() {
        let stages = build_stages(&FilterConfig::default()).unwrap();
        let counted = &stages[0];

        assert!(counted.excludes("1girl"));
        assert!(counted.excludes("2boys"));
        assert!(counted.excludes("10GIRLS"));
        assert!(!counted.excludes("girl"));
        assert!(!counted.excludes("1girl_smiling"));
        assert!(!counted.excludes("boy1"));
    }

    #[test]
    fn test_configured_stage_order() {
        let config = FilterConfig {
            regex_filter: Some("watermark".to_string()),
            exact_tags: vec!["ugly".to_string()],
            gender_regex: Some("^(male|female)$".to_string()),
        };
        let stages = build_stages(&config).unwrap();
        let names: Vec<_> = stages.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "regex-exclusion",
                "exact-exclusion",
                "gender-exclusion",
                "counted-person"
            ]
        );
    }

    #[test]
    fn test_regex_stage_is_case_insensitive_substring() {
        let config = FilterConfig {
            regex_filter: Some("watermark".to_string()),
            ..Default::default()
        };
        let stages = build_stages(&config).unwrap();
        assert!(stages[0].excludes("Watermark"));
        assert!(stages[0].excludes("has_watermark_text"));
        assert!(!stages[0].excludes("water"));
    }

    #[test]
    fn test_exact_stage_is_verbatim() {
        let config = FilterConfig {
            exact_tags: vec!["ugly".to_string()],
            ..Default::default()
        };
        let stages = build_stages(&config).unwrap();
        assert!(stages[0].excludes("ugly"));
        assert!(!stages[0].excludes("Ugly"));
        assert!(!stages[0].excludes("ugly_duck"));
    }
}
