//! Problem patterns: sets of optional criteria that decide which errors belong to a problem.

use serde::{Deserialize, Serialize};

/// Criteria of a pattern. Every unset (or empty) criterion is a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternCriteria {
    pub feature_file: Option<String>,
    pub feature_name: Option<String>,
    pub scenario_name: Option<String>,
    /// Match `scenario_name` as a prefix (with `%` wildcards) instead of exactly.
    #[serde(default)]
    pub scenario_name_starts_with: bool,
    pub step: Option<String>,
    #[serde(default)]
    pub step_starts_with: bool,
    pub step_definition: Option<String>,
    #[serde(default)]
    pub step_definition_starts_with: bool,
    /// Matched anywhere in the exception, `%` being a wildcard.
    pub exception: Option<String>,
    pub release: Option<String>,
    pub country_code: Option<String>,
    pub type_code: Option<String>,
    pub type_is_browser: Option<bool>,
    pub type_is_mobile: Option<bool>,
    pub platform: Option<String>,
}

impl PatternCriteria {
    /// Canonical form: empty strings become unset, and starts-with flags
    /// without a value are dropped. Two patterns have the same criteria
    /// exactly when their normalized forms are equal.
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value.clone().filter(|v| !v.is_empty())
        }

        let scenario_name = clean(&self.scenario_name);
        let step = clean(&self.step);
        let step_definition = clean(&self.step_definition);

        PatternCriteria {
            feature_file: clean(&self.feature_file),
            feature_name: clean(&self.feature_name),
            scenario_name_starts_with: scenario_name.is_some() && self.scenario_name_starts_with,
            scenario_name,
            step_starts_with: step.is_some() && self.step_starts_with,
            step,
            step_definition_starts_with: step_definition.is_some()
                && self.step_definition_starts_with,
            step_definition,
            exception: clean(&self.exception),
            release: clean(&self.release),
            country_code: clean(&self.country_code),
            type_code: clean(&self.type_code),
            type_is_browser: self.type_is_browser,
            type_is_mobile: self.type_is_mobile,
            platform: clean(&self.platform),
        }
    }

    /// Field-by-field comparison of the non-wildcard criteria.
    pub fn same_criteria(&self, other: &PatternCriteria) -> bool {
        self.normalized() == other.normalized()
    }

    /// Whether every criterion is a wildcard (the pattern matches all errors).
    pub fn is_wildcard(&self) -> bool {
        self.normalized() == PatternCriteria::default()
    }

    pub fn with_feature_file(mut self, value: &str) -> Self {
        self.feature_file = Some(value.to_string());
        self
    }

    pub fn with_feature_name(mut self, value: &str) -> Self {
        self.feature_name = Some(value.to_string());
        self
    }

    pub fn with_scenario_name(mut self, value: &str) -> Self {
        self.scenario_name = Some(value.to_string());
        self
    }

    pub fn with_step(mut self, value: &str) -> Self {
        self.step = Some(value.to_string());
        self
    }

    pub fn with_step_definition(mut self, value: &str) -> Self {
        self.step_definition = Some(value.to_string());
        self
    }

    pub fn with_exception(mut self, value: &str) -> Self {
        self.exception = Some(value.to_string());
        self
    }

    pub fn with_release(mut self, value: &str) -> Self {
        self.release = Some(value.to_string());
        self
    }

    pub fn with_country(mut self, code: &str) -> Self {
        self.country_code = Some(code.to_string());
        self
    }

    pub fn with_type(mut self, code: &str) -> Self {
        self.type_code = Some(code.to_string());
        self
    }

    pub fn with_platform(mut self, value: &str) -> Self {
        self.platform = Some(value.to_string());
        self
    }

    pub fn with_type_is_browser(mut self, value: bool) -> Self {
        self.type_is_browser = Some(value);
        self
    }

    pub fn with_type_is_mobile(mut self, value: bool) -> Self {
        self.type_is_mobile = Some(value);
        self
    }
}

/// A pattern owned by a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: i64,
    pub problem_id: i64,
    pub criteria: PatternCriteria,
}
