//! Criterion model: the matchable attributes of an error.
//!
//! Every criterion a pattern can carry is listed in [`Criterion::ALL`]. Each one maps
//! statically to the attribute it reads on an [`ErrorContext`] and to the value it
//! reads on a [`PatternCriteria`]; no criterion is ever looked up by name.

use super::execution::ErrorContext;
use super::pattern::PatternCriteria;

/// One matchable attribute of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    FeatureFile,
    FeatureName,
    ScenarioName,
    Step,
    StepDefinition,
    Exception,
    Release,
    Country,
    Type,
    Platform,
    TypeIsBrowser,
    TypeIsMobile,
}

impl Criterion {
    pub const ALL: [Criterion; 12] = [
        Criterion::FeatureFile,
        Criterion::FeatureName,
        Criterion::ScenarioName,
        Criterion::Step,
        Criterion::StepDefinition,
        Criterion::Exception,
        Criterion::Release,
        Criterion::Country,
        Criterion::Type,
        Criterion::Platform,
        Criterion::TypeIsBrowser,
        Criterion::TypeIsMobile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeatureFile => "featureFile",
            Self::FeatureName => "featureName",
            Self::ScenarioName => "scenarioName",
            Self::Step => "step",
            Self::StepDefinition => "stepDefinition",
            Self::Exception => "exception",
            Self::Release => "release",
            Self::Country => "country",
            Self::Type => "type",
            Self::Platform => "platform",
            Self::TypeIsBrowser => "typeIsBrowser",
            Self::TypeIsMobile => "typeIsMobile",
        }
    }

    /// Read the attribute this criterion tests on an error.
    pub fn attribute<'a>(&self, error: &'a ErrorContext) -> Attribute<'a> {
        match self {
            Self::FeatureFile => Attribute::Text(Some(&error.scenario.feature_file)),
            Self::FeatureName => Attribute::Text(Some(&error.scenario.feature_name)),
            Self::ScenarioName => Attribute::Text(Some(&error.scenario.name)),
            Self::Step => Attribute::Text(Some(&error.error.step)),
            Self::StepDefinition => Attribute::Text(Some(&error.error.step_definition)),
            Self::Exception => Attribute::Text(error.error.exception.as_deref()),
            Self::Release => Attribute::Text(error.execution.release.as_deref()),
            Self::Country => Attribute::Text(Some(&error.run.country.code)),
            Self::Type => Attribute::Text(Some(&error.run.run_type.code)),
            Self::Platform => Attribute::Text(Some(&error.run.platform)),
            Self::TypeIsBrowser => Attribute::Flag(error.run.run_type.is_browser),
            Self::TypeIsMobile => Attribute::Flag(error.run.run_type.is_mobile),
        }
    }

    /// Read the constraint a pattern puts on this criterion; `None` is a wildcard.
    pub fn value<'a>(&self, criteria: &'a PatternCriteria) -> Option<CriterionValue<'a>> {
        match self {
            Self::FeatureFile => text(&criteria.feature_file).map(CriterionValue::Exact),
            Self::FeatureName => text(&criteria.feature_name).map(CriterionValue::Exact),
            Self::ScenarioName => {
                text_or_prefix(&criteria.scenario_name, criteria.scenario_name_starts_with)
            }
            Self::Step => text_or_prefix(&criteria.step, criteria.step_starts_with),
            Self::StepDefinition => text_or_prefix(
                &criteria.step_definition,
                criteria.step_definition_starts_with,
            ),
            Self::Exception => text(&criteria.exception).map(CriterionValue::Contains),
            Self::Release => text(&criteria.release).map(CriterionValue::Exact),
            Self::Country => text(&criteria.country_code).map(CriterionValue::Exact),
            Self::Type => text(&criteria.type_code).map(CriterionValue::Exact),
            Self::Platform => text(&criteria.platform).map(CriterionValue::Exact),
            Self::TypeIsBrowser => criteria.type_is_browser.map(CriterionValue::Flag),
            Self::TypeIsMobile => criteria.type_is_mobile.map(CriterionValue::Flag),
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn text_or_prefix(value: &Option<String>, starts_with: bool) -> Option<CriterionValue<'_>> {
    text(value).map(|v| {
        if starts_with {
            CriterionValue::Prefix(v)
        } else {
            CriterionValue::Exact(v)
        }
    })
}

/// Value of an error attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute<'a> {
    Text(Option<&'a str>),
    Flag(bool),
}

/// Constraint put by a pattern on one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionValue<'a> {
    /// Case-sensitive equality.
    Exact(&'a str),
    /// `LIKE value%`: the value may itself contain `%` wildcards.
    Prefix(&'a str),
    /// `LIKE %value%`: the value may itself contain `%` wildcards.
    Contains(&'a str),
    /// The boolean attribute must equal this value.
    Flag(bool),
}

impl CriterionValue<'_> {
    /// The `LIKE` pattern equivalent to this constraint, for text constraints.
    pub fn like_pattern(&self) -> Option<String> {
        match self {
            Self::Exact(_) | Self::Flag(_) => None,
            Self::Prefix(v) => Some(format!("{}%", v)),
            Self::Contains(v) => Some(format!("%{}%", v)),
        }
    }
}
