//! Custom metric definitions.
//!
//! Metric definitions are SQL fragments with `{{placeholder}}` slots that the
//! platform fills in per window (`{{prediction_col}}`, `{{current_df}}`, ...).
//! `MetricTemplate` keeps text and slots apart so a slot can only come from a
//! `Placeholder` value, never from spliced text.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A slot the platform substitutes when it evaluates a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    PredictionCol,
    LabelCol,
    /// Current window's metrics row (drift metrics only).
    CurrentDf,
    /// Comparison window's metrics row (drift metrics only).
    BaseDf,
    InputColumn,
}

impl Placeholder {
    pub const ALL: [Placeholder; 5] = [
        Placeholder::PredictionCol,
        Placeholder::LabelCol,
        Placeholder::CurrentDf,
        Placeholder::BaseDf,
        Placeholder::InputColumn,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::PredictionCol => "prediction_col",
            Placeholder::LabelCol => "label_col",
            Placeholder::CurrentDf => "current_df",
            Placeholder::BaseDf => "base_df",
            Placeholder::InputColumn => "input_column",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn is_drift_only(self) -> bool {
        matches!(self, Placeholder::CurrentDf | Placeholder::BaseDf)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}}}}}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricError {
    #[error("unknown placeholder {{{{{0}}}}}")]
    UnknownPlaceholder(String),

    #[error("unbalanced template delimiter at byte {0}")]
    UnbalancedDelimiter(usize),

    #[error("literal text may not contain template delimiters: {0:?}")]
    DelimiterInText(String),

    #[error("literal text may not put a brace directly against a placeholder: {0:?}")]
    BraceAgainstSlot(String),

    #[error("no value bound for placeholder {0}")]
    MissingBinding(Placeholder),

    #[error("invalid metric name {0:?}")]
    InvalidName(String),

    #[error("metric {name}: definition is empty")]
    EmptyDefinition { name: String },

    #[error("metric {name}: placeholder {placeholder} is only valid in drift metrics")]
    DriftPlaceholderOutsideDrift { name: String, placeholder: Placeholder },

    #[error("metric {name}: at least one input column is required")]
    NoInputColumns { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(Placeholder),
}

/// Parsed or built metric definition template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricTemplate {
    segments: Vec<Segment>,
}

/// Values used by [`MetricTemplate::render`] for local previews.
pub type Bindings = HashMap<Placeholder, String>;

impl MetricTemplate {
    pub fn builder() -> TemplateBuilder {
        TemplateBuilder::default()
    }

    /// Parse a `{{name}}` template. Unknown names and stray delimiters are errors.
    pub fn parse(raw: &str) -> Result<Self, MetricError> {
        let mut segments = Vec::new();
        let mut rest = raw;
        let mut offset = 0;

        while let Some(open) = rest.find("{{") {
            let text = &rest[..open];
            if let Some(stray) = text.find("}}") {
                return Err(MetricError::UnbalancedDelimiter(offset + stray));
            }
            if !text.is_empty() {
                segments.push(Segment::Text(text.to_string()));
            }

            let after_open = &rest[open + 2..];
            let close = after_open
                .find("}}")
                .ok_or(MetricError::UnbalancedDelimiter(offset + open))?;
            let name = after_open[..close].trim();
            if name.contains("{{") {
                return Err(MetricError::UnbalancedDelimiter(offset + open));
            }
            let slot = Placeholder::from_name(name)
                .ok_or_else(|| MetricError::UnknownPlaceholder(name.to_string()))?;
            segments.push(Segment::Slot(slot));

            let consumed = open + 2 + close + 2;
            offset += consumed;
            rest = &rest[consumed..];
            if rest.starts_with('}') {
                return Err(MetricError::UnbalancedDelimiter(offset));
            }
        }

        if let Some(stray) = rest.find("}}") {
            return Err(MetricError::UnbalancedDelimiter(offset + stray));
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }
        Ok(Self { segments })
    }

    /// Template string in the form the platform expects.
    pub fn to_definition(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Slot(slot) => slot.to_string(),
            })
            .collect()
    }

    /// Substitute every slot from `bindings`.
    pub fn render(&self, bindings: &Bindings) -> Result<String, MetricError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(
                    bindings
                        .get(slot)
                        .ok_or(MetricError::MissingBinding(*slot))?,
                ),
            }
        }
        Ok(out)
    }

    pub fn placeholders(&self) -> impl Iterator<Item = Placeholder> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Slot(slot) => Some(*slot),
            Segment::Text(_) => None,
        })
    }

    pub fn is_blank(&self) -> bool {
        self.segments.iter().all(|segment| match segment {
            Segment::Text(text) => text.trim().is_empty(),
            Segment::Slot(_) => false,
        })
    }
}

/// Incremental construction of a [`MetricTemplate`].
///
/// The first error is kept and reported by `build()`.
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    segments: Vec<Segment>,
    error: Option<MetricError>,
}

impl TemplateBuilder {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if self.error.is_some() || text.is_empty() {
            return self;
        }
        if matches!(self.segments.last(), Some(Segment::Slot(_))) && text.starts_with('}') {
            self.error = Some(MetricError::BraceAgainstSlot(text));
            return self;
        }
        if let Some(Segment::Text(prev)) = self.segments.last_mut() {
            prev.push_str(&text);
        } else {
            self.segments.push(Segment::Text(text));
        }
        // Check the merged run: "{" + "{label_col}" must not become a slot.
        if let Some(Segment::Text(merged)) = self.segments.last()
            && (merged.contains("{{") || merged.contains("}}"))
        {
            self.error = Some(MetricError::DelimiterInText(merged.clone()));
        }
        self
    }

    pub fn slot(mut self, placeholder: Placeholder) -> Self {
        if self.error.is_none()
            && let Some(Segment::Text(prev)) = self.segments.last()
            && prev.ends_with('{')
        {
            self.error = Some(MetricError::BraceAgainstSlot(prev.clone()));
        }
        self.segments.push(Segment::Slot(placeholder));
        self
    }

    pub fn build(self) -> Result<MetricTemplate, MetricError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(MetricTemplate {
                segments: self.segments,
            }),
        }
    }
}

/// How the platform evaluates a custom metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Computed from the columns of the monitored table.
    #[serde(rename = "CUSTOM_METRIC_TYPE_AGGREGATE", alias = "aggregate")]
    Aggregate,
    /// Computed from previously computed aggregate metrics.
    #[serde(rename = "CUSTOM_METRIC_TYPE_DERIVED", alias = "derived")]
    Derived,
    /// Compares two windows (consecutive or against baseline).
    #[serde(rename = "CUSTOM_METRIC_TYPE_DRIFT", alias = "drift")]
    Drift,
}

/// Spark SQL type of a metric's output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Double,
    Long,
    Integer,
    String,
    Boolean,
}

/// Spark `StructField` JSON. Field order matches Spark's sorted-key output.
#[derive(Debug, Serialize)]
struct StructField<'a> {
    metadata: serde_json::Map<String, serde_json::Value>,
    name: &'a str,
    nullable: bool,
    #[serde(rename = "type")]
    data_type: OutputType,
}

/// Table-level input: the metric sees the whole window, not one column.
pub const TABLE_INPUT: &str = ":table";

/// A custom metric in the platform's wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomMetric {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub name: String,
    pub input_columns: Vec<String>,
    pub definition: String,
    pub output_data_type: String,
}

impl CustomMetric {
    pub fn aggregate(name: impl Into<String>, template: MetricTemplate) -> CustomMetricBuilder {
        CustomMetricBuilder::new(MetricKind::Aggregate, name.into(), template)
    }

    pub fn derived(name: impl Into<String>, template: MetricTemplate) -> CustomMetricBuilder {
        CustomMetricBuilder::new(MetricKind::Derived, name.into(), template)
    }

    pub fn drift(name: impl Into<String>, template: MetricTemplate) -> CustomMetricBuilder {
        CustomMetricBuilder::new(MetricKind::Drift, name.into(), template)
    }
}

pub struct CustomMetricBuilder {
    kind: MetricKind,
    name: String,
    template: MetricTemplate,
    input_columns: Vec<String>,
    output: OutputType,
}

impl CustomMetricBuilder {
    fn new(kind: MetricKind, name: String, template: MetricTemplate) -> Self {
        Self {
            kind,
            name,
            template,
            input_columns: vec![TABLE_INPUT.to_string()],
            output: OutputType::Double,
        }
    }

    pub fn input_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn output(mut self, output: OutputType) -> Self {
        self.output = output;
        self
    }

    pub fn build(self) -> Result<CustomMetric, MetricError> {
        if !is_identifier(&self.name) {
            return Err(MetricError::InvalidName(self.name));
        }
        if self.template.is_blank() {
            return Err(MetricError::EmptyDefinition { name: self.name });
        }
        if self.input_columns.is_empty() {
            return Err(MetricError::NoInputColumns { name: self.name });
        }
        if self.kind != MetricKind::Drift
            && let Some(placeholder) = self.template.placeholders().find(|p| p.is_drift_only())
        {
            return Err(MetricError::DriftPlaceholderOutsideDrift {
                name: self.name,
                placeholder,
            });
        }

        let field = StructField {
            metadata: serde_json::Map::new(),
            name: &self.name,
            nullable: true,
            data_type: self.output,
        };
        // A struct of strings, bools and an empty map always serializes.
        let output_data_type = serde_json::to_string(&field).unwrap_or_default();

        Ok(CustomMetric {
            kind: self.kind,
            definition: self.template.to_definition(),
            name: self.name,
            input_columns: self.input_columns,
            output_data_type,
        })
    }
}

/// SQL-safe identifier: ASCII letters, digits and `_`, not starting with a digit.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parse_preserves_definition_text() {
        let raw = "sum(CASE WHEN {{prediction_col}} = {{label_col}} THEN 0 ELSE 1 END)";
        let t = MetricTemplate::parse(raw).unwrap();
        assert_eq!(t.to_definition(), raw);
        assert_eq!(
            t.placeholders().collect::<Vec<_>>(),
            vec![Placeholder::PredictionCol, Placeholder::LabelCol]
        );
    }

    #[test]
    fn parse_tolerates_inner_whitespace_and_normalizes_it() {
        let t = MetricTemplate::parse("{{ current_df }}.r2_score").unwrap();
        assert_eq!(t.to_definition(), "{{current_df}}.r2_score");
    }

    #[rstest]
    #[case::typo("{{predicton_col}} + 1", MetricError::UnknownPlaceholder("predicton_col".to_string()))]
    #[case::unclosed("sum({{label_col)", MetricError::UnbalancedDelimiter(4))]
    #[case::stray_close("a }} b", MetricError::UnbalancedDelimiter(2))]
    #[case::stray_close_after_slot("{{label_col}} }}", MetricError::UnbalancedDelimiter(14))]
    fn parse_rejects_malformed_templates(#[case] raw: &str, #[case] expected: MetricError) {
        assert_eq!(MetricTemplate::parse(raw), Err(expected));
    }

    #[test]
    fn builder_matches_parsed_template() {
        let built = MetricTemplate::builder()
            .slot(Placeholder::CurrentDf)
            .text(".r2_score - ")
            .slot(Placeholder::BaseDf)
            .text(".r2_score")
            .build()
            .unwrap();
        let parsed = MetricTemplate::parse("{{current_df}}.r2_score - {{base_df}}.r2_score").unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn builder_rejects_smuggled_slots_in_text() {
        let err = MetricTemplate::builder()
            .text("sum({{label_col}})")
            .build()
            .unwrap_err();
        assert!(matches!(err, MetricError::DelimiterInText(_)));
    }

    #[test]
    fn builder_checks_delimiters_across_text_fragments() {
        let err = MetricTemplate::builder()
            .text("{")
            .text("{label_col}")
            .text("}")
            .build()
            .unwrap_err();
        assert_eq!(err, MetricError::DelimiterInText("{{label_col}".to_string()));

        let err = MetricTemplate::builder()
            .text("a }")
            .text("} b")
            .build()
            .unwrap_err();
        assert!(matches!(err, MetricError::DelimiterInText(_)));
    }

    #[rstest]
    #[case::open_brace_before_slot(MetricTemplate::builder().text("map{").slot(Placeholder::PredictionCol))]
    #[case::close_brace_after_slot(MetricTemplate::builder().slot(Placeholder::PredictionCol).text("}x"))]
    fn builder_keeps_braces_off_slots(#[case] builder: TemplateBuilder) {
        assert!(matches!(builder.build(), Err(MetricError::BraceAgainstSlot(_))));
    }

    #[test]
    fn built_definitions_parse_back_to_the_same_template() {
        let built = MetricTemplate::builder()
            .text("map{ ")
            .slot(Placeholder::PredictionCol)
            .text(" }")
            .build()
            .unwrap();
        let reparsed = MetricTemplate::parse(&built.to_definition()).unwrap();
        assert_eq!(reparsed, built);
    }

    #[test]
    fn parse_rejects_brace_right_after_slot() {
        assert_eq!(
            MetricTemplate::parse("{{label_col}}}"),
            Err(MetricError::UnbalancedDelimiter(13))
        );
    }

    #[test]
    fn render_substitutes_bindings() {
        let t = MetricTemplate::parse("POWER({{prediction_col}} - {{label_col}}, 2)").unwrap();
        let bindings = Bindings::from([
            (Placeholder::PredictionCol, "Prediction".to_string()),
            (Placeholder::LabelCol, "ProductRating".to_string()),
        ]);
        assert_eq!(t.render(&bindings).unwrap(), "POWER(Prediction - ProductRating, 2)");
    }

    #[test]
    fn render_reports_missing_binding() {
        let t = MetricTemplate::parse("{{label_col}}").unwrap();
        assert_eq!(
            t.render(&Bindings::new()),
            Err(MetricError::MissingBinding(Placeholder::LabelCol))
        );
    }

    #[test]
    fn metric_wire_form() {
        let m = CustomMetric::derived("weighted_mse", MetricTemplate::parse("weighted_se / weights_sum").unwrap())
            .build()
            .unwrap();
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["type"], "CUSTOM_METRIC_TYPE_DERIVED");
        assert_eq!(v["name"], "weighted_mse");
        assert_eq!(v["input_columns"], serde_json::json!([":table"]));
        assert_eq!(v["definition"], "weighted_se / weights_sum");
        assert_eq!(
            v["output_data_type"],
            r#"{"metadata":{},"name":"weighted_mse","nullable":true,"type":"double"}"#
        );
    }

    #[test]
    fn drift_slots_are_rejected_outside_drift_metrics() {
        let t = MetricTemplate::parse("{{current_df}}.r2_score").unwrap();
        let err = CustomMetric::aggregate("r2", t.clone()).build().unwrap_err();
        assert!(matches!(
            err,
            MetricError::DriftPlaceholderOutsideDrift { placeholder: Placeholder::CurrentDf, .. }
        ));
        assert!(CustomMetric::drift("r2", t).build().is_ok());
    }

    #[rstest]
    #[case::leading_digit("1metric")]
    #[case::dash("weighted-mse")]
    #[case::empty("")]
    fn invalid_names_are_rejected(#[case] name: &str) {
        let t = MetricTemplate::parse("count(1)").unwrap();
        assert_eq!(
            CustomMetric::aggregate(name, t).build(),
            Err(MetricError::InvalidName(name.to_string()))
        );
    }

    #[test]
    fn blank_definition_and_missing_inputs_are_rejected() {
        let blank = MetricTemplate::parse("   ").unwrap();
        assert!(matches!(
            CustomMetric::aggregate("m", blank).build(),
            Err(MetricError::EmptyDefinition { .. })
        ));

        let t = MetricTemplate::parse("count(1)").unwrap();
        assert!(matches!(
            CustomMetric::aggregate("m", t).input_columns(Vec::<String>::new()).build(),
            Err(MetricError::NoInputColumns { .. })
        ));
    }

    #[test]
    fn output_type_and_columns_are_configurable() {
        let t = MetricTemplate::parse("count({{input_column}})").unwrap();
        let m = CustomMetric::aggregate("non_null", t)
            .input_columns(["Prediction", "ProductRating"])
            .output(OutputType::Long)
            .build()
            .unwrap();
        assert_eq!(m.input_columns, vec!["Prediction", "ProductRating"]);
        assert!(m.output_data_type.contains(r#""type":"long""#));
    }
}
