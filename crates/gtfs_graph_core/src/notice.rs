use std::collections::BTreeMap;
use std::fmt;

use gtfs_graph_model::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One broken invariant found while validating a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub entity: EntityKind,
    pub key: String,
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_order: Vec<String>,
}

impl Violation {
    pub fn new(
        code: impl Into<String>,
        severity: Severity,
        entity: EntityKind,
        key: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            entity,
            key: key.to_string(),
            field: None,
            context: BTreeMap::new(),
            field_order: Vec::new(),
        }
    }

    pub fn error(
        code: impl Into<String>,
        entity: EntityKind,
        key: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::new(code, Severity::Error, entity, key, message)
    }

    pub fn warning(
        code: impl Into<String>,
        entity: EntityKind,
        key: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::new(code, Severity::Warning, entity, key, message)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn insert_context_field<V: Serialize>(&mut self, name: impl Into<String>, value: V) {
        let key = name.into();
        let serialized = serde_json::to_value(value).unwrap_or(Value::Null);
        if !self.field_order.iter().any(|item| item == &key) {
            self.field_order.push(key.clone());
        }
        self.context.insert(key, serialized);
    }

    pub fn with_context_field<V: Serialize>(mut self, name: impl Into<String>, value: V) -> Self {
        self.insert_context_field(name, value);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {}", self.code, self.entity, self.key)?;
        if let Some(field) = &self.field {
            write!(f, ", field {}", field)?;
        }
        write!(f, "): {}", self.message)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationReport {
    violations: Vec<Violation>,
}

impl ViolationReport {
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|violation| violation.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.violations.iter().any(|violation| violation.code == code)
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn merge(&mut self, other: ViolationReport) {
        self.violations.extend(other.violations);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ViolationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors().next().or_else(|| self.violations.first()) {
            Some(first) => write!(
                f,
                "invariant violated: {} ({} violation(s) in total)",
                first,
                self.violations.len()
            ),
            None => f.write_str("no invariant violated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_context_field_order() {
        let violation = Violation::error("foreign_key_violation", EntityKind::Trip, "1001_1", "x")
            .with_context_field("routeId", "1001")
            .with_context_field("agencyId", 1);
        assert_eq!(violation.field_order, vec!["routeId", "agencyId"]);
        assert_eq!(violation.context["agencyId"], Value::from(1));
    }

    #[test]
    fn report_names_first_error() {
        let mut report = ViolationReport::new();
        report.push(Violation::warning(
            "trip_without_stop_times",
            EntityKind::Trip,
            "t",
            "no stop times",
        ));
        report.push(
            Violation::error("no_active_day", EntityKind::Service, 3, "no active day")
                .with_field("monday"),
        );
        assert!(report.has_errors());
        let text = report.to_string();
        assert!(text.contains("no_active_day (service 3, field monday)"));
        assert!(text.contains("2 violation(s)"));
    }

    #[test]
    fn serializes_report_as_json() {
        let mut report = ViolationReport::new();
        report.push(Violation::error(
            "empty_shape",
            EntityKind::Shape,
            7,
            "shape has no points",
        ));
        let json = report.to_json().unwrap();
        assert!(json.contains("\"severity\": \"error\""));
        assert!(json.contains("\"entity\": \"shape\""));
        assert!(!json.contains("context"));
    }
}
