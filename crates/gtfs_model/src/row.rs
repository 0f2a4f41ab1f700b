use std::collections::BTreeMap;

use crate::{GtfsColor, GtfsDate, GtfsParseError, GtfsTime};

/// One tabular record as an ordered field-name to text mapping.
///
/// An empty value means the field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut row = RawRow::new();
        for (name, value) in pairs {
            row.insert(name, value);
        }
        row
    }

    /// Sets `name`, keeping the position of an existing field.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(str::to_string)
    }

    pub fn text_or_empty(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    pub fn required_text(&self, name: &str) -> Result<String, GtfsParseError> {
        self.text(name)
            .ok_or_else(|| GtfsParseError::MissingField(name.to_string()))
    }

    pub fn required<T: FieldValue>(&self, name: &str) -> Result<T, GtfsParseError> {
        let value = self
            .get(name)
            .ok_or_else(|| GtfsParseError::MissingField(name.to_string()))?;
        T::parse_field(value).map_err(|err| err.in_field(name))
    }

    pub fn optional<T: FieldValue>(&self, name: &str) -> Result<Option<T>, GtfsParseError> {
        match self.get(name) {
            Some(value) => T::parse_field(value)
                .map(Some)
                .map_err(|err| err.in_field(name)),
            None => Ok(None),
        }
    }

    pub fn or_default<T: FieldValue + Default>(&self, name: &str) -> Result<T, GtfsParseError> {
        Ok(self.optional(name)?.unwrap_or_default())
    }

    pub fn put<T: FieldValue>(&mut self, name: &str, value: &T) {
        self.insert(name, value.format_field());
    }

    pub fn put_optional<T: FieldValue>(&mut self, name: &str, value: &Option<T>) {
        let text = value
            .as_ref()
            .map(FieldValue::format_field)
            .unwrap_or_default();
        self.insert(name, text);
    }

    /// Collects every non-empty field that is not one of `known`.
    pub fn extensions(&self, known: &[&str]) -> Extensions {
        let mut extensions = Extensions::new();
        for (name, value) in self.iter() {
            if !known.contains(&name) {
                extensions.insert(name, value);
            }
        }
        extensions
    }

    pub fn append_extensions(&mut self, extensions: &Extensions) {
        for (name, value) in extensions.iter() {
            self.insert(name, value);
        }
    }
}

/// Conversion between a typed field and its text form.
pub trait FieldValue: Sized {
    fn parse_field(value: &str) -> Result<Self, GtfsParseError>;
    fn format_field(&self) -> String;
}

impl FieldValue for String {
    fn parse_field(value: &str) -> Result<Self, GtfsParseError> {
        Ok(value.to_string())
    }

    fn format_field(&self) -> String {
        self.clone()
    }
}

macro_rules! integer_field {
    ($($ty:ty),+) => {
        $(
            impl FieldValue for $ty {
                fn parse_field(value: &str) -> Result<Self, GtfsParseError> {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| GtfsParseError::InvalidInteger(value.to_string()))
                }

                fn format_field(&self) -> String {
                    self.to_string()
                }
            }
        )+
    };
}

integer_field!(u32, i32);

impl FieldValue for f64 {
    fn parse_field(value: &str) -> Result<Self, GtfsParseError> {
        let parsed: f64 = value
            .trim()
            .parse()
            .map_err(|_| GtfsParseError::InvalidNumber(value.to_string()))?;
        if !parsed.is_finite() {
            return Err(GtfsParseError::InvalidNumber(value.to_string()));
        }
        Ok(parsed)
    }

    fn format_field(&self) -> String {
        self.to_string()
    }
}

/// Boolean flags are written `0` or `1`.
impl FieldValue for bool {
    fn parse_field(value: &str) -> Result<Self, GtfsParseError> {
        match value.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            _ => Err(GtfsParseError::InvalidBoolean(value.to_string())),
        }
    }

    fn format_field(&self) -> String {
        let flag = if *self { "1" } else { "0" };
        flag.to_string()
    }
}

impl FieldValue for GtfsDate {
    fn parse_field(value: &str) -> Result<Self, GtfsParseError> {
        GtfsDate::parse(value)
    }

    fn format_field(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for GtfsTime {
    fn parse_field(value: &str) -> Result<Self, GtfsParseError> {
        GtfsTime::parse(value)
    }

    fn format_field(&self) -> String {
        self.to_string()
    }
}

impl FieldValue for GtfsColor {
    fn parse_field(value: &str) -> Result<Self, GtfsParseError> {
        GtfsColor::parse(value)
    }

    fn format_field(&self) -> String {
        self.to_string()
    }
}

/// Columns a record does not model, kept in first-seen order so they are
/// written back where they were read.
///
/// Equality ignores insertion order. Inserting an empty value removes the key.
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    values: BTreeMap<String, String>,
    field_order: Vec<String>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if value.is_empty() {
            self.remove(&name);
            return;
        }
        if !self.field_order.iter().any(|item| item == &name) {
            self.field_order.push(name.clone());
        }
        self.values.insert(name, value);
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.field_order.retain(|item| item != name);
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.field_order.iter().filter_map(|name| {
            self.values
                .get(name)
                .map(|value| (name.as_str(), value.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for Extensions {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Extensions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut extensions = Extensions::new();
        for (name, value) in iter {
            extensions.insert(name, value);
        }
        extensions
    }
}
