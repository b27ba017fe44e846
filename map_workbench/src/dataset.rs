//! Datasets, features and the in-memory dataset registry.

use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::geometry::{Geometry, GeometryKind};

/// Declared type of a dataset field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
}

/// Schema entry for one attribute field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
        }
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    Null,
}

impl AttributeValue {
    pub fn text(s: &str) -> Self {
        Self::Text(s.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Reads the value as a number, coercing numeric text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Reads the value as text. Every non-null value has a textual form.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(s) => Some(Cow::Borrowed(s)),
            Self::Number(n) => Some(Cow::Owned(n.to_string())),
            Self::Boolean(b) => Some(Cow::Owned(b.to_string())),
            Self::Date(d) => Some(Cow::Owned(d.format("%Y-%m-%d").to_string())),
            Self::Null => None,
        }
    }

    /// Reads the value as a date, coercing ISO `YYYY-MM-DD` text.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

/// One geometry plus its attribute record within a dataset.
///
/// Features are immutable once queried; their geometries are shared
/// read-only with the render surface for highlighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: u64,
    pub geometry: Geometry,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Feature {
    /// Creates a feature with no attributes.
    pub fn new(id: u64, geometry: Geometry) -> Self {
        Self {
            id,
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute, builder style.
    pub fn with_attribute(mut self, name: &str, value: AttributeValue) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    /// Looks up an attribute value by field name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}

/// A named collection of features sharing a schema and geometry kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub title: String,
    pub geometry_kind: GeometryKind,
    pub fields: Vec<FieldDef>,
    features: Vec<Feature>,
}

impl Dataset {
    /// Creates an empty dataset.
    pub fn new(id: &str, title: &str, geometry_kind: GeometryKind, fields: Vec<FieldDef>) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            geometry_kind,
            fields,
            features: Vec::new(),
        }
    }

    /// Looks up a schema field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Appends a feature.
    pub fn add_feature(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Removes the feature with the given id.
    pub fn remove_feature(&mut self, id: u64) -> Option<Feature> {
        let index = self.features.iter().position(|f| f.id == id)?;
        Some(self.features.remove(index))
    }

    /// All features in load order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Looks up a feature by id.
    pub fn feature(&self, id: u64) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// In-memory registry of loaded datasets.
///
/// Datasets are listed in insertion order. Registering a dataset under an
/// id that is already present replaces the previous entry in place (last
/// write wins).
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    datasets: Vec<Dataset>,
}

impl DatasetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            datasets: Vec::new(),
        }
    }

    /// Registers a dataset, replacing any existing entry with the same id.
    /// Returns `true` when an entry was replaced.
    pub fn register(&mut self, dataset: Dataset) -> bool {
        match self.datasets.iter().position(|d| d.id == dataset.id) {
            Some(index) => {
                self.datasets[index] = dataset;
                true
            }
            None => {
                self.datasets.push(dataset);
                false
            }
        }
    }

    /// Removes and returns the dataset with the given id.
    pub fn unregister(&mut self, id: &str) -> Option<Dataset> {
        let index = self.datasets.iter().position(|d| d.id == id)?;
        Some(self.datasets.remove(index))
    }

    /// Looks up a dataset by id.
    pub fn get(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }

    /// Mutable lookup, for add/remove-feature operations.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Dataset> {
        self.datasets.iter_mut().find(|d| d.id == id)
    }

    /// Iterator over all datasets in insertion order.
    pub fn list(&self) -> impl Iterator<Item = &Dataset> {
        self.datasets.iter()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_dataset(id: &str) -> Dataset {
        Dataset::new(
            id,
            id,
            GeometryKind::Point,
            vec![FieldDef::new("name", FieldType::Text)],
        )
    }

    #[test]
    fn register_keeps_insertion_order() {
        let mut registry = DatasetRegistry::new();
        registry.register(point_dataset("b"));
        registry.register(point_dataset("a"));
        let ids: Vec<_> = registry.list().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn duplicate_id_replaces_previous_entry() {
        let mut registry = DatasetRegistry::new();
        registry.register(point_dataset("a"));
        let mut replacement = point_dataset("a");
        replacement.title = "second".to_string();
        assert!(registry.register(replacement));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("a").unwrap().title, "second");
    }

    #[test]
    fn feature_add_remove() {
        let mut dataset = point_dataset("a");
        dataset.add_feature(Feature::new(1, Geometry::point(0.0, 0.0)));
        dataset.add_feature(Feature::new(2, Geometry::point(1.0, 1.0)));
        assert_eq!(dataset.len(), 2);
        assert!(dataset.remove_feature(1).is_some());
        assert!(dataset.remove_feature(1).is_none());
        assert_eq!(dataset.features()[0].id, 2);
    }

    #[test]
    fn numeric_text_coerces() {
        assert_eq!(AttributeValue::text(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(AttributeValue::text("twelve").as_number(), None);
        assert!(AttributeValue::Null.as_text().is_none());
    }
}
