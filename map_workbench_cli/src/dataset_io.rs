//! GeoJSON loading for the CLI's demonstration datasets.

use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use geojson::{FeatureCollection, GeoJson, Value};
use log::warn;

use map_workbench::dataset::{AttributeValue, Dataset, Feature, FieldDef, FieldType};
use map_workbench::geometry::{Geometry, GeometryKind, Point};

/// Reads a GeoJSON feature collection into a dataset.
///
/// The schema is inferred from the first non-null occurrence of each
/// property; features whose geometry kind differs from the first feature's
/// are skipped with a warning.
pub fn load_geojson_dataset(path: &str, id: &str) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let geojson: GeoJson = text
        .parse()
        .with_context(|| format!("parsing {path} as GeoJSON"))?;
    let collection = FeatureCollection::try_from(geojson)
        .map_err(|e| anyhow!("{path} is not a feature collection: {e}"))?;

    let mut kind: Option<GeometryKind> = None;
    let mut schema: BTreeMap<String, FieldType> = BTreeMap::new();
    let mut features: Vec<Feature> = Vec::new();
    let mut skipped = 0usize;

    for (index, gj) in collection.features.iter().enumerate() {
        let geometry = match gj.geometry.as_ref().map(|g| &g.value) {
            Some(value) => match convert_geometry(value) {
                Some(g) => g,
                None => {
                    skipped += 1;
                    continue;
                }
            },
            None => {
                skipped += 1;
                continue;
            }
        };
        let dataset_kind = *kind.get_or_insert(geometry.kind());
        if geometry.kind() != dataset_kind {
            skipped += 1;
            continue;
        }

        let feature_id = match &gj.id {
            Some(geojson::feature::Id::Number(n)) => n.as_u64().unwrap_or(index as u64 + 1),
            _ => index as u64 + 1,
        };
        let mut feature = Feature::new(feature_id, geometry);
        if let Some(properties) = &gj.properties {
            for (name, value) in properties {
                let value = convert_value(value);
                if !value.is_null() {
                    schema.entry(name.clone()).or_insert_with(|| field_type(&value));
                }
                feature.attributes.insert(name.clone(), value);
            }
        }
        features.push(feature);
    }

    if skipped > 0 {
        warn!("{skipped} features skipped while loading {path}");
    }
    let fields = schema
        .into_iter()
        .map(|(name, field_type)| FieldDef { name, field_type })
        .collect();
    let mut dataset = Dataset::new(
        id,
        path,
        kind.unwrap_or(GeometryKind::Point),
        fields,
    );
    for feature in features {
        dataset.add_feature(feature);
    }
    Ok(dataset)
}

fn convert_geometry(value: &Value) -> Option<Geometry> {
    match value {
        Value::Point(pos) => Some(Geometry::point(pos[0], pos[1])),
        Value::LineString(positions) => Some(Geometry::line(
            positions.iter().map(|p| Point::new(p[0], p[1])).collect(),
        )),
        Value::Polygon(rings) => {
            let outer = rings.first()?;
            Some(Geometry::polygon(
                outer.iter().map(|p| Point::new(p[0], p[1])).collect(),
            ))
        }
        _ => None,
    }
}

fn convert_value(value: &serde_json::Value) -> AttributeValue {
    match value {
        serde_json::Value::String(s) => AttributeValue::Text(s.clone()),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) => AttributeValue::Number(f),
            None => AttributeValue::Text(n.to_string()),
        },
        serde_json::Value::Bool(b) => AttributeValue::Boolean(*b),
        serde_json::Value::Null => AttributeValue::Null,
        other => AttributeValue::Text(other.to_string()),
    }
}

fn field_type(value: &AttributeValue) -> FieldType {
    match value {
        AttributeValue::Number(_) => FieldType::Number,
        AttributeValue::Boolean(_) => FieldType::Boolean,
        AttributeValue::Date(_) => FieldType::Date,
        _ => FieldType::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_points_with_inferred_schema() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"type":"FeatureCollection","features":[
                {{"type":"Feature","geometry":{{"type":"Point","coordinates":[1.0,2.0]}},
                 "properties":{{"name":"alpha","size":4.5,"active":true}}}},
                {{"type":"Feature","geometry":{{"type":"Point","coordinates":[3.0,4.0]}},
                 "properties":{{"name":"beta","size":1.25,"active":false}}}}
            ]}}"#
        )
        .unwrap();
        let dataset = load_geojson_dataset(file.path().to_str().unwrap(), "test").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.geometry_kind, GeometryKind::Point);
        assert_eq!(dataset.field("size").unwrap().field_type, FieldType::Number);
        assert_eq!(
            dataset.field("active").unwrap().field_type,
            FieldType::Boolean
        );
    }
}
