//! `GeoJSON` and two-column CSV output.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use natural_cities_analytics_models::CcdfPoint;
use natural_cities_cluster::{ClusterId, GroupedLocality, NaturalCity};
use natural_cities_spatial::Locality;

use crate::GeographyError;

/// Property holding the natural-city id.
pub const CLUSTER_ID_PROPERTY: &str = "id_convex";

/// Natural cities with their hull-union component as geometry.
#[must_use]
pub fn natural_cities_collection<'a>(
    cities: impl IntoIterator<Item = &'a NaturalCity>,
) -> FeatureCollection {
    collection(cities.into_iter().map(|city| {
        feature(
            Geometry::new(geojson::Value::from(&city.boundary)),
            Some(city.id),
            None,
            &city.attributes,
        )
    }))
}

/// Natural cities with the union of their member localities as geometry.
#[must_use]
pub fn grouped_collection<'a>(
    cities: impl IntoIterator<Item = &'a NaturalCity>,
) -> FeatureCollection {
    collection(cities.into_iter().map(|city| {
        feature(
            Geometry::new(geojson::Value::from(&city.footprint)),
            Some(city.id),
            None,
            &city.attributes,
        )
    }))
}

/// Input localities tagged with their natural city (`null` when
/// unmatched).
#[must_use]
pub fn assignments_collection(grouped: &[GroupedLocality]) -> FeatureCollection {
    collection(grouped.iter().map(|g| {
        let mut f = feature(
            Geometry::new(geojson::Value::from(&g.locality.geometry)),
            g.cluster_id,
            Some(g.locality.key.as_str()),
            &g.locality.attributes,
        );
        if g.cluster_id.is_none()
            && let Some(properties) = f.properties.as_mut()
        {
            properties.insert(CLUSTER_ID_PROPERTY.to_string(), JsonValue::Null);
        }
        f
    }))
}

/// Plain localities (e.g. the joined census polygons).
#[must_use]
pub fn localities_collection(localities: &[Locality], key_property: &str) -> FeatureCollection {
    collection(localities.iter().map(|locality| {
        let mut f = feature(
            Geometry::new(geojson::Value::from(&locality.geometry)),
            None,
            None,
            &locality.attributes,
        );
        if let Some(properties) = f.properties.as_mut() {
            properties.insert(
                key_property.to_string(),
                JsonValue::String(locality.key.clone()),
            );
        }
        f
    }))
}

fn collection(features: impl Iterator<Item = Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: features.collect(),
        foreign_members: None,
    }
}

fn feature(
    geometry: Geometry,
    cluster_id: Option<ClusterId>,
    key: Option<&str>,
    attributes: &BTreeMap<String, f64>,
) -> Feature {
    let mut properties = JsonObject::new();
    if let Some(key) = key {
        properties.insert(
            crate::ingest::LOCALITY_KEY.to_string(),
            JsonValue::String(key.to_string()),
        );
    }
    if let Some(id) = cluster_id {
        properties.insert(CLUSTER_ID_PROPERTY.to_string(), JsonValue::from(id));
    }
    for (name, value) in attributes {
        properties.insert(name.clone(), JsonValue::from(*value));
    }

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Writes a feature collection to `path` as `GeoJSON`.
///
/// # Errors
///
/// Returns [`GeographyError`] if the file cannot be written.
pub fn write_feature_collection(
    path: &Path,
    collection: &FeatureCollection,
) -> Result<(), GeographyError> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer(file, collection)?;
    log::info!(
        "Wrote {} features to {}",
        collection.features.len(),
        path.display()
    );
    Ok(())
}

/// Writes `(field, value)` rows as a headerless two-column CSV.
///
/// # Errors
///
/// Returns [`GeographyError`] if writing fails.
pub fn write_field_values<W: Write>(
    writer: W,
    rows: &[(&str, String)],
) -> Result<(), GeographyError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for (field, value) in rows {
        writer.write_record([*field, value.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes `(field, value)` rows to a CSV file at `path`.
///
/// # Errors
///
/// Returns [`GeographyError`] if the file cannot be written.
pub fn write_field_values_file(
    path: &Path,
    rows: &[(&str, String)],
) -> Result<(), GeographyError> {
    write_field_values(std::fs::File::create(path)?, rows)?;
    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Writes named CCDF curves as a `curve,value,probability` CSV, one row
/// per point.
///
/// # Errors
///
/// Returns [`GeographyError`] if writing fails.
pub fn write_ccdf<W: Write>(writer: W, curves: &[(&str, &[CcdfPoint])]) -> Result<(), GeographyError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["curve", "value", "probability"])?;
    for (name, points) in curves {
        for point in *points {
            writer.write_record([
                (*name).to_string(),
                point.value.to_string(),
                point.probability.to_string(),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes named CCDF curves to a CSV file at `path`. See [`write_ccdf`].
///
/// # Errors
///
/// Returns [`GeographyError`] if the file cannot be written.
pub fn write_ccdf_file(path: &Path, curves: &[(&str, &[CcdfPoint])]) -> Result<(), GeographyError> {
    write_ccdf(std::fs::File::create(path)?, curves)?;
    log::info!("Wrote {} curves to {}", curves.len(), path.display());
    Ok(())
}
