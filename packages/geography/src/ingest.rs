//! Locality polygon and census ingest.
//!
//! Polygons come from a `GeoJSON` `FeatureCollection` keyed by a string
//! property (`CVEGEO` for localities, `CVE_ENT` for states, `CVE_SUN` for
//! SUN-2018 metropolitan areas). Census rows
//! come from the INEGI locality census CSV, filtered to inhabited
//! localities and keyed by the same `CVEGEO`.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use geojson::GeoJson;
use natural_cities_geography_models::{CensusLocality, TOTAL_POPULATION, inegi};
use natural_cities_spatial::{Locality, geometry_to_multipolygon};

use crate::GeographyError;

/// Key property of locality features.
pub const LOCALITY_KEY: &str = "CVEGEO";

/// Key property of SUN-2018 metropolitan-area features.
pub const SUN_KEY: &str = "CVE_SUN";

/// Key property of state features.
pub const STATE_KEY: &str = "CVE_ENT";

/// Highest `LOC` value that denotes a real locality; 9998 and 9999 group
/// the one- and two-dwelling localities of a municipality.
const MAX_LOCALITY_NUMBER: u32 = 9997;

/// Reads a `GeoJSON` `FeatureCollection` of polygons from `path`.
///
/// # Errors
///
/// Returns [`GeographyError`] if the file cannot be read or is not a
/// `FeatureCollection`.
pub fn read_features(
    path: &Path,
    key_property: &str,
    projection: u32,
) -> Result<Vec<Locality>, GeographyError> {
    log::info!("Reading features from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    parse_features(&content, key_property, projection)
}

/// Parses a `GeoJSON` `FeatureCollection` into [`Locality`] values.
///
/// The key is taken from `key_property` (string or number). Every other
/// numeric property becomes an attribute. Features without a key or
/// without areal geometry are skipped with a warning.
///
/// # Errors
///
/// Returns [`GeographyError`] if the input is not valid `GeoJSON` or not a
/// `FeatureCollection`.
pub fn parse_features(
    content: &str,
    key_property: &str,
    projection: u32,
) -> Result<Vec<Locality>, GeographyError> {
    let GeoJson::FeatureCollection(collection) = content.parse::<GeoJson>()? else {
        return Err(GeographyError::Conversion {
            message: "expected a GeoJSON FeatureCollection".to_string(),
        });
    };

    let total = collection.features.len();
    let mut localities = Vec::with_capacity(total);
    let mut missing_key = 0usize;
    let mut not_areal = 0usize;

    for feature in collection.features {
        let key = match feature.property(key_property) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                missing_key += 1;
                continue;
            }
        };

        let Some(geometry) = feature.geometry.and_then(geometry_to_multipolygon) else {
            not_areal += 1;
            continue;
        };

        let attributes: BTreeMap<String, f64> = feature
            .properties
            .iter()
            .flatten()
            .filter(|(name, _)| name.as_str() != key_property)
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.clone(), v)))
            .collect();

        localities.push(Locality {
            key,
            projection,
            geometry,
            attributes,
        });
    }

    if missing_key > 0 {
        log::warn!("Skipped {missing_key} of {total} features without a '{key_property}' key");
    }
    if not_areal > 0 {
        log::warn!("Skipped {not_areal} of {total} features without polygon geometry");
    }
    log::info!("Parsed {} features", localities.len());

    Ok(localities)
}

/// Reads the locality census CSV at `path`. See [`parse_census`].
///
/// # Errors
///
/// Returns [`GeographyError`] if the file cannot be read or parsed.
pub fn read_census(path: &Path, attributes: &[String]) -> Result<Vec<CensusLocality>, GeographyError> {
    log::info!("Reading census from {}", path.display());
    let file = std::fs::File::open(path)?;
    parse_census(file, attributes)
}

/// Parses the locality census.
///
/// Keeps rows with `0 < LOC < 9998` and `POBTOT > 0`, builds the
/// `CVEGEO` key from `ENTIDAD`, `MUN` and `LOC`, and keeps `POBTOT` plus
/// the requested `attributes`. Cells that are not numbers (INEGI writes
/// `*` for confidential values) count as absent; rows whose `POBTOT` is
/// absent are skipped with a warning. Text columns may be in any
/// encoding.
///
/// # Errors
///
/// Returns [`GeographyError`] if the CSV is malformed or lacks a key
/// column or a requested attribute column.
pub fn parse_census(
    reader: impl Read,
    attributes: &[String],
) -> Result<Vec<CensusLocality>, GeographyError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .trim()
                .to_string()
        })
        .collect();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| GeographyError::Conversion {
                message: format!("census CSV has no '{name}' column"),
            })
    };

    let entity_col = column("ENTIDAD")?;
    let municipality_col = column("MUN")?;
    let locality_col = column("LOC")?;
    let population_col = column(TOTAL_POPULATION)?;
    let mut attribute_cols = vec![(TOTAL_POPULATION.to_string(), population_col)];
    for attribute in attributes {
        if attribute != TOTAL_POPULATION {
            attribute_cols.push((attribute.clone(), column(attribute)?));
        }
    }

    let mut rows = Vec::new();
    let mut read = 0usize;
    let mut absent_population = 0usize;

    for record in reader.byte_records() {
        let record = record?;
        read += 1;

        let (Some(entity), Some(municipality), Some(locality)) = (
            parse_cell::<u32>(record.get(entity_col)),
            parse_cell::<u32>(record.get(municipality_col)),
            parse_cell::<u32>(record.get(locality_col)),
        ) else {
            continue;
        };
        if locality == 0 || locality > MAX_LOCALITY_NUMBER {
            continue;
        }

        let Some(population) = parse_cell::<f64>(record.get(population_col)) else {
            absent_population += 1;
            continue;
        };
        if population <= 0.0 {
            continue;
        }

        let Some(key) = inegi::locality_key(entity, municipality, locality) else {
            log::warn!("Census row {read}: key parts {entity}/{municipality}/{locality} out of range");
            continue;
        };

        let attributes = attribute_cols
            .iter()
            .filter_map(|(name, col)| parse_cell::<f64>(record.get(*col)).map(|v| (name.clone(), v)))
            .collect();

        rows.push(CensusLocality { key, attributes });
    }

    if absent_population > 0 {
        log::warn!("Skipped {absent_population} census rows without a numeric {TOTAL_POPULATION}");
    }
    log::info!("Kept {} of {read} census rows", rows.len());

    Ok(rows)
}

fn parse_cell<T: std::str::FromStr>(cell: Option<&[u8]>) -> Option<T> {
    std::str::from_utf8(cell?).ok()?.trim().parse().ok()
}

/// Left-joins census attributes onto polygons by key, then keeps only the
/// polygons whose `primary` attribute is present and positive.
#[must_use]
pub fn join_census(
    localities: Vec<Locality>,
    census: Vec<CensusLocality>,
    primary: &str,
) -> Vec<Locality> {
    let census: BTreeMap<String, BTreeMap<String, f64>> =
        census.into_iter().map(|row| (row.key, row.attributes)).collect();

    let total = localities.len();
    let joined: Vec<Locality> = localities
        .into_iter()
        .filter_map(|mut locality| {
            if let Some(attributes) = census.get(&locality.key) {
                locality
                    .attributes
                    .extend(attributes.iter().map(|(k, v)| (k.clone(), *v)));
            }
            locality
                .attribute(primary)
                .is_some_and(|v| v > 0.0)
                .then_some(locality)
        })
        .collect();

    log::info!(
        "Joined census onto {total} polygons: {} with positive {primary}, {} dropped",
        joined.len(),
        total - joined.len()
    );

    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCALITIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "CVEGEO": "010010001", "AMBITO": "Urbano" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[4,0],[4,4],[0,4],[0,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "CVEGEO": "010010002", "POBTOT": 12 },
                "geometry": { "type": "MultiPolygon", "coordinates": [[[[10,0],[12,0],[12,2],[10,2],[10,0]]]] }
            },
            {
                "type": "Feature",
                "properties": { "NOMBRE": "sin clave" },
                "geometry": { "type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]] }
            },
            {
                "type": "Feature",
                "properties": { "CVEGEO": "010010003" },
                "geometry": { "type": "Point", "coordinates": [5,5] }
            }
        ]
    }"#;

    const CENSUS: &str = "\u{feff}ENTIDAD,NOM_ENT,MUN,NOM_MUN,LOC,NOM_LOC,POBTOT,VIVTOT,TVIVHAB
1,Aguascalientes,0,Total de la Entidad,0,Total de la Entidad,1425607,386671,386671
1,Aguascalientes,1,Aguascalientes,0,Total del Municipio,948990,265000,260000
1,Aguascalientes,1,Aguascalientes,1,Aguascalientes,863893,240000,235000
1,Aguascalientes,1,Aguascalientes,2,Granja Adelita,9,*,3
1,Aguascalientes,1,Aguascalientes,3,Despoblado,0,1,0
1,Aguascalientes,1,Aguascalientes,9998,Localidades de una vivienda,120,*,*
1,Aguascalientes,1,Aguascalientes,4,Confidencial,*,1,1
";

    fn attrs(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_keyed_polygons() {
        let localities = parse_features(LOCALITIES, LOCALITY_KEY, 6372).unwrap();
        assert_eq!(localities.len(), 2);
        assert_eq!(localities[0].key, "010010001");
        assert_eq!(localities[0].projection, 6372);
        assert!(localities[0].attributes.is_empty());
        assert_eq!(localities[1].attribute("POBTOT"), Some(12.0));
    }

    #[test]
    fn rejects_non_collections() {
        let result = parse_features(r#"{"type":"Point","coordinates":[1,2]}"#, LOCALITY_KEY, 6372);
        assert!(matches!(result, Err(GeographyError::Conversion { .. })));
        assert!(matches!(
            parse_features("{", LOCALITY_KEY, 6372),
            Err(GeographyError::GeoJson(_))
        ));
    }

    #[test]
    fn filters_census_rows_and_builds_keys() {
        let rows = parse_census(CENSUS.as_bytes(), &attrs(&["POBTOT", "VIVTOT", "TVIVHAB"])).unwrap();
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["010010001", "010010002"]);

        assert_eq!(rows[0].attribute("POBTOT"), Some(863_893.0));
        assert_eq!(rows[0].attribute("VIVTOT"), Some(240_000.0));
        // '*' is absent, not zero.
        assert_eq!(rows[1].attribute("VIVTOT"), None);
        assert_eq!(rows[1].attribute("TVIVHAB"), Some(3.0));
    }

    #[test]
    fn missing_attribute_column_is_an_error() {
        let result = parse_census(CENSUS.as_bytes(), &attrs(&["OCUPVIVPAR"]));
        assert!(matches!(result, Err(GeographyError::Conversion { .. })));
    }

    #[test]
    fn joins_and_drops_unpopulated_polygons() {
        let localities = parse_features(LOCALITIES, LOCALITY_KEY, 6372).unwrap();
        let census = vec![CensusLocality {
            key: "010010001".to_string(),
            attributes: BTreeMap::from([("POBTOT".to_string(), 50.0), ("VIVTOT".to_string(), 20.0)]),
        }];

        let joined = join_census(localities, census, TOTAL_POPULATION);
        // 010010002 has no census row but carries its own POBTOT property.
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].attribute("POBTOT"), Some(50.0));
        assert_eq!(joined[0].attribute("VIVTOT"), Some(20.0));

        let localities = parse_features(LOCALITIES, LOCALITY_KEY, 6372).unwrap();
        let joined = join_census(localities, Vec::new(), "VIVTOT");
        assert!(joined.is_empty());
    }
}
