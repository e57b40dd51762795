//! Dissolving features that share a key.
//!
//! SUN-2018 publishes one polygon per member municipality of a
//! metropolitan area, each carrying the area's `CVE_SUN`. Dissolving by
//! that key gives one feature per area.

use std::collections::BTreeMap;

use natural_cities_spatial::{Locality, union_geometries};

/// Merges the features that share a key into one feature per key.
///
/// Attributes named in `rounded` are first rounded to the nearest integer
/// (ties to even) on every input feature. Then every attribute is summed
/// per key and the geometries are unioned. A member without an attribute
/// adds nothing to that sum. The output is in ascending key order.
#[must_use]
pub fn dissolve_by_key(features: Vec<Locality>, rounded: &[&str]) -> Vec<Locality> {
    let total = features.len();
    let mut groups: BTreeMap<String, Vec<Locality>> = BTreeMap::new();

    for mut feature in features {
        for name in rounded {
            if let Some(value) = feature.attributes.get_mut(*name) {
                *value = value.round_ties_even();
            }
        }
        groups.entry(feature.key.clone()).or_default().push(feature);
    }

    let dissolved: Vec<Locality> = groups
        .into_iter()
        .filter_map(|(key, members)| {
            let projection = members.first()?.projection;
            let geometry = union_geometries(members.iter().map(|m| &m.geometry));

            let mut attributes: BTreeMap<String, f64> = BTreeMap::new();
            for member in &members {
                for (name, value) in &member.attributes {
                    *attributes.entry(name.clone()).or_insert(0.0) += value;
                }
            }

            Some(Locality {
                key,
                projection,
                geometry,
                attributes,
            })
        })
        .collect();

    log::info!("Dissolved {total} features into {} by key", dissolved.len());
    dissolved
}
