//! INEGI geostatistical key utilities.
//!
//! Two-digit state codes (`CVE_ENT`) and names of the 32 federal entities
//! of Mexico, and construction of the nine-digit locality key
//! (`CVEGEO` = entity + municipality + locality).

/// INEGI state codes for the 32 federal entities.
pub const STATE_CODES: &[&str] = &[
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14", "15", "16",
    "17", "18", "19", "20", "21", "22", "23", "24", "25", "26", "27", "28", "29", "30", "31", "32",
];

/// Maps a two-digit state code to the full state name.
///
/// Returns `"Unknown"` for unrecognized codes.
#[must_use]
pub fn state_name(code: &str) -> &'static str {
    match code {
        "01" => "Aguascalientes",
        "02" => "Baja California",
        "03" => "Baja California Sur",
        "04" => "Campeche",
        "05" => "Coahuila de Zaragoza",
        "06" => "Colima",
        "07" => "Chiapas",
        "08" => "Chihuahua",
        "09" => "Ciudad de México",
        "10" => "Durango",
        "11" => "Guanajuato",
        "12" => "Guerrero",
        "13" => "Hidalgo",
        "14" => "Jalisco",
        "15" => "México",
        "16" => "Michoacán de Ocampo",
        "17" => "Morelos",
        "18" => "Nayarit",
        "19" => "Nuevo León",
        "20" => "Oaxaca",
        "21" => "Puebla",
        "22" => "Querétaro",
        "23" => "Quintana Roo",
        "24" => "San Luis Potosí",
        "25" => "Sinaloa",
        "26" => "Sonora",
        "27" => "Tabasco",
        "28" => "Tamaulipas",
        "29" => "Tlaxcala",
        "30" => "Veracruz de Ignacio de la Llave",
        "31" => "Yucatán",
        "32" => "Zacatecas",
        _ => "Unknown",
    }
}

/// Builds a nine-digit `CVEGEO` locality key from its numeric parts.
///
/// Returns `None` if any part does not fit its zero-padded width.
#[must_use]
pub fn locality_key(entity: u32, municipality: u32, locality: u32) -> Option<String> {
    if entity > 99 || municipality > 999 || locality > 9999 {
        return None;
    }
    Some(format!("{entity:02}{municipality:03}{locality:04}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_count() {
        assert_eq!(STATE_CODES.len(), 32);
    }

    #[test]
    fn name_coverage() {
        for code in STATE_CODES {
            assert_ne!(state_name(code), "Unknown", "no name for code: {code}");
        }
    }

    #[test]
    fn unknown_code() {
        assert_eq!(state_name("00"), "Unknown");
        assert_eq!(state_name("33"), "Unknown");
        assert_eq!(state_name("19"), "Nuevo León");
    }

    #[test]
    fn builds_padded_locality_key() {
        assert_eq!(locality_key(1, 1, 1).as_deref(), Some("010010001"));
        assert_eq!(locality_key(32, 58, 123).as_deref(), Some("320580123"));
        assert_eq!(locality_key(1, 1, 10_000), None);
    }
}
