//! Wire types for the provider's change feeds.
//!
//! Field names follow the provider's JSON (Spanish, camelCase). Prices may
//! arrive as a number or as a string with either `.` or `,` as the decimal
//! separator, so the raw value is kept loose and normalized by the caller.

use serde::Deserialize;

/// Pagination block attached to every feed page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub total: i64,
    #[serde(rename = "lastId", default)]
    pub last_id: i64,
}

/// One vehicle record from `RecuperarCambiosVehiculosCanal`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVehicle {
    #[serde(rename = "idLocal")]
    pub id_local: i64,
    #[serde(rename = "nombreMarca", default)]
    pub make: String,
    #[serde(rename = "nombreModelo", default)]
    pub model: String,
    #[serde(rename = "nombreVersion", default)]
    pub trim_level: String,
    #[serde(rename = "anyoVehiculo", default)]
    pub year: i32,
    #[serde(rename = "combustible", default)]
    pub fuel: String,
}

/// One part record from `RecuperarCambiosCanalEmpresa`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPart {
    #[serde(rename = "refLocal")]
    pub ref_local: i64,
    /// Supplier-side vehicle reference. Can be negative for vehicles the
    /// provider has not published yet; kept verbatim.
    #[serde(rename = "idVehiculo", default)]
    pub id_vehiculo: i64,
    #[serde(rename = "codFamilia", default)]
    pub family_code: String,
    #[serde(rename = "descripcionFamilia", default)]
    pub family: String,
    #[serde(rename = "descripcionArticulo", default)]
    pub description: String,
    #[serde(rename = "precio", default)]
    pub price: serde_json::Value,
}

impl RawPart {
    /// Normalize the loose price field to integer cents.
    ///
    /// Handles numbers, `"12.34"`, and the provider's `"12,34"` form.
    /// Anything unparseable counts as zero, which downstream treats as
    /// not sellable.
    pub fn price_cents(&self) -> i64 {
        let parsed = match &self.price {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(p) if p.is_finite() && p > 0.0 => (p * 100.0).round() as i64,
            _ => 0,
        }
    }
}

/// A page of the vehicle change feed.
#[derive(Debug, Clone, Deserialize)]
pub struct VehiclePage {
    #[serde(rename = "vehiculos", default)]
    pub vehicles: Vec<RawVehicle>,
    #[serde(rename = "result_set", default)]
    pub result_set: ResultSet,
}

/// A page of the part change feed.
#[derive(Debug, Clone, Deserialize)]
pub struct PartPage {
    #[serde(rename = "piezas", default)]
    pub parts: Vec<RawPart>,
    #[serde(rename = "result_set", default)]
    pub result_set: ResultSet,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_page_deserializes_provider_shape() {
        let page: VehiclePage = serde_json::from_str(
            r#"{
                "vehiculos": [
                    {
                        "idLocal": 1819916,
                        "nombreMarca": "SEAT",
                        "nombreModelo": "IBIZA",
                        "nombreVersion": "1.9 TDI",
                        "anyoVehiculo": 2004,
                        "combustible": "Diesel"
                    }
                ],
                "result_set": { "total": 3200, "lastId": 1819916 }
            }"#,
        )
        .unwrap();

        assert_eq!(page.vehicles.len(), 1);
        assert_eq!(page.vehicles[0].id_local, 1819916);
        assert_eq!(page.vehicles[0].make, "SEAT");
        assert_eq!(page.result_set.total, 3200);
        assert_eq!(page.result_set.last_id, 1819916);
    }

    #[test]
    fn missing_optional_vehicle_fields_default() {
        let page: VehiclePage =
            serde_json::from_str(r#"{"vehiculos": [{"idLocal": 5}]}"#).unwrap();
        assert_eq!(page.vehicles[0].make, "");
        assert_eq!(page.vehicles[0].year, 0);
        assert_eq!(page.result_set.last_id, 0);
    }

    #[test]
    fn part_price_accepts_number_and_both_decimal_separators() {
        let part: RawPart = serde_json::from_str(
            r#"{"refLocal": 1, "idVehiculo": -42, "precio": 12.5}"#,
        )
        .unwrap();
        assert_eq!(part.price_cents(), 1250);

        let part: RawPart =
            serde_json::from_str(r#"{"refLocal": 2, "precio": "30.00"}"#).unwrap();
        assert_eq!(part.price_cents(), 3000);

        let part: RawPart =
            serde_json::from_str(r#"{"refLocal": 3, "precio": "7,95"}"#).unwrap();
        assert_eq!(part.price_cents(), 795);
    }

    #[test]
    fn zero_and_garbage_prices_collapse_to_zero() {
        for raw in [r#""0,00""#, r#""""#, "null", r#""n/a""#, "0"] {
            let json = format!(r#"{{"refLocal": 9, "precio": {raw}}}"#);
            let part: RawPart = serde_json::from_str(&json).unwrap();
            assert_eq!(part.price_cents(), 0, "price {raw} should normalize to 0");
        }
    }

    #[test]
    fn negative_vehicle_reference_is_kept_verbatim() {
        let part: RawPart =
            serde_json::from_str(r#"{"refLocal": 4, "idVehiculo": -1819916}"#).unwrap();
        assert_eq!(part.id_vehiculo, -1819916);
    }
}
