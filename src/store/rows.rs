//! Raw row shapes of the backing store's collections
//!
//! Column names follow the store schema. Deserialization is lenient: ids may
//! be numbers or strings, numeric columns may be null or numeric strings, and
//! an unparseable timestamp becomes `None` instead of failing the row.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const INVENTORY_DEPOSIT: &str = "id_deposito";

pub const DONATION_ID: &str = "id_producto";
pub const DONATION_DATE: &str = "fecha_donacion";

pub const REQUEST_DATE: &str = "created_at";

pub const MOVEMENT_ID: &str = "id_movimiento";
pub const MOVEMENT_DATE: &str = "fecha_movimiento";

pub const USER_ID: &str = "id";

pub const DEPOSIT_ID: &str = "id_deposito";

/// Parse a store timestamp.
///
/// Accepts RFC 3339, naive date-times (assumed UTC, `T` or space separated)
/// and bare dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Text form of a scalar JSON value (ids, equality comparisons)
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    scalar_text(&value).ok_or_else(|| serde::de::Error::custom("id must be a string or number"))
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text).filter(|s| !s.is_empty()))
}

fn de_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|q: &f64| q.is_finite()))
}

fn de_opt_ts<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

fn de_opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_text))
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryRow {
    #[serde(rename = "id_inventario", deserialize_with = "de_id")]
    pub id: String,
    #[serde(rename = "cantidad_disponible", default, deserialize_with = "de_opt_f64")]
    pub available: Option<f64>,
    #[serde(rename = "id_deposito", default, deserialize_with = "de_opt_id")]
    pub deposit_id: Option<String>,
    #[serde(rename = "id_producto", default, deserialize_with = "de_opt_id")]
    pub product_id: Option<String>,
    #[serde(rename = "fecha_actualizacion", default, deserialize_with = "de_opt_ts")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DonationRow {
    #[serde(rename = "id_producto", deserialize_with = "de_id")]
    pub product_id: String,
    #[serde(rename = "id_usuario", default, deserialize_with = "de_opt_id")]
    pub donor_id: Option<String>,
    #[serde(rename = "nombre_producto", default, deserialize_with = "de_opt_text")]
    pub product_name: Option<String>,
    #[serde(rename = "descripcion", default, deserialize_with = "de_opt_text")]
    pub description: Option<String>,
    #[serde(rename = "fecha_donacion", default, deserialize_with = "de_opt_ts")]
    pub donated_at: Option<DateTime<Utc>>,
    #[serde(rename = "cantidad", default, deserialize_with = "de_opt_f64")]
    pub quantity: Option<f64>,
    #[serde(rename = "unidad_medida", default, deserialize_with = "de_opt_text")]
    pub unit: Option<String>,
    #[serde(rename = "fecha_caducidad", default, deserialize_with = "de_opt_ts")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Product name lookup (same collection as donations, narrower projection)
#[derive(Debug, Clone, Deserialize)]
pub struct ProductNameRow {
    #[serde(rename = "id_producto", deserialize_with = "de_id")]
    pub id: String,
    #[serde(rename = "nombre_producto", default, deserialize_with = "de_opt_text")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(rename = "usuario_id", default, deserialize_with = "de_opt_id")]
    pub requester_id: Option<String>,
    #[serde(rename = "tipo_alimento", default, deserialize_with = "de_opt_text")]
    pub food_type: Option<String>,
    #[serde(rename = "cantidad", default, deserialize_with = "de_opt_f64")]
    pub quantity: Option<f64>,
    #[serde(rename = "comentarios", default, deserialize_with = "de_opt_text")]
    pub comments: Option<String>,
    #[serde(rename = "estado", default, deserialize_with = "de_opt_text")]
    pub status: Option<String>,
    #[serde(rename = "created_at", default, deserialize_with = "de_opt_ts")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovementHeaderRow {
    #[serde(rename = "id_movimiento", deserialize_with = "de_id")]
    pub id: String,
    #[serde(rename = "fecha_movimiento", default, deserialize_with = "de_opt_ts")]
    pub moved_at: Option<DateTime<Utc>>,
    #[serde(rename = "estado_movimiento", default, deserialize_with = "de_opt_text")]
    pub status: Option<String>,
    #[serde(rename = "id_donante", default, deserialize_with = "de_opt_id")]
    pub donor_id: Option<String>,
    #[serde(rename = "id_solicitante", default, deserialize_with = "de_opt_id")]
    pub requester_id: Option<String>,
    #[serde(rename = "observaciones", default, deserialize_with = "de_opt_text")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MovementDetailRow {
    #[serde(rename = "id_movimiento", deserialize_with = "de_id")]
    pub movement_id: String,
    #[serde(rename = "id_producto", default, deserialize_with = "de_opt_id")]
    pub product_id: Option<String>,
    #[serde(rename = "cantidad", default, deserialize_with = "de_opt_f64")]
    pub quantity: Option<f64>,
    #[serde(rename = "tipo_transaccion", default, deserialize_with = "de_opt_text")]
    pub transaction_type: Option<String>,
    #[serde(rename = "rol_usuario", default, deserialize_with = "de_opt_text")]
    pub actor_role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserRow {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(rename = "nombre", default, deserialize_with = "de_opt_text")]
    pub name: Option<String>,
    #[serde(rename = "rol", default, deserialize_with = "de_opt_text")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositRow {
    #[serde(rename = "id_deposito", deserialize_with = "de_id")]
    pub id: String,
    #[serde(rename = "nombre", default, deserialize_with = "de_opt_text")]
    pub name: Option<String>,
    #[serde(rename = "descripcion", default, deserialize_with = "de_opt_text")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp_rfc3339() {
        assert_eq!(
            parse_timestamp("2024-01-15T10:30:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_naive_and_date() {
        assert_eq!(
            parse_timestamp("2024-01-15T10:30:00.123"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
                + chrono::Duration::milliseconds(123))
        );
        assert_eq!(
            parse_timestamp("2024-01-15 10:30:00"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
        );
        assert_eq!(
            parse_timestamp("2024-01-15"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_donation_row_lenient_fields() {
        let row: DonationRow = serde_json::from_value(json!({
            "id_producto": 42,
            "id_usuario": "u1",
            "nombre_producto": "Leche",
            "fecha_donacion": "not a date",
            "cantidad": "12.5",
            "fecha_caducidad": null
        }))
        .unwrap();

        assert_eq!(row.product_id, "42");
        assert_eq!(row.donor_id.as_deref(), Some("u1"));
        assert_eq!(row.donated_at, None);
        assert_eq!(row.quantity, Some(12.5));
        assert_eq!(row.expires_at, None);
        assert_eq!(row.description, None);
    }

    #[test]
    fn test_request_row_missing_quantity() {
        let row: RequestRow = serde_json::from_value(json!({
            "id": "r1",
            "usuario_id": "u2",
            "tipo_alimento": "granos",
            "estado": "pendiente",
            "created_at": "2024-02-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(row.quantity, None);
        assert_eq!(row.status.as_deref(), Some("pendiente"));
    }

    #[test]
    fn test_row_without_id_is_rejected() {
        let result: Result<UserRow, _> = serde_json::from_value(json!({ "nombre": "Ana" }));
        assert!(result.is_err());
    }
}
