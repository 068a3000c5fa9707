//! Reservation records
//!
//! `Reservation` is the validated record held by the dashboard. Anything
//! coming from the API or the push channel goes through [`WireReservation`]
//! first, so a missing or mistyped field is rejected here instead of
//! leaking into aggregation.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use super::error::RecordError;

/// Opaque, server-assigned reservation identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReservationId(String);

impl ReservationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReservationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ReservationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A booking record as stored by the external service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireReservation")]
pub struct Reservation {
    /// Server-assigned identifier
    #[serde(rename = "_id")]
    pub id: ReservationId,
    /// Name of the person booking
    pub nombre: String,
    /// Contact email
    pub email: String,
    /// Day of the reservation
    pub fecha: NaiveDate,
    /// Party size, always >= 1
    pub personas: u32,
    /// Optional free-text note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensaje: Option<String>,
}

impl Reservation {
    /// Create a reservation without a note
    pub fn new(
        id: impl Into<ReservationId>,
        nombre: impl Into<String>,
        email: impl Into<String>,
        fecha: NaiveDate,
        personas: u32,
    ) -> Self {
        Self {
            id: id.into(),
            nombre: nombre.into(),
            email: email.into(),
            fecha,
            personas,
            mensaje: None,
        }
    }

    /// Attach a note
    pub fn mensaje(mut self, mensaje: impl Into<String>) -> Self {
        self.mensaje = Some(mensaje.into());
        self
    }

    /// Validate a raw JSON record
    pub fn from_json(value: serde_json::Value) -> Result<Self, RecordError> {
        let wire: WireReservation = serde_json::from_value(value)?;
        Reservation::try_from(wire)
    }
}

/// Loose shape of a record as it appears on the wire
#[derive(Debug, Deserialize)]
pub struct WireReservation {
    #[serde(rename = "_id", alias = "id")]
    id: Option<WireScalar>,
    nombre: Option<String>,
    email: Option<String>,
    fecha: Option<String>,
    personas: Option<WireScalar>,
    mensaje: Option<String>,
}

/// Scalars the service is known to send for ids and counts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireScalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for WireScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireScalar::Int(n) => write!(f, "{}", n),
            WireScalar::Float(x) => write!(f, "{}", x),
            WireScalar::Text(s) => f.write_str(s),
        }
    }
}

impl TryFrom<WireReservation> for Reservation {
    type Error = RecordError;

    fn try_from(wire: WireReservation) -> Result<Self, Self::Error> {
        let id = match wire.id {
            Some(WireScalar::Text(s)) if !s.trim().is_empty() => ReservationId(s),
            Some(WireScalar::Int(n)) => ReservationId(n.to_string()),
            Some(other @ WireScalar::Float(_)) => {
                return Err(RecordError::InvalidIdentifier(other.to_string()))
            }
            _ => return Err(RecordError::MissingField("_id")),
        };

        let nombre = required_text(wire.nombre, "nombre")?;
        let email = required_text(wire.email, "email")?;
        let fecha = match wire.fecha.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_fecha(raw)?,
            _ => return Err(RecordError::MissingField("fecha")),
        };
        let personas = match wire.personas {
            Some(scalar) => party_size(&scalar)?,
            None => return Err(RecordError::MissingField("personas")),
        };
        let mensaje = wire.mensaje.filter(|m| !m.trim().is_empty());

        Ok(Self {
            id,
            nombre,
            email,
            fecha,
            personas,
            mensaje,
        })
    }
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, RecordError> {
    match value {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(RecordError::MissingField(field)),
    }
}

fn party_size(scalar: &WireScalar) -> Result<u32, RecordError> {
    let n = match scalar {
        WireScalar::Int(n) => Some(*n),
        WireScalar::Float(x) if x.fract() == 0.0 => Some(*x as i64),
        WireScalar::Float(_) => None,
        WireScalar::Text(s) => s.trim().parse::<i64>().ok(),
    };

    match n {
        Some(n) if n >= 1 && n <= u32::MAX as i64 => Ok(n as u32),
        _ => Err(RecordError::InvalidPartySize(scalar.to_string())),
    }
}

/// Parse a reservation date
///
/// Accepts `YYYY-MM-DD` and date-times (RFC 3339 or a bare
/// `YYYY-MM-DDTHH:MM:SS`), keeping only the calendar day.
pub fn parse_fecha(raw: &str) -> Result<NaiveDate, RecordError> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }

    if raw.len() > 10 && raw.as_bytes().get(10) == Some(&b'T') {
        if let Some(date) = raw
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        {
            return Ok(date);
        }
    }

    Err(RecordError::InvalidDate(raw.to_string()))
}

/// Validated booking request, as posted by the booking form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReservation {
    pub nombre: String,
    pub email: String,
    pub fecha: NaiveDate,
    pub personas: u32,
    /// Posted as an empty string when absent
    #[serde(serialize_with = "note_or_empty")]
    pub mensaje: Option<String>,
}

fn note_or_empty<S: Serializer>(note: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(note.as_deref().unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_decode_full_record() {
        let r = Reservation::from_json(json!({
            "_id": "665f1c2e9b1e8a0012345678",
            "nombre": "Ana",
            "email": "ana@example.com",
            "fecha": "2024-06-01",
            "personas": 4,
            "mensaje": "Mesa junto a la ventana"
        }))
        .unwrap();

        assert_eq!(r.id.as_str(), "665f1c2e9b1e8a0012345678");
        assert_eq!(r.fecha, day(2024, 6, 1));
        assert_eq!(r.personas, 4);
        assert_eq!(r.mensaje.as_deref(), Some("Mesa junto a la ventana"));
    }

    #[test]
    fn test_decode_numeric_id_and_string_party_size() {
        let r = Reservation::from_json(json!({
            "id": 1,
            "nombre": "Luis",
            "email": "luis@example.com",
            "fecha": "2024-06-02T00:00:00.000Z",
            "personas": "3",
            "mensaje": ""
        }))
        .unwrap();

        assert_eq!(r.id, ReservationId::from("1"));
        assert_eq!(r.fecha, day(2024, 6, 2));
        assert_eq!(r.personas, 3);
        assert!(r.mensaje.is_none());
    }

    #[test]
    fn test_decode_rejects_missing_id() {
        let err = Reservation::from_json(json!({
            "nombre": "Ana",
            "email": "ana@example.com",
            "fecha": "2024-06-01",
            "personas": 2
        }))
        .unwrap_err();
        assert_eq!(err, RecordError::MissingField("_id"));
    }

    #[test]
    fn test_decode_rejects_zero_party() {
        let err = Reservation::from_json(json!({
            "_id": "a",
            "nombre": "Ana",
            "email": "ana@example.com",
            "fecha": "2024-06-01",
            "personas": 0
        }))
        .unwrap_err();
        assert!(matches!(err, RecordError::InvalidPartySize(_)));
    }

    #[test]
    fn test_decode_rejects_bad_date() {
        let err = Reservation::from_json(json!({
            "_id": "a",
            "nombre": "Ana",
            "email": "ana@example.com",
            "fecha": "2024-02-30",
            "personas": 2
        }))
        .unwrap_err();
        assert_eq!(err, RecordError::InvalidDate("2024-02-30".to_string()));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = Reservation::from_json(json!(["not", "a", "record"])).unwrap_err();
        assert!(matches!(err, RecordError::Malformed(_)));
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let r = Reservation::new("x1", "Ana", "ana@example.com", day(2024, 6, 1), 2);
        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["_id"], "x1");
        assert_eq!(value["fecha"], "2024-06-01");
        assert!(value.get("mensaje").is_none());
    }

    #[test]
    fn test_new_reservation_posts_empty_note() {
        let new = NewReservation {
            nombre: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            fecha: day(2024, 6, 1),
            personas: 2,
            mensaje: None,
        };
        let value = serde_json::to_value(&new).unwrap();
        assert_eq!(
            value,
            json!({
                "nombre": "Ana",
                "email": "ana@example.com",
                "fecha": "2024-06-01",
                "personas": 2,
                "mensaje": ""
            })
        );
    }
}
