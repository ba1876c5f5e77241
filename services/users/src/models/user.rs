//! User record model and request payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Countries a user can be registered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Country {
    Argentina,
    Bolivia,
    Brasil,
    Chile,
    Colombia,
    Ecuador,
    Paraguay,
    #[serde(rename = "Perú")]
    Peru,
    Uruguay,
    Venezuela,
}

impl Country {
    pub const ALL: [Country; 10] = [
        Country::Argentina,
        Country::Bolivia,
        Country::Brasil,
        Country::Chile,
        Country::Colombia,
        Country::Ecuador,
        Country::Paraguay,
        Country::Peru,
        Country::Uruguay,
        Country::Venezuela,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Country::Argentina => "Argentina",
            Country::Bolivia => "Bolivia",
            Country::Brasil => "Brasil",
            Country::Chile => "Chile",
            Country::Colombia => "Colombia",
            Country::Ecuador => "Ecuador",
            Country::Paraguay => "Paraguay",
            Country::Peru => "Perú",
            Country::Uruguay => "Uruguay",
            Country::Venezuela => "Venezuela",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not one of the supported countries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCountry(pub String);

impl fmt::Display for UnknownCountry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown country: {}", self.0)
    }
}

impl std::error::Error for UnknownCountry {}

impl FromStr for Country {
    type Err = UnknownCountry;

    /// Exact, case-sensitive match against the display names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Country::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCountry(s.to_string()))
    }
}

/// A persisted user record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: Uuid,
    pub nombre: String,
    pub email: String,
    pub telefono: String,
    pub edad: i32,
    pub pais: Country,
    pub comentarios: String,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_actualizacion: DateTime<Utc>,
}

/// A validated, normalized user ready to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub nombre: String,
    pub email: String,
    pub telefono: String,
    pub edad: i32,
    pub pais: Country,
    pub comentarios: String,
}

/// A validated partial update. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct UserChanges {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub edad: Option<i32>,
    pub pais: Option<Country>,
    pub comentarios: Option<String>,
    /// Time the update was requested; becomes the new `fechaActualizacion`
    pub touched_at: DateTime<Utc>,
}

/// Age as sent by clients: HTML forms post it as a string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AgeInput {
    Integer(i64),
    Float(f64),
    Text(String),
    /// Any other JSON value; rejected by validation rather than parsing
    Other(serde_json::Value),
}

/// Raw request body for create and update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPayload {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub edad: Option<AgeInput>,
    pub pais: Option<String>,
    pub comentarios: Option<String>,
}

/// Confirmation returned after a delete
#[derive(Debug, Clone, Serialize)]
pub struct DeletedUser {
    pub id: Uuid,
    pub nombre: String,
    pub email: String,
}

impl From<UserRecord> for DeletedUser {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            nombre: record.nombre,
            email: record.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_country_round_trips_through_display_name() {
        for country in Country::ALL {
            assert_eq!(country.as_str().parse::<Country>(), Ok(country));
        }
        assert!("Peru".parse::<Country>().is_err());
        assert!("chile".parse::<Country>().is_err());
    }

    #[test]
    fn test_peru_serializes_with_accent() {
        let json = serde_json::to_string(&Country::Peru).unwrap();
        assert_eq!(json, "\"Perú\"");
    }

    #[test]
    fn test_age_input_accepts_numbers_and_strings() {
        let payload: UserPayload =
            serde_json::from_str(r#"{"edad": "25"}"#).expect("string age");
        assert_eq!(payload.edad, Some(AgeInput::Text("25".to_string())));

        let payload: UserPayload = serde_json::from_str(r#"{"edad": 25}"#).expect("integer age");
        assert_eq!(payload.edad, Some(AgeInput::Integer(25)));

        let payload: UserPayload = serde_json::from_str(r#"{"edad": 25.5}"#).expect("float age");
        assert_eq!(payload.edad, Some(AgeInput::Float(25.5)));
    }

    #[test]
    fn test_age_input_keeps_non_numeric_values() {
        let payload: UserPayload =
            serde_json::from_str(r#"{"edad": true}"#).expect("boolean age");
        assert_eq!(
            payload.edad,
            Some(AgeInput::Other(serde_json::Value::Bool(true)))
        );

        let payload: UserPayload = serde_json::from_str(r#"{"edad": null}"#).expect("null age");
        assert_eq!(payload.edad, None);
    }

    #[test]
    fn test_record_serializes_with_wire_names() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = UserRecord {
            id: Uuid::nil(),
            nombre: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            telefono: String::new(),
            edad: 30,
            pais: Country::Chile,
            comentarios: String::new(),
            fecha_creacion: now,
            fecha_actualizacion: now,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["pais"], "Chile");
        assert!(value.get("fechaCreacion").is_some());
        assert!(value.get("fechaActualizacion").is_some());
        assert!(value.get("fecha_creacion").is_none());
    }
}
