//! Input validation for user records
//!
//! The same rule functions run twice: on the raw payload at the handler
//! boundary, and on the typed values inside the repository right before a
//! write reaches storage.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::{collections::BTreeMap, sync::OnceLock};

use crate::models::{AgeInput, Country, NewUser, UserChanges, UserPayload};

/// Field name to human-readable message
pub type FieldErrors = BTreeMap<&'static str, String>;

pub const NOMBRE_MIN_CHARS: usize = 2;
pub const NOMBRE_MAX_CHARS: usize = 100;
pub const COMENTARIOS_MAX_CHARS: usize = 500;
pub const EDAD_MIN: i64 = 18;
pub const EDAD_MAX: i64 = 100;

/// Validate and trim a name
pub fn validate_nombre(nombre: &str) -> Result<String, String> {
    let nombre = nombre.trim();

    if nombre.is_empty() {
        return Err("El nombre es requerido".to_string());
    }

    let chars = nombre.chars().count();
    if chars < NOMBRE_MIN_CHARS {
        return Err("El nombre debe tener al menos 2 caracteres".to_string());
    }

    if chars > NOMBRE_MAX_CHARS {
        return Err("El nombre no puede exceder 100 caracteres".to_string());
    }

    static NOMBRE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NOMBRE_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-ZáéíóúÁÉÍÓÚñÑ\s]+$").expect("Failed to compile name regex")
    });

    if !regex.is_match(nombre) {
        return Err("El nombre solo puede contener letras y espacios".to_string());
    }

    Ok(nombre.to_string())
}

/// Validate an email, returning it trimmed and lowercased
pub fn validate_email(email: &str) -> Result<String, String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err("El email es requerido".to_string());
    }

    if email.len() > 254 {
        return Err("Email inválido".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        // Dot-separated parts must be non-empty; domain labels may not start
        // or end with a hyphen.
        Regex::new(concat!(
            r"^[a-zA-Z0-9_%+-]+(\.[a-zA-Z0-9_%+-]+)*",
            r"@([a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$",
        ))
        .expect("Failed to compile email regex")
    });

    if !regex.is_match(&email) {
        return Err("Email inválido".to_string());
    }

    Ok(email)
}

/// Validate an optional phone number. An empty value is accepted.
pub fn validate_telefono(telefono: &str) -> Result<String, String> {
    let telefono = telefono.trim();

    if telefono.is_empty() {
        return Ok(String::new());
    }

    static TELEFONO_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = TELEFONO_REGEX.get_or_init(|| {
        Regex::new(r"^[+]?[0-9\s\-()]{10,15}$").expect("Failed to compile phone regex")
    });

    if !regex.is_match(telefono) {
        return Err("Formato de teléfono inválido".to_string());
    }

    Ok(telefono.to_string())
}

/// Validate an age given as a number or numeric string
pub fn validate_edad(edad: &AgeInput) -> Result<i32, String> {
    let value = match edad {
        AgeInput::Integer(n) => *n,
        AgeInput::Float(f) => whole_number(*f)?,
        AgeInput::Other(_) => return Err(not_integer()),
        AgeInput::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Err("La edad es requerida".to_string());
            }
            match text.parse::<i64>() {
                Ok(n) => n,
                Err(_) => whole_number(text.parse::<f64>().map_err(|_| not_integer())?)?,
            }
        }
    };

    check_edad_range(value)
}

fn whole_number(value: f64) -> Result<i64, String> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(not_integer());
    }
    // Out-of-range floats saturate; the range check rejects them next.
    Ok(value as i64)
}

fn not_integer() -> String {
    "La edad debe ser un número entero".to_string()
}

fn check_edad_range(value: i64) -> Result<i32, String> {
    if !(EDAD_MIN..=EDAD_MAX).contains(&value) {
        return Err("La edad debe estar entre 18 y 100 años".to_string());
    }
    Ok(value as i32)
}

/// Validate a country against the supported set
pub fn validate_pais(pais: &str) -> Result<Country, String> {
    if pais.trim().is_empty() {
        return Err("El país es requerido".to_string());
    }

    pais.trim()
        .parse::<Country>()
        .map_err(|_| "País no válido".to_string())
}

/// Validate and trim optional comments
pub fn validate_comentarios(comentarios: &str) -> Result<String, String> {
    let comentarios = comentarios.trim();

    if comentarios.chars().count() > COMENTARIOS_MAX_CHARS {
        return Err("Los comentarios no pueden exceder 500 caracteres".to_string());
    }

    Ok(comentarios.to_string())
}

/// Collects the first failure of every field
#[derive(Default)]
struct Collector {
    errors: FieldErrors,
}

impl Collector {
    fn check<T>(&mut self, field: &'static str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.errors.insert(field, message);
                None
            }
        }
    }

    fn require<T>(&mut self, field: &'static str, message: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.errors.insert(field, message.to_string());
        }
        value
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, FieldErrors> {
        match value {
            Some(value) if self.errors.is_empty() => Ok(value),
            _ => Err(self.errors),
        }
    }
}

/// Validate a create payload, producing a normalized user
pub fn validate_new_user(payload: &UserPayload) -> Result<NewUser, FieldErrors> {
    let mut c = Collector::default();

    let nombre = c
        .require("nombre", "El nombre es requerido", payload.nombre.as_deref())
        .and_then(|v| c.check("nombre", validate_nombre(v)));
    let email = c
        .require("email", "El email es requerido", payload.email.as_deref())
        .and_then(|v| c.check("email", validate_email(v)));
    let telefono = c.check(
        "telefono",
        validate_telefono(payload.telefono.as_deref().unwrap_or_default()),
    );
    let edad = c
        .require("edad", "La edad es requerida", payload.edad.as_ref())
        .and_then(|v| c.check("edad", validate_edad(v)));
    let pais = c
        .require("pais", "El país es requerido", payload.pais.as_deref())
        .and_then(|v| c.check("pais", validate_pais(v)));
    let comentarios = c.check(
        "comentarios",
        validate_comentarios(payload.comentarios.as_deref().unwrap_or_default()),
    );

    let user = match (nombre, email, telefono, edad, pais, comentarios) {
        (Some(nombre), Some(email), Some(telefono), Some(edad), Some(pais), Some(comentarios)) => {
            Some(NewUser {
                nombre,
                email,
                telefono,
                edad,
                pais,
                comentarios,
            })
        }
        _ => None,
    };

    c.finish(user)
}

/// Validate only the fields present in an update payload
pub fn validate_changes(
    payload: &UserPayload,
    touched_at: DateTime<Utc>,
) -> Result<UserChanges, FieldErrors> {
    let mut c = Collector::default();

    let changes = UserChanges {
        nombre: payload
            .nombre
            .as_deref()
            .and_then(|v| c.check("nombre", validate_nombre(v))),
        email: payload
            .email
            .as_deref()
            .and_then(|v| c.check("email", validate_email(v))),
        telefono: payload
            .telefono
            .as_deref()
            .and_then(|v| c.check("telefono", validate_telefono(v))),
        edad: payload
            .edad
            .as_ref()
            .and_then(|v| c.check("edad", validate_edad(v))),
        pais: payload
            .pais
            .as_deref()
            .and_then(|v| c.check("pais", validate_pais(v))),
        comentarios: payload
            .comentarios
            .as_deref()
            .and_then(|v| c.check("comentarios", validate_comentarios(v))),
        touched_at,
    };

    c.finish(Some(changes))
}

/// Re-check a normalized user before it is written
pub fn check_new_user(user: &NewUser) -> Result<(), FieldErrors> {
    let mut c = Collector::default();

    c.check("nombre", validate_nombre(&user.nombre));
    c.check("email", validate_email(&user.email));
    c.check("telefono", validate_telefono(&user.telefono));
    c.check("edad", check_edad_range(i64::from(user.edad)));
    c.check("comentarios", validate_comentarios(&user.comentarios));

    c.finish(Some(()))
}

/// Re-check a change set before it is written
pub fn check_changes(changes: &UserChanges) -> Result<(), FieldErrors> {
    let mut c = Collector::default();

    if let Some(nombre) = &changes.nombre {
        c.check("nombre", validate_nombre(nombre));
    }
    if let Some(email) = &changes.email {
        c.check("email", validate_email(email));
    }
    if let Some(telefono) = &changes.telefono {
        c.check("telefono", validate_telefono(telefono));
    }
    if let Some(edad) = changes.edad {
        c.check("edad", check_edad_range(i64::from(edad)));
    }
    if let Some(comentarios) = &changes.comentarios {
        c.check("comentarios", validate_comentarios(comentarios));
    }

    c.finish(Some(()))
}
