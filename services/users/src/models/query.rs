//! List query parameters and the list specification built from them

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 50;
/// Larger `limit` values are clamped; pagination metadata uses the clamped value
pub const MAX_LIMIT: u32 = 100;

/// Query string accepted by the list endpoint
///
/// Numeric parameters are kept as strings so a malformed value falls back to
/// its default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
}

/// Columns a list can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Nombre,
    Email,
    Edad,
    Pais,
    FechaCreacion,
    FechaActualizacion,
}

impl SortField {
    /// Accepts both the wire names and their English aliases
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "nombre" | "name" => Some(SortField::Nombre),
            "email" => Some(SortField::Email),
            "edad" | "age" => Some(SortField::Edad),
            "pais" | "country" => Some(SortField::Pais),
            "fechaCreacion" | "createdAt" => Some(SortField::FechaCreacion),
            "fechaActualizacion" | "updatedAt" => Some(SortField::FechaActualizacion),
            _ => None,
        }
    }

    /// Column name in the `usuarios` table
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Nombre => "nombre",
            SortField::Email => "email",
            SortField::Edad => "edad",
            SortField::Pais => "pais",
            SortField::FechaCreacion => "fecha_creacion",
            SortField::FechaActualizacion => "fecha_actualizacion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filter, sort and window for one list request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSpec {
    pub page: u32,
    pub limit: u32,
    pub sort_by: SortField,
    pub order: SortOrder,
    /// Case-insensitive substring matched against nombre, email and pais
    pub search: Option<String>,
    /// False when the caller sent neither `page` nor `limit`
    pub paginated: bool,
}

impl ListSpec {
    pub fn from_query(query: &ListQuery) -> Self {
        let page = parse_positive(query.page.as_deref()).unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive(query.limit.as_deref())
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);

        let sort_by = query
            .sort_by
            .as_deref()
            .and_then(SortField::parse)
            .unwrap_or(SortField::FechaCreacion);

        let order = match query.order.as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };

        let search = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            page,
            limit,
            sort_by,
            order,
            search,
            paginated: query.page.is_some() || query.limit.is_some(),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for ListSpec {
    fn default() -> Self {
        Self::from_query(&ListQuery::default())
    }
}

fn parse_positive(value: Option<&str>) -> Option<u32> {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v >= 1)
}

/// Pagination metadata of the list envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_users: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(spec: &ListSpec, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(spec.limit));
        Self {
            current_page: spec.page,
            total_pages,
            total_users: total,
            has_next_page: u64::from(spec.page) < total_pages,
            has_prev_page: spec.page > 1,
        }
    }
}
