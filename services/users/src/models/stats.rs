//! Aggregate statistics over the user collection

use serde::Serialize;

use crate::models::user::Country;

/// Number of users registered from one country
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryCount {
    pub pais: Country,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_usuarios: u64,
    /// Sorted by count descending, ties by country name
    pub usuarios_por_pais: Vec<CountryCount>,
    /// 0 when the collection is empty
    pub edad_promedio: f64,
    /// Users created within the recent window (30 days)
    pub usuarios_recientes: u64,
}

/// Sort country counts the way the statistics endpoint reports them
pub fn sort_country_counts(counts: &mut [CountryCount]) {
    counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.pais.as_str().cmp(b.pais.as_str()))
    });
}
