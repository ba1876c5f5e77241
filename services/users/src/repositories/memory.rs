//! In-memory user repository used by handler tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{cmp::Ordering, collections::BTreeMap};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{RepositoryError, RepositoryResult, UserRepository};
use crate::{
    models::{
        CountryCount, ListSpec, NewUser, UserChanges, UserRecord, UserStats,
        query::{SortField, SortOrder},
        stats::sort_country_counts,
    },
    validation,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<BTreeMap<Uuid, UserRecord>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, bypassing validation (for fixtures)
    pub async fn insert_raw(&self, record: UserRecord) {
        self.users.lock().await.insert(record.id, record);
    }
}

fn email_taken(users: &BTreeMap<Uuid, UserRecord>, email: &str, exclude: Option<Uuid>) -> bool {
    users
        .values()
        .any(|u| u.email == email && Some(u.id) != exclude)
}

fn matches_search(user: &UserRecord, search: &str) -> bool {
    let needle = search.to_lowercase();
    [user.nombre.as_str(), user.email.as_str(), user.pais.as_str()]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Update timestamps move strictly forward even when the clock does not
fn next_update_stamp(previous: DateTime<Utc>, requested: DateTime<Utc>) -> DateTime<Utc> {
    requested.max(previous + chrono::Duration::microseconds(1))
}

fn apply_changes(record: &mut UserRecord, changes: &UserChanges) {
    if let Some(nombre) = &changes.nombre {
        record.nombre = nombre.clone();
    }
    if let Some(email) = &changes.email {
        record.email = email.clone();
    }
    if let Some(telefono) = &changes.telefono {
        record.telefono = telefono.clone();
    }
    if let Some(edad) = changes.edad {
        record.edad = edad;
    }
    if let Some(pais) = changes.pais {
        record.pais = pais;
    }
    if let Some(comentarios) = &changes.comentarios {
        record.comentarios = comentarios.clone();
    }
    record.fecha_actualizacion = next_update_stamp(record.fecha_actualizacion, changes.touched_at);
}

fn compare(a: &UserRecord, b: &UserRecord, field: SortField) -> Ordering {
    match field {
        SortField::Nombre => a.nombre.cmp(&b.nombre),
        SortField::Email => a.email.cmp(&b.email),
        SortField::Edad => a.edad.cmp(&b.edad),
        SortField::Pais => a.pais.as_str().cmp(b.pais.as_str()),
        SortField::FechaCreacion => a.fecha_creacion.cmp(&b.fecha_creacion),
        SortField::FechaActualizacion => a.fecha_actualizacion.cmp(&b.fecha_actualizacion),
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list(&self, spec: &ListSpec) -> RepositoryResult<(Vec<UserRecord>, u64)> {
        let users = self.users.lock().await;

        let mut matching: Vec<UserRecord> = users
            .values()
            .filter(|u| spec.search.as_deref().is_none_or(|s| matches_search(u, s)))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            let ordering = compare(a, b, spec.sort_by).then_with(|| a.id.cmp(&b.id));
            match spec.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(spec.offset()).unwrap_or(usize::MAX))
            .take(spec.limit as usize)
            .collect();

        Ok((page, total))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<UserRecord>> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn find_by_email(
        &self,
        email: &str,
        exclude: Option<Uuid>,
    ) -> RepositoryResult<Option<UserRecord>> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|u| u.email == email && Some(u.id) != exclude)
            .cloned())
    }

    async fn create(&self, user: &NewUser) -> RepositoryResult<UserRecord> {
        validation::check_new_user(user).map_err(RepositoryError::Validation)?;

        let mut users = self.users.lock().await;
        if email_taken(&users, &user.email, None) {
            return Err(RepositoryError::Duplicate { field: "email" });
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            nombre: user.nombre.clone(),
            email: user.email.clone(),
            telefono: user.telefono.clone(),
            edad: user.edad,
            pais: user.pais,
            comentarios: user.comentarios.clone(),
            fecha_creacion: now,
            fecha_actualizacion: now,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &UserChanges,
    ) -> RepositoryResult<Option<UserRecord>> {
        validation::check_changes(changes).map_err(RepositoryError::Validation)?;

        let mut users = self.users.lock().await;
        if let Some(email) = &changes.email {
            if email_taken(&users, email, Some(id)) {
                return Err(RepositoryError::Duplicate { field: "email" });
            }
        }

        Ok(users.get_mut(&id).map(|record| {
            apply_changes(record, changes);
            record.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<Option<UserRecord>> {
        Ok(self.users.lock().await.remove(&id))
    }

    async fn stats(&self, recent_since: DateTime<Utc>) -> RepositoryResult<UserStats> {
        let users = self.users.lock().await;

        let mut by_country: BTreeMap<_, u64> = BTreeMap::new();
        for user in users.values() {
            *by_country.entry(user.pais).or_default() += 1;
        }
        let mut usuarios_por_pais: Vec<CountryCount> = by_country
            .into_iter()
            .map(|(pais, count)| CountryCount { pais, count })
            .collect();
        sort_country_counts(&mut usuarios_por_pais);

        let total = users.len() as u64;
        let edad_promedio = if total == 0 {
            0.0
        } else {
            users.values().map(|u| f64::from(u.edad)).sum::<f64>() / total as f64
        };

        Ok(UserStats {
            total_usuarios: total,
            usuarios_por_pais,
            edad_promedio,
            usuarios_recientes: users
                .values()
                .filter(|u| u.fecha_creacion >= recent_since)
                .count() as u64,
        })
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_update_stamp_is_strictly_increasing() {
        let previous = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let stale = previous - chrono::Duration::seconds(5);
        assert!(next_update_stamp(previous, stale) > previous);
        assert!(next_update_stamp(previous, previous) > previous);

        let later = previous + chrono::Duration::seconds(5);
        assert_eq!(next_update_stamp(previous, later), later);
    }
}
