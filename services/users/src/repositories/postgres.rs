//! PostgreSQL-backed user repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use super::{RepositoryError, RepositoryResult, UserRepository};
use crate::{
    models::{
        Country, CountryCount, ListSpec, NewUser, UserChanges, UserRecord, UserStats,
        stats::sort_country_counts,
    },
    validation,
};

const SELECT_USERS: &str = r#"
    SELECT id, nombre, email, telefono, edad, pais, comentarios,
           fecha_creacion, fecha_actualizacion
    FROM usuarios
"#;

/// User repository for database operations
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    let pais: String = row.try_get("pais")?;
    let pais = pais
        .parse::<Country>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "pais".to_string(),
            source: Box::new(e),
        })?;

    Ok(UserRecord {
        id: row.try_get("id")?,
        nombre: row.try_get("nombre")?,
        email: row.try_get("email")?,
        telefono: row.try_get("telefono")?,
        edad: row.try_get("edad")?,
        pais,
        comentarios: row.try_get("comentarios")?,
        fecha_creacion: row.try_get("fecha_creacion")?,
        fecha_actualizacion: row.try_get("fecha_actualizacion")?,
    })
}

/// Escape LIKE metacharacters so the search text matches literally
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_search_filter(builder: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    if let Some(search) = search {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" WHERE (nombre ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR pais ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn list(&self, spec: &ListSpec) -> RepositoryResult<(Vec<UserRecord>, u64)> {
        let mut query = QueryBuilder::<Postgres>::new(SELECT_USERS);
        push_search_filter(&mut query, spec.search.as_deref());
        // Column and direction come from closed enums, never from raw input.
        query.push(format!(
            " ORDER BY {column} {dir}, id {dir}",
            column = spec.sort_by.column(),
            dir = spec.order.keyword()
        ));
        query
            .push(" LIMIT ")
            .push_bind(i64::from(spec.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(spec.offset()).unwrap_or(i64::MAX));

        let rows = query.build().fetch_all(&self.pool).await?;
        let users = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM usuarios");
        push_search_filter(&mut count, spec.search.as_deref());
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        debug!("Listed {} of {} users", users.len(), total);
        Ok((users, total.max(0) as u64))
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<UserRecord>> {
        let row = sqlx::query(&format!("{SELECT_USERS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn find_by_email(
        &self,
        email: &str,
        exclude: Option<Uuid>,
    ) -> RepositoryResult<Option<UserRecord>> {
        let row = sqlx::query(&format!(
            "{SELECT_USERS} WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2)"
        ))
        .bind(email)
        .bind(exclude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn create(&self, user: &NewUser) -> RepositoryResult<UserRecord> {
        validation::check_new_user(user).map_err(RepositoryError::Validation)?;

        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO usuarios
                (id, nombre, email, telefono, edad, pais, comentarios,
                 fecha_creacion, fecha_actualizacion)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING id, nombre, email, telefono, edad, pais, comentarios,
                      fecha_creacion, fecha_actualizacion
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.nombre)
        .bind(&user.email)
        .bind(&user.telefono)
        .bind(user.edad)
        .bind(user.pais.as_str())
        .bind(&user.comentarios)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let record = user_from_row(&row)?;
        info!("Created user {}", record.id);
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &UserChanges,
    ) -> RepositoryResult<Option<UserRecord>> {
        validation::check_changes(changes).map_err(RepositoryError::Validation)?;

        let row = sqlx::query(
            r#"
            UPDATE usuarios SET
                nombre = COALESCE($2, nombre),
                email = COALESCE($3, email),
                telefono = COALESCE($4, telefono),
                edad = COALESCE($5, edad),
                pais = COALESCE($6, pais),
                comentarios = COALESCE($7, comentarios),
                fecha_actualizacion = GREATEST($8, fecha_actualizacion + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING id, nombre, email, telefono, edad, pais, comentarios,
                      fecha_creacion, fecha_actualizacion
            "#,
        )
        .bind(id)
        .bind(changes.nombre.as_deref())
        .bind(changes.email.as_deref())
        .bind(changes.telefono.as_deref())
        .bind(changes.edad)
        .bind(changes.pais.map(|p| p.as_str()))
        .bind(changes.comentarios.as_deref())
        .bind(changes.touched_at)
        .fetch_optional(&self.pool)
        .await?;

        let record = row.as_ref().map(user_from_row).transpose()?;
        if let Some(record) = &record {
            info!("Updated user {}", record.id);
        }
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> RepositoryResult<Option<UserRecord>> {
        let row = sqlx::query(
            r#"
            DELETE FROM usuarios
            WHERE id = $1
            RETURNING id, nombre, email, telefono, edad, pais, comentarios,
                      fecha_creacion, fecha_actualizacion
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let record = row.as_ref().map(user_from_row).transpose()?;
        if record.is_some() {
            info!("Deleted user {}", id);
        }
        Ok(record)
    }

    async fn stats(&self, recent_since: DateTime<Utc>) -> RepositoryResult<UserStats> {
        let totals = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COALESCE(AVG(edad)::float8, 0) AS edad_promedio,
                   COUNT(*) FILTER (WHERE fecha_creacion >= $1) AS recientes
            FROM usuarios
            "#,
        )
        .bind(recent_since)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT pais, COUNT(*) AS count
            FROM usuarios
            GROUP BY pais
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut usuarios_por_pais = rows
            .iter()
            .map(|row| -> Result<CountryCount, sqlx::Error> {
                let pais: String = row.try_get("pais")?;
                let count: i64 = row.try_get("count")?;
                Ok(CountryCount {
                    pais: pais.parse().map_err(|e| sqlx::Error::ColumnDecode {
                        index: "pais".to_string(),
                        source: Box::new(e),
                    })?,
                    count: count.max(0) as u64,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        sort_country_counts(&mut usuarios_por_pais);

        let total: i64 = totals.try_get("total")?;
        let recientes: i64 = totals.try_get("recientes")?;

        Ok(UserStats {
            total_usuarios: total.max(0) as u64,
            usuarios_por_pais,
            edad_promedio: totals.try_get("edad_promedio")?,
            usuarios_recientes: recientes.max(0) as u64,
        })
    }

    async fn ping(&self) -> bool {
        common::database::health_check(&self.pool).await
    }
}
