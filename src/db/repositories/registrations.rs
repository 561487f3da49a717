use crate::{
    db::models::{CameraRegistration, CameraRegistrationDb, RegistrationFilter},
    db::repositories::RegistrationStore,
    error::Error,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Postgres-backed registrations repository
#[derive(Clone)]
pub struct RegistrationsRepository {
    pool: Arc<PgPool>,
}

impl RegistrationsRepository {
    /// Create a new registrations repository
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

/// Map a unique-index violation to a duplicate error, anything else to a database error
fn map_write_error(e: sqlx::Error, action: &str) -> Error {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Error::Duplicate("This email is already registered".to_string())
        }
        _ => Error::Database(format!("Failed to {}: {}", action, e)),
    }
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn into_domain(rows: Vec<CameraRegistrationDb>) -> Result<Vec<CameraRegistration>> {
    rows.into_iter()
        .map(|row| CameraRegistration::try_from(row).map_err(anyhow::Error::from))
        .collect()
}

#[async_trait]
impl RegistrationStore for RegistrationsRepository {
    async fn insert(&self, registration: &CameraRegistration) -> Result<CameraRegistration> {
        info!("Creating new registration: {}", registration.name);

        let row = CameraRegistrationDb::from(registration.clone());

        let result = sqlx::query_as::<_, CameraRegistrationDb>(
            r#"
            INSERT INTO camera_registrations (
                id, name, email, phone, camera_type, coverage_area, pincode, locality,
                longitude, latitude, location, preferences, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id, name, email, phone, camera_type, coverage_area, pincode, locality,
                      longitude, latitude, location, preferences, created_at, updated_at
            "#,
        )
        .bind(row.id)
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.camera_type)
        .bind(&row.coverage_area)
        .bind(&row.pincode)
        .bind(&row.locality)
        .bind(row.longitude)
        .bind(row.latitude)
        .bind(&row.location)
        .bind(&row.preferences)
        .bind(row.created_at)
        .bind(row.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_write_error(e, "create registration"))?;

        Ok(CameraRegistration::try_from(result)?)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<CameraRegistration>> {
        let result = sqlx::query_as::<_, CameraRegistrationDb>(
            r#"
            SELECT id, name, email, phone, camera_type, coverage_area, pincode, locality,
                   longitude, latitude, location, preferences, created_at, updated_at
            FROM camera_registrations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get registration by ID: {}", e)))?;

        Ok(result.map(CameraRegistration::try_from).transpose()?)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<CameraRegistration>> {
        let result = sqlx::query_as::<_, CameraRegistrationDb>(
            r#"
            SELECT id, name, email, phone, camera_type, coverage_area, pincode, locality,
                   longitude, latitude, location, preferences, created_at, updated_at
            FROM camera_registrations
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get registration by email: {}", e)))?;

        Ok(result.map(CameraRegistration::try_from).transpose()?)
    }

    async fn list(&self, filter: &RegistrationFilter) -> Result<Vec<CameraRegistration>> {
        let pincode = filter.pincode.as_deref().filter(|p| !p.is_empty());
        let locality = filter
            .locality
            .as_deref()
            .filter(|l| !l.is_empty())
            .map(escape_like);

        let result = sqlx::query_as::<_, CameraRegistrationDb>(
            r#"
            SELECT id, name, email, phone, camera_type, coverage_area, pincode, locality,
                   longitude, latitude, location, preferences, created_at, updated_at
            FROM camera_registrations
            WHERE ($1::TEXT IS NULL OR pincode = $1)
              AND ($2::TEXT IS NULL OR locality ILIKE '%' || $2 || '%')
            ORDER BY created_at, id
            "#,
        )
        .bind(pincode)
        .bind(locality)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to list registrations: {}", e)))?;

        into_domain(result)
    }

    async fn update(&self, registration: &CameraRegistration) -> Result<CameraRegistration> {
        let row = CameraRegistrationDb::from(registration.clone());

        let result = sqlx::query_as::<_, CameraRegistrationDb>(
            r#"
            UPDATE camera_registrations
            SET name = $1, email = $2, phone = $3, camera_type = $4, coverage_area = $5,
                preferences = $6, updated_at = $7
            WHERE id = $8
            RETURNING id, name, email, phone, camera_type, coverage_area, pincode, locality,
                      longitude, latitude, location, preferences, created_at, updated_at
            "#,
        )
        .bind(&row.name)
        .bind(&row.email)
        .bind(&row.phone)
        .bind(&row.camera_type)
        .bind(&row.coverage_area)
        .bind(&row.preferences)
        .bind(Utc::now())
        .bind(row.id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_write_error(e, "update registration"))?
        .ok_or_else(|| Error::NotFound(format!("Registration {}", registration.id)))?;

        Ok(CameraRegistration::try_from(result)?)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM camera_registrations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to delete registration: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM camera_registrations")
            .execute(&*self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to clear registrations: {}", e)))?;

        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&*self.pool).await {
            Ok(_) => true,
            Err(e) => {
                error!("Database health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("Vaishali Nagar"), "Vaishali Nagar");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
