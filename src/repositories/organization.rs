use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Organization;

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: MySqlPool,
}

impl OrganizationRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str, slug: &str) -> Result<Organization, AppError> {
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO organizations (id, name, slug) VALUES (?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().map(|c| c == "23000").unwrap_or(false) {
                        return AppError::Conflict { resource: "organization" };
                    }
                }
                AppError::Internal(e.into())
            })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to fetch created organization")))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>, AppError> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, slug, created_at, updated_at FROM organizations WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, AppError> {
        sqlx::query_as::<_, Organization>(
            "SELECT id, name, slug, created_at, updated_at FROM organizations WHERE slug = ?",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }
}
