use sqlx::{MySql, MySqlPool, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Role;

#[derive(Clone)]
pub struct RoleRepository {
    pool: MySqlPool,
}

impl RoleRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create_system_role(&self, name: &str) -> Result<Role, AppError> {
        self.create(None, name, true).await
    }

    pub async fn create_custom_role(&self, organization_id: Uuid, name: &str) -> Result<Role, AppError> {
        self.create(Some(organization_id), name, false).await
    }

    async fn create(
        &self,
        organization_id: Option<Uuid>,
        name: &str,
        is_system: bool,
    ) -> Result<Role, AppError> {
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO roles (id, organization_id, name, is_system) VALUES (?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(organization_id.map(|o| o.to_string()))
            .bind(name)
            .bind(is_system)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().map(|c| c == "23000").unwrap_or(false) {
                        return AppError::Conflict { resource: "role" };
                    }
                }
                AppError::Internal(e.into())
            })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to fetch created role")))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT id, organization_id, name, is_system FROM roles WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))
    }

    /// Lock the role row for the duration of the caller's transaction, so a
    /// concurrent assignment can't race past the system/custom-org checks
    /// performed against the value this returns.
    pub async fn find_by_id_for_update(
        &self,
        tx: &mut Transaction<'_, MySql>,
        id: Uuid,
    ) -> Result<Option<Role>, AppError> {
        sqlx::query_as::<_, Role>(
            "SELECT id, organization_id, name, is_system FROM roles WHERE id = ? FOR UPDATE",
        )
        .bind(id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn list_system(&self) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>(
            "SELECT id, organization_id, name, is_system FROM roles WHERE is_system = true ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn list_for_organization(&self, organization_id: Uuid) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>(
            r#"
            SELECT id, organization_id, name, is_system FROM roles
            WHERE organization_id = ? OR is_system = true
            ORDER BY is_system DESC, name
            "#,
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn assign_to_user_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        user_id: Uuid,
        organization_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, organization_id, role_id)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE role_id = role_id
            "#,
        )
        .bind(user_id.to_string())
        .bind(organization_id.to_string())
        .bind(role_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
        Ok(())
    }

    pub async fn names_for_user_in_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Vec<String>, AppError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.name FROM roles r
            INNER JOIN user_roles ur ON r.id = ur.role_id
            WHERE ur.user_id = ? AND ur.organization_id = ?
            ORDER BY r.name
            "#,
        )
        .bind(user_id.to_string())
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn ids_for_user_in_organization(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT role_id FROM user_roles WHERE user_id = ? AND organization_id = ?",
        )
        .bind(user_id.to_string())
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        Ok(ids.into_iter().filter_map(|id| Uuid::parse_str(&id).ok()).collect())
    }
}
