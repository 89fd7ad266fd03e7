use sqlx::{MySql, MySqlPool, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::RolePermission;

#[derive(Clone)]
pub struct RolePermissionRepository {
    pool: MySqlPool,
}

impl RolePermissionRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Runs inside the caller's transaction so the insert happens while the
    /// role row locked by `RoleRepository::find_by_id_for_update` is still
    /// held, not after it's released at commit.
    pub async fn assign(
        &self,
        tx: &mut Transaction<'_, MySql>,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> Result<RolePermission, AppError> {
        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE role_id = role_id
            "#,
        )
        .bind(role_id.to_string())
        .bind(permission_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.message().contains("foreign key constraint") {
                    return AppError::NotFound { resource: "role_or_permission" };
                }
            }
            AppError::Internal(e.into())
        })?;

        Ok(RolePermission { role_id, permission_id })
    }

    pub async fn remove(&self, role_id: Uuid, permission_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM role_permissions WHERE role_id = ? AND permission_id = ?")
            .bind(role_id.to_string())
            .bind(permission_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_role(&self, role_id: Uuid) -> Result<Vec<RolePermission>, AppError> {
        sqlx::query_as::<_, RolePermission>(
            "SELECT role_id, permission_id FROM role_permissions WHERE role_id = ?",
        )
        .bind(role_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }
}
