use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Permission;

#[derive(Clone)]
pub struct PermissionRepository {
    pool: MySqlPool,
}

impl PermissionRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create_system_permission(&self, name: &str) -> Result<Permission, AppError> {
        self.create(None, name, true).await
    }

    pub async fn create_custom_permission(
        &self,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Permission, AppError> {
        self.create(Some(organization_id), name, false).await
    }

    async fn create(
        &self,
        organization_id: Option<Uuid>,
        name: &str,
        is_system: bool,
    ) -> Result<Permission, AppError> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO permissions (id, organization_id, name, is_system) VALUES (?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(organization_id.map(|o| o.to_string()))
        .bind(name)
        .bind(is_system)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().map(|c| c == "23000").unwrap_or(false) {
                    return AppError::Conflict { resource: "permission" };
                }
            }
            AppError::Internal(e.into())
        })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to fetch created permission")))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Permission>, AppError> {
        sqlx::query_as::<_, Permission>(
            "SELECT id, organization_id, name, is_system FROM permissions WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn list_system(&self) -> Result<Vec<Permission>, AppError> {
        sqlx::query_as::<_, Permission>(
            "SELECT id, organization_id, name, is_system FROM permissions WHERE is_system = true ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn is_system_permission(&self, name: &str) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM permissions WHERE name = ? AND is_system = true",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
        Ok(count > 0)
    }

    pub async fn list_for_organization(&self, organization_id: Uuid) -> Result<Vec<Permission>, AppError> {
        sqlx::query_as::<_, Permission>(
            r#"
            SELECT id, organization_id, name, is_system FROM permissions
            WHERE organization_id = ? OR is_system = true
            ORDER BY is_system DESC, name
            "#,
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    /// Flattened permission names granted by a set of roles — the value
    /// that becomes an access token's `permissions` claim.
    pub async fn names_for_roles(&self, role_ids: &[Uuid]) -> Result<Vec<String>, AppError> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = role_ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let query = format!(
            r#"
            SELECT DISTINCT p.name
            FROM permissions p
            INNER JOIN role_permissions rp ON p.id = rp.permission_id
            WHERE rp.role_id IN ({placeholders})
            ORDER BY p.name
            "#
        );

        let mut q = sqlx::query_scalar::<_, String>(&query);
        for id in role_ids {
            q = q.bind(id.to_string());
        }
        q.fetch_all(&self.pool).await.map_err(|e| AppError::Internal(e.into()))
    }
}
