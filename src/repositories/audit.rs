use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::AuditRecord;

#[derive(Clone)]
pub struct AuditRepository {
    pool: MySqlPool,
}

impl AuditRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        organization_id: Option<Uuid>,
        actor_user_id: Option<Uuid>,
        action: &str,
        target_type: &str,
        target_id: &str,
        metadata: serde_json::Value,
    ) -> Result<AuditRecord, AppError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO audit_records
            (id, organization_id, actor_user_id, action, target_type, target_id, metadata)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(organization_id.map(|o| o.to_string()))
        .bind(actor_user_id.map(|u| u.to_string()))
        .bind(action)
        .bind(target_type)
        .bind(target_id)
        .bind(&metadata)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to fetch created audit record")))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AuditRecord>, AppError> {
        sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, organization_id, actor_user_id, action, target_type, target_id,
                   metadata, created_at
            FROM audit_records WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn list_for_organization(
        &self,
        organization_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Vec<AuditRecord>, AppError> {
        let offset = (page.max(1) - 1) * limit;
        sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, organization_id, actor_user_id, action, target_type, target_id,
                   metadata, created_at
            FROM audit_records
            WHERE organization_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(organization_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn list_for_actor(&self, actor_user_id: Uuid, page: i64, limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        let offset = (page.max(1) - 1) * limit;
        sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, organization_id, actor_user_id, action, target_type, target_id,
                   metadata, created_at
            FROM audit_records
            WHERE actor_user_id = ?
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(actor_user_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }
}
