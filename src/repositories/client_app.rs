use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ClientApp;

#[derive(Clone)]
pub struct ClientAppRepository {
    pool: MySqlPool,
}

impl ClientAppRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        organization_id: Uuid,
        name: &str,
        client_id: &str,
        client_secret_hash: Option<&str>,
        is_confidential: bool,
        redirect_uris: &[String],
    ) -> Result<ClientApp, AppError> {
        let id = Uuid::new_v4();
        let redirect_uris_json = serde_json::to_value(redirect_uris).map_err(|e| AppError::Internal(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO client_apps
            (id, organization_id, name, client_id, client_secret_hash, is_confidential, redirect_uris, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?, true)
            "#,
        )
        .bind(id.to_string())
        .bind(organization_id.to_string())
        .bind(name)
        .bind(client_id)
        .bind(client_secret_hash)
        .bind(is_confidential)
        .bind(&redirect_uris_json)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().map(|c| c == "23000").unwrap_or(false) {
                    return AppError::Conflict { resource: "client_app" };
                }
            }
            AppError::Internal(e.into())
        })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to fetch created client app")))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ClientApp>, AppError> {
        sqlx::query_as::<_, ClientApp>(
            r#"
            SELECT id, organization_id, name, client_id, client_secret_hash, is_confidential,
                   redirect_uris, is_active, created_at
            FROM client_apps WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn find_by_client_id(&self, client_id: &str) -> Result<Option<ClientApp>, AppError> {
        sqlx::query_as::<_, ClientApp>(
            r#"
            SELECT id, organization_id, name, client_id, client_secret_hash, is_confidential,
                   redirect_uris, is_active, created_at
            FROM client_apps WHERE client_id = ? AND is_active = true
            "#,
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn list_for_organization(&self, organization_id: Uuid) -> Result<Vec<ClientApp>, AppError> {
        sqlx::query_as::<_, ClientApp>(
            r#"
            SELECT id, organization_id, name, client_id, client_secret_hash, is_confidential,
                   redirect_uris, is_active, created_at
            FROM client_apps WHERE organization_id = ? ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }
}
