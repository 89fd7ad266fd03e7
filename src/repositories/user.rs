use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::User;

#[derive(Clone)]
pub struct UserRepository {
    pool: MySqlPool,
}

impl UserRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, email: &str, password_hash: &str, name: &str) -> Result<User, AppError> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, is_active, is_superadmin)
            VALUES (?, ?, ?, ?, true, false)
            "#,
        )
        .bind(id.to_string())
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().map(|c| c == "23000").unwrap_or(false) {
                    return AppError::Conflict { resource: "user" };
                }
            }
            AppError::Internal(e.into())
        })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("failed to fetch created user")))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, is_active, is_superadmin, created_at, updated_at
            FROM users WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, is_active, is_superadmin, created_at, updated_at
            FROM users WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn update_password(&self, user_id: Uuid, new_password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(new_password_hash)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound { resource: "user" });
        }
        Ok(())
    }

    pub async fn update_name(&self, user_id: Uuid, name: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET name = ? WHERE id = ?")
            .bind(name)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound { resource: "user" });
        }
        Ok(())
    }

    pub async fn set_active(&self, user_id: Uuid, is_active: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound { resource: "user" });
        }
        Ok(())
    }

    pub async fn list_all(&self, page: u32, limit: u32) -> Result<Vec<User>, AppError> {
        let offset = (page.saturating_sub(1)) * limit;
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, name, is_active, is_superadmin, created_at, updated_at
            FROM users ORDER BY created_at DESC LIMIT ? OFFSET ?
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn count_all(&self) -> Result<u64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        Ok(count as u64)
    }
}
