//! User repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;
use crate::repositories::TradeRepository;

/// Repository for user-related database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        external_id: &str,
        display_name: &str,
        profile_image_url: Option<&str>,
    ) -> Result<UserEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (external_id, display_name, profile_image_url)
            VALUES ($1, $2, $3)
            RETURNING id, external_id, display_name, profile_image_url, created_at, updated_at, deleted_at
            "#,
        )
        .bind(external_id)
        .bind(display_name)
        .bind(profile_image_url)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a user by ID, including withdrawn users.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, external_id, display_name, profile_image_url, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_active_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_user_by_external_id");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, external_id, display_name, profile_image_url, created_at, updated_at, deleted_at
            FROM users
            WHERE external_id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Close the user's OPEN trades and anonymize the row in one transaction.
    ///
    /// Returns `None` (nothing changed) when the user is unknown or already
    /// withdrawn, otherwise the number of trades closed.
    pub async fn withdraw(
        &self,
        user_id: Uuid,
        tombstone: &str,
        placeholder_name: &str,
    ) -> Result<Option<u64>, sqlx::Error> {
        let timer = QueryTimer::new("withdraw_user");
        let result = self.withdraw_tx(user_id, tombstone, placeholder_name).await;
        timer.record();
        result
    }

    async fn withdraw_tx(
        &self,
        user_id: Uuid,
        tombstone: &str,
        placeholder_name: &str,
    ) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let active: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM users WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        if active.is_none() {
            return Ok(None);
        }

        let closed = TradeRepository::close_open_for_requester(&mut *tx, user_id).await?;

        sqlx::query(
            r#"
            UPDATE users
            SET external_id = $2, display_name = $3, profile_image_url = NULL,
                deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(tombstone)
        .bind(placeholder_name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(closed))
    }
}
