//! Group and membership repository for database operations.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GroupEntity, GroupMemberEntity, GroupRoleDb};
use crate::metrics::QueryTimer;
use crate::repositories::TradeRepository;

/// Repository for group-related database operations.
#[derive(Clone)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a group and add the owner as ADMIN.
    pub async fn create_with_admin(
        &self,
        name: &str,
        invitation_code: &str,
        owner_id: Uuid,
    ) -> Result<(GroupEntity, GroupMemberEntity), sqlx::Error> {
        let timer = QueryTimer::new("create_group");
        let result = self
            .create_with_admin_tx(name, invitation_code, owner_id)
            .await;
        timer.record();
        result
    }

    async fn create_with_admin_tx(
        &self,
        name: &str,
        invitation_code: &str,
        owner_id: Uuid,
    ) -> Result<(GroupEntity, GroupMemberEntity), sqlx::Error> {
        // group and owner membership commit together
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, GroupEntity>(
            r#"
            INSERT INTO job_groups (name, invitation_code, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, invitation_code, owner_id, created_at, updated_at, deleted_at
            "#,
        )
        .bind(name)
        .bind(invitation_code)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        let member = sqlx::query_as::<_, GroupMemberEntity>(
            r#"
            INSERT INTO group_members (group_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, group_id, user_id, role, joined_at
            "#,
        )
        .bind(group.id)
        .bind(owner_id)
        .bind(GroupRoleDb::Admin)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((group, member))
    }

    /// Find a live (not dissolved) group by ID.
    pub async fn find_live_by_id(&self, id: Uuid) -> Result<Option<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_by_id");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, name, invitation_code, owner_id, created_at, updated_at, deleted_at
            FROM job_groups
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_live_by_code(&self, code: &str) -> Result<Option<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_by_code");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT id, name, invitation_code, owner_id, created_at, updated_at, deleted_at
            FROM job_groups
            WHERE invitation_code = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Live groups a user belongs to, newest membership first.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_user_groups");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            SELECT g.id, g.name, g.invitation_code, g.owner_id, g.created_at, g.updated_at, g.deleted_at
            FROM job_groups g
            JOIN group_members gm ON gm.group_id = g.id
            WHERE gm.user_id = $1 AND g.deleted_at IS NULL
            ORDER BY gm.joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Rename where the group is live and owned by `owner_id`.
    pub async fn rename(
        &self,
        id: Uuid,
        owner_id: Uuid,
        name: &str,
    ) -> Result<Option<GroupEntity>, sqlx::Error> {
        let timer = QueryTimer::new("rename_group");
        let result = sqlx::query_as::<_, GroupEntity>(
            r#"
            UPDATE job_groups
            SET name = $3, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL
            RETURNING id, name, invitation_code, owner_id, created_at, updated_at, deleted_at
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Close the group's OPEN trades and soft-delete it in one transaction.
    ///
    /// Returns `None` (nothing changed) when the group is not live or not
    /// owned by `owner_id`.
    pub async fn dissolve(&self, id: Uuid, owner_id: Uuid) -> Result<Option<u64>, sqlx::Error> {
        let timer = QueryTimer::new("dissolve_group");
        let result = self.dissolve_tx(id, owner_id).await;
        timer.record();
        result
    }

    async fn dissolve_tx(&self, id: Uuid, owner_id: Uuid) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let live: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM job_groups
            WHERE id = $1 AND owner_id = $2 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;
        if live.is_none() {
            return Ok(None);
        }

        let closed = TradeRepository::close_open_for_group(&mut *tx, id).await?;

        sqlx::query("UPDATE job_groups SET deleted_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(closed))
    }

    /// Insert a membership. Fails with a unique violation on duplicates.
    pub async fn add_member(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRoleDb,
    ) -> Result<GroupMemberEntity, sqlx::Error> {
        let timer = QueryTimer::new("add_group_member");
        let result = sqlx::query_as::<_, GroupMemberEntity>(
            r#"
            INSERT INTO group_members (group_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, group_id, user_id, role, joined_at
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Membership in a live group.
    pub async fn find_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<GroupMemberEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_group_member");
        let result = sqlx::query_as::<_, GroupMemberEntity>(
            r#"
            SELECT gm.id, gm.group_id, gm.user_id, gm.role, gm.joined_at
            FROM group_members gm
            JOIN job_groups g ON g.id = gm.group_id
            WHERE gm.group_id = $1 AND gm.user_id = $2 AND g.deleted_at IS NULL
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// External identities of active members, except one user.
    pub async fn member_external_ids(
        &self,
        group_id: Uuid,
        exclude_user_id: Uuid,
    ) -> Result<Vec<String>, sqlx::Error> {
        let timer = QueryTimer::new("member_external_ids");
        let result = sqlx::query_scalar::<_, String>(
            r#"
            SELECT u.external_id
            FROM group_members gm
            JOIN users u ON u.id = gm.user_id
            WHERE gm.group_id = $1 AND gm.user_id <> $2 AND u.deleted_at IS NULL
            "#,
        )
        .bind(group_id)
        .bind(exclude_user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
