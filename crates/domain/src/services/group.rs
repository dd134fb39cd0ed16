//! Group management: creation, joining, renaming and dissolution.

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::DomainError;
use crate::models::group::{
    generate_invitation_code, CreateGroupRequest, CreateGroupResponse, JoinGroupRequest,
    JoinGroupResponse, ListGroupsResponse, UpdateGroupRequest,
};
use crate::models::{Group, GroupRole};
use crate::store::{StoreError, TradeStore};

/// Invitation code generation attempts before giving up on collisions.
pub const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn TradeStore>,
}

impl GroupService {
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self { store }
    }

    /// Create a group owned by `owner_id`, who becomes its ADMIN.
    pub async fn create(
        &self,
        owner_id: Uuid,
        request: CreateGroupRequest,
    ) -> Result<CreateGroupResponse, DomainError> {
        request.validate()?;
        let name = request.group_name.trim();

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_invitation_code();
            match self.store.create_group(name, &code, owner_id).await {
                Ok((group, membership)) => {
                    tracing::info!(group_id = %group.id, owner_id = %owner_id, "Group created");
                    return Ok(CreateGroupResponse {
                        group,
                        your_role: membership.role,
                    });
                }
                Err(StoreError::AlreadyExists) => {
                    tracing::debug!(attempt = attempt, "Invitation code collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(attempts = MAX_CODE_ATTEMPTS, "Could not allocate a unique invitation code");
        Err(DomainError::Internal(
            "Could not allocate an invitation code".into(),
        ))
    }

    /// Join the group behind an invitation code as a MEMBER.
    ///
    /// Duplicate membership is rejected by the store's unique constraint, so
    /// two concurrent joins by the same user yield one success and one
    /// [`DomainError::Conflict`].
    pub async fn join(
        &self,
        user_id: Uuid,
        request: JoinGroupRequest,
    ) -> Result<JoinGroupResponse, DomainError> {
        request.validate()?;

        let group = self
            .store
            .find_group_by_invitation_code(request.invitation_code.trim())
            .await?
            .ok_or_else(|| DomainError::NotFound("Invalid invitation code".into()))?;

        let member = match self
            .store
            .add_member(group.id, user_id, GroupRole::Member)
            .await
        {
            Ok(member) => member,
            Err(StoreError::AlreadyExists) => {
                return Err(DomainError::Conflict(
                    "You are already a member of this group".into(),
                ))
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(group_id = %group.id, user_id = %user_id, "User joined group");
        Ok(JoinGroupResponse {
            message: "Joined successfully".to_string(),
            group,
            member,
        })
    }

    pub async fn list_mine(&self, user_id: Uuid) -> Result<ListGroupsResponse, DomainError> {
        let data = self.store.list_user_groups(user_id).await?;
        let count = data.len();
        Ok(ListGroupsResponse { data, count })
    }

    /// Rename a group. Owner only.
    pub async fn rename(
        &self,
        owner_id: Uuid,
        group_id: Uuid,
        request: UpdateGroupRequest,
    ) -> Result<Group, DomainError> {
        request.validate()?;
        self.require_owner(group_id, owner_id, "Only the group owner can rename the group")
            .await?;

        let group = self
            .store
            .rename_group(group_id, owner_id, request.name.trim())
            .await?
            .ok_or_else(|| DomainError::NotFound("Group not found".into()))?;

        tracing::info!(group_id = %group.id, "Group renamed");
        Ok(group)
    }

    /// Close the group's OPEN trades and soft-delete it, atomically. Owner
    /// only. Returns the number of trades closed.
    pub async fn dissolve(&self, owner_id: Uuid, group_id: Uuid) -> Result<u64, DomainError> {
        self.require_owner(group_id, owner_id, "Only the group owner can dissolve the group")
            .await?;

        let closed = match self.store.dissolve_group(group_id, owner_id).await {
            Ok(closed) => closed,
            Err(StoreError::NotFound) => {
                return Err(DomainError::NotFound("Group not found".into()))
            }
            Err(e) => {
                tracing::error!(error = %e, group_id = %group_id, "Group dissolution rolled back");
                return Err(e.into());
            }
        };

        tracing::info!(group_id = %group_id, closed_trades = closed, "Group dissolved");
        Ok(closed)
    }

    async fn require_owner(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        denied: &str,
    ) -> Result<Group, DomainError> {
        let group = self
            .store
            .find_group(group_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Group not found".into()))?;
        if group.owner_id != user_id {
            return Err(DomainError::Forbidden(denied.to_string()));
        }
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTrade, TradeStatus, User};
    use crate::store::{FailPoint, MemoryTradeStore};
    use chrono::{Duration, Utc};

    async fn setup() -> (Arc<MemoryTradeStore>, GroupService, User, User) {
        let store = Arc::new(MemoryTradeStore::new());
        let service = GroupService::new(store.clone());
        let owner = store.create_user("Uowner", "Owner", None).await.unwrap();
        let joiner = store.create_user("Ujoiner", "Joiner", None).await.unwrap();
        (store, service, owner, joiner)
    }

    fn create_request(name: &str) -> CreateGroupRequest {
        CreateGroupRequest {
            group_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_makes_owner_admin() {
        let (store, service, owner, _) = setup().await;
        let created = service.create(owner.id, create_request("Cafe")).await.unwrap();
        assert_eq!(created.your_role, GroupRole::Admin);
        assert_eq!(created.group.invitation_code.len(), 6);

        let membership = store
            .find_membership(created.group.id, owner.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(membership.role, GroupRole::Admin);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let (_, service, owner, _) = setup().await;
        let err = service.create(owner.id, create_request("  ")).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_join_unknown_code() {
        let (_, service, _, joiner) = setup().await;
        let err = service
            .join(
                joiner.id,
                JoinGroupRequest {
                    invitation_code: "ZZZZZZ".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_join_conflicts() {
        let (store, service, owner, joiner) = setup().await;
        let created = service.create(owner.id, create_request("Cafe")).await.unwrap();
        let code = created.group.invitation_code.clone();

        let req = || JoinGroupRequest {
            invitation_code: code.clone(),
        };
        let (a, b) = tokio::join!(service.join(joiner.id, req()), service.join(joiner.id, req()));

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(DomainError::Conflict(_)))));
        assert_eq!(store.membership_count(created.group.id, joiner.id).await, 1);
    }

    #[tokio::test]
    async fn test_rename_owner_only() {
        let (_, service, owner, joiner) = setup().await;
        let created = service.create(owner.id, create_request("Cafe")).await.unwrap();
        let req = || UpdateGroupRequest {
            name: "Bistro".to_string(),
        };

        let err = service
            .rename(joiner.id, created.group.id, req())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let renamed = service.rename(owner.id, created.group.id, req()).await.unwrap();
        assert_eq!(renamed.name, "Bistro");
    }

    #[tokio::test]
    async fn test_dissolve_closes_trades_and_hides_group() {
        let (store, service, owner, _) = setup().await;
        let created = service.create(owner.id, create_request("Cafe")).await.unwrap();
        let start = Utc::now() + Duration::hours(10);
        let trade = store
            .create_trade(&NewTrade {
                group_id: created.group.id,
                requester_id: owner.id,
                shift_start_at: start,
                shift_end_at: start + Duration::hours(2),
                bounty_description: String::new(),
            })
            .await
            .unwrap();

        assert_eq!(service.dissolve(owner.id, created.group.id).await.unwrap(), 1);
        assert_eq!(
            store.find_trade(trade.id).await.unwrap().unwrap().status,
            TradeStatus::Closed
        );
        assert!(service.list_mine(owner.id).await.unwrap().data.is_empty());

        let err = service.dissolve(owner.id, created.group.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dissolve_failure_leaves_everything_in_place() {
        let (store, service, owner, _) = setup().await;
        let created = service.create(owner.id, create_request("Cafe")).await.unwrap();

        store.inject_failure(FailPoint::MidTransaction);
        let err = service.dissolve(owner.id, created.group.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
        store.clear_failure();

        assert_eq!(service.list_mine(owner.id).await.unwrap().count, 1);
    }
}
