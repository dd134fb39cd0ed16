//! Group domain models for shift trading groups.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Length of a group invitation code.
pub const INVITATION_CODE_LENGTH: usize = 6;

/// Alphabet invitation codes are drawn from.
pub const INVITATION_CODE_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Role within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupRole {
    Admin,
    Member,
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Admin => "ADMIN",
            GroupRole::Member => "MEMBER",
        }
    }
}

impl FromStr for GroupRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(GroupRole::Admin),
            "MEMBER" => Ok(GroupRole::Member),
            _ => Err(format!("Invalid group role: {}", s)),
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A work group whose members trade shifts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub invitation_code: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Group {
    pub fn is_dissolved(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A user's membership in a group. Unique per (group, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Membership {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

/// Request payload for creating a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateGroupRequest {
    #[validate(
        length(min = 1, max = 100, message = "Group name must be between 1 and 100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub group_name: String,
}

/// Request payload for joining a group by invitation code.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct JoinGroupRequest {
    #[validate(length(min = 1, max = 32, message = "Invitation code is required"))]
    pub invitation_code: String,
}

/// Request payload for renaming a group.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateGroupRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub name: String,
}

/// Response after joining a group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct JoinGroupResponse {
    pub message: String,
    pub group: Group,
    pub member: Membership,
}

/// Response after creating a group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CreateGroupResponse {
    #[serde(flatten)]
    pub group: Group,
    pub your_role: GroupRole,
}

/// Response for listing the caller's groups.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListGroupsResponse {
    pub data: Vec<Group>,
    pub count: usize,
}

/// Result of dissolving a group.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DissolveGroupResponse {
    pub message: String,
    pub closed_trades: u64,
}

/// Generate a random invitation code from [`INVITATION_CODE_ALPHABET`].
pub fn generate_invitation_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITATION_CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..INVITATION_CODE_ALPHABET.len());
            INVITATION_CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_invitation_code_format() {
        let code = generate_invitation_code();
        assert_eq!(code.len(), INVITATION_CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_invitation_code_varies() {
        let codes: std::collections::HashSet<String> =
            (0..50).map(|_| generate_invitation_code()).collect();
        // 62^6 possibilities; 50 draws colliding down to a handful would mean a broken RNG
        assert!(codes.len() > 45);
    }

    #[test]
    fn test_group_role_round_trip_strings() {
        assert_eq!(GroupRole::Admin.as_str(), "ADMIN");
        assert_eq!("member".parse::<GroupRole>().unwrap(), GroupRole::Member);
        assert!("owner".parse::<GroupRole>().is_err());
    }

    #[test]
    fn test_group_role_serializes_uppercase() {
        let json = serde_json::to_string(&GroupRole::Member).unwrap();
        assert_eq!(json, "\"MEMBER\"");
    }

    #[test]
    fn test_create_group_request_validation() {
        let ok = CreateGroupRequest {
            group_name: "Corner Cafe".to_string(),
        };
        assert!(ok.validate().is_ok());

        let empty = CreateGroupRequest {
            group_name: String::new(),
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_join_request_requires_code() {
        let req = JoinGroupRequest {
            invitation_code: String::new(),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_group_response_flattens_group() {
        let now = Utc::now();
        let response = CreateGroupResponse {
            group: Group {
                id: Uuid::nil(),
                name: "Night shift".to_string(),
                invitation_code: "AB12CD".to_string(),
                owner_id: Uuid::nil(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
            your_role: GroupRole::Admin,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["invitation_code"], "AB12CD");
        assert_eq!(json["your_role"], "ADMIN");
    }
}
