use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// User record as written at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(with = "iso_date")]
    pub birthdate: Date,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String, // Argon2 hash, never exposed
    pub created_by: String,
    pub updated_by: String,
}

/// Credentials projection used by login. Not persisted on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct Session {
    pub user_uid: String,
    pub role_uid: String,
    pub password: String,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct UserWithRoleRow {
    pub uid: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birthdate: Date,
    pub username: String,
    pub created_at: OffsetDateTime,
    pub per_page: i64,
    pub role_name: String,
}

/// Listing projection: user joined with its role name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserWithRole {
    pub uid: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(with = "iso_date")]
    pub birthdate: Date,
    pub username: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub role_name: String,
}

impl From<UserWithRoleRow> for UserWithRole {
    fn from(r: UserWithRoleRow) -> Self {
        Self {
            uid: r.uid,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            birthdate: r.birthdate,
            username: r.username,
            created_at: r.created_at,
            role_name: r.role_name,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadUsersWithPaginationReq {
    pub fullname: String,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ReadUsersWithPaginationResp {
    pub users: Vec<UserWithRole>,
    /// Sum of the per-row `per_page` column over the returned rows.
    pub per_page: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(i8)]
pub enum IsDeleted {
    #[default]
    False = 0,
    True = 1,
}

impl IsDeleted {
    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CountUsersReq {
    pub is_deleted: IsDeleted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountUsersResp {
    pub total: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentor,
    #[default]
    Mentee,
}

impl Role {
    /// Name stored in `roles.name`.
    pub fn name(self) -> &'static str {
        match self {
            Role::Mentor => "mentor",
            Role::Mentee => "mentee",
        }
    }
}
