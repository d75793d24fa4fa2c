use serde::{Deserialize, Serialize};

use crate::users::repo_types::{Role, UserWithRole};

pub const DEFAULT_LIMIT: i64 = 10;
pub const DEFAULT_PAGE: i64 = 1;
/// Upper bound on `limit`; larger requests are clamped.
pub const MAX_LIMIT: i64 = 100;

/// Request body for `POST /v1/users`.
#[derive(Debug, Deserialize)]
pub struct CreateUsersReq {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birthdate: String, // YYYY-MM-DD
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResp {
    pub access_token: String,
    pub user_uid: String,
    pub role_uid: String,
}

/// Raw query string of `GET /v1/users`. Values are parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct GetUsersQuery {
    pub name: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUsersWithPaginationReq {
    pub fullname: String,
    pub limit: i64,
    pub page: i64,
}

fn positive_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

impl From<GetUsersQuery> for GetUsersWithPaginationReq {
    fn from(q: GetUsersQuery) -> Self {
        Self {
            fullname: q.name.map(|n| n.trim().to_string()).unwrap_or_default(),
            limit: positive_or(q.limit.as_deref(), DEFAULT_LIMIT).min(MAX_LIMIT),
            page: positive_or(q.page.as_deref(), DEFAULT_PAGE),
        }
    }
}

impl GetUsersWithPaginationReq {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize)]
pub struct GetUsersWithPaginationResp {
    pub users: Vec<UserWithRole>,
    pub per_page: i64,
    pub total: i64,
    pub total_page: i64,
    pub page: i64,
    pub limit: i64,
}
