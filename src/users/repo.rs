use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::debug;

use crate::error::RepoError;
use crate::users::repo_types::{
    CountUsersReq, CountUsersResp, ReadUsersWithPaginationReq, ReadUsersWithPaginationResp, Role,
    Session, User, UserWithRoleRow,
};

const INSERT_USERS: &str = r#"
    INSERT INTO users (uid, first_name, last_name, email, birthdate, username, password, created_by, updated_by)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const INSERT_AUTHZ: &str = r#"
    INSERT INTO authz (user_uid, role_uid)
    SELECT u.uid, r.uid FROM users u JOIN roles r ON r.name = ?
    WHERE u.uid = ?
"#;

const SELECT_BY_EMAIL: &str = r#"
    SELECT a.user_uid, a.role_uid, u.password
    FROM users u
    JOIN authz a ON u.uid = a.user_uid
    WHERE u.email = ?
"#;

const SELECT_USERS_WITH_PAGINATION: &str = r#"SELECT u.uid, u.first_name, u.last_name, u.email, u.birthdate, u.username, u.created_at,
    (SELECT COUNT(*) FROM users us WHERE us.id = u.id) AS per_page, r.name AS role_name"#;

const SELECT_COUNT_USERS_WITH_PAGINATION: &str = "SELECT COUNT(*)";

/// Listing source shared by the page and its count, so both see the same rows.
const FROM_USERS_WITH_ROLE: &str = r#"
    FROM users u
    JOIN authz a ON u.uid = a.user_uid
    JOIN roles r ON a.role_uid = r.uid"#;

const SELECT_COUNT_USERS: &str = "SELECT COUNT(*) FROM users WHERE is_deleted = ?";

/// Characters with operator meaning in MySQL boolean-mode full-text search.
const BOOLEAN_MODE_OPERATORS: &[char] = &['+', '-', '<', '>', '(', ')', '~', '*', '"', '@'];

#[async_trait]
pub trait UsersRepository: Send + Sync {
    /// Inserts a user. Re-inserting an existing uid or email succeeds without effect.
    async fn create_users(&self, user: &User) -> Result<(), RepoError>;
    /// Binds `user_uid` to `role`. A no-op when either side is missing or the binding exists.
    async fn create_authz(&self, user_uid: &str, role: Role) -> Result<(), RepoError>;
    async fn read_user_by_email(&self, email: &str) -> Result<Session, RepoError>;
    async fn read_users_with_pagination(
        &self,
        req: &ReadUsersWithPaginationReq,
    ) -> Result<ReadUsersWithPaginationResp, RepoError>;
    async fn count_users(&self, req: CountUsersReq) -> Result<CountUsersResp, RepoError>;
    /// Counts the rows `read_users_with_pagination` would page through for `fullname`.
    async fn count_users_with_pagination(
        &self,
        fullname: &str,
    ) -> Result<CountUsersResp, RepoError>;
}

#[derive(Clone)]
pub struct MySqlUsersRepository {
    db: MySqlPool,
}

impl MySqlUsersRepository {
    pub fn new(db: MySqlPool) -> Self {
        Self { db }
    }
}

fn is_duplicate(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Turns a free-text name into a prefix search term, or `None` when nothing searchable remains.
pub(crate) fn search_term(fullname: &str) -> Option<String> {
    let cleaned: String = fullname
        .chars()
        .map(|c| if BOOLEAN_MODE_OPERATORS.contains(&c) { ' ' } else { c })
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        None
    } else {
        Some(format!("{cleaned}*"))
    }
}

fn push_listing_source(qb: &mut QueryBuilder<'static, MySql>, fullname: &str) {
    qb.push(FROM_USERS_WITH_ROLE);
    if let Some(term) = search_term(fullname) {
        qb.push(" WHERE MATCH (u.first_name, u.last_name) AGAINST (");
        qb.push_bind(term);
        qb.push(" IN BOOLEAN MODE)");
    }
}

/// Builds the listing query. Every user supplied value is a bound parameter.
pub(crate) fn build_users_page_query(
    req: &ReadUsersWithPaginationReq,
) -> QueryBuilder<'static, MySql> {
    let mut qb = QueryBuilder::new(SELECT_USERS_WITH_PAGINATION);
    push_listing_source(&mut qb, &req.fullname);
    qb.push(" ORDER BY u.id");
    qb.push(" LIMIT ").push_bind(req.limit);
    qb.push(" OFFSET ").push_bind(req.offset);
    qb
}

pub(crate) fn build_users_count_query(fullname: &str) -> QueryBuilder<'static, MySql> {
    let mut qb = QueryBuilder::new(SELECT_COUNT_USERS_WITH_PAGINATION);
    push_listing_source(&mut qb, fullname);
    qb
}

pub(crate) fn assemble_page(rows: Vec<UserWithRoleRow>) -> ReadUsersWithPaginationResp {
    let mut resp = ReadUsersWithPaginationResp::default();
    for row in rows {
        resp.per_page += row.per_page;
        resp.users.push(row.into());
    }
    resp
}

#[async_trait]
impl UsersRepository for MySqlUsersRepository {
    async fn create_users(&self, user: &User) -> Result<(), RepoError> {
        let res = sqlx::query(INSERT_USERS)
            .bind(&user.uid)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(user.birthdate)
            .bind(&user.username)
            .bind(&user.password)
            .bind(&user.created_by)
            .bind(&user.updated_by)
            .execute(&self.db)
            .await;

        match res {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate(&e) => {
                debug!(uid = %user.uid, "user already exists; insert skipped");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_authz(&self, user_uid: &str, role: Role) -> Result<(), RepoError> {
        let res = sqlx::query(INSERT_AUTHZ)
            .bind(role.name())
            .bind(user_uid)
            .execute(&self.db)
            .await;

        match res {
            Ok(done) if done.rows_affected() == 0 => {
                debug!(%user_uid, role = role.name(), "no user or role to bind");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) if is_duplicate(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_user_by_email(&self, email: &str) -> Result<Session, RepoError> {
        sqlx::query_as::<_, Session>(SELECT_BY_EMAIL)
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => RepoError::NotFound,
                other => other.into(),
            })
    }

    async fn read_users_with_pagination(
        &self,
        req: &ReadUsersWithPaginationReq,
    ) -> Result<ReadUsersWithPaginationResp, RepoError> {
        let mut qb = build_users_page_query(req);
        let rows = match qb
            .build_query_as::<UserWithRoleRow>()
            .fetch_all(&self.db)
            .await
        {
            Ok(rows) => rows,
            Err(sqlx::Error::RowNotFound) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(assemble_page(rows))
    }

    async fn count_users(&self, req: CountUsersReq) -> Result<CountUsersResp, RepoError> {
        let total = match sqlx::query_scalar::<_, i64>(SELECT_COUNT_USERS)
            .bind(req.is_deleted.as_i8())
            .fetch_one(&self.db)
            .await
        {
            Ok(total) => total,
            Err(sqlx::Error::RowNotFound) => 0,
            Err(e) => return Err(e.into()),
        };
        Ok(CountUsersResp { total })
    }

    async fn count_users_with_pagination(
        &self,
        fullname: &str,
    ) -> Result<CountUsersResp, RepoError> {
        let mut qb = build_users_count_query(fullname);
        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.db)
            .await?;
        Ok(CountUsersResp { total })
    }
}
