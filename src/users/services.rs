use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    error::{AppError, AppResult, RepoError},
    state::AppState,
    users::{
        dto::{CreateUsersReq, GetUsersWithPaginationReq, GetUsersWithPaginationResp, LoginReq, LoginResp},
        repo_types::{ReadUsersWithPaginationReq, User},
    },
};

const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn parse_birthdate(raw: &str) -> AppResult<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::Validation("birthdate must be formatted as YYYY-MM-DD".into()))
}

fn validate(req: &CreateUsersReq, email: &str) -> AppResult<()> {
    for (field, value) in [
        ("first_name", &req.first_name),
        ("last_name", &req.last_name),
        ("username", &req.username),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{field} is required")));
        }
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation("invalid email".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation("password too short".into()));
    }
    Ok(())
}

/// Registers a user and binds its role. Returns the new user's UID.
pub async fn create_users(st: &AppState, req: CreateUsersReq) -> AppResult<String> {
    let email = normalize_email(&req.email);
    validate(&req, &email)?;
    let birthdate = parse_birthdate(&req.birthdate)?;

    let password =
        hash_password(&req.password).map_err(|e| AppError::Internal(e.to_string()))?;

    let uid = Uuid::new_v4().to_string();
    let user = User {
        uid: uid.clone(),
        first_name: req.first_name.trim().to_string(),
        last_name: req.last_name.trim().to_string(),
        email,
        birthdate,
        username: req.username.trim().to_string(),
        password,
        created_by: uid.clone(),
        updated_by: uid.clone(),
    };

    st.users.create_users(&user).await?;
    st.users.create_authz(&uid, req.role).await?;

    info!(user_uid = %uid, role = req.role.name(), "user registered");
    Ok(uid)
}

/// Checks credentials, opens a session marker and issues an access token.
pub async fn login(st: &AppState, req: LoginReq) -> AppResult<LoginResp> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(AppError::Validation("invalid email".into()));
    }

    let session = match st.users.read_user_by_email(&email).await {
        Ok(s) => s,
        Err(RepoError::NotFound) => {
            warn!(%email, "login unknown email");
            return Err(AppError::Unauthorized("invalid credentials".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let ok = verify_password(&req.password, &session.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !ok {
        warn!(user_uid = %session.user_uid, "login invalid password");
        return Err(AppError::Unauthorized("invalid credentials".into()));
    }

    let keys = JwtKeys::from(&st.config.jwt);
    let access_token = keys
        .sign(&session.user_uid, &session.role_uid)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    st.sessions.create_session(&session.user_uid).await?;

    info!(user_uid = %session.user_uid, "user logged in");
    Ok(LoginResp {
        access_token,
        user_uid: session.user_uid,
        role_uid: session.role_uid,
    })
}

pub async fn logout(st: &AppState, user_uid: &str) -> AppResult<()> {
    st.sessions.delete_session(user_uid).await?;
    info!(%user_uid, "user logged out");
    Ok(())
}

pub async fn get_users_with_pagination(
    st: &AppState,
    req: GetUsersWithPaginationReq,
) -> AppResult<GetUsersWithPaginationResp> {
    let page = st
        .users
        .read_users_with_pagination(&ReadUsersWithPaginationReq {
            fullname: req.fullname.clone(),
            limit: req.limit,
            offset: req.offset(),
        })
        .await?;

    let count = st
        .users
        .count_users_with_pagination(&req.fullname)
        .await?;

    Ok(GetUsersWithPaginationResp {
        users: page.users,
        per_page: page.per_page,
        total: count.total,
        total_page: total_pages(count.total, req.limit),
        page: req.page,
        limit: req.limit,
    })
}

fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 || total <= 0 {
        return 0;
    }
    total / limit + i64::from(total % limit != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::Role;

    fn register_req(email: &str, first: &str, last: &str) -> CreateUsersReq {
        CreateUsersReq {
            first_name: first.into(),
            last_name: last.into(),
            email: email.into(),
            birthdate: "1990-04-02".into(),
            username: format!("{first}{last}").to_lowercase(),
            password: "password123".into(),
            role: Role::Mentee,
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no at sign"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(3, 0), 0);
        assert_eq!(total_pages(3, i64::MAX), 1);
        assert_eq!(total_pages(i64::MAX, 1), i64::MAX);
        assert_eq!(total_pages(i64::MAX, 2), i64::MAX / 2 + 1);
    }

    #[test]
    fn birthdate_must_be_iso() {
        assert!(parse_birthdate("1990-04-02").is_ok());
        assert!(matches!(
            parse_birthdate("02/04/1990"),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let st = AppState::fake();
        let mut req = register_req("bad-email", "John", "Doe");
        assert!(matches!(create_users(&st, req).await, Err(AppError::Validation(_))));

        req = register_req("john@x.com", "John", "Doe");
        req.password = "short".into();
        assert!(matches!(create_users(&st, req).await, Err(AppError::Validation(_))));

        req = register_req("john@x.com", " ", "Doe");
        assert!(matches!(create_users(&st, req).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn register_then_read_by_email_returns_stored_hash() {
        let st = AppState::fake();
        let uid = create_users(&st, register_req(" John@X.com ", "John", "Doe"))
            .await
            .unwrap();

        let session = st.users.read_user_by_email("john@x.com").await.unwrap();
        assert_eq!(session.user_uid, uid);
        assert!(verify_password("password123", &session.password).unwrap());
    }

    #[tokio::test]
    async fn duplicate_registration_succeeds_silently() {
        let st = AppState::fake();
        let first = create_users(&st, register_req("a@x.com", "John", "Doe"))
            .await
            .unwrap();
        create_users(&st, register_req("a@x.com", "John", "Doe"))
            .await
            .unwrap();

        let session = st.users.read_user_by_email("a@x.com").await.unwrap();
        assert_eq!(session.user_uid, first);
    }

    #[tokio::test]
    async fn login_opens_and_logout_closes_session() {
        let st = AppState::fake();
        create_users(&st, register_req("a@x.com", "John", "Doe"))
            .await
            .unwrap();

        let resp = login(
            &st,
            LoginReq {
                email: "a@x.com".into(),
                password: "password123".into(),
            },
        )
        .await
        .unwrap();
        assert!(st.sessions.session_exists(&resp.user_uid).await.unwrap());

        let claims = JwtKeys::from(&st.config.jwt)
            .verify(&resp.access_token)
            .unwrap();
        assert_eq!(claims.sub, resp.user_uid);
        assert_eq!(claims.role_uid, resp.role_uid);

        logout(&st, &resp.user_uid).await.unwrap();
        assert!(!st.sessions.session_exists(&resp.user_uid).await.unwrap());
        logout(&st, &resp.user_uid).await.unwrap();
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let st = AppState::fake();
        create_users(&st, register_req("a@x.com", "John", "Doe"))
            .await
            .unwrap();

        let wrong = login(
            &st,
            LoginReq {
                email: "a@x.com".into(),
                password: "nope-nope".into(),
            },
        )
        .await;
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

        let unknown = login(
            &st,
            LoginReq {
                email: "missing@x.com".into(),
                password: "password123".into(),
            },
        )
        .await;
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn listing_reports_per_page_and_total() {
        let st = AppState::fake();
        for (email, first, last) in [
            ("john@x.com", "John", "Doe"),
            ("amy@x.com", "Amy", "Smith"),
            ("jo@x.com", "Joanna", "Park"),
        ] {
            create_users(&st, register_req(email, first, last))
                .await
                .unwrap();
        }

        let resp = get_users_with_pagination(
            &st,
            GetUsersWithPaginationReq {
                fullname: String::new(),
                limit: 2,
                page: 1,
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.users.len(), 2);
        assert_eq!(resp.per_page, 2);
        assert_eq!(resp.total, 3);
        assert_eq!(resp.total_page, 2);

        let resp = get_users_with_pagination(
            &st,
            GetUsersWithPaginationReq {
                fullname: "Jo".into(),
                limit: 10,
                page: 1,
            },
        )
        .await
        .unwrap();
        assert!(resp.users.iter().all(|u| u.first_name.starts_with("Jo")));
        assert!(!resp.users.iter().any(|u| u.first_name == "Amy"));
        assert_eq!(resp.total, 2);
        assert_eq!(resp.total_page, 1);
    }

    #[tokio::test]
    async fn name_filter_narrows_total() {
        let st = AppState::fake();
        for (email, first, last) in [
            ("john@x.com", "John", "Doe"),
            ("amy@x.com", "Amy", "Smith"),
            ("bob@x.com", "Bob", "Brown"),
        ] {
            create_users(&st, register_req(email, first, last))
                .await
                .unwrap();
        }

        let resp = get_users_with_pagination(
            &st,
            GetUsersWithPaginationReq {
                fullname: "Jo".into(),
                limit: 1,
                page: 1,
            },
        )
        .await
        .unwrap();
        assert_eq!(resp.users.len(), 1);
        assert_eq!(resp.total, 1);
        assert_eq!(resp.total_page, 1);

        let resp = get_users_with_pagination(
            &st,
            GetUsersWithPaginationReq {
                fullname: "Zed".into(),
                limit: 1,
                page: 1,
            },
        )
        .await
        .unwrap();
        assert!(resp.users.is_empty());
        assert_eq!(resp.total, 0);
        assert_eq!(resp.total_page, 0);
    }
}
