use actix_web::{HttpRequest, HttpResponse, web};

use crate::auth::rate_limit::RateLimiter;
use crate::auth::token::TokenKeys;
use crate::auth::{password, validate};
use crate::db::DbPool;
use crate::dto::{AuthResponse, LoginRequest, SignupRequest, UserDto};
use crate::errors::{AppError, is_unique_violation};
use crate::models::user::{self, NewUser, Role, User};

const BAD_CREDENTIALS: &str = "Invalid email or password";

fn client_ip(req: &HttpRequest) -> std::net::IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED))
}

fn auth_response(keys: &TokenKeys, user: User) -> Result<HttpResponse, AppError> {
    let token = keys.issue(user.id, &user.email)?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        user: UserDto::from(user),
    }))
}

/// POST /api/auth/login
pub async fn login(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    keys: web::Data<TokenKeys>,
    limiter: web::Data<RateLimiter>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    // Rate-limit check BEFORE any database access
    let ip = client_ip(&req);
    if limiter.is_blocked(ip) {
        log::warn!("Login blocked for {ip}: too many failures");
        return Err(AppError::RateLimited);
    }

    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::Validation("Email and password are required".to_string()));
    }

    let found = user::find_by_email(&pool, &body.email).await?;
    let verified = match &found {
        Some(u) => password::verify_password(&body.password, &u.password)?,
        None => false,
    };

    match found {
        Some(u) if verified => {
            limiter.clear(ip);
            log::info!("User {} logged in", u.id);
            auth_response(&keys, u)
        }
        _ => {
            limiter.record_failure(ip);
            Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()))
        }
    }
}

/// POST /api/auth/signup
///
/// The role comes from `Role::hint_for_email`: any address containing
/// "admin" is granted ADMIN. This is a known trust gap kept for
/// compatibility with existing clients, since anyone can sign up with such
/// an address. Deployments that need a closed admin set should seed the
/// admin account through `ADMIN_EMAIL`/`ADMIN_PASSWORD` and keep signup
/// unreachable from untrusted networks.
pub async fn signup(
    pool: web::Data<DbPool>,
    keys: web::Data<TokenKeys>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    let errors: Vec<String> = [
        validate::validate_name(&body.name),
        validate::validate_email(&body.email),
        validate::validate_password(&body.password),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors.join("; ")));
    }

    if user::email_exists(&pool, &body.email).await? {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let new_user = NewUser {
        name: body.name.trim().to_string(),
        email: body.email.trim().to_string(),
        password: password::hash_password(&body.password)?,
        role: Role::hint_for_email(&body.email),
    };
    let id = match user::create(&pool, &new_user).await {
        Ok(id) => id,
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    log::info!("Created {} account {} for {}", new_user.role, id, new_user.email);

    let created = user::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    auth_response(&keys, created)
}
