use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::auth::token::Claims;
use crate::auth::validate;
use crate::db::DbPool;
use crate::dto::{CreatePollRequest, PollDto, UpdatePollRequest, VoteRequest};
use crate::errors::AppError;
use crate::models::poll::{self, NewPoll, PollChanges};
use crate::models::user::{self, User};

/// Load the caller's account. Roles come from the database, not the token.
async fn current_user(pool: &DbPool, claims: &Claims) -> Result<User, AppError> {
    let id = claims
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Invalid token subject".to_string()))?;
    user::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))
}

fn require_admin(user: &User, action: &str) -> Result<(), AppError> {
    if user.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(format!("Only admins can {action} polls")))
    }
}

async fn poll_for(pool: &DbPool, poll_id: i64, viewer: &User) -> Result<PollDto, AppError> {
    let view = poll::find_for_viewer(pool, poll_id, viewer.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Poll".to_string()))?;
    Ok(PollDto::from_view(view, Utc::now()))
}

/// Trimmed question and options, or a 400 listing every problem.
fn clean_poll_input(question: &str, options: &[String]) -> Result<(String, Vec<String>), AppError> {
    let mut errors = Vec::new();
    errors.extend(validate::validate_question(question));
    let options = match validate::clean_options(options) {
        Ok(options) => options,
        Err(e) => {
            errors.push(e);
            Vec::new()
        }
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors.join("; ")));
    }
    Ok((question.trim().to_string(), options))
}

/// GET /api/polls
pub async fn list(
    pool: web::Data<DbPool>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let viewer = current_user(&pool, &claims).await?;
    let now = Utc::now();
    let polls: Vec<PollDto> = poll::list_for_viewer(&pool, viewer.id)
        .await?
        .into_iter()
        .map(|view| PollDto::from_view(view, now))
        .collect();
    Ok(HttpResponse::Ok().json(polls))
}

/// GET /api/polls/{id}
pub async fn read(
    pool: web::Data<DbPool>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let viewer = current_user(&pool, &claims).await?;
    let dto = poll_for(&pool, path.into_inner(), &viewer).await?;
    Ok(HttpResponse::Ok().json(dto))
}

/// POST /api/polls
pub async fn create(
    pool: web::Data<DbPool>,
    claims: web::ReqData<Claims>,
    body: web::Json<CreatePollRequest>,
) -> Result<HttpResponse, AppError> {
    let admin = current_user(&pool, &claims).await?;
    require_admin(&admin, "create")?;

    let (question, options) = clean_poll_input(&body.question, &body.options)?;
    if let Some(e) = validate::validate_closes_at(body.closes_at, Utc::now()) {
        return Err(AppError::Validation(e));
    }

    let new_poll = NewPoll {
        question,
        options,
        closes_at: body.closes_at,
        created_by: admin.id,
    };
    let poll_id = poll::create(&pool, &new_poll).await?;
    log::info!("Poll {poll_id} created by user {}", admin.id);

    let dto = poll_for(&pool, poll_id, &admin).await?;
    Ok(HttpResponse::Created().json(dto))
}

/// PUT /api/polls/{id}
pub async fn update(
    pool: web::Data<DbPool>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: web::Json<UpdatePollRequest>,
) -> Result<HttpResponse, AppError> {
    let admin = current_user(&pool, &claims).await?;
    require_admin(&admin, "update")?;

    let poll_id = path.into_inner();
    let (question, options) = clean_poll_input(&body.question, &body.options)?;
    if let Some(e) = body
        .closes_at
        .and_then(|closes_at| validate::validate_closes_at(closes_at, Utc::now()))
    {
        return Err(AppError::Validation(e));
    }

    let changes = PollChanges {
        question,
        options,
        closes_at: body.closes_at,
    };
    poll::update(&pool, poll_id, &changes).await?;
    log::info!("Poll {poll_id} updated by user {}", admin.id);

    let dto = poll_for(&pool, poll_id, &admin).await?;
    Ok(HttpResponse::Ok().json(dto))
}

/// POST /api/polls/{id}/close
pub async fn close(
    pool: web::Data<DbPool>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let admin = current_user(&pool, &claims).await?;
    require_admin(&admin, "close")?;

    let poll_id = path.into_inner();
    if !poll::close(&pool, poll_id).await? {
        return Err(AppError::NotFound("Poll".to_string()));
    }
    log::info!("Poll {poll_id} closed by user {}", admin.id);

    let dto = poll_for(&pool, poll_id, &admin).await?;
    Ok(HttpResponse::Ok().json(dto))
}

/// POST /api/polls/{id}/vote
pub async fn vote(
    pool: web::Data<DbPool>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
    body: web::Json<VoteRequest>,
) -> Result<HttpResponse, AppError> {
    let voter = current_user(&pool, &claims).await?;
    let poll_id = path.into_inner();

    poll::cast_vote(&pool, poll_id, body.option_id, voter.id, Utc::now()).await?;
    log::debug!("User {} voted for option {} in poll {poll_id}", voter.id, body.option_id);

    let dto = poll_for(&pool, poll_id, &voter).await?;
    Ok(HttpResponse::Ok().json(dto))
}

/// DELETE /api/polls/{id}
pub async fn delete(
    pool: web::Data<DbPool>,
    claims: web::ReqData<Claims>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let admin = current_user(&pool, &claims).await?;
    require_admin(&admin, "delete")?;

    let poll_id = path.into_inner();
    if !poll::delete(&pool, poll_id).await? {
        return Err(AppError::NotFound("Poll".to_string()));
    }
    log::info!("Poll {poll_id} deleted by user {}", admin.id);

    Ok(HttpResponse::NoContent().finish())
}
