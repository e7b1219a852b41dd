//! Administrative user handlers.
//!
//! Every handler runs its directory call through the action envelope, so
//! each request leaves exactly one audit entry behind.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::extractors::{ClientContext, ValidatedJson};
use crate::api::middleware::CurrentAdmin;
use crate::api::AppState;
use crate::config::{
    ACTION_CREATE_USER, ACTION_DELETE_USER, ACTION_SEARCH_USERS, ACTION_UPDATE_USER,
    ACTION_UPDATE_USER_STATUS, ACTION_VIEW_USER, ACTION_VIEW_USERNAME_AVAILABILITY,
    ACTION_VIEW_USERS, ACTION_VIEW_USER_ANALYTICS, RESOURCE_USER,
};
use crate::domain::{CreateUser, UserCounts, UserResponse, UserUpdate};
use crate::errors::ActionFailure;
use crate::services::{AdminAction, Summary};
use crate::types::{MessageResponse, PaginationParams, UserPage};

type ActionResult<T> = Result<T, ActionFailure>;

/// Optional role filter for listings
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoleFilter {
    /// CUSTOMER, ARTIST, ADMIN or STAFF
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring
    #[serde(default)]
    pub term: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    #[serde(default)]
    pub username: String,
}

/// Username availability across every role
#[derive(Debug, Serialize, ToSchema)]
pub struct Availability {
    #[schema(example = "jdoe")]
    pub username: String,
    pub available: bool,
}

/// Enable or disable an account
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StatusUpdate {
    pub enabled: bool,
}

/// Create administrative user routes
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/search", get(search_users))
        .route("/users/availability", get(username_availability))
        .route("/users/counts", get(user_counts))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/status", put(update_user_status))
        .route("/roles/:role/users/:id", delete(delete_user_in_role))
}

fn user_action(admin: &CurrentAdmin, action: &'static str, ctx: ClientContext) -> AdminAction {
    AdminAction::new(admin.username.clone(), action, RESOURCE_USER, ctx.0)
}

/// Create an account of any role
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "Users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 422, description = "Username or email already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    ValidatedJson(payload): ValidatedJson<CreateUser>,
) -> ActionResult<(StatusCode, Json<UserResponse>)> {
    let action = user_action(&admin, ACTION_CREATE_USER, ctx);

    let account = state
        .envelope
        .run(action, state.directory.create_user(payload), |account| {
            Summary::new(format!(
                "Created user: {} with role: {}",
                account.username,
                account.role()
            ))
            .with_resource(account.id)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(account))))
}

/// List accounts across every role, or one role
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Users",
    params(PaginationParams, RoleFilter),
    responses(
        (status = 200, description = "One page of accounts", body = UserPage),
        (status = 400, description = "Invalid page or role")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<RoleFilter>,
) -> ActionResult<Json<UserPage>> {
    let action = user_action(&admin, ACTION_VIEW_USERS, ctx);

    let page = state
        .envelope
        .run(
            action,
            state
                .directory
                .get_all_users(params.page, params.size, filter.role.as_deref()),
            |_| Summary::new(format!("Viewed users page {}", params.page)),
        )
        .await?;

    Ok(Json(page.map(UserResponse::from)))
}

/// Search accounts by username, email, names or artist name
#[utoipa::path(
    get,
    path = "/api/admin/users/search",
    tag = "Users",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching accounts", body = Vec<UserResponse>),
        (status = 400, description = "Missing search term")
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_users(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Query(query): Query<SearchQuery>,
) -> ActionResult<Json<Vec<UserResponse>>> {
    let action = user_action(&admin, ACTION_SEARCH_USERS, ctx);

    let accounts = state
        .envelope
        .run(action, state.directory.search_users(&query.term), |_| {
            Summary::new(format!("Searched users for: {}", query.term))
        })
        .await?;

    Ok(Json(accounts.into_iter().map(UserResponse::from).collect()))
}

/// Check whether a username is free in every role
#[utoipa::path(
    get,
    path = "/api/admin/users/availability",
    tag = "Users",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Availability result", body = Availability)
    ),
    security(("bearer_auth" = []))
)]
pub async fn username_availability(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Query(query): Query<AvailabilityQuery>,
) -> ActionResult<Json<Availability>> {
    let action = user_action(&admin, ACTION_VIEW_USERNAME_AVAILABILITY, ctx);
    let directory = state.directory.clone();
    let username = query.username;

    let available = state
        .envelope
        .run(
            action,
            async { Ok(directory.is_username_available(&username).await) },
            |_| Summary::new(format!("Checked username availability: {}", username)),
        )
        .await?;

    Ok(Json(Availability {
        username,
        available,
    }))
}

/// Account totals per role
#[utoipa::path(
    get,
    path = "/api/admin/users/counts",
    tag = "Users",
    responses(
        (status = 200, description = "Counts per role", body = UserCounts)
    ),
    security(("bearer_auth" = []))
)]
pub async fn user_counts(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
) -> ActionResult<Json<UserCounts>> {
    let action = user_action(&admin, ACTION_VIEW_USER_ANALYTICS, ctx);

    let counts = state
        .envelope
        .run(action, state.directory.user_counts(), |counts| {
            Summary::new(format!("Viewed user counts: {} total", counts.total))
        })
        .await?;

    Ok(Json(counts))
}

/// Get an account by id
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account found", body = UserResponse),
        (status = 400, description = "No account with this id")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Path(id): Path<i64>,
) -> ActionResult<Json<UserResponse>> {
    let action = user_action(&admin, ACTION_VIEW_USER, ctx).on(id);

    let account = state
        .envelope
        .run(action, state.directory.get_user_by_id(id), |_| {
            Summary::new(format!("Viewed user {}", id))
        })
        .await?;

    Ok(Json(UserResponse::from(account)))
}

/// Partially update an account
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "Account id")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 400, description = "Validation error or unknown id")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<UserUpdate>,
) -> ActionResult<Json<UserResponse>> {
    let action = user_action(&admin, ACTION_UPDATE_USER, ctx).on(id);

    let account = state
        .envelope
        .run(action, state.directory.update_user(id, payload), |_| {
            Summary::new("Updated user information")
        })
        .await?;

    Ok(Json(UserResponse::from(account)))
}

/// Enable or disable an account
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/status",
    tag = "Users",
    params(("id" = i64, Path, description = "Account id")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status changed", body = UserResponse),
        (status = 400, description = "Unknown id")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<StatusUpdate>,
) -> ActionResult<Json<UserResponse>> {
    let action = user_action(&admin, ACTION_UPDATE_USER_STATUS, ctx).on(id);
    let enabled = payload.enabled;

    let account = state
        .envelope
        .run(
            action,
            state.directory.update_user_status(id, enabled),
            |_| {
                Summary::new(format!(
                    "Changed user status to: {}",
                    if enabled { "ENABLED" } else { "DISABLED" }
                ))
            },
        )
        .await?;

    Ok(Json(UserResponse::from(account)))
}

/// Delete an account, resolving its role by id
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 400, description = "Unknown id"),
        (status = 422, description = "Deletion not allowed for this role")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Path(id): Path<i64>,
) -> ActionResult<Json<MessageResponse>> {
    let action = user_action(&admin, ACTION_DELETE_USER, ctx).on(id);

    let role = state
        .envelope
        .run(action, state.directory.delete_user(id), |_| {
            Summary::new("Deleted user account")
        })
        .await?;

    Ok(Json(MessageResponse::new(format!(
        "Deleted {} account {}",
        role, id
    ))))
}

/// Delete an account in a known role
#[utoipa::path(
    delete,
    path = "/api/admin/roles/{role}/users/{id}",
    tag = "Users",
    params(
        ("role" = String, Path, description = "CUSTOMER, ARTIST, ADMIN or STAFF"),
        ("id" = i64, Path, description = "Account id")
    ),
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 404, description = "No such account in this role"),
        (status = 422, description = "Deletion not allowed for this role")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user_in_role(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    ctx: ClientContext,
    Path((role, id)): Path<(String, i64)>,
) -> ActionResult<Json<MessageResponse>> {
    let action = user_action(&admin, ACTION_DELETE_USER, ctx).on(id);

    state
        .envelope
        .run(action, state.directory.delete_user_in_role(id, &role), |_| {
            Summary::new("Deleted user account")
        })
        .await?;

    Ok(Json(MessageResponse::new(format!(
        "Deleted {} account {}",
        role.to_ascii_uppercase(),
        id
    ))))
}
