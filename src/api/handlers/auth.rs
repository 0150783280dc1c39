//! Authentication and profile handlers.

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::ApiResponse;
use crate::api::handlers::forms;
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{FieldError, Result};
use crate::models::user::User;
use crate::services::auth_service::{AuthService, ProfileUpdate};

#[derive(OpenApi)]
#[openapi(
    paths(register, login, get_profile, update_profile, delete_profile),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        UpdateProfileRequest,
        UserResponse,
        SessionData,
        ProfileData,
    ))
)]
pub struct AuthApiDoc;

/// Routes that require no token.
pub fn public_router() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes scoped to the authenticated caller.
pub fn protected_router() -> Router<SharedState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/profile", put(update_profile))
        .route("/profile", delete(delete_profile))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "passwordConfirmation")]
    pub password_confirmation: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "currentPassword")]
    pub current_password: Option<String>,
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
    #[serde(rename = "confirmNewPassword")]
    pub confirm_new_password: Option<String>,
}

/// User as exposed on the wire; the password hash never leaves the row.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Token plus user, returned by register and login.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionData {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileData {
    pub user: UserResponse,
}

fn auth_service(state: &SharedState) -> AuthService {
    AuthService::new(state.db.clone(), Arc::new(state.config.clone()))
}

/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/register",
    context_path = "/api/auth",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = SessionData),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email is already registered"),
    ),
)]
pub async fn register(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionData>>)> {
    let mut errors = Vec::new();
    let username = forms::require_str(payload.username.as_deref(), "username", 3, &mut errors);
    let email = forms::require_email(payload.email.as_deref(), "email", &mut errors);
    let password = forms::require_str(payload.password.as_deref(), "password", 8, &mut errors);
    match (&password, &payload.password_confirmation) {
        (Some(password), Some(confirmation)) if password != confirmation => {
            errors.push(FieldError::new(
                "passwordConfirmation",
                "passwordConfirmation does not match password",
            ));
        }
        (Some(_), None) => {
            errors.push(FieldError::new(
                "passwordConfirmation",
                "passwordConfirmation is required",
            ));
        }
        _ => {}
    }
    forms::finish(errors)?;

    let (user, token) = auth_service(&state)
        .register(
            &username.unwrap_or_default(),
            &email.unwrap_or_default(),
            &password.unwrap_or_default(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Registration successful",
            SessionData {
                token,
                user: user.into(),
            },
        )),
    ))
}

/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/login",
    context_path = "/api/auth",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = SessionData),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Invalid email or password"),
    ),
)]
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionData>>> {
    let mut errors = Vec::new();
    let email = forms::require_email(payload.email.as_deref(), "email", &mut errors);
    let password = forms::require_str(payload.password.as_deref(), "password", 1, &mut errors);
    forms::finish(errors)?;

    let (user, token) = auth_service(&state)
        .login(&email.unwrap_or_default(), &password.unwrap_or_default())
        .await?;

    Ok(Json(ApiResponse::with_message(
        "Login successful",
        SessionData {
            token,
            user: user.into(),
        },
    )))
}

/// GET /api/auth/profile
#[utoipa::path(
    get,
    path = "/profile",
    context_path = "/api/auth",
    tag = "auth",
    responses(
        (status = 200, description = "The caller's profile", body = ProfileData),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_profile(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<ApiResponse<ProfileData>>> {
    let user = auth_service(&state).profile(auth.user_id).await?;
    Ok(Json(ApiResponse::ok(ProfileData { user: user.into() })))
}

/// PUT /api/auth/profile (presence-aware)
#[utoipa::path(
    put,
    path = "/profile",
    context_path = "/api/auth",
    tag = "auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileData),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Current password is incorrect"),
        (status = 409, description = "Email is already registered"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn update_profile(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileData>>> {
    let mut errors = Vec::new();
    let username = forms::optional_str(payload.username.as_deref(), "username", 3, &mut errors);
    let email = forms::optional_email(payload.email.as_deref(), "email", &mut errors);
    let new_password =
        forms::optional_str(payload.new_password.as_deref(), "newPassword", 8, &mut errors);
    if let Some(new_password) = &new_password {
        let current_present = payload
            .current_password
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .is_some();
        if !current_present {
            errors.push(FieldError::new(
                "currentPassword",
                "currentPassword is required to change the password",
            ));
        }
        if payload.confirm_new_password.as_deref() != Some(new_password.as_str()) {
            errors.push(FieldError::new(
                "confirmNewPassword",
                "confirmNewPassword does not match newPassword",
            ));
        }
    }
    forms::finish(errors)?;

    let update = ProfileUpdate {
        username,
        email,
        current_password: payload.current_password,
        new_password,
    };

    let user = auth_service(&state)
        .update_profile(auth.user_id, update)
        .await?;
    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        ProfileData { user: user.into() },
    )))
}

/// DELETE /api/auth/profile
#[utoipa::path(
    delete,
    path = "/profile",
    context_path = "/api/auth",
    tag = "auth",
    responses(
        (status = 200, description = "Account deleted"),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn delete_profile(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<ApiResponse<()>>> {
    auth_service(&state).delete_account(auth.user_id).await?;
    Ok(Json(ApiResponse::message_only(
        "Account deleted successfully",
    )))
}
