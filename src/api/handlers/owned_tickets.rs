//! Owned ticket handlers.
//!
//! Owned tickets are the redeemable instances produced by a purchase.
//! Every route is scoped to the authenticated caller; another user's
//! tickets are invisible. Redemption is the one-way `/use` transition.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::ApiResponse;
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{FieldError, Result};
use crate::models::transaction::{OwnedTicket, UsageStatus};
use crate::services::owned_ticket_service::{OwnedTicketDetails, OwnedTicketService};

#[derive(OpenApi)]
#[openapi(
    paths(list_owned_tickets, get_owned_ticket, create_owned_ticket, use_owned_ticket),
    components(schemas(
        CreateOwnedTicketRequest,
        OwnedTicketResponse,
        OwnedTicketDetailResponse,
        OwnedTicketTicketResponse,
        OwnedTicketTempleResponse,
        OwnedTicketTransactionResponse,
        OwnedTicketData,
        OwnedTicketDetailData,
        OwnedTicketDetailListData,
    ))
)]
pub struct OwnedTicketsApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_owned_tickets))
        .route("/", post(create_owned_ticket))
        .route("/:id", get(get_owned_ticket))
        .route("/:id/use", put(use_owned_ticket))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOwnedTicketRequest {
    #[serde(rename = "ticketID")]
    pub ticket_id: Option<Uuid>,
    #[serde(rename = "transactionID")]
    pub transaction_id: Option<Uuid>,
}

/// Bare owned ticket row, as returned by purchase and manual issuance.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnedTicketResponse {
    #[serde(rename = "ownedTicketID")]
    pub owned_ticket_id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(rename = "ticketID")]
    pub ticket_id: Uuid,
    #[serde(rename = "transactionID")]
    pub transaction_id: Uuid,
    pub unique_code: String,
    pub usage_status: UsageStatus,
    pub created_at: DateTime<Utc>,
}

impl From<OwnedTicket> for OwnedTicketResponse {
    fn from(row: OwnedTicket) -> Self {
        Self {
            owned_ticket_id: row.id,
            user_id: row.user_id,
            ticket_id: row.ticket_id,
            transaction_id: row.transaction_id,
            unique_code: row.unique_code,
            usage_status: row.usage_status,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnedTicketTempleResponse {
    pub title: String,
    pub location_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnedTicketTicketResponse {
    pub price: Decimal,
    pub description: String,
    pub temple: OwnedTicketTempleResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnedTicketTransactionResponse {
    #[serde(rename = "transactionID")]
    pub transaction_id: Uuid,
    pub valid_date: NaiveDate,
    pub total_price: Decimal,
    pub transaction_date: DateTime<Utc>,
    pub status: String,
}

/// Owned ticket joined with its ticket, temple and transaction summary.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OwnedTicketDetailResponse {
    #[serde(rename = "ownedTicketID")]
    pub owned_ticket_id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(rename = "ticketID")]
    pub ticket_id: Uuid,
    #[serde(rename = "transactionID")]
    pub transaction_id: Uuid,
    pub unique_code: String,
    pub usage_status: UsageStatus,
    pub created_at: DateTime<Utc>,
    pub ticket: OwnedTicketTicketResponse,
    pub transaction: OwnedTicketTransactionResponse,
}

impl From<OwnedTicketDetails> for OwnedTicketDetailResponse {
    fn from(row: OwnedTicketDetails) -> Self {
        Self {
            owned_ticket_id: row.id,
            user_id: row.user_id,
            ticket_id: row.ticket_id,
            transaction_id: row.transaction_id,
            unique_code: row.unique_code,
            usage_status: row.usage_status,
            created_at: row.created_at,
            ticket: OwnedTicketTicketResponse {
                price: row.ticket_price,
                description: row.ticket_description,
                temple: OwnedTicketTempleResponse {
                    title: row.temple_title,
                    location_url: row.temple_location_url,
                },
            },
            transaction: OwnedTicketTransactionResponse {
                transaction_id: row.transaction_id,
                valid_date: row.valid_date,
                total_price: row.total_price,
                transaction_date: row.transaction_date,
                status: row.status,
            },
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnedTicketData {
    #[serde(rename = "ownedTicket")]
    pub owned_ticket: OwnedTicketResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnedTicketDetailData {
    #[serde(rename = "ownedTicket")]
    pub owned_ticket: OwnedTicketDetailResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OwnedTicketDetailListData {
    #[serde(rename = "ownedTickets")]
    pub owned_tickets: Vec<OwnedTicketDetailResponse>,
}

/// GET /api/owned-tickets
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/owned-tickets",
    tag = "owned-tickets",
    responses(
        (status = 200, description = "The caller's owned tickets, newest first", body = OwnedTicketDetailListData),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn list_owned_tickets(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<ApiResponse<OwnedTicketDetailListData>>> {
    let rows = OwnedTicketService::new(state.db.clone())
        .list_for_user(auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(OwnedTicketDetailListData {
        owned_tickets: rows.into_iter().map(Into::into).collect(),
    })))
}

/// GET /api/owned-tickets/:id
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/owned-tickets",
    tag = "owned-tickets",
    params(("id" = Uuid, Path, description = "Owned ticket id")),
    responses(
        (status = 200, description = "Owned ticket detail", body = OwnedTicketDetailData),
        (status = 404, description = "Owned ticket not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_owned_ticket(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OwnedTicketDetailData>>> {
    let row = OwnedTicketService::new(state.db.clone())
        .get_for_user(id, auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(OwnedTicketDetailData {
        owned_ticket: row.into(),
    })))
}

/// POST /api/owned-tickets
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/owned-tickets",
    tag = "owned-tickets",
    request_body = CreateOwnedTicketRequest,
    responses(
        (status = 201, description = "Owned ticket issued", body = OwnedTicketData),
        (status = 400, description = "Validation failed"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn create_owned_ticket(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<CreateOwnedTicketRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OwnedTicketData>>)> {
    let mut errors = Vec::new();
    if payload.ticket_id.is_none() {
        errors.push(FieldError::new("ticketID", "ticketID is required"));
    }
    if payload.transaction_id.is_none() {
        errors.push(FieldError::new("transactionID", "transactionID is required"));
    }
    if !errors.is_empty() {
        return Err(crate::error::AppError::Invalid(errors));
    }

    let row = OwnedTicketService::new(state.db.clone())
        .create(
            auth.user_id,
            payload.ticket_id.unwrap_or_default(),
            payload.transaction_id.unwrap_or_default(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Owned ticket created successfully",
            OwnedTicketData {
                owned_ticket: row.into(),
            },
        )),
    ))
}

/// PUT /api/owned-tickets/:id/use
#[utoipa::path(
    put,
    path = "/{id}/use",
    context_path = "/api/owned-tickets",
    tag = "owned-tickets",
    params(("id" = Uuid, Path, description = "Owned ticket id")),
    responses(
        (status = 200, description = "Ticket marked as used", body = OwnedTicketDetailData),
        (status = 404, description = "Owned ticket not found"),
        (status = 409, description = "Ticket has already been used"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn use_owned_ticket(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OwnedTicketDetailData>>> {
    let row = OwnedTicketService::new(state.db.clone())
        .redeem(id, auth.user_id)
        .await?;
    Ok(Json(ApiResponse::with_message(
        "Ticket usage status updated",
        OwnedTicketDetailData {
            owned_ticket: row.into(),
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_details(status: UsageStatus) -> OwnedTicketDetails {
        OwnedTicketDetails {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ticket_id: Uuid::new_v4(),
            transaction_id: Uuid::new_v4(),
            unique_code: "a1b2c3d4e5f60718".to_string(),
            usage_status: status,
            created_at: Utc::now(),
            ticket_price: Decimal::new(50000, 0),
            ticket_description: "Regular entry ticket".to_string(),
            temple_title: "Candi Borobudur".to_string(),
            temple_location_url: "https://maps.app.goo.gl/borobudur".to_string(),
            valid_date: NaiveDate::from_ymd_opt(2026, 8, 25).unwrap(),
            total_price: Decimal::new(150000, 0),
            transaction_date: Utc::now(),
            status: "success".to_string(),
        }
    }

    #[test]
    fn detail_response_nests_ticket_and_transaction() {
        let response: OwnedTicketDetailResponse = sample_details(UsageStatus::Unused).into();
        let json = serde_json::to_value(response).unwrap();

        assert!(json.get("ownedTicketID").is_some());
        assert_eq!(json["uniqueCode"], serde_json::json!("a1b2c3d4e5f60718"));
        assert_eq!(json["usageStatus"], serde_json::json!("Belum Digunakan"));
        assert_eq!(json["ticket"]["temple"]["title"], serde_json::json!("Candi Borobudur"));
        assert_eq!(json["transaction"]["status"], serde_json::json!("success"));
        assert_eq!(json["transaction"]["validDate"], serde_json::json!("2026-08-25"));
    }

    #[test]
    fn used_status_serializes_with_its_sentinel() {
        let response: OwnedTicketDetailResponse = sample_details(UsageStatus::Used).into();
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["usageStatus"], serde_json::json!("Sudah Digunakan"));
    }
}
