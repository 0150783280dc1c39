//! Transaction handlers.
//!
//! A purchase creates one transaction plus `ticketQuantity` owned tickets
//! in a single database transaction. Users see only their own history;
//! the `/admin` listing exposes everything.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::ApiResponse;
use crate::api::handlers::forms;
use crate::api::handlers::owned_tickets::OwnedTicketResponse;
use crate::api::middleware::auth::AuthExtension;
use crate::api::SharedState;
use crate::error::{FieldError, Result};
use crate::services::transaction_service::{
    PurchaseOutcome, TransactionService, TransactionWithTicket,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        create_transaction,
        list_transactions,
        get_transaction,
        list_all_transactions,
    ),
    components(schemas(
        CreateTransactionRequest,
        TransactionResponse,
        TransactionTicketResponse,
        TransactionTempleResponse,
        PurchaseData,
        PurchasedTransactionResponse,
        PurchasedTicketSummary,
        TransactionData,
        TransactionListData,
    ))
)]
pub struct TransactionsApiDoc;

/// Routes available to any authenticated user.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(create_transaction))
        .route("/", get(list_transactions))
        .route("/:id", get(get_transaction))
}

/// Admin-only routes.
pub fn admin_router() -> Router<SharedState> {
    Router::new().route("/admin", get(list_all_transactions))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTransactionRequest {
    #[serde(rename = "ticketID")]
    pub ticket_id: Option<Uuid>,
    #[serde(rename = "validDate")]
    pub valid_date: Option<String>,
    #[serde(rename = "ticketQuantity")]
    pub ticket_quantity: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionTempleResponse {
    pub title: String,
    pub location_url: String,
}

/// Ticket summary nested under history reads.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionTicketResponse {
    pub price: Decimal,
    pub description: String,
    pub temple: TransactionTempleResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    #[serde(rename = "transactionID")]
    pub transaction_id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(rename = "ticketID")]
    pub ticket_id: Uuid,
    pub ticket_quantity: i32,
    pub total_price: Decimal,
    pub valid_date: NaiveDate,
    pub status: String,
    pub transaction_date: DateTime<Utc>,
    pub ticket: TransactionTicketResponse,
}

impl From<TransactionWithTicket> for TransactionResponse {
    fn from(row: TransactionWithTicket) -> Self {
        Self {
            transaction_id: row.id,
            user_id: row.user_id,
            ticket_id: row.ticket_id,
            ticket_quantity: row.ticket_quantity,
            total_price: row.total_price,
            valid_date: row.valid_date,
            status: row.status,
            transaction_date: row.transaction_date,
            ticket: TransactionTicketResponse {
                price: row.ticket_price,
                description: row.ticket_description,
                temple: TransactionTempleResponse {
                    title: row.temple_title,
                    location_url: row.temple_location_url,
                },
            },
        }
    }
}

/// Ticket summary nested under a fresh purchase: the temple title plus
/// the unit price paid.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchasedTicketSummary {
    pub title: String,
    pub price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedTransactionResponse {
    #[serde(rename = "transactionID")]
    pub transaction_id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(rename = "ticketID")]
    pub ticket_id: Uuid,
    pub ticket_quantity: i32,
    pub total_price: Decimal,
    pub valid_date: NaiveDate,
    pub status: String,
    pub transaction_date: DateTime<Utc>,
    pub ticket: PurchasedTicketSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseData {
    pub transaction: PurchasedTransactionResponse,
    #[serde(rename = "ownedTickets")]
    pub owned_tickets: Vec<OwnedTicketResponse>,
}

impl From<PurchaseOutcome> for PurchaseData {
    fn from(outcome: PurchaseOutcome) -> Self {
        let tx = outcome.transaction;
        Self {
            transaction: PurchasedTransactionResponse {
                transaction_id: tx.id,
                user_id: tx.user_id,
                ticket_id: tx.ticket_id,
                ticket_quantity: tx.ticket_quantity,
                total_price: tx.total_price,
                valid_date: tx.valid_date,
                status: tx.status,
                transaction_date: tx.transaction_date,
                ticket: PurchasedTicketSummary {
                    title: outcome.temple_title,
                    price: outcome.ticket_price,
                },
            },
            owned_tickets: outcome.owned_tickets.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionData {
    pub transaction: TransactionResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionListData {
    pub transactions: Vec<TransactionResponse>,
}

/// POST /api/transactions
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/transactions",
    tag = "transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Purchase completed", body = PurchaseData),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Ticket not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn create_transaction(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PurchaseData>>)> {
    let mut errors = Vec::new();
    let ticket_id = match payload.ticket_id {
        Some(id) => Some(id),
        None => {
            errors.push(FieldError::new("ticketID", "ticketID is required"));
            None
        }
    };
    let valid_date = forms::require_future_date(
        payload.valid_date.as_deref(),
        "validDate",
        &mut errors,
    );
    let quantity = match payload.ticket_quantity {
        Some(q) if q >= 1 => Some(q),
        Some(_) => {
            errors.push(FieldError::new(
                "ticketQuantity",
                "ticketQuantity must be at least 1",
            ));
            None
        }
        None => {
            errors.push(FieldError::new("ticketQuantity", "ticketQuantity is required"));
            None
        }
    };
    forms::finish(errors)?;

    let outcome = TransactionService::new(state.db.clone())
        .purchase(
            auth.user_id,
            ticket_id.unwrap_or_default(),
            valid_date.unwrap_or_default(),
            quantity.unwrap_or_default(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Transaction created successfully",
            outcome.into(),
        )),
    ))
}

/// GET /api/transactions
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/transactions",
    tag = "transactions",
    responses(
        (status = 200, description = "The caller's transactions, newest first", body = TransactionListData),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn list_transactions(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
) -> Result<Json<ApiResponse<TransactionListData>>> {
    let rows = TransactionService::new(state.db.clone())
        .list_for_user(auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(TransactionListData {
        transactions: rows.into_iter().map(Into::into).collect(),
    })))
}

/// GET /api/transactions/:id
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/transactions",
    tag = "transactions",
    params(("id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 200, description = "Transaction detail", body = TransactionData),
        (status = 404, description = "Transaction not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_transaction(
    State(state): State<SharedState>,
    Extension(auth): Extension<AuthExtension>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransactionData>>> {
    let row = TransactionService::new(state.db.clone())
        .get_for_user(id, auth.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(TransactionData {
        transaction: row.into(),
    })))
}

/// GET /api/transactions/admin
#[utoipa::path(
    get,
    path = "/admin",
    context_path = "/api/transactions",
    tag = "transactions",
    responses(
        (status = 200, description = "Every transaction, newest first", body = TransactionListData),
        (status = 403, description = "Admin access required"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn list_all_transactions(
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<TransactionListData>>> {
    let rows = TransactionService::new(state.db.clone()).list_all().await?;
    Ok(Json(ApiResponse::ok(TransactionListData {
        transactions: rows.into_iter().map(Into::into).collect(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::{OwnedTicket, Transaction, UsageStatus, STATUS_SUCCESS};

    #[test]
    fn purchase_data_nests_temple_title_and_unit_price() {
        let tx = Transaction {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ticket_id: Uuid::new_v4(),
            ticket_quantity: 3,
            total_price: Decimal::new(150000, 0),
            valid_date: NaiveDate::from_ymd_opt(2026, 8, 25).unwrap(),
            status: STATUS_SUCCESS.to_string(),
            transaction_date: Utc::now(),
        };
        let owned = OwnedTicket {
            id: Uuid::new_v4(),
            user_id: tx.user_id,
            ticket_id: tx.ticket_id,
            transaction_id: tx.id,
            unique_code: "0123456789abcdef".to_string(),
            usage_status: UsageStatus::Unused,
            created_at: Utc::now(),
        };
        let outcome = PurchaseOutcome {
            transaction: tx,
            ticket_price: Decimal::new(50000, 0),
            temple_title: "Candi Borobudur".to_string(),
            owned_tickets: vec![owned.clone(), owned.clone(), owned],
        };

        let json = serde_json::to_value(PurchaseData::from(outcome)).unwrap();
        assert_eq!(
            json["transaction"]["ticket"]["title"],
            serde_json::json!("Candi Borobudur")
        );
        assert_eq!(json["transaction"]["status"], serde_json::json!("success"));
        assert_eq!(json["ownedTickets"].as_array().unwrap().len(), 3);
        assert_eq!(
            json["ownedTickets"][0]["usageStatus"],
            serde_json::json!("Belum Digunakan")
        );
    }

    #[test]
    fn history_response_uses_frontend_field_names() {
        let row = TransactionWithTicket {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ticket_id: Uuid::new_v4(),
            ticket_quantity: 1,
            total_price: Decimal::new(50000, 0),
            valid_date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
            status: STATUS_SUCCESS.to_string(),
            transaction_date: Utc::now(),
            ticket_price: Decimal::new(50000, 0),
            ticket_description: "Regular entry ticket".to_string(),
            temple_title: "Candi Prambanan".to_string(),
            temple_location_url: "https://maps.app.goo.gl/prambanan".to_string(),
        };

        let json = serde_json::to_value(TransactionResponse::from(row)).unwrap();
        assert!(json.get("transactionID").is_some());
        assert!(json.get("ticketQuantity").is_some());
        assert!(json.get("totalPrice").is_some());
        assert_eq!(
            json["ticket"]["temple"]["locationUrl"],
            serde_json::json!("https://maps.app.goo.gl/prambanan")
        );
    }
}
