//! Ticket catalog handlers.
//!
//! Tickets are purchasable entry types tied to one temple. Reads include
//! the owning temple's title and location; writes are admin-only JSON.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::api::dto::ApiResponse;
use crate::api::handlers::forms;
use crate::api::SharedState;
use crate::error::{FieldError, Result};
use crate::services::ticket_service::{NewTicket, TicketPatch, TicketService, TicketWithTemple};

#[derive(OpenApi)]
#[openapi(
    paths(list_tickets, get_ticket, create_ticket, update_ticket, delete_ticket),
    components(schemas(
        CreateTicketRequest,
        UpdateTicketRequest,
        TicketResponse,
        TicketTempleResponse,
        TicketData,
        TicketListData,
    ))
)]
pub struct TicketsApiDoc;

/// Routes available to any authenticated user.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_tickets))
        .route("/:id", get(get_ticket))
}

/// Admin-only routes.
pub fn admin_router() -> Router<SharedState> {
    Router::new()
        .route("/", post(create_ticket))
        .route("/:id", put(update_ticket))
        .route("/:id", delete(delete_ticket))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTicketRequest {
    #[serde(rename = "templeID")]
    pub temple_id: Option<Uuid>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTicketRequest {
    #[serde(rename = "templeID")]
    pub temple_id: Option<Uuid>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

/// Owning temple summary embedded in ticket reads.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketTempleResponse {
    pub title: String,
    pub location_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    #[serde(rename = "ticketID")]
    pub ticket_id: Uuid,
    #[serde(rename = "templeID")]
    pub temple_id: Uuid,
    pub price: Decimal,
    pub description: String,
    pub temple: TicketTempleResponse,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketData {
    pub ticket: TicketResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketListData {
    pub tickets: Vec<TicketResponse>,
}

fn ticket_response(ticket: TicketWithTemple) -> TicketResponse {
    TicketResponse {
        ticket_id: ticket.id,
        temple_id: ticket.temple_id,
        price: ticket.price,
        description: ticket.description,
        temple: TicketTempleResponse {
            title: ticket.temple_title,
            location_url: ticket.temple_location_url,
        },
        created_at: ticket.created_at,
        updated_at: ticket.updated_at,
    }
}

fn check_price(price: Option<Decimal>, required: bool, errors: &mut Vec<FieldError>) -> Option<Decimal> {
    match price {
        Some(p) if p >= Decimal::ZERO => Some(p),
        Some(_) => {
            errors.push(FieldError::new("price", "price must be a non-negative number"));
            None
        }
        None => {
            if required {
                errors.push(FieldError::new("price", "price is required"));
            }
            None
        }
    }
}

/// GET /api/tickets
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/tickets",
    tag = "tickets",
    responses(
        (status = 200, description = "All tickets, newest first", body = TicketListData),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn list_tickets(
    State(state): State<SharedState>,
) -> Result<Json<ApiResponse<TicketListData>>> {
    let tickets = TicketService::new(state.db.clone()).list().await?;
    let tickets = tickets.into_iter().map(ticket_response).collect();
    Ok(Json(ApiResponse::ok(TicketListData { tickets })))
}

/// GET /api/tickets/:id
#[utoipa::path(
    get,
    path = "/{id}",
    context_path = "/api/tickets",
    tag = "tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket detail", body = TicketData),
        (status = 404, description = "Ticket not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn get_ticket(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TicketData>>> {
    let ticket = TicketService::new(state.db.clone()).get(id).await?;
    Ok(Json(ApiResponse::ok(TicketData {
        ticket: ticket_response(ticket),
    })))
}

/// POST /api/tickets (admin)
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/tickets",
    tag = "tickets",
    request_body = CreateTicketRequest,
    responses(
        (status = 201, description = "Ticket created", body = TicketData),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Admin access required"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn create_ticket(
    State(state): State<SharedState>,
    Json(payload): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TicketData>>)> {
    let mut errors = Vec::new();
    let temple_id = match payload.temple_id {
        Some(id) => Some(id),
        None => {
            errors.push(FieldError::new("templeID", "templeID is required"));
            None
        }
    };
    let price = check_price(payload.price, true, &mut errors);
    let description =
        forms::require_str(payload.description.as_deref(), "description", 10, &mut errors);
    forms::finish(errors)?;

    let new = NewTicket {
        temple_id: temple_id.unwrap_or_default(),
        price: price.unwrap_or_default(),
        description: description.unwrap_or_default(),
    };

    let ticket = TicketService::new(state.db.clone()).create(new).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Ticket created successfully",
            TicketData {
                ticket: ticket_response(ticket),
            },
        )),
    ))
}

/// PUT /api/tickets/:id (admin, presence-aware)
#[utoipa::path(
    put,
    path = "/{id}",
    context_path = "/api/tickets",
    tag = "tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = UpdateTicketRequest,
    responses(
        (status = 200, description = "Ticket updated", body = TicketData),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Ticket not found"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn update_ticket(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTicketRequest>,
) -> Result<Json<ApiResponse<TicketData>>> {
    let mut errors = Vec::new();
    let patch = TicketPatch {
        temple_id: payload.temple_id,
        price: check_price(payload.price, false, &mut errors),
        description: forms::optional_str(
            payload.description.as_deref(),
            "description",
            10,
            &mut errors,
        ),
    };
    forms::finish(errors)?;

    let ticket = TicketService::new(state.db.clone()).update(id, patch).await?;
    Ok(Json(ApiResponse::with_message(
        "Ticket updated successfully",
        TicketData {
            ticket: ticket_response(ticket),
        },
    )))
}

/// DELETE /api/tickets/:id (admin)
#[utoipa::path(
    delete,
    path = "/{id}",
    context_path = "/api/tickets",
    tag = "tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket deleted"),
        (status = 404, description = "Ticket not found"),
        (status = 409, description = "Ticket has purchase history"),
    ),
    security(("bearer_auth" = [])),
)]
pub async fn delete_ticket(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    TicketService::new(state.db.clone()).delete(id).await?;
    Ok(Json(ApiResponse::message_only("Ticket deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_response_nests_temple_summary() {
        let ticket = TicketWithTemple {
            id: Uuid::new_v4(),
            temple_id: Uuid::new_v4(),
            price: Decimal::new(50000, 0),
            description: "Regular entry ticket, valid one day".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            temple_title: "Candi Borobudur".to_string(),
            temple_location_url: "https://maps.app.goo.gl/borobudur".to_string(),
        };

        let json = serde_json::to_value(ticket_response(ticket)).unwrap();
        assert!(json.get("ticketID").is_some());
        assert!(json.get("templeID").is_some());
        assert_eq!(json["temple"]["title"], serde_json::json!("Candi Borobudur"));
        assert_eq!(
            json["temple"]["locationUrl"],
            serde_json::json!("https://maps.app.goo.gl/borobudur")
        );
    }

    #[test]
    fn price_check_flags_negative_values() {
        let mut errors = Vec::new();
        assert_eq!(
            check_price(Some(Decimal::new(100, 0)), true, &mut errors),
            Some(Decimal::new(100, 0))
        );
        assert!(errors.is_empty());

        assert_eq!(check_price(Some(Decimal::new(-1, 0)), true, &mut errors), None);
        assert_eq!(check_price(None, true, &mut errors), None);
        assert_eq!(errors.len(), 2);

        errors.clear();
        assert_eq!(check_price(None, false, &mut errors), None);
        assert!(errors.is_empty());
    }

    #[test]
    fn create_request_accepts_frontend_field_names() {
        let payload: CreateTicketRequest = serde_json::from_value(serde_json::json!({
            "templeID": "b9c7dd7e-3a3e-4bb4-9a47-62a52ba27f30",
            "price": "50000",
            "description": "Regular entry ticket, valid one day"
        }))
        .unwrap();
        assert!(payload.temple_id.is_some());
        assert_eq!(payload.price, Some(Decimal::new(50000, 0)));
    }
}
