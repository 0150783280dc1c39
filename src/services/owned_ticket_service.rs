//! Owned ticket service.
//!
//! Redemption flips usage_status with a conditional UPDATE, so two
//! racing calls cannot both succeed.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, FieldError, Result};
use crate::models::transaction::{OwnedTicket, UsageStatus};
use crate::services::transaction_service::generate_unique_code;

const DETAIL_COLUMNS: &str = "ot.id, ot.user_id, ot.ticket_id, ot.transaction_id, \
     ot.unique_code, ot.usage_status, ot.created_at, \
     t.price AS ticket_price, t.description AS ticket_description, \
     tp.title AS temple_title, tp.location_url AS temple_location_url, \
     tr.valid_date, tr.total_price, tr.transaction_date, tr.status";

const DETAIL_JOINS: &str = "FROM owned_tickets ot \
     JOIN tickets t ON t.id = ot.ticket_id \
     JOIN temples tp ON tp.id = t.temple_id \
     JOIN transactions tr ON tr.id = ot.transaction_id";

/// Owned ticket joined with its ticket, temple and transaction summary.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedTicketDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub transaction_id: Uuid,
    pub unique_code: String,
    pub usage_status: UsageStatus,
    pub created_at: DateTime<Utc>,
    pub ticket_price: Decimal,
    pub ticket_description: String,
    pub temple_title: String,
    pub temple_location_url: String,
    pub valid_date: NaiveDate,
    pub total_price: Decimal,
    pub transaction_date: DateTime<Utc>,
    pub status: String,
}

/// Owned ticket service
pub struct OwnedTicketService {
    db: PgPool,
}

impl OwnedTicketService {
    /// Create a new owned ticket service
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List the caller's owned tickets, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OwnedTicketDetails>> {
        sqlx::query_as::<_, OwnedTicketDetails>(&format!(
            "SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} \
             WHERE ot.user_id = $1 ORDER BY ot.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one of the caller's owned tickets
    pub async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<OwnedTicketDetails> {
        sqlx::query_as::<_, OwnedTicketDetails>(&format!(
            "SELECT {DETAIL_COLUMNS} {DETAIL_JOINS} WHERE ot.id = $1 AND ot.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Owned ticket not found".to_string()))
    }

    /// Redeem one of the caller's tickets, exactly once. A ticket that
    /// is already used stays used and the call fails with a conflict.
    pub async fn redeem(&self, id: Uuid, user_id: Uuid) -> Result<OwnedTicketDetails> {
        let updated = sqlx::query_scalar::<_, Uuid>(
            "UPDATE owned_tickets SET usage_status = 'Sudah Digunakan' \
             WHERE id = $1 AND user_id = $2 AND usage_status = 'Belum Digunakan' \
             RETURNING id",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match updated {
            Some(_) => self.get_for_user(id, user_id).await,
            None => {
                // Row exists but was not updatable: it is already used
                // (possibly by a concurrent redemption).
                self.get_for_user(id, user_id).await?;
                Err(AppError::Conflict(
                    "Ticket has already been used".to_string(),
                ))
            }
        }
    }

    /// Manually issue one owned ticket against the caller's own
    /// transaction.
    pub async fn create(
        &self,
        user_id: Uuid,
        ticket_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<OwnedTicket> {
        let mut errors = Vec::new();

        let ticket_exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM tickets WHERE id = $1)")
                .bind(ticket_id)
                .fetch_one(&self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        if !ticket_exists {
            errors.push(FieldError::new("ticketID", "Ticket does not exist"));
        }

        // A transaction owned by someone else is treated as nonexistent.
        let transaction_owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE id = $1 AND user_id = $2)",
        )
        .bind(transaction_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
        if !transaction_owned {
            errors.push(FieldError::new(
                "transactionID",
                "Transaction does not exist",
            ));
        }

        if !errors.is_empty() {
            return Err(AppError::Invalid(errors));
        }

        sqlx::query_as::<_, OwnedTicket>(
            "INSERT INTO owned_tickets (user_id, ticket_id, transaction_id, unique_code) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, ticket_id, transaction_id, unique_code, usage_status, created_at",
        )
        .bind(user_id)
        .bind(ticket_id)
        .bind(transaction_id)
        .bind(generate_unique_code())
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }
}
