//! Ticket purchase service.
//!
//! A purchase writes one transaction row and its owned tickets inside a
//! single database transaction, so a failure never leaves a purchase
//! with fewer tickets than paid for.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::transaction::{OwnedTicket, Transaction, STATUS_SUCCESS};

const TRANSACTION_COLUMNS: &str = "id, user_id, ticket_id, ticket_quantity, total_price, \
     valid_date, status, transaction_date";

const OWNED_TICKET_COLUMNS: &str =
    "id, user_id, ticket_id, transaction_id, unique_code, usage_status, created_at";

const JOINED_COLUMNS: &str = "tr.id, tr.user_id, tr.ticket_id, tr.ticket_quantity, \
     tr.total_price, tr.valid_date, tr.status, tr.transaction_date, \
     t.price AS ticket_price, t.description AS ticket_description, \
     tp.title AS temple_title, tp.location_url AS temple_location_url";

const TICKET_JOINS: &str = "FROM transactions tr \
     JOIN tickets t ON t.id = tr.ticket_id \
     JOIN temples tp ON tp.id = t.temple_id";

/// Transaction row joined with its ticket and temple.
#[derive(Debug, Clone, FromRow)]
pub struct TransactionWithTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub ticket_quantity: i32,
    pub total_price: Decimal,
    pub valid_date: NaiveDate,
    pub status: String,
    pub transaction_date: DateTime<Utc>,
    pub ticket_price: Decimal,
    pub ticket_description: String,
    pub temple_title: String,
    pub temple_location_url: String,
}

#[derive(Debug, FromRow)]
struct TicketPricing {
    price: Decimal,
    temple_title: String,
}

/// Everything a completed purchase returns to the caller.
#[derive(Debug)]
pub struct PurchaseOutcome {
    pub transaction: Transaction,
    pub ticket_price: Decimal,
    pub temple_title: String,
    pub owned_tickets: Vec<OwnedTicket>,
}

/// Transaction service
pub struct TransactionService {
    db: PgPool,
}

impl TransactionService {
    /// Create a new transaction service
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Purchase `quantity` tickets: one transaction row plus one owned
    /// ticket per unit, committed atomically.
    pub async fn purchase(
        &self,
        user_id: Uuid,
        ticket_id: Uuid,
        valid_date: NaiveDate,
        quantity: i32,
    ) -> Result<PurchaseOutcome> {
        let pricing = sqlx::query_as::<_, TicketPricing>(
            "SELECT t.price, tp.title AS temple_title \
             FROM tickets t JOIN temples tp ON tp.id = t.temple_id \
             WHERE t.id = $1",
        )
        .bind(ticket_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

        let total_price = pricing.price * Decimal::from(quantity);

        let mut tx = self.db.begin().await?;

        let transaction = sqlx::query_as::<_, Transaction>(&format!(
            "INSERT INTO transactions \
                 (user_id, ticket_id, ticket_quantity, total_price, valid_date, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(ticket_id)
        .bind(quantity)
        .bind(total_price)
        .bind(valid_date)
        .bind(STATUS_SUCCESS)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let mut owned_tickets = Vec::with_capacity(quantity as usize);
        for _ in 0..quantity {
            let code = generate_unique_code();
            let owned = sqlx::query_as::<_, OwnedTicket>(&format!(
                "INSERT INTO owned_tickets (user_id, ticket_id, transaction_id, unique_code) \
                 VALUES ($1, $2, $3, $4) RETURNING {OWNED_TICKET_COLUMNS}"
            ))
            .bind(user_id)
            .bind(ticket_id)
            .bind(transaction.id)
            .bind(&code)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
            owned_tickets.push(owned);
        }

        tx.commit().await?;

        Ok(PurchaseOutcome {
            transaction,
            ticket_price: pricing.price,
            temple_title: pricing.temple_title,
            owned_tickets,
        })
    }

    /// List the caller's transactions, newest first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<TransactionWithTicket>> {
        sqlx::query_as::<_, TransactionWithTicket>(&format!(
            "SELECT {JOINED_COLUMNS} {TICKET_JOINS} \
             WHERE tr.user_id = $1 ORDER BY tr.transaction_date DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one of the caller's transactions
    pub async fn get_for_user(&self, id: Uuid, user_id: Uuid) -> Result<TransactionWithTicket> {
        sqlx::query_as::<_, TransactionWithTicket>(&format!(
            "SELECT {JOINED_COLUMNS} {TICKET_JOINS} WHERE tr.id = $1 AND tr.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))
    }

    /// List every transaction (admin view), newest first
    pub async fn list_all(&self) -> Result<Vec<TransactionWithTicket>> {
        sqlx::query_as::<_, TransactionWithTicket>(&format!(
            "SELECT {JOINED_COLUMNS} {TICKET_JOINS} ORDER BY tr.transaction_date DESC"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Random redemption code: 8 random bytes as 16 lowercase hex chars.
pub(crate) fn generate_unique_code() -> String {
    let bytes: [u8; 8] = rand::random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_codes_are_16_lowercase_hex_chars() {
        let code = generate_unique_code();
        assert_eq!(code.len(), 16);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn unique_codes_differ_across_calls() {
        let codes: Vec<String> = (0..32).map(|_| generate_unique_code()).collect();
        let mut deduped = codes.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(codes.len(), deduped.len());
    }

    #[test]
    fn total_price_is_price_times_quantity() {
        let price = Decimal::new(50_000, 0);
        let total = price * Decimal::from(3);
        assert_eq!(total, Decimal::new(150_000, 0));
    }

    #[test]
    fn total_price_keeps_decimal_places() {
        let price = Decimal::new(12_550, 2); // 125.50
        let total = price * Decimal::from(4);
        assert_eq!(total.to_string(), "502.00");
    }
}
