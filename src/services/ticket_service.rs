//! Ticket catalog service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, FieldError, Result};

const JOINED_COLUMNS: &str = "t.id, t.temple_id, t.price, t.description, \
     t.created_at, t.updated_at, \
     tp.title AS temple_title, tp.location_url AS temple_location_url";

const TEMPLE_JOIN: &str = "FROM tickets t JOIN temples tp ON tp.id = t.temple_id";

/// Ticket row joined with its temple's title and location.
#[derive(Debug, Clone, FromRow)]
pub struct TicketWithTemple {
    pub id: Uuid,
    pub temple_id: Uuid,
    pub price: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub temple_title: String,
    pub temple_location_url: String,
}

/// New ticket payload. Field validation happens at the handler.
#[derive(Debug)]
pub struct NewTicket {
    pub temple_id: Uuid,
    pub price: Decimal,
    pub description: String,
}

/// Presence-aware ticket patch.
#[derive(Debug, Default)]
pub struct TicketPatch {
    pub temple_id: Option<Uuid>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

/// Ticket service
pub struct TicketService {
    db: PgPool,
}

impl TicketService {
    /// Create a new ticket service
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all tickets with temple info, newest first
    pub async fn list(&self) -> Result<Vec<TicketWithTemple>> {
        sqlx::query_as::<_, TicketWithTemple>(&format!(
            "SELECT {JOINED_COLUMNS} {TEMPLE_JOIN} ORDER BY t.created_at DESC"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one ticket with temple info
    pub async fn get(&self, id: Uuid) -> Result<TicketWithTemple> {
        sqlx::query_as::<_, TicketWithTemple>(&format!(
            "SELECT {JOINED_COLUMNS} {TEMPLE_JOIN} WHERE t.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))
    }

    /// Create a ticket under an existing temple
    pub async fn create(&self, new: NewTicket) -> Result<TicketWithTemple> {
        self.ensure_temple(new.temple_id).await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO tickets (temple_id, price, description) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(new.temple_id)
        .bind(new.price)
        .bind(&new.description)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.get(id).await
    }

    /// Apply a partial update
    pub async fn update(&self, id: Uuid, patch: TicketPatch) -> Result<TicketWithTemple> {
        self.get(id).await?;

        if let Some(temple_id) = patch.temple_id {
            self.ensure_temple(temple_id).await?;
        }

        sqlx::query(
            "UPDATE tickets SET \
                 temple_id = COALESCE($2, temple_id), \
                 price = COALESCE($3, price), \
                 description = COALESCE($4, description), \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(patch.temple_id)
        .bind(patch.price)
        .bind(patch.description)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.get(id).await
    }

    /// Delete a ticket. Tickets referenced by purchases cannot be
    /// deleted.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.get(id).await?;

        sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                if e.to_string().contains("foreign key") {
                    AppError::Conflict("Ticket has purchase history".to_string())
                } else {
                    AppError::Database(e.to_string())
                }
            })?;

        Ok(())
    }

    async fn ensure_temple(&self, temple_id: Uuid) -> Result<()> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM temples WHERE id = $1)")
                .bind(temple_id)
                .fetch_one(&self.db)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

        if exists {
            Ok(())
        } else {
            Err(AppError::Invalid(vec![FieldError::new(
                "templeID",
                "Temple does not exist",
            )]))
        }
    }
}
