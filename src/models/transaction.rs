//! Transaction and owned-ticket models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Status written by a completed purchase. The column defaults to
/// "Pending" but no payment-pending flow exists.
pub const STATUS_SUCCESS: &str = "success";

/// Redemption state of an owned ticket. The Indonesian sentinels are
/// part of the wire contract and the column enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "usage_status")]
pub enum UsageStatus {
    #[sqlx(rename = "Belum Digunakan")]
    #[serde(rename = "Belum Digunakan")]
    Unused,
    #[sqlx(rename = "Sudah Digunakan")]
    #[serde(rename = "Sudah Digunakan")]
    Used,
}

/// Transaction entity: one purchase event. `total_price` is fixed at
/// purchase time and never recomputed from the ticket row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub ticket_quantity: i32,
    pub total_price: Decimal,
    pub valid_date: NaiveDate,
    pub status: String,
    pub transaction_date: DateTime<Utc>,
}

/// OwnedTicket entity: one redeemable instance of a purchased ticket.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OwnedTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticket_id: Uuid,
    pub transaction_id: Uuid,
    pub unique_code: String,
    pub usage_status: UsageStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_status_serializes_to_wire_sentinels() {
        assert_eq!(
            serde_json::to_value(UsageStatus::Unused).unwrap(),
            "Belum Digunakan"
        );
        assert_eq!(
            serde_json::to_value(UsageStatus::Used).unwrap(),
            "Sudah Digunakan"
        );
    }

    #[test]
    fn usage_status_roundtrips_from_wire() {
        let status: UsageStatus = serde_json::from_str("\"Belum Digunakan\"").unwrap();
        assert_eq!(status, UsageStatus::Unused);
    }
}
