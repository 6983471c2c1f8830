//! Payment method variants and gateway status vocabulary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::status::PurchaseStatus;

/// How a purchase was paid. Each gateway integration keys off this variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard { installments: u8 },
    Pix { key: String },
    Boleto { barcode: String, due_date: NaiveDate },
}

impl PaymentMethod {
    /// Path segment used by the gateway for this payment kind.
    pub fn gateway_segment(&self) -> &'static str {
        match self {
            Self::CreditCard { .. } => "card",
            Self::Pix { .. } => "pix",
            Self::Boleto { .. } => "boleto",
        }
    }
}

/// Map a raw gateway status string onto a purchase status.
///
/// Returns `None` for vocabulary we do not recognise; callers leave the record untouched.
pub fn map_gateway_status(raw: &str) -> Option<PurchaseStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "approved" | "paid" | "confirmed" | "authorized" => Some(PurchaseStatus::Approved),
        "pending" | "waiting" | "waiting_payment" | "in_process" | "processing" => {
            Some(PurchaseStatus::Pending)
        }
        "refused" | "rejected" | "canceled" | "cancelled" | "expired" | "failed" | "error" => {
            Some(PurchaseStatus::Error)
        }
        _ => None,
    }
}
