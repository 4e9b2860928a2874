//! Billing model: invoices, their line items and payments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Invoice settlement status.
///
/// The machine only moves forward: DRAFT to {PARTIALLY_PAID, PAID, VOID},
/// PARTIALLY_PAID to {PAID, VOID}. PAID and VOID are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    PartiallyPaid,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::PartiallyPaid => "PARTIALLY_PAID",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Void => "VOID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(InvoiceStatus::Draft),
            "PARTIALLY_PAID" => Some(InvoiceStatus::PartiallyPaid),
            "PAID" => Some(InvoiceStatus::Paid),
            "VOID" => Some(InvoiceStatus::Void),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Void)
    }

    /// Whether the forward-only machine allows moving from `self` to `next`.
    pub fn may_become(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Draft, InvoiceStatus::PartiallyPaid)
                | (InvoiceStatus::Draft, InvoiceStatus::Paid)
                | (InvoiceStatus::Draft, InvoiceStatus::Void)
                | (InvoiceStatus::PartiallyPaid, InvoiceStatus::Paid)
                | (InvoiceStatus::PartiallyPaid, InvoiceStatus::Void)
        )
    }

    /// Settlement status implied by a cumulative paid amount against a total.
    /// Callers reject overpayment first; `paid > total` is never settled here.
    pub fn settled(paid: Decimal, total: Decimal) -> InvoiceStatus {
        if paid.is_zero() {
            InvoiceStatus::Draft
        } else if paid < total {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Paid
        }
    }
}

/// How a payment was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
    Insurance,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Transfer => "TRANSFER",
            PaymentMethod::Insurance => "INSURANCE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(PaymentMethod::Cash),
            "CARD" => Some(PaymentMethod::Card),
            "TRANSFER" => Some(PaymentMethod::Transfer),
            "INSURANCE" => Some(PaymentMethod::Insurance),
            _ => None,
        }
    }
}

/// An invoice for a patient, optionally tied to the encounter it bills.
///
/// Amount invariant: `total == subtotal + tax - discount` and `subtotal`
/// equals the sum of the item totals, at all times.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub patient_id: String,
    pub encounter_id: Option<String>,
    pub branch_id: String,
    /// Human-facing unique document number, e.g. "INV-00001"
    pub number: String,
    pub status: InvoiceStatus,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One billable line on an invoice, optionally citing the procedure
/// it bills. `total == unit_price * quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub procedure_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total: Decimal,
}

impl InvoiceItem {
    /// Fails with `InvalidAmount` when `unit_price * quantity` leaves the
    /// representable decimal range.
    pub fn new(
        invoice_id: String,
        procedure_id: Option<String>,
        description: String,
        quantity: i64,
        unit_price: Decimal,
    ) -> CoreResult<Self> {
        let total = unit_price
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| {
                CoreError::InvalidAmount(format!(
                    "line total out of range: {unit_price} x {quantity}"
                ))
            })?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_id,
            procedure_id,
            description,
            quantity,
            unit_price,
            total,
        })
    }
}

/// A captured payment applied to one invoice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(invoice_id: String, spec: PaymentSpec, paid_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            invoice_id,
            method: spec.method,
            amount: spec.amount,
            paid_at,
        }
    }
}

/// An invoice with its owned items and payments, as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceDetail {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
}

impl InvoiceDetail {
    /// Sum of the recorded payment amounts.
    pub fn paid(&self) -> Decimal {
        self.payments.iter().map(|p| p.amount).sum()
    }
}

/// Input for creating an invoice with its lines and any payments already
/// captured at the desk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvoice {
    pub patient_id: String,
    pub encounter_id: Option<String>,
    pub branch_id: String,
    pub number: String,
    pub items: Vec<InvoiceItemSpec>,
    /// Defaults to zero
    pub tax: Option<Decimal>,
    /// Defaults to zero
    pub discount: Option<Decimal>,
    pub payments: Vec<PaymentSpec>,
}

/// One requested invoice line.
///
/// With `procedure_id` set, quantity and price are copied from the stored
/// procedure and any caller-supplied values are ignored. Without it, both
/// `quantity` and `unit_price` are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItemSpec {
    pub description: String,
    pub procedure_id: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
}

/// One requested payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSpec {
    pub method: PaymentMethod,
    pub amount: Decimal,
}
