//! Billing ledger: invoice creation, payment recording and voiding.
//!
//! Every multi-row write runs inside one store transaction. An error at any
//! step rolls the whole operation back, so a partially created invoice is
//! never visible.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    CreateInvoice, Invoice, InvoiceDetail, InvoiceItem, InvoiceStatus, Payment, PaymentSpec,
};

/// Billing ledger over the shared store.
pub struct Billing<'a> {
    db: &'a Database,
}

impl<'a> Billing<'a> {
    /// Create a new billing view.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create an invoice with its lines and any payments already captured
    /// at the desk, all or nothing.
    ///
    /// Lines citing a procedure copy quantity and price from the stored
    /// procedure and claim it; a procedure already billed, or cited twice in
    /// the same request, fails the whole creation. Ad-hoc lines carry their
    /// own quantity and price. Totals are computed here, never trusted.
    pub fn create_invoice(
        &self,
        spec: CreateInvoice,
        now: DateTime<Utc>,
    ) -> CoreResult<InvoiceDetail> {
        // 1. References must exist and agree on the patient.
        if self.db.get_patient(&spec.patient_id)?.is_none() {
            return Err(CoreError::InvalidReference(format!(
                "patient {} not found",
                spec.patient_id
            )));
        }
        if self.db.get_branch(&spec.branch_id)?.is_none() {
            return Err(CoreError::InvalidReference(format!(
                "branch {} not found",
                spec.branch_id
            )));
        }
        if let Some(encounter_id) = &spec.encounter_id {
            let encounter = self.db.get_encounter(encounter_id)?.ok_or_else(|| {
                CoreError::InvalidReference(format!("encounter {} not found", encounter_id))
            })?;
            if encounter.patient_id != spec.patient_id {
                return Err(CoreError::InvalidReference(format!(
                    "encounter {} belongs to another patient",
                    encounter_id
                )));
            }
        }

        // 2. Adjustment amounts.
        let tax = spec.tax.unwrap_or(Decimal::ZERO);
        let discount = spec.discount.unwrap_or(Decimal::ZERO);
        if tax < Decimal::ZERO || discount < Decimal::ZERO {
            return Err(CoreError::InvalidAmount(
                "tax and discount must not be negative".into(),
            ));
        }

        // 3. Resolve the requested lines.
        let invoice_id = uuid::Uuid::new_v4().to_string();
        let mut items: Vec<InvoiceItem> = Vec::with_capacity(spec.items.len());
        let mut cited: Vec<String> = Vec::new();
        for line in &spec.items {
            let item = match &line.procedure_id {
                Some(procedure_id) => {
                    let procedure = self.db.get_procedure(procedure_id)?.ok_or_else(|| {
                        CoreError::InvalidReference(format!(
                            "procedure {} not found",
                            procedure_id
                        ))
                    })?;
                    if procedure.patient_id != spec.patient_id {
                        return Err(CoreError::InvalidReference(format!(
                            "procedure {} belongs to another patient",
                            procedure_id
                        )));
                    }
                    if procedure.is_billed() || cited.contains(procedure_id) {
                        return Err(CoreError::AlreadyBilled(procedure_id.clone()));
                    }
                    cited.push(procedure_id.clone());
                    InvoiceItem::new(
                        invoice_id.clone(),
                        Some(procedure_id.clone()),
                        line.description.clone(),
                        procedure.quantity,
                        procedure.unit_price,
                    )?
                }
                None => {
                    let quantity = line.quantity.filter(|q| *q > 0).ok_or_else(|| {
                        CoreError::InvalidQuantity(format!(
                            "line \"{}\" needs a positive quantity",
                            line.description
                        ))
                    })?;
                    let unit_price =
                        line.unit_price.filter(|p| *p >= Decimal::ZERO).ok_or_else(|| {
                            CoreError::InvalidAmount(format!(
                                "line \"{}\" needs a non-negative unit price",
                                line.description
                            ))
                        })?;
                    InvoiceItem::new(
                        invoice_id.clone(),
                        None,
                        line.description.clone(),
                        quantity,
                        unit_price,
                    )?
                }
            };
            items.push(item);
        }

        // 4. Totals, folded with checked arithmetic.
        let mut subtotal = Decimal::ZERO;
        for item in &items {
            subtotal = subtotal.checked_add(item.total).ok_or_else(|| {
                CoreError::InvalidAmount("subtotal out of range".into())
            })?;
        }
        let total = subtotal
            .checked_add(tax)
            .and_then(|t| t.checked_sub(discount))
            .ok_or_else(|| CoreError::InvalidAmount("total out of range".into()))?;
        if total < Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "total would be negative ({})",
                total
            )));
        }

        let mut invoice = Invoice {
            id: invoice_id,
            patient_id: spec.patient_id,
            encounter_id: spec.encounter_id,
            branch_id: spec.branch_id,
            number: spec.number,
            status: InvoiceStatus::Draft,
            subtotal,
            tax,
            discount,
            total,
            created_at: now,
            updated_at: now,
        };

        // 5. Write invoice, items, claims and payments in one transaction.
        //    A duplicate invoice number surfaces here as DuplicateKey.
        let tx = self.db.transaction()?;
        self.db.insert_invoice(&invoice)?;
        for item in &items {
            self.db.insert_invoice_item(item)?;
            if let Some(procedure_id) = &item.procedure_id {
                if !self.db.mark_procedure_billed(procedure_id, &invoice.id)? {
                    return Err(CoreError::AlreadyBilled(procedure_id.clone()));
                }
            }
        }
        let mut payments = Vec::with_capacity(spec.payments.len());
        let mut paid = Decimal::ZERO;
        for payment_spec in spec.payments {
            let payment = self.apply_payment(&invoice, paid, payment_spec, now)?;
            paid += payment.amount;
            payments.push(payment);
        }
        if !paid.is_zero() {
            invoice.status = InvoiceStatus::settled(paid, invoice.total);
            self.db
                .update_invoice_status(&invoice.id, invoice.status, now)?;
        }
        tx.commit()?;

        Ok(InvoiceDetail {
            invoice,
            items,
            payments,
        })
    }

    /// Record an externally captured payment against an invoice and settle
    /// its status. The payment row and the status change commit together.
    pub fn record_payment(
        &self,
        invoice_id: &str,
        spec: PaymentSpec,
        now: DateTime<Utc>,
    ) -> CoreResult<InvoiceDetail> {
        let mut invoice = self.require_invoice(invoice_id)?;
        if invoice.status == InvoiceStatus::Void {
            return Err(CoreError::InvoiceVoided(invoice.number));
        }
        let already_paid = self.db.invoice_paid_total(invoice_id)?;

        let tx = self.db.transaction()?;
        let payment = self.apply_payment(&invoice, already_paid, spec, now)?;
        let status = InvoiceStatus::settled(already_paid + payment.amount, invoice.total);
        if status != invoice.status {
            self.db.update_invoice_status(invoice_id, status, now)?;
            invoice.status = status;
            invoice.updated_at = now;
        }
        tx.commit()?;

        let items = self.db.list_invoice_items(invoice_id)?;
        let payments = self.db.list_payments(invoice_id)?;
        Ok(InvoiceDetail {
            invoice,
            items,
            payments,
        })
    }

    /// Void an invoice. DRAFT and PARTIALLY_PAID invoices can be voided;
    /// PAID and VOID are terminal. Refunds are not modeled, so a paid
    /// invoice never moves again.
    pub fn void_invoice(&self, invoice_id: &str, now: DateTime<Utc>) -> CoreResult<Invoice> {
        let mut invoice = self.require_invoice(invoice_id)?;
        if invoice.status == InvoiceStatus::Void {
            return Err(CoreError::InvoiceVoided(invoice.number));
        }
        if !invoice.status.may_become(InvoiceStatus::Void) {
            return Err(CoreError::InvalidTransition(format!(
                "invoice {} is {} and cannot be voided",
                invoice.number,
                invoice.status.as_str()
            )));
        }
        self.db
            .update_invoice_status(invoice_id, InvoiceStatus::Void, now)?;
        invoice.status = InvoiceStatus::Void;
        invoice.updated_at = now;
        Ok(invoice)
    }

    /// Fetch an invoice with its items and payments.
    pub fn get_invoice(&self, invoice_id: &str) -> CoreResult<Option<InvoiceDetail>> {
        let invoice = match self.db.get_invoice(invoice_id)? {
            Some(invoice) => invoice,
            None => return Ok(None),
        };
        let items = self.db.list_invoice_items(invoice_id)?;
        let payments = self.db.list_payments(invoice_id)?;
        Ok(Some(InvoiceDetail {
            invoice,
            items,
            payments,
        }))
    }

    /// All invoices of one patient, newest first.
    pub fn list_for_patient(&self, patient_id: &str) -> CoreResult<Vec<Invoice>> {
        Ok(self.db.list_invoices_for_patient(patient_id)?)
    }

    /// Validate one payment against the invoice total and the amount already
    /// paid, then insert it. Settling the status is left to the caller.
    fn apply_payment(
        &self,
        invoice: &Invoice,
        already_paid: Decimal,
        spec: PaymentSpec,
        now: DateTime<Utc>,
    ) -> CoreResult<Payment> {
        if spec.amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(format!(
                "payment amount must be positive, got {}",
                spec.amount
            )));
        }
        let would_be_paid = already_paid.checked_add(spec.amount).ok_or_else(|| {
            CoreError::InvalidAmount(format!(
                "payment amount out of range: {}",
                spec.amount
            ))
        })?;
        if would_be_paid > invoice.total {
            return Err(CoreError::Overpayment(format!(
                "{} already paid of {} total, {} more would overshoot",
                already_paid, invoice.total, spec.amount
            )));
        }
        let payment = Payment::new(invoice.id.clone(), spec, now);
        self.db.insert_payment(&payment)?;
        Ok(payment)
    }

    fn require_invoice(&self, invoice_id: &str) -> CoreResult<Invoice> {
        self.db.get_invoice(invoice_id)?.ok_or_else(|| {
            CoreError::InvalidReference(format!("invoice {} not found", invoice_id))
        })
    }
}
