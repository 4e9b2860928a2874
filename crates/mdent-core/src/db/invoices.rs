//! Invoice, invoice item and payment database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::{Database, DbError, DbResult};
use crate::models::{Invoice, InvoiceItem, InvoiceStatus, Payment, PaymentMethod};

const INVOICE_COLUMNS: &str =
    "id, patient_id, encounter_id, branch_id, number, status, subtotal, tax, discount, total, created_at, updated_at";

impl Database {
    /// Insert a new invoice header.
    pub fn insert_invoice(&self, invoice: &Invoice) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO invoices (
                id, patient_id, encounter_id, branch_id, number, status,
                subtotal, tax, discount, total, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                invoice.id,
                invoice.patient_id,
                invoice.encounter_id,
                invoice.branch_id,
                invoice.number,
                invoice.status.as_str(),
                invoice.subtotal.to_string(),
                invoice.tax.to_string(),
                invoice.discount.to_string(),
                invoice.total.to_string(),
                invoice.created_at,
                invoice.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get an invoice by ID.
    pub fn get_invoice(&self, id: &str) -> DbResult<Option<Invoice>> {
        self.conn
            .query_row(
                &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?"),
                [id],
                invoice_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get an invoice by its unique document number.
    pub fn get_invoice_by_number(&self, number: &str) -> DbResult<Option<Invoice>> {
        self.conn
            .query_row(
                &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE number = ?"),
                [number],
                invoice_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List a patient's invoices, newest first.
    pub fn list_invoices_for_patient(&self, patient_id: &str) -> DbResult<Vec<Invoice>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE patient_id = ? ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([patient_id], invoice_row)?;

        let mut invoices = Vec::new();
        for row in rows {
            invoices.push(row?.try_into()?);
        }
        Ok(invoices)
    }

    /// Set an invoice's settlement status.
    pub fn update_invoice_status(
        &self,
        id: &str,
        status: InvoiceStatus,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE invoices SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), now],
        )?;
        Ok(rows_affected > 0)
    }

    /// Insert one invoice line.
    pub fn insert_invoice_item(&self, item: &InvoiceItem) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO invoice_items (
                id, invoice_id, procedure_id, description, quantity, unit_price, total
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                item.id,
                item.invoice_id,
                item.procedure_id,
                item.description,
                item.quantity,
                item.unit_price.to_string(),
                item.total.to_string(),
            ],
        )?;
        Ok(())
    }

    /// List an invoice's lines in insertion order.
    pub fn list_invoice_items(&self, invoice_id: &str) -> DbResult<Vec<InvoiceItem>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, invoice_id, procedure_id, description, quantity, unit_price, total
            FROM invoice_items
            WHERE invoice_id = ?
            ORDER BY rowid
            "#,
        )?;
        let rows = stmt.query_map([invoice_id], |row| {
            Ok(ItemRow {
                id: row.get(0)?,
                invoice_id: row.get(1)?,
                procedure_id: row.get(2)?,
                description: row.get(3)?,
                quantity: row.get(4)?,
                unit_price: row.get(5)?,
                total: row.get(6)?,
            })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?.try_into()?);
        }
        Ok(items)
    }

    /// Insert one payment.
    pub fn insert_payment(&self, payment: &Payment) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO payments (id, invoice_id, method, amount, paid_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                payment.id,
                payment.invoice_id,
                payment.method.as_str(),
                payment.amount.to_string(),
                payment.paid_at,
            ],
        )?;
        Ok(())
    }

    /// List an invoice's payments in the order they were taken.
    pub fn list_payments(&self, invoice_id: &str) -> DbResult<Vec<Payment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, invoice_id, method, amount, paid_at FROM payments WHERE invoice_id = ? ORDER BY paid_at, rowid",
        )?;
        let rows = stmt.query_map([invoice_id], |row| {
            Ok(PaymentRow {
                id: row.get(0)?,
                invoice_id: row.get(1)?,
                method: row.get(2)?,
                amount: row.get(3)?,
                paid_at: row.get(4)?,
            })
        })?;

        let mut payments = Vec::new();
        for row in rows {
            payments.push(row?.try_into()?);
        }
        Ok(payments)
    }

    /// Cumulative amount paid on an invoice. Amounts are folded in Rust;
    /// SQL SUM over the text column would coerce to float.
    pub fn invoice_paid_total(&self, invoice_id: &str) -> DbResult<Decimal> {
        let mut stmt = self
            .conn
            .prepare("SELECT amount FROM payments WHERE invoice_id = ?")?;
        let rows = stmt.query_map([invoice_id], |row| row.get::<_, String>(0))?;

        let mut total = Decimal::ZERO;
        for amount in rows {
            total += amount?.parse::<Decimal>()?;
        }
        Ok(total)
    }
}

/// Intermediate row struct for database mapping.
struct InvoiceRow {
    id: String,
    patient_id: String,
    encounter_id: Option<String>,
    branch_id: String,
    number: String,
    status: String,
    subtotal: String,
    tax: String,
    discount: String,
    total: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn invoice_row(row: &Row<'_>) -> rusqlite::Result<InvoiceRow> {
    Ok(InvoiceRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        encounter_id: row.get(2)?,
        branch_id: row.get(3)?,
        number: row.get(4)?,
        status: row.get(5)?,
        subtotal: row.get(6)?,
        tax: row.get(7)?,
        discount: row.get(8)?,
        total: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        let status = InvoiceStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown invoice status: {}", row.status)))?;

        Ok(Invoice {
            id: row.id,
            patient_id: row.patient_id,
            encounter_id: row.encounter_id,
            branch_id: row.branch_id,
            number: row.number,
            status,
            subtotal: row.subtotal.parse()?,
            tax: row.tax.parse()?,
            discount: row.discount.parse()?,
            total: row.total.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

struct ItemRow {
    id: String,
    invoice_id: String,
    procedure_id: Option<String>,
    description: String,
    quantity: i64,
    unit_price: String,
    total: String,
}

impl TryFrom<ItemRow> for InvoiceItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(InvoiceItem {
            id: row.id,
            invoice_id: row.invoice_id,
            procedure_id: row.procedure_id,
            description: row.description,
            quantity: row.quantity,
            unit_price: row.unit_price.parse()?,
            total: row.total.parse()?,
        })
    }
}

struct PaymentRow {
    id: String,
    invoice_id: String,
    method: String,
    amount: String,
    paid_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let method = PaymentMethod::parse(&row.method)
            .ok_or_else(|| DbError::Constraint(format!("Unknown payment method: {}", row.method)))?;

        Ok(Payment {
            id: row.id,
            invoice_id: row.invoice_id,
            method,
            amount: row.amount.parse()?,
            paid_at: row.paid_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Branch, CreateBranch, CreatePatient, Patient, PaymentSpec};

    fn money(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    struct Fixture {
        db: Database,
        patient: Patient,
        branch: Branch,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let branch = Branch::new(
            CreateBranch {
                code: "TUV".into(),
                name: "Tuv Salbar".into(),
                address: "Ulaanbaatar".into(),
                phone: "7700-0001".into(),
            },
            now,
        );
        db.insert_branch(&branch).unwrap();
        let patient = Patient::new(
            CreatePatient {
                branch_id: branch.id.clone(),
                first_name: "Temuujin".into(),
                last_name: "Baatar".into(),
                reg_no: "AA12345678".into(),
                phone: None,
                email: None,
                birth_date: None,
                gender: None,
            },
            now,
        );
        db.insert_patient(&patient).unwrap();

        Fixture {
            db,
            patient,
            branch,
        }
    }

    fn make_invoice(fx: &Fixture, number: &str) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: fx.patient.id.clone(),
            encounter_id: None,
            branch_id: fx.branch.id.clone(),
            number: number.into(),
            status: InvoiceStatus::Draft,
            subtotal: money("25000.00"),
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: money("25000.00"),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_invoice_round_trip() {
        let fx = setup();
        let invoice = make_invoice(&fx, "INV-00001");
        fx.db.insert_invoice(&invoice).unwrap();

        let retrieved = fx.db.get_invoice(&invoice.id).unwrap().unwrap();
        assert_eq!(retrieved, invoice);

        let by_number = fx.db.get_invoice_by_number("INV-00001").unwrap().unwrap();
        assert_eq!(by_number.id, invoice.id);
        assert!(fx.db.get_invoice_by_number("INV-99999").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_number_rejected() {
        let fx = setup();
        fx.db.insert_invoice(&make_invoice(&fx, "INV-00001")).unwrap();
        assert!(fx.db.insert_invoice(&make_invoice(&fx, "INV-00001")).is_err());
    }

    #[test]
    fn test_status_update() {
        let fx = setup();
        let invoice = make_invoice(&fx, "INV-00001");
        fx.db.insert_invoice(&invoice).unwrap();

        assert!(fx
            .db
            .update_invoice_status(&invoice.id, InvoiceStatus::Void, Utc::now())
            .unwrap());
        let retrieved = fx.db.get_invoice(&invoice.id).unwrap().unwrap();
        assert_eq!(retrieved.status, InvoiceStatus::Void);
    }

    #[test]
    fn test_items_round_trip() {
        let fx = setup();
        let invoice = make_invoice(&fx, "INV-00001");
        fx.db.insert_invoice(&invoice).unwrap();

        let first = InvoiceItem::new(
            invoice.id.clone(),
            None,
            "Fluoride varnish (26)".into(),
            1,
            money("25000.00"),
        )
        .unwrap();
        let second = InvoiceItem::new(
            invoice.id.clone(),
            None,
            "Consultation".into(),
            1,
            money("5000.00"),
        )
        .unwrap();
        fx.db.insert_invoice_item(&first).unwrap();
        fx.db.insert_invoice_item(&second).unwrap();

        let items = fx.db.list_invoice_items(&invoice.id).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], first);
        assert_eq!(items[1], second);
    }

    #[test]
    fn test_payments_and_paid_total() {
        let fx = setup();
        let invoice = make_invoice(&fx, "INV-00001");
        fx.db.insert_invoice(&invoice).unwrap();

        assert_eq!(
            fx.db.invoice_paid_total(&invoice.id).unwrap(),
            Decimal::ZERO
        );

        let now = Utc::now();
        let cash = Payment::new(
            invoice.id.clone(),
            PaymentSpec {
                method: PaymentMethod::Cash,
                amount: money("10000.00"),
            },
            now,
        );
        let card = Payment::new(
            invoice.id.clone(),
            PaymentSpec {
                method: PaymentMethod::Card,
                amount: money("15000.00"),
            },
            now + chrono::Duration::minutes(1),
        );
        fx.db.insert_payment(&cash).unwrap();
        fx.db.insert_payment(&card).unwrap();

        let payments = fx.db.list_payments(&invoice.id).unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].method, PaymentMethod::Cash);
        assert_eq!(payments[1].method, PaymentMethod::Card);

        // Exact decimal sum, no float drift
        assert_eq!(
            fx.db.invoice_paid_total(&invoice.id).unwrap(),
            money("25000.00")
        );
    }
}
