//! SQLite schema definition.

/// Complete database schema for the clinic core.
///
/// Monetary columns are fixed-point decimals stored as TEXT; instants are
/// RFC 3339 TEXT with a uniform UTC offset, so lexicographic comparison
/// matches chronological order.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Identity Registry: branches, rooms, doctors, patients, history books
-- ============================================================================

CREATE TABLE IF NOT EXISTS branches (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,                   -- human-readable, e.g. 'TUV'
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    phone TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rooms (
    id TEXT PRIMARY KEY,
    branch_id TEXT NOT NULL REFERENCES branches(id),
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rooms_branch ON rooms(branch_id);

CREATE TABLE IF NOT EXISTS doctors (
    id TEXT PRIMARY KEY,
    branch_id TEXT NOT NULL REFERENCES branches(id),
    full_name TEXT NOT NULL,
    phone TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_doctors_branch ON doctors(branch_id);

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    branch_id TEXT NOT NULL REFERENCES branches(id),    -- home branch
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    reg_no TEXT NOT NULL UNIQUE,
    phone TEXT,                                  -- not unique
    email TEXT,
    birth_date TEXT,                             -- ISO date
    gender TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_branch ON patients(branch_id);
CREATE INDEX IF NOT EXISTS idx_patients_updated ON patients(updated_at);

CREATE TABLE IF NOT EXISTS history_books (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL UNIQUE REFERENCES patients(id),
    book_number TEXT NOT NULL UNIQUE,            -- e.g. 'HB-00001'
    opened_at TEXT NOT NULL
);

-- ============================================================================
-- Scheduling Ledger: appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    doctor_id TEXT NOT NULL REFERENCES doctors(id),
    branch_id TEXT NOT NULL REFERENCES branches(id),
    room_id TEXT NOT NULL REFERENCES rooms(id),
    starts_at TEXT NOT NULL,
    ends_at TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('SCHEDULED', 'COMPLETED', 'CANCELLED', 'NO_SHOW')),
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (starts_at < ends_at)
);

CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
CREATE INDEX IF NOT EXISTS idx_appointments_doctor ON appointments(doctor_id);

-- ============================================================================
-- Clinical Record: encounters, chart notes, procedures (append-only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS encounters (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    doctor_id TEXT NOT NULL REFERENCES doctors(id),
    branch_id TEXT NOT NULL REFERENCES branches(id),
    occurred_at TEXT NOT NULL,
    reason TEXT NOT NULL,
    notes TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_encounters_patient ON encounters(patient_id);

CREATE TABLE IF NOT EXISTS chart_notes (
    id TEXT PRIMARY KEY,
    encounter_id TEXT NOT NULL REFERENCES encounters(id),
    patient_id TEXT NOT NULL REFERENCES patients(id),
    tooth_code TEXT,                             -- FDI notation, e.g. '26'
    note TEXT NOT NULL,
    noted_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chart_notes_encounter ON chart_notes(encounter_id);
CREATE INDEX IF NOT EXISTS idx_chart_notes_patient ON chart_notes(patient_id);

CREATE TABLE IF NOT EXISTS procedures (
    id TEXT PRIMARY KEY,
    encounter_id TEXT NOT NULL REFERENCES encounters(id),
    patient_id TEXT NOT NULL REFERENCES patients(id),
    code TEXT NOT NULL,                          -- billing code, e.g. 'FL-26'
    name TEXT NOT NULL,
    tooth_code TEXT,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    unit_price TEXT NOT NULL,                    -- fixed-point decimal
    total_amount TEXT NOT NULL,                  -- unit_price * quantity
    billed_invoice_id TEXT REFERENCES invoices(id),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_procedures_encounter ON procedures(encounter_id);
CREATE INDEX IF NOT EXISTS idx_procedures_patient ON procedures(patient_id);

-- ============================================================================
-- Billing Ledger: invoices own their items and payments
-- ============================================================================

CREATE TABLE IF NOT EXISTS invoices (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    encounter_id TEXT REFERENCES encounters(id),
    branch_id TEXT NOT NULL REFERENCES branches(id),
    number TEXT NOT NULL UNIQUE,                 -- e.g. 'INV-00001'
    status TEXT NOT NULL CHECK (status IN ('DRAFT', 'PARTIALLY_PAID', 'PAID', 'VOID')),
    subtotal TEXT NOT NULL,
    tax TEXT NOT NULL,
    discount TEXT NOT NULL,
    total TEXT NOT NULL,                         -- subtotal + tax - discount
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_invoices_patient ON invoices(patient_id);
CREATE INDEX IF NOT EXISTS idx_invoices_branch ON invoices(branch_id);

CREATE TABLE IF NOT EXISTS invoice_items (
    id TEXT PRIMARY KEY,
    invoice_id TEXT NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    procedure_id TEXT REFERENCES procedures(id),
    description TEXT NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    unit_price TEXT NOT NULL,
    total TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice ON invoice_items(invoice_id);

-- A procedure may be cited by at most one invoice line, ever
CREATE UNIQUE INDEX IF NOT EXISTS idx_invoice_items_procedure
    ON invoice_items(procedure_id) WHERE procedure_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS payments (
    id TEXT PRIMARY KEY,
    invoice_id TEXT NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    method TEXT NOT NULL CHECK (method IN ('CASH', 'CARD', 'TRANSFER', 'INSURANCE')),
    amount TEXT NOT NULL,                        -- positive fixed-point decimal
    paid_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_payments_invoice ON payments(invoice_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn
    }

    fn insert_branch(conn: &Connection, id: &str, code: &str) {
        conn.execute(
            "INSERT INTO branches (id, code, name, address, phone, created_at, updated_at)
             VALUES (?1, ?2, 'Tuv Salbar', 'Ulaanbaatar', '7700-0001', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
            [id, code],
        )
        .unwrap();
    }

    fn insert_patient(conn: &Connection, id: &str, branch_id: &str, reg_no: &str) -> Result<usize, rusqlite::Error> {
        conn.execute(
            "INSERT INTO patients (id, branch_id, first_name, last_name, reg_no, created_at, updated_at)
             VALUES (?1, ?2, 'Temuujin', 'Baatar', ?3, '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
            [id, branch_id, reg_no],
        )
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_reg_no_unique() {
        let conn = setup_conn();
        insert_branch(&conn, "b1", "TUV");

        insert_patient(&conn, "p1", "b1", "AA12345678").unwrap();
        let result = insert_patient(&conn, "p2", "b1", "AA12345678");
        assert!(result.is_err());
    }

    #[test]
    fn test_appointment_time_order_check() {
        let conn = setup_conn();
        insert_branch(&conn, "b1", "TUV");
        insert_patient(&conn, "p1", "b1", "AA12345678").unwrap();
        conn.execute(
            "INSERT INTO rooms (id, branch_id, name, created_at) VALUES ('r1', 'b1', 'Room 1', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO doctors (id, branch_id, full_name, phone, created_at)
             VALUES ('d1', 'b1', 'Dr. Eelen', '9911-0001', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();

        // Reversed start/end must be rejected by the table check
        let result = conn.execute(
            "INSERT INTO appointments (id, patient_id, doctor_id, branch_id, room_id,
                                       starts_at, ends_at, status, created_at, updated_at)
             VALUES ('a1', 'p1', 'd1', 'b1', 'r1',
                     '2026-01-02T10:30:00+00:00', '2026-01-02T10:00:00+00:00',
                     'SCHEDULED', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_procedure_cited_by_at_most_one_item() {
        let conn = setup_conn();
        insert_branch(&conn, "b1", "TUV");
        insert_patient(&conn, "p1", "b1", "AA12345678").unwrap();
        conn.execute(
            "INSERT INTO doctors (id, branch_id, full_name, phone, created_at)
             VALUES ('d1', 'b1', 'Dr. Eelen', '9911-0001', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO encounters (id, patient_id, doctor_id, branch_id, occurred_at, reason, created_at)
             VALUES ('e1', 'p1', 'd1', 'b1', '2026-01-01T00:00:00+00:00', 'Tooth sensitivity', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO procedures (id, encounter_id, patient_id, code, name, quantity, unit_price, total_amount, created_at)
             VALUES ('pr1', 'e1', 'p1', 'FL-26', 'Fluoride varnish', 1, '25000.00', '25000.00', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();
        for inv in ["i1", "i2"] {
            conn.execute(
                "INSERT INTO invoices (id, patient_id, branch_id, number, status, subtotal, tax, discount, total, created_at, updated_at)
                 VALUES (?1, 'p1', 'b1', ?2, 'DRAFT', '25000.00', '0', '0', '25000.00', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
                [inv, &format!("INV-{inv}")],
            )
            .unwrap();
        }

        conn.execute(
            "INSERT INTO invoice_items (id, invoice_id, procedure_id, description, quantity, unit_price, total)
             VALUES ('it1', 'i1', 'pr1', 'Fluoride varnish (26)', 1, '25000.00', '25000.00')",
            [],
        )
        .unwrap();

        // Second citation of the same procedure violates the partial unique index
        let result = conn.execute(
            "INSERT INTO invoice_items (id, invoice_id, procedure_id, description, quantity, unit_price, total)
             VALUES ('it2', 'i2', 'pr1', 'Fluoride varnish again', 1, '25000.00', '25000.00')",
            [],
        );
        assert!(result.is_err());

        // Ad-hoc lines without a procedure id do not collide with each other
        for (id, inv) in [("it3", "i1"), ("it4", "i2")] {
            conn.execute(
                "INSERT INTO invoice_items (id, invoice_id, description, quantity, unit_price, total)
                 VALUES (?1, ?2, 'Consultation', 1, '5000.00', '5000.00')",
                [id, inv],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_invoice_owns_items_and_payments() {
        let conn = setup_conn();
        insert_branch(&conn, "b1", "TUV");
        insert_patient(&conn, "p1", "b1", "AA12345678").unwrap();
        conn.execute(
            "INSERT INTO invoices (id, patient_id, branch_id, number, status, subtotal, tax, discount, total, created_at, updated_at)
             VALUES ('i1', 'p1', 'b1', 'INV-00001', 'DRAFT', '25000.00', '0', '0', '25000.00', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO invoice_items (id, invoice_id, description, quantity, unit_price, total)
             VALUES ('it1', 'i1', 'Fluoride varnish (26)', 1, '25000.00', '25000.00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO payments (id, invoice_id, method, amount, paid_at)
             VALUES ('pay1', 'i1', 'CASH', '25000.00', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM invoices WHERE id = 'i1'", []).unwrap();

        let items: i64 = conn
            .query_row("SELECT COUNT(*) FROM invoice_items", [], |row| row.get(0))
            .unwrap();
        let payments: i64 = conn
            .query_row("SELECT COUNT(*) FROM payments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(items, 0);
        assert_eq!(payments, 0);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let conn = setup_conn();
        insert_branch(&conn, "b1", "TUV");
        insert_patient(&conn, "p1", "b1", "AA12345678").unwrap();

        let result = conn.execute(
            "INSERT INTO invoices (id, patient_id, branch_id, number, status, subtotal, tax, discount, total, created_at, updated_at)
             VALUES ('i1', 'p1', 'b1', 'INV-00001', 'OVERDUE', '0', '0', '0', '0', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
            [],
        );
        assert!(result.is_err());
    }
}
