//! Randomized checks over invoice arithmetic and payment settlement.
//!
//! Prices are generated in whole cents so every expected value is exact.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use mdent_core::{
    Billing, CoreError, CreateBranch, CreateInvoice, CreatePatient, Database, InvoiceItemSpec,
    InvoiceStatus, PaymentMethod, PaymentSpec, Registry,
};

fn seed(db: &Database) -> (String, String) {
    let registry = Registry::new(db);
    let now = Utc::now();
    let branch = registry
        .register_branch(
            CreateBranch {
                code: "TUV".into(),
                name: "Tuv Salbar".into(),
                address: "Ulaanbaatar".into(),
                phone: "7700-0001".into(),
            },
            now,
        )
        .unwrap();
    let patient = registry
        .create_patient(
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
        )
        .unwrap();
    (branch.id, patient.id)
}

fn single_line_invoice(patient_id: String, branch_id: String, number: &str, total: Decimal) -> CreateInvoice {
    CreateInvoice {
        patient_id,
        encounter_id: None,
        branch_id,
        number: number.into(),
        items: vec![InvoiceItemSpec {
            description: "Treatment".into(),
            procedure_id: None,
            quantity: Some(1),
            unit_price: Some(total),
        }],
        tax: None,
        discount: None,
        payments: vec![],
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invoice_totals_follow_the_lines(
        lines in proptest::collection::vec((1..=5i64, 0..=200_000i64), 1..8),
        tax_cents in 0..=50_000i64,
    ) {
        let db = Database::open_in_memory().unwrap();
        let (branch_id, patient_id) = seed(&db);

        let items = lines
            .iter()
            .enumerate()
            .map(|(i, (quantity, cents))| InvoiceItemSpec {
                description: format!("Line {}", i + 1),
                procedure_id: None,
                quantity: Some(*quantity),
                unit_price: Some(Decimal::new(*cents, 2)),
            })
            .collect();
        let expected_subtotal: Decimal = lines
            .iter()
            .map(|(quantity, cents)| Decimal::from(*quantity) * Decimal::new(*cents, 2))
            .sum();
        let tax = Decimal::new(tax_cents, 2);

        let detail = Billing::new(&db)
            .create_invoice(
                CreateInvoice {
                    patient_id,
                    encounter_id: None,
                    branch_id,
                    number: "INV-PROP".into(),
                    items,
                    tax: Some(tax),
                    discount: None,
                    payments: vec![],
                },
                Utc::now(),
            )
            .unwrap();

        prop_assert_eq!(detail.invoice.subtotal, expected_subtotal);
        prop_assert_eq!(detail.invoice.total, expected_subtotal + tax);
        let stored_sum: Decimal = detail.items.iter().map(|item| item.total).sum();
        prop_assert_eq!(stored_sum, expected_subtotal);
    }

    #[test]
    fn payments_never_exceed_the_total(
        price_cents in 10_000..=1_000_000i64,
        payment_cents in proptest::collection::vec(1..=400_000i64, 1..10),
    ) {
        let db = Database::open_in_memory().unwrap();
        let (branch_id, patient_id) = seed(&db);
        let billing = Billing::new(&db);

        let total = Decimal::new(price_cents, 2);
        let detail = billing
            .create_invoice(single_line_invoice(patient_id, branch_id, "INV-PROP", total), Utc::now())
            .unwrap();

        let mut paid = Decimal::ZERO;
        for cents in payment_cents {
            let amount = Decimal::new(cents, 2);
            let attempt = billing.record_payment(
                &detail.invoice.id,
                PaymentSpec {
                    method: PaymentMethod::Cash,
                    amount,
                },
                Utc::now(),
            );
            if paid + amount > total {
                prop_assert!(matches!(attempt, Err(CoreError::Overpayment(_))));
            } else {
                paid += amount;
                let after = attempt.unwrap();
                prop_assert_eq!(after.paid(), paid);
                let expected = if paid == total {
                    InvoiceStatus::Paid
                } else {
                    InvoiceStatus::PartiallyPaid
                };
                prop_assert_eq!(after.invoice.status, expected);
            }
        }

        let stored = billing.get_invoice(&detail.invoice.id).unwrap().unwrap();
        prop_assert_eq!(stored.paid(), paid);
        prop_assert!(stored.paid() <= stored.invoice.total);
    }

    #[test]
    fn creation_payments_match_post_hoc_payments(
        price_cents in 10_000..=500_000i64,
        pay_fraction in 1..=100i64,
    ) {
        let db = Database::open_in_memory().unwrap();
        let (branch_id, patient_id) = seed(&db);
        let billing = Billing::new(&db);

        let total = Decimal::new(price_cents, 2);
        // Between one cent and the full amount.
        let amount = Decimal::new((price_cents * pay_fraction) / 100, 2).max(Decimal::new(1, 2));
        let payment = PaymentSpec {
            method: PaymentMethod::Card,
            amount,
        };

        let mut upfront_spec =
            single_line_invoice(patient_id.clone(), branch_id.clone(), "INV-A", total);
        upfront_spec.payments = vec![payment.clone()];
        let upfront = billing.create_invoice(upfront_spec, Utc::now()).unwrap();

        let drafted = billing
            .create_invoice(single_line_invoice(patient_id, branch_id, "INV-B", total), Utc::now())
            .unwrap();
        let settled = billing
            .record_payment(&drafted.invoice.id, payment, Utc::now())
            .unwrap();

        prop_assert_eq!(upfront.paid(), settled.paid());
        prop_assert_eq!(upfront.invoice.status, settled.invoice.status);
    }
}
