mod common;

use pos_invoices::application::registry::{ApplyOutcome, InvoiceRegistry};
use pos_invoices::domain::invoice::PaymentStatus;
use pos_invoices::domain::payment::{ChargeResult, ChargeStatus};
use pos_invoices::error::WorkflowError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn result(charge_id: &str, status: ChargeStatus, position: usize) -> ChargeResult {
    ChargeResult {
        charge_id: charge_id.to_string(),
        status,
        position,
    }
}

#[tokio::test]
async fn test_paid_status_never_reverts() {
    let registry = InvoiceRegistry::new(common::seeds());
    let mut rng = StdRng::seed_from_u64(0x1ce);
    let mut first_charge: Vec<Option<String>> = vec![None; 3];

    for step in 0..500 {
        // Positions 3 and 4 are out of range on purpose
        let position = rng.gen_range(0..5);
        let status = if rng.gen_bool(0.4) {
            ChargeStatus::Succeeded
        } else {
            ChargeStatus::Failed
        };
        let charge_id = format!("ch_{step}");
        let outcome = registry.apply_result(&result(&charge_id, status, position)).await;

        match (position < 3, status) {
            (false, ChargeStatus::Succeeded) => assert_eq!(outcome, ApplyOutcome::OutOfRange),
            (_, ChargeStatus::Failed) => assert_eq!(outcome, ApplyOutcome::NotSucceeded),
            (true, ChargeStatus::Succeeded) => {
                if first_charge[position].is_none() {
                    assert_eq!(outcome, ApplyOutcome::Applied);
                    first_charge[position] = Some(charge_id);
                } else {
                    assert_eq!(outcome, ApplyOutcome::AlreadyPaid);
                }
            }
        }

        for (invoice, expected) in registry.list_invoices().await.iter().zip(&first_charge) {
            assert_eq!(&invoice.unique_id, expected);
            let status = if expected.is_some() {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Unpaid
            };
            assert_eq!(invoice.payment_status, status);
        }
    }
}

#[tokio::test]
async fn test_reapplying_a_result_does_not_double_count() {
    let registry = InvoiceRegistry::new(common::seeds());
    let mut refresh = registry.subscribe_refresh();
    let paid = result("ch_1", ChargeStatus::Succeeded, 2);

    assert_eq!(registry.apply_result(&paid).await, ApplyOutcome::Applied);
    assert_eq!(registry.apply_result(&paid).await, ApplyOutcome::AlreadyPaid);

    assert_eq!(*refresh.borrow_and_update(), 1);
    let paid_count = registry
        .list_invoices()
        .await
        .iter()
        .filter(|invoice| invoice.is_paid())
        .count();
    assert_eq!(paid_count, 1);
}

#[tokio::test]
async fn test_failed_or_unknown_results_leave_collection_unchanged() {
    let registry = InvoiceRegistry::new(common::seeds());
    let before = registry.list_invoices().await;

    registry
        .apply_result(&result("ch_f", ChargeStatus::Failed, 1))
        .await;
    registry
        .apply_result(&result("ch_o", ChargeStatus::Succeeded, 3))
        .await;
    registry
        .apply_result(&result("ch_o", ChargeStatus::Succeeded, usize::MAX))
        .await;

    assert_eq!(registry.list_invoices().await, before);
}

#[tokio::test]
async fn test_ordering_is_stable_across_mutation() {
    let registry = InvoiceRegistry::new(common::seeds());
    let order: Vec<String> = registry
        .list_invoices()
        .await
        .into_iter()
        .map(|invoice| invoice.invoice_no)
        .collect();

    registry
        .apply_result(&result("ch_1", ChargeStatus::Succeeded, 1))
        .await;

    let after: Vec<String> = registry
        .list_invoices()
        .await
        .into_iter()
        .map(|invoice| invoice.invoice_no)
        .collect();
    assert_eq!(order, after);
    assert_eq!(order, vec!["INV-1", "INV-2", "INV-3"]);
}

#[tokio::test]
async fn test_select_invoice_bounds() {
    let registry = InvoiceRegistry::new(common::seeds());
    assert_eq!(registry.select_invoice(0).await.unwrap().invoice_no, "INV-1");
    assert!(matches!(
        registry.select_invoice(3).await,
        Err(WorkflowError::OutOfRange { position: 3, len: 3 })
    ));

    let empty = InvoiceRegistry::new(Vec::new());
    assert!(empty.is_empty().await);
    assert!(matches!(
        empty.select_invoice(0).await,
        Err(WorkflowError::OutOfRange { position: 0, len: 0 })
    ));
}
