#![allow(dead_code)]

use pos_invoices::application::context::{Collaborators, WorkflowContext};
use pos_invoices::application::registry::InvoiceRegistry;
use pos_invoices::config::WorkflowConfig;
use pos_invoices::domain::invoice::InvoiceSeed;
use pos_invoices::infrastructure::in_memory::{
    RecordingCapturePage, RecordingNotifier, StaticAuthenticator,
};
use pos_invoices::infrastructure::sandbox::SandboxChargeService;
use rust_decimal_macros::dec;
use std::sync::Arc;

/// A started workflow context plus handles on every collaborator.
pub struct Harness {
    pub context: WorkflowContext,
    pub registry: InvoiceRegistry,
    pub charges: SandboxChargeService,
    pub capture_page: RecordingCapturePage,
    pub notifier: RecordingNotifier,
}

/// Three invoices; position 2 is 25.00 and unpaid.
pub fn seeds() -> Vec<InvoiceSeed> {
    vec![
        InvoiceSeed::new("INV-1", "Ada Lovelace", "CUST-1", dec!(19.99), "ORD-1").unwrap(),
        InvoiceSeed::new("INV-2", "Grace Hopper", "CUST-2", dec!(10), "ORD-2").unwrap(),
        InvoiceSeed::new("INV-3", "Alan Turing", "CUST-3", dec!(25.00), "ORD-3").unwrap(),
    ]
}

pub fn start() -> Harness {
    start_with(
        SandboxChargeService::new(),
        StaticAuthenticator::new("merchant-key"),
        WorkflowConfig::default(),
    )
}

pub fn start_with(
    charges: SandboxChargeService,
    authenticator: StaticAuthenticator,
    config: WorkflowConfig,
) -> Harness {
    let registry = InvoiceRegistry::new(seeds());
    let capture_page = RecordingCapturePage::new();
    let notifier = RecordingNotifier::new();
    let collaborators = Collaborators {
        charge_service: Arc::new(charges.clone()),
        authenticator: Arc::new(authenticator),
        capture_page: Arc::new(capture_page.clone()),
        notifier: Arc::new(notifier.clone()),
    };
    let context = WorkflowContext::start(registry.clone(), collaborators, config);
    Harness {
        context,
        registry,
        charges,
        capture_page,
        notifier,
    }
}
