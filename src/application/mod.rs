//! Application layer: the invoice registry and the payment workflow.
//!
//! `WorkflowContext` is the composition point. It owns the result channel,
//! spawns the task that feeds results into the `InvoiceRegistry`, and hands
//! out `PaymentCoordinator`s that drive one invoice at a time through
//! method selection, token capture and charge submission.

pub mod context;
pub mod coordinator;
pub mod registry;
