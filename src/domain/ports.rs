use super::invoice::InvoiceDetail;
use super::payment::{BearerCredential, ChargeRequest, ChargeResponse};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Remote charge API.
///
/// Transport failures are `Err`; a reply from the service, success or
/// error payload, is `Ok`.
#[async_trait]
pub trait ChargeService: Send + Sync {
    /// Submits one charge with the given credential.
    async fn create_charge(
        &self,
        credential: &BearerCredential,
        request: &ChargeRequest,
    ) -> Result<ChargeResponse>;
}

/// Supplies the bearer credential for the charge API.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns a credential, or `Authentication` when none is available.
    async fn authenticate(&self) -> Result<BearerCredential>;
}

/// Navigation to and from the manual card-entry page.
pub trait CapturePage: Send + Sync {
    /// One-way handoff; the detail snapshot is the only payload.
    fn open(&self, detail: InvoiceDetail);
    /// Dismisses the page after a successful charge.
    fn close(&self, position: usize);
}

/// Surfaces short messages to the operator.
pub trait Notifier: Send + Sync {
    /// Shows `message` to the operator.
    fn notify(&self, message: &str);
}

pub type ChargeServiceRef = Arc<dyn ChargeService>;
pub type AuthenticatorRef = Arc<dyn Authenticator>;
pub type CapturePageRef = Arc<dyn CapturePage>;
pub type NotifierRef = Arc<dyn Notifier>;
