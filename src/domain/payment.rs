use super::invoice::InvoiceDetail;
use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the card details are captured for an invoice.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMethod {
    /// Card details keyed into the hosted web form.
    Manual,
    /// Card swiped or dipped on a payment terminal.
    CardPresent,
}

impl CaptureMethod {
    pub const ALL: [CaptureMethod; 2] = [CaptureMethod::Manual, CaptureMethod::CardPresent];

    /// Whether this device can run the capture step for the method.
    pub fn capability(&self) -> Capability {
        match self {
            CaptureMethod::Manual => Capability::Available,
            CaptureMethod::CardPresent => Capability::Unsupported,
        }
    }
}

impl fmt::Display for CaptureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureMethod::Manual => write!(f, "manual"),
            CaptureMethod::CardPresent => write!(f, "card_present"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Capability {
    Available,
    Unsupported,
}

/// The method picked by the operator for one invoice.
///
/// Refers to the invoice by position and number only, never by a live
/// registry entry.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PaymentSelection {
    pub position: usize,
    pub invoice_no: String,
    pub method: CaptureMethod,
}

/// Payload posted by the capture surface once card entry completes.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct TokenMessage {
    #[serde(default)]
    pub token: Option<String>,
}

impl TokenMessage {
    pub fn from_json(raw: &str) -> Result<Self, WorkflowError> {
        serde_json::from_str(raw).map_err(|_| WorkflowError::InvalidToken)
    }

    /// The token, if present and non-blank.
    pub fn into_token(self) -> Result<String, WorkflowError> {
        match self.token {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(WorkflowError::InvalidToken),
        }
    }
}

/// Outbound charge body.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct ChargeRequest {
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub channel: String,
    pub token: String,
}

impl ChargeRequest {
    /// Assembles a charge for the snapshotted invoice amount.
    pub fn for_detail(
        detail: &InvoiceDetail,
        currency: &str,
        channel: &str,
        token: String,
    ) -> Result<Self, WorkflowError> {
        if token.trim().is_empty() {
            return Err(WorkflowError::InvalidToken);
        }
        let amount = detail.amount.to_minor_units()?;
        if amount <= 0 {
            return Err(WorkflowError::Validation(format!(
                "invoice {} rounds to a zero charge",
                detail.invoice_no
            )));
        }
        Ok(Self {
            amount,
            currency: currency.to_string(),
            channel: channel.to_string(),
            token,
        })
    }
}

/// Reply from the charge service: either a charge record or an error.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum ChargeResponse {
    Charge { id: String, status: String },
    Error { message: String },
}

impl ChargeResponse {
    pub fn from_json(raw: &str) -> Result<Self, WorkflowError> {
        serde_json::from_str(raw)
            .map_err(|e| WorkflowError::ChargeService(format!("unreadable charge response: {e}")))
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChargeStatus {
    Succeeded,
    Failed,
}

impl ChargeStatus {
    /// Maps the service's free-form status string.
    pub fn from_service(status: &str) -> Self {
        if status.eq_ignore_ascii_case("succeeded") {
            ChargeStatus::Succeeded
        } else {
            ChargeStatus::Failed
        }
    }
}

/// Terminal event of a payment attempt, published on the result channel.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct ChargeResult {
    pub charge_id: String,
    pub status: ChargeStatus,
    pub position: usize,
}

/// Bearer credential used to authorize a charge.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerCredential(String);

impl BearerCredential {
    pub fn new(token: impl Into<String>) -> Result<Self, WorkflowError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(WorkflowError::Authentication(
                "empty bearer token".to_string(),
            ));
        }
        Ok(Self(token))
    }

    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerCredential(***)")
    }
}
