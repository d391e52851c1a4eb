use thiserror::Error;

use crate::application::coordinator::Phase;

/// Errors raised while driving an invoice through the payment workflow.
///
/// Every workflow variant is scoped to a single payment attempt: the
/// coordinator returns to `Idle` and the registry is left untouched.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("card-present payments are not supported on this device")]
    CapabilityUnsupported,
    #[error("capture step ended without a usable payment token")]
    InvalidToken,
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("charge declined: {}", .message.as_deref().unwrap_or("no reason given"))]
    ChargeDeclined { message: Option<String> },
    #[error("invoice position {position} is out of range (registry holds {len})")]
    OutOfRange { position: usize, len: usize },
    #[error("a payment attempt for invoice position {position} is already in flight")]
    AttemptInProgress { position: usize },
    #[error("invoice at position {position} is already paid")]
    AlreadyPaid { position: usize },
    #[error("cannot {event} while in state {from}")]
    InvalidTransition { from: Phase, event: &'static str },
    #[error("charge service did not answer in time")]
    ChargeTimeout,
    #[error("charge service error: {0}")]
    ChargeService(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

impl WorkflowError {
    /// Short notification text shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::CapabilityUnsupported => {
                "Swipe payment option not supported on this device".to_string()
            }
            WorkflowError::InvalidToken => "Card details could not be read, try again".to_string(),
            WorkflowError::Authentication(_) => {
                "Could not authenticate with the payment service".to_string()
            }
            WorkflowError::ChargeDeclined { message } => message
                .clone()
                .unwrap_or_else(|| "Payment failed".to_string()),
            WorkflowError::OutOfRange { .. } => "Invoice not found".to_string(),
            WorkflowError::AttemptInProgress { .. } => {
                "A payment for this invoice is already in progress".to_string()
            }
            WorkflowError::AlreadyPaid { .. } => "Invoice is already paid".to_string(),
            WorkflowError::ChargeTimeout | WorkflowError::ChargeService(_) => {
                "Payment service unavailable, try again".to_string()
            }
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::Validation(_)
            | WorkflowError::Csv(_)
            | WorkflowError::Io(_) => "Payment failed".to_string(),
        }
    }

    /// Whether the attempt can be re-initiated after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, WorkflowError::Csv(_) | WorkflowError::Io(_))
    }
}
