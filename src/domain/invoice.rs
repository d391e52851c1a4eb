use crate::error::WorkflowError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A positive invoice amount in major currency units (e.g. dollars).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Rejects zero and negative values.
    pub fn new(value: Decimal) -> Result<Self, WorkflowError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(WorkflowError::Validation(format!(
                "invoice amount must be positive, got {value}"
            )))
        }
    }

    /// The amount in major units.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts to integer minor units (cents).
    ///
    /// Multiplies by 100 and rounds half away from zero, so 19.99 becomes
    /// 1999 and 10.005 becomes 1001.
    pub fn to_minor_units(&self) -> Result<i64, WorkflowError> {
        (self.0 * dec!(100))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| {
                WorkflowError::Validation(format!("amount {} overflows minor units", self.0))
            })
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = WorkflowError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

/// A billable record tracked by the registry.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Invoice {
    /// Stable external identifier.
    pub invoice_no: String,
    /// Charge id, assigned only after a successful charge.
    pub unique_id: Option<String>,
    pub customer_name: String,
    pub customer_id: String,
    pub amount: Amount,
    pub payment_status: PaymentStatus,
    /// External order reference.
    pub order_ref: String,
    /// Index in the display ordering.
    pub position: usize,
}

impl Invoice {
    /// Whether a successful charge has been recorded.
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    /// Marks the invoice paid with the given charge id.
    ///
    /// Returns `false` and leaves the invoice untouched if it is already paid.
    pub fn mark_paid(&mut self, charge_id: &str) -> bool {
        if self.is_paid() {
            return false;
        }
        self.unique_id = Some(charge_id.to_string());
        self.payment_status = PaymentStatus::Paid;
        true
    }

    /// Immutable snapshot carried across the capture-page handoff.
    pub fn detail(&self) -> InvoiceDetail {
        InvoiceDetail {
            invoice_no: self.invoice_no.clone(),
            unique_id: self.unique_id.clone(),
            customer_name: self.customer_name.clone(),
            customer_id: self.customer_id.clone(),
            amount: self.amount,
            payment_status: self.payment_status,
            order_ref: self.order_ref.clone(),
            position: self.position,
        }
    }
}

/// Snapshot of an invoice taken when a payment is requested.
///
/// Later registry mutations do not affect it; the charge amount is always
/// taken from here.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct InvoiceDetail {
    pub invoice_no: String,
    pub unique_id: Option<String>,
    pub customer_name: String,
    pub customer_id: String,
    pub amount: Amount,
    pub payment_status: PaymentStatus,
    pub order_ref: String,
    pub position: usize,
}

/// Invoice fields as supplied by a seed source; positions are assigned
/// by the registry from the load order.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct InvoiceSeed {
    pub invoice_no: String,
    pub customer_name: String,
    pub customer_id: String,
    pub amount: Amount,
    pub order_ref: String,
}

impl InvoiceSeed {
    pub fn new(
        invoice_no: &str,
        customer_name: &str,
        customer_id: &str,
        amount: Decimal,
        order_ref: &str,
    ) -> Result<Self, WorkflowError> {
        Ok(Self {
            invoice_no: invoice_no.to_string(),
            customer_name: customer_name.to_string(),
            customer_id: customer_id.to_string(),
            amount: Amount::new(amount)?,
            order_ref: order_ref.to_string(),
        })
    }

    /// Unpaid invoice at `position`.
    pub fn into_invoice(self, position: usize) -> Invoice {
        Invoice {
            invoice_no: self.invoice_no,
            unique_id: None,
            customer_name: self.customer_name,
            customer_id: self.customer_id,
            amount: self.amount,
            payment_status: PaymentStatus::Unpaid,
            order_ref: self.order_ref,
            position,
        }
    }
}

/// The built-in invoice list loaded at process start.
pub fn default_seed() -> Vec<InvoiceSeed> {
    [
        ("INV-1001", "Ada Lovelace", "CUST-01", dec!(12.50), "ORD-7F3K2"),
        ("INV-1002", "Grace Hopper", "CUST-02", dec!(19.99), "ORD-8A1Q9"),
        ("INV-1003", "Alan Turing", "CUST-03", dec!(25.00), "ORD-2M6P4"),
        ("INV-1004", "Edsger Dijkstra", "CUST-04", dec!(100.00), "ORD-5C8W1"),
        ("INV-1005", "Barbara Liskov", "CUST-05", dec!(7.35), "ORD-9H4T6"),
    ]
    .into_iter()
    .map(|(no, name, id, amount, order)| InvoiceSeed {
        invoice_no: no.to_string(),
        customer_name: name.to_string(),
        customer_id: id.to_string(),
        amount: Amount(amount),
        order_ref: order.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(0.01)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(WorkflowError::Validation(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-5.0)),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn test_minor_units_conversion() {
        assert_eq!(Amount::new(dec!(19.99)).unwrap().to_minor_units().unwrap(), 1999);
        assert_eq!(Amount::new(dec!(10)).unwrap().to_minor_units().unwrap(), 1000);
        assert_eq!(Amount::new(dec!(25.00)).unwrap().to_minor_units().unwrap(), 2500);
        assert_eq!(Amount::new(dec!(10.005)).unwrap().to_minor_units().unwrap(), 1001);
        assert_eq!(Amount::new(dec!(0.004)).unwrap().to_minor_units().unwrap(), 0);
    }

    #[test]
    fn test_amount_deserialization_rejects_non_positive() {
        let ok: Amount = serde_json::from_str("\"12.5\"").unwrap();
        assert_eq!(ok.value(), dec!(12.5));
        assert!(serde_json::from_str::<Amount>("\"0\"").is_err());
    }

    #[test]
    fn test_mark_paid_only_once() {
        let mut invoice = InvoiceSeed::new("INV-1", "A", "C-1", dec!(5), "ORD-1")
            .unwrap()
            .into_invoice(0);
        assert!(invoice.mark_paid("ch_1"));
        assert!(!invoice.mark_paid("ch_2"));
        assert_eq!(invoice.unique_id.as_deref(), Some("ch_1"));
        assert_eq!(invoice.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn test_detail_is_a_snapshot() {
        let mut invoice = default_seed().remove(2).into_invoice(2);
        let detail = invoice.detail();
        invoice.mark_paid("ch_9");
        assert_eq!(detail.payment_status, PaymentStatus::Unpaid);
        assert_eq!(detail.unique_id, None);
        assert_eq!(detail.position, 2);
        assert_eq!(detail.amount.value(), dec!(25.00));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&PaymentStatus::Paid).unwrap(), "\"PAID\"");
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Unpaid).unwrap(),
            "\"UNPAID\""
        );
    }
}
