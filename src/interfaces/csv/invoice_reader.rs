use crate::domain::invoice::InvoiceSeed;
use crate::error::{Result, WorkflowError};
use std::io::Read;

/// Reads invoice seeds from a CSV source.
///
/// Expected columns: `invoice_no, customer_name, customer_id, amount, order_ref`.
/// Whitespace around fields is trimmed. Rows with a non-positive amount fail
/// to deserialize.
pub struct InvoiceReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> InvoiceReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one seed per row.
    pub fn invoices(self) -> impl Iterator<Item = Result<InvoiceSeed>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(WorkflowError::from))
    }
}
