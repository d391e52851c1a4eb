use crate::domain::invoice::Invoice;
use crate::error::Result;
use std::io::Write;

/// Writes the invoice table as CSV, one row per invoice in display order.
pub struct InvoiceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> InvoiceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_invoices(&mut self, invoices: impl IntoIterator<Item = Invoice>) -> Result<()> {
        for invoice in invoices {
            self.writer.serialize(invoice)?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
