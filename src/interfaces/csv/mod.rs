//! CSV adapters: invoice seed files, scripted payment attempts and the
//! final invoice table.

pub mod attempt_reader;
pub mod invoice_reader;
pub mod invoice_writer;
