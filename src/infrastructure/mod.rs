//! Adapters for the workflow ports that run inside the process.

pub mod console;
pub mod in_memory;
pub mod sandbox;
