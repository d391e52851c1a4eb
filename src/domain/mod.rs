pub mod invoice;
pub mod payment;
pub mod ports;
