//! Driven adapters: persistence engines and the payment processor.

pub mod payment;
pub mod persistence;
