//! Course marketplace backend.
//!
//! Gates access to paid course content on successful payment. The core is
//! the enrollment lifecycle: purchase intents created at checkout time are
//! reconciled against asynchronous, possibly duplicated and reordered
//! confirmation events from the payment gateway, over one of two
//! interchangeable storage engines selected at startup.

pub mod api;
pub mod domain;
pub mod outbound;
pub mod server;
