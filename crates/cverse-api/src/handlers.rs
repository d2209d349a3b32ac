//! Request handlers.

pub mod health;
pub mod uploads;
pub mod webhooks;

pub use health::*;
pub use uploads::*;
pub use webhooks::*;
