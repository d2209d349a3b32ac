//! Business logic services.

pub mod reconciler;

pub use reconciler::{Outcome, ReconcileError, Reconciler};
