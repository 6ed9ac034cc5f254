pub mod reconcile;

pub use reconcile::{ReconcileError, Reconciler, WebhookOutcome};
