pub mod lifecycle;
pub mod reconcile;

pub use lifecycle::{BookingLifecycle, LifecycleError};
pub use reconcile::{ConfirmationNotifier, ReconcileError, ReconcileOutcome, Reconciler};
