//! The chore abstraction and the shared execution wrapper

use annostore_core::Result;
use tracing::{debug, warn};

use crate::status::StatusHandle;

/// A background unit of work with an id and a pollable status
pub trait Chore: Send + Sync + 'static {
    /// The registry key clients poll with
    fn id(&self) -> &str;

    /// This chore's status handle
    fn status(&self) -> &StatusHandle;

    /// Do the work; an Err becomes a Failed status, never a caller error
    fn run(&self) -> Result<()>;
}

/// Drive one chore through its lifecycle on the current worker
///
/// Errors are recorded on the status and go no further: the caller that
/// registered the chore already got its accepted response.
pub fn execute_chore<C: Chore + ?Sized>(chore: &C) {
    let status = chore.status();
    status.begin();
    match chore.run() {
        Ok(()) => {
            status.finish();
            debug!(id = chore.id(), "chore done");
        }
        Err(e) => {
            warn!(id = chore.id(), error = %e, "chore failed");
            status.fail(e.kind_label(), &e.to_string());
        }
    }
}
