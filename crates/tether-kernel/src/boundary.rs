//! Outermost fault boundary for every operation exposed to the host.
//!
//! Host accessors and third-party hooks can report a [`HostFault`] or, in a
//! host mid-teardown, panic outright.  [`shield`] turns both into the
//! operation's safe default and reports them on the `tracing` channel, so
//! nothing raised inside Tether ever unwinds into the host.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tether_types::HostFault;
use tracing::warn;

/// Run `body`; on `Err` or panic, log and return `fallback` instead.
pub fn shield<T>(
    operation: &'static str,
    fallback: T,
    body: impl FnOnce() -> Result<T, HostFault>,
) -> T {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => value,
        Ok(Err(fault)) => {
            warn!(operation, %fault, "host fault contained; using safe default");
            fallback
        }
        Err(payload) => {
            warn!(
                operation,
                panic = panic_message(payload.as_ref()),
                "panic contained; using safe default"
            );
            fallback
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
