//! Runtime collaborator interface for the hipcts conformance suite.
//!
//! The GPU runtime itself is external. This crate pins down the parts of its
//! contract the harness depends on: the status-code convention, in-order
//! asynchronous work queues, device capability queries, and the process-wide
//! coherence policy. [`HostQueue`] and [`HostDevices`] satisfy the contract on
//! the host so the harness can be tested without hardware.

use std::any::Any;

pub mod coherence;
pub mod device;
pub mod queue;
pub mod status;

pub use coherence::{CoherencePolicy, HOST_COHERENT_ENV};
pub use device::{DeviceProps, DeviceQuery, HostDevices};
pub use queue::{Callback, HostQueue, WorkQueue};
pub use status::Status;

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
