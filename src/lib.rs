//! hipcts - conformance suite support for a GPU compute runtime
//!
//! Re-exports the threaded check harness and the runtime collaborator
//! interface. Conformance test bodies live under `tests/` and usually start
//! with `use hipcts::prelude::*;`.

pub use hipcts_harness as harness;
pub use hipcts_runtime as runtime;

pub mod prelude {
    pub use hipcts_harness::{
        check_thread, hip_check, hip_check_error, require_thread, run_isolated, skip_test,
        spawn_workers, BlockingStream, ResultRecord, SourceSite, TestContext, SKIP_MARKER,
    };
    pub use hipcts_runtime::{
        CoherencePolicy, DeviceProps, DeviceQuery, HostDevices, HostQueue, Status, WorkQueue,
        HOST_COHERENT_ENV,
    };
}
