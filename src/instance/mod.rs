//! Instance management for the fleet.
//!
//! - registry: the named set of instances built from the instance map
//! - lifecycle: per-instance controller driving the control program
//! - types: operations, status and per-instance reports

mod lifecycle;
mod registry;
mod types;

pub use lifecycle::InstanceController;
pub use registry::Registry;
pub use types::{InstanceStatus, Operation, OperationOutcome, OperationReport};
