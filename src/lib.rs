mod cli;
pub mod config;
pub mod error;
pub mod instance;
pub mod paths;
pub mod process;
mod validation;

pub use cli::{run, Cli};
pub use config::{load_config, FleetConfig, InstanceConfig};
pub use error::{ErrorKind, FleetError, Result};
pub use instance::{
    InstanceController, InstanceStatus, Operation, OperationOutcome, OperationReport, Registry,
};
pub use validation::ALL_INSTANCES;
