use crate::error::{FleetError, Result};

/// Reserved selector meaning "every instance" on the command line.
pub const ALL_INSTANCES: &str = "all";

pub fn validate_instance_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(FleetError::config("instance name must not be empty"));
    }
    if name == ALL_INSTANCES {
        return Err(FleetError::config(format!(
            "instance name '{ALL_INSTANCES}' is reserved"
        )));
    }
    Ok(())
}
