//! The configured set of instances.

use std::collections::{BTreeSet, HashSet};

use super::lifecycle::InstanceController;
use super::types::{Operation, OperationReport};
use crate::config::{FleetConfig, InstanceConfig};
use crate::error::{FleetError, Result};
use crate::process::Host;
use crate::validation::{validate_instance_name, ALL_INSTANCES};

/// Constellation of servers as defined in the instance map.
pub struct Registry {
    controllers: Vec<InstanceController>,
}

impl Registry {
    /// Build controllers for every instance in a loaded config, against the
    /// real process table.
    pub fn from_config(config: &FleetConfig) -> Result<Self> {
        Self::with_host(
            config.instances.clone(),
            &config.library_path_var,
            Host::system(),
        )
    }

    pub fn with_host<I>(entries: I, library_path_var: &str, host: Host) -> Result<Self>
    where
        I: IntoIterator<Item = (String, InstanceConfig)>,
    {
        let mut seen = HashSet::new();
        let mut controllers = Vec::new();

        for (name, config) in entries {
            validate_instance_name(&name)?;
            if !seen.insert(name.clone()) {
                return Err(FleetError::config(format!(
                    "duplicate instance name: {name}"
                )));
            }
            controllers.push(InstanceController::new(
                &name,
                config,
                library_path_var,
                host.clone(),
            ));
        }

        log::debug!("registry holds {} instances", controllers.len());
        Ok(Self { controllers })
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Get sorted list of instance names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .controllers
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Retrieve a named instance from the set.
    pub fn get(&self, name: &str) -> Result<&InstanceController> {
        let mut found = self.controllers.iter().filter(|c| c.name() == name);
        match (found.next(), found.next()) {
            (Some(controller), None) => Ok(controller),
            _ => {
                log::error!("invalid instance identifier: {}", name);
                Err(FleetError::invalid_instance(name))
            }
        }
    }

    /// All controllers in construction order.
    pub fn iter(&self) -> std::slice::Iter<'_, InstanceController> {
        self.controllers.iter()
    }

    /// Expand and validate requested names. `all` selects every instance;
    /// unknown names are reported together. The result is sorted and unique.
    pub fn resolve_selection(&self, requested: &[String]) -> Result<Vec<String>> {
        if requested.iter().any(|name| name == ALL_INSTANCES) {
            return Ok(self.names());
        }

        let known: HashSet<&str> = self.controllers.iter().map(|c| c.name()).collect();
        let mut invalid: Vec<String> = Vec::new();
        for name in requested {
            if !known.contains(name.as_str()) && !invalid.contains(name) {
                invalid.push(name.clone());
            }
        }
        if !invalid.is_empty() {
            log::error!("invalid instance(s): {:?}", invalid);
            return Err(FleetError::invalid_instances(&invalid));
        }

        let selected: BTreeSet<String> = requested.iter().cloned().collect();
        Ok(selected.into_iter().collect())
    }

    /// Run `operation` on each selected instance in name order. Every
    /// instance gets a report; one failure never skips the rest.
    pub fn apply(
        &self,
        operation: Operation,
        requested: &[String],
    ) -> Result<Vec<OperationReport>> {
        let selected = self.resolve_selection(requested)?;
        let mut reports = Vec::with_capacity(selected.len());

        for name in selected {
            let controller = self.get(&name)?;
            log::info!("performing {} for {}", operation, name);
            let result = controller.perform(operation);
            if let Err(e) = &result {
                log::error!("{} failed for {}: {}", operation, name, e);
            }
            reports.push(OperationReport {
                instance: name,
                operation,
                result,
            });
        }

        Ok(reports)
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a InstanceController;
    type IntoIter = std::slice::Iter<'a, InstanceController>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
