//! Action execution
//!
//! Resolves a model-chosen action name against the registry and runs it.
//! Failures are not retried here; they go straight back to the agent loop.

use crate::error::ActionError;
use crate::tools::ActionRegistry;
use std::time::Instant;
use tracing::{debug, warn};

pub struct ActionExecutor {
    registry: ActionRegistry,
}

impl ActionExecutor {
    pub fn new(registry: ActionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Execute one named action with positional arguments
    pub async fn execute(&self, name: &str, args: &[String]) -> Result<String, ActionError> {
        let action = self.registry.get(name).ok_or_else(|| {
            warn!(action = %name, "Action not registered");
            ActionError::UnknownAction(name.trim().to_string())
        })?;

        debug!(action = %action.name(), ?args, "Executing action");
        let start = Instant::now();

        let result = action.execute(args).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(output) => debug!(action = %action.name(), elapsed_ms, output = %output, "Action succeeded"),
            Err(e) => warn!(action = %action.name(), elapsed_ms, error = %e, "Action failed"),
        }

        result
    }
}
