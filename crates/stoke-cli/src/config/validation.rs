use crate::config::StokeConfig;
use crate::error::{ConfigError, Result};
use stoke_serve::{ServeError, config::validate_builds};

impl StokeConfig {
    /// Validate the configuration without running anything.
    ///
    /// Build graphs get the same checks the orchestrator applies before the
    /// first build; engine settings get the checks the process engine applies.
    pub fn validate(&self) -> Result<()> {
        validate_builds(&self.builds).map_err(ServeError::from)?;

        if self.engine.command.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "engine.command".to_string(),
                hint: "Set the build command, e.g. \"engine\": { \"command\": \"npx\", \"args\": [\"vite\", \"build\"] }".to_string(),
            }
            .into());
        }

        if self.engine.debounce_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.debounceMs".to_string(),
                value: "0".to_string(),
                hint: "Use a positive delay in milliseconds".to_string(),
            }
            .into());
        }

        if let Some(host) = &self.dev_server.host {
            if host.trim().is_empty() || host.contains(char::is_whitespace) {
                return Err(ConfigError::InvalidValue {
                    field: "devServer.host".to_string(),
                    value: host.clone(),
                    hint: "Use a hostname or IP address such as 127.0.0.1".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}
