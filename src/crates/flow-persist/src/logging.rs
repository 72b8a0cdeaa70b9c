//! Injected logging capability
//!
//! Components receive a [`Logger`] at construction instead of writing to a
//! process-wide logger. A `Logger` carries a `tracing` dispatch and a
//! component name; [`Logger::scope`] runs a future with that dispatch installed
//! and inside a span named after the component, so the `tracing` macros used
//! by the repositories reach the injected subscriber.

use crate::config::LoggingConfig;
use crate::error::{PersistError, PersistResult};
use std::future::Future;
use tracing::instrument::{Instrument, WithSubscriber};
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Logging handle handed to each component
#[derive(Clone, Debug)]
pub struct Logger {
    dispatch: Dispatch,
    component: &'static str,
}

impl Logger {
    /// Logger writing to the given dispatch
    pub fn new(dispatch: Dispatch) -> Self {
        Self {
            dispatch,
            component: "flow_persist",
        }
    }

    /// Logger writing to whatever subscriber is the default on this thread
    pub fn current() -> Self {
        Self::new(tracing::dispatcher::get_default(|d| d.clone()))
    }

    /// Logger that drops every event
    pub fn disabled() -> Self {
        Self::new(Dispatch::none())
    }

    /// Build a fmt subscriber from configuration
    pub fn from_config(config: &LoggingConfig) -> PersistResult<Self> {
        let filter = EnvFilter::try_new(&config.level)
            .map_err(|e| PersistError::Config(format!("Invalid log level {:?}: {}", config.level, e)))?;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(config.colored);

        let dispatch = match config.format.as_str() {
            "pretty" => Dispatch::new(builder.pretty().finish()),
            "full" => Dispatch::new(builder.finish()),
            _ => Dispatch::new(builder.compact().finish()),
        };
        Ok(Self::new(dispatch))
    }

    /// Same dispatch, tagged with another component name
    pub fn for_component(&self, component: &'static str) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
            component,
        }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `fut` with this logger's dispatch and component span
    pub async fn scope<F: Future>(&self, operation: &'static str, fut: F) -> F::Output {
        let span = tracing::dispatcher::with_default(&self.dispatch, || {
            tracing::debug_span!("persist", component = self.component, operation)
        });
        fut.instrument(span)
            .with_subscriber(self.dispatch.clone())
            .await
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let logger = Logger::from_config(&LoggingConfig::default()).unwrap();
        assert_eq!(logger.component(), "flow_persist");
    }

    #[test]
    fn test_invalid_level_is_config_error() {
        let config = LoggingConfig {
            level: "flow_persist=loudest".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(Logger::from_config(&config), Err(PersistError::Config(_))));
    }

    #[tokio::test]
    async fn test_scope_returns_inner_output() {
        let logger = Logger::disabled().for_component("status_tracker");
        let value = logger.scope("insert", async { 41 + 1 }).await;
        assert_eq!(value, 42);
        assert_eq!(logger.component(), "status_tracker");
    }
}
