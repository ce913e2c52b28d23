use std::{fmt, str::FromStr, sync::Arc};

use env_logger::Builder;
use log::{Level, LevelFilter};
use once_cell::sync::OnceCell;

use crate::{config, core::Request};

const TARGET: &str = "cfn_dispatch";

static LOGGER: OnceCell<()> = OnceCell::new();

/// Install the process-wide `env_logger` once.
///
/// `RUST_LOG` still wins over the configured level for individual modules.
pub fn init_logger(config: &config::Log) {
    LOGGER.get_or_init(|| {
        let level = LevelFilter::from_str(&config.level).unwrap_or(LevelFilter::Info);
        let result = Builder::new()
            .filter(None, level)
            .parse_env(env_logger::Env::default())
            .format_timestamp_millis()
            .try_init();
        if let Err(e) = result {
            log::warn!("Logger already installed: {e}");
        }
    });
}

/// Logger scoped to a single invocation.
///
/// Every record carries the request id, logical resource id and request
/// type as structured key-values. It is cheap to clone and handed to each
/// component that runs on behalf of the invocation.
#[derive(Debug, Clone)]
pub struct InvocationLog {
    request_id: Arc<str>,
    logical_resource_id: Arc<str>,
    request_type: Arc<str>,
}

impl InvocationLog {
    pub fn for_request(request: &Request) -> Self {
        Self {
            request_id: Arc::from(request.request_id()),
            logical_resource_id: Arc::from(request.logical_resource_id()),
            request_type: Arc::from(request.request_type().as_str()),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(
            target: TARGET,
            level,
            request_id = &*self.request_id,
            logical_resource_id = &*self.logical_resource_id,
            request_type = &*self.request_type;
            "{args}"
        );
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_log_scoped_to_request() {
        let request = Request::new("Create", "S1", "R1", "L1", "https://example.com/cb");
        let log = InvocationLog::for_request(&request);

        assert_eq!(log.request_id(), "R1");
        log.info(format_args!("Received a {} Request", request.request_type()));
    }

    #[test]
    fn test_init_logger_is_idempotent() {
        let config = config::Log {
            level: "debug".to_string(),
        };
        init_logger(&config);
        init_logger(&config);
    }
}
