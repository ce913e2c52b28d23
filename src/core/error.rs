//! Unified error handling for cfn-dispatch
//!
//! Every failure an invocation can produce is funnelled into
//! [`DispatchError`]. Handler failures keep their own kind name so the
//! orchestrator sees `"<Kind>: <message>"` in the FAILED reason.

use std::{any::Any, borrow::Cow, fmt};

use http::StatusCode;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top level error returned by the dispatcher
#[derive(Debug)]
pub enum DispatchError {
    /// Handler returned a malformed result
    Contract(ContractError),

    /// Handler itself failed (returned an error or panicked)
    Handler(HandlerError),

    /// The deadline guard fired before the handler completed
    TimedOut,

    /// The callback PUT could not be delivered
    Delivery(DeliveryError),

    /// The invocation envelope could not be turned into a request
    InvalidRequest(String),

    /// Configuration-related errors
    Configuration(String),
}

impl DispatchError {
    /// Name used as the `<ErrorKind>` prefix of a FAILED reason
    pub fn kind(&self) -> Cow<'_, str> {
        match self {
            DispatchError::Contract(_) => Cow::Borrowed(ContractError::KIND),
            DispatchError::Handler(err) => Cow::Borrowed(err.kind()),
            DispatchError::TimedOut => Cow::Borrowed("TimeoutError"),
            DispatchError::Delivery(_) => Cow::Borrowed("DeliveryError"),
            DispatchError::InvalidRequest(_) => Cow::Borrowed("InvalidRequest"),
            DispatchError::Configuration(_) => Cow::Borrowed("ConfigurationError"),
        }
    }

    /// Reason string reported to the orchestrator, `"<ErrorKind>: <message>"`
    pub fn reason(&self) -> String {
        match self {
            DispatchError::Contract(err) => format!("{}: {err}", ContractError::KIND),
            DispatchError::Handler(err) => format!("{}: {}", err.kind(), err.message()),
            other => format!("{}: {other}", other.kind()),
        }
    }

    /// A fatal error must halt the process after it has been reported
    pub fn is_fatal(&self) -> bool {
        matches!(self, DispatchError::TimedOut)
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Contract(err) => write!(f, "Handler contract violated: {err}"),
            DispatchError::Handler(err) => write!(f, "Handler failed: {err}"),
            DispatchError::TimedOut => write!(f, "Execution timed out before the handler completed"),
            DispatchError::Delivery(err) => write!(f, "Callback delivery failed: {err}"),
            DispatchError::InvalidRequest(msg) => write!(f, "Invalid request: {msg}"),
            DispatchError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Contract(err) => Some(err),
            DispatchError::Handler(err) => err
                .source
                .as_deref()
                .map(|e| e as &(dyn std::error::Error + 'static)),
            DispatchError::Delivery(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ContractError> for DispatchError {
    fn from(err: ContractError) -> Self {
        DispatchError::Contract(err)
    }
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        DispatchError::Handler(err)
    }
}

impl From<DeliveryError> for DispatchError {
    fn from(err: DeliveryError) -> Self {
        DispatchError::Delivery(err)
    }
}

/// Result type alias for dispatch operations
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// A handler returned something other than `(PhysicalResourceId, Data)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// Output was not a two element pair
    NotAPair { handler: &'static str },

    /// First element of the pair was not a string
    PhysicalResourceIdNotString { found: &'static str },

    /// First element of the pair was an empty string
    EmptyPhysicalResourceId,

    /// Second element of the pair was not an object
    DataNotMapping { found: &'static str },
}

impl ContractError {
    pub const KIND: &'static str = "ContractError";
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractError::NotAPair { handler } => write!(
                f,
                "Error during {handler}: handler does not return (PhysicalResourceId, Data)"
            ),
            ContractError::PhysicalResourceIdNotString { found } => {
                write!(f, "PhysicalResourceId is not a string, but {found}")
            }
            ContractError::EmptyPhysicalResourceId => write!(f, "PhysicalResourceId is empty"),
            ContractError::DataNotMapping { found } => {
                write!(f, "Data is not a mapping, but {found}")
            }
        }
    }
}

impl std::error::Error for ContractError {}

/// Error raised by an integrator-supplied handler.
///
/// Any `std::error::Error` converts into it with `?`; the kind is taken
/// from the error's type name. Like `anyhow::Error` it deliberately does
/// not implement `std::error::Error` itself so that blanket conversion
/// stays coherent.
pub struct HandlerError {
    kind: Cow<'static, str>,
    message: String,
    source: Option<BoxError>,
}

impl HandlerError {
    /// Create a handler error with an explicit kind
    pub fn new(kind: impl Into<Cow<'static, str>>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a handler error of the generic `Error` kind
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "handler panicked".to_string()
        };
        Self::new("Panic", message)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self {
            kind: Cow::Borrowed(short_type_name::<E>()),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

/// Last path segment of a type name, without generic arguments
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// The callback PUT failed
#[derive(Debug)]
pub enum DeliveryError {
    /// The endpoint answered with a non-2xx status
    Rejected { status: StatusCode, body: String },

    /// The request never got a response
    Transport(String),

    /// The terminal response could not be serialized
    Serialization(serde_json::Error),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Rejected { status, body } => {
                write!(f, "callback rejected with status {status}: {body}")
            }
            DeliveryError::Transport(msg) => write!(f, "callback transport error: {msg}"),
            DeliveryError::Serialization(err) => {
                write!(f, "failed to serialize terminal response: {err}")
            }
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeliveryError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DeliveryError {
    fn from(err: serde_json::Error) -> Self {
        DeliveryError::Serialization(err)
    }
}

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> DispatchResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> DispatchResult<T> {
        self.map_err(|e| DispatchError::Configuration(format!("{context}: {e}")))
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::DispatchError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::DispatchError::Configuration(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! invalid_request {
    ($msg:expr) => {
        $crate::core::DispatchError::InvalidRequest($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::DispatchError::InvalidRequest(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct BucketMissing;

    impl fmt::Display for BucketMissing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "bucket does not exist")
        }
    }

    impl std::error::Error for BucketMissing {}

    fn provision() -> Result<(), HandlerError> {
        let lookup: Result<(), BucketMissing> = Err(BucketMissing);
        lookup?;
        Ok(())
    }

    #[test]
    fn test_handler_error_kind_from_type_name() {
        let err = provision().unwrap_err();
        assert_eq!(err.kind(), "BucketMissing");
        assert_eq!(err.message(), "bucket does not exist");

        let reason = DispatchError::Handler(err).reason();
        assert_eq!(reason, "BucketMissing: bucket does not exist");
    }

    #[test]
    fn test_handler_error_from_panic_payload() {
        let err = HandlerError::from_panic(Box::new("boom"));
        assert_eq!(err.kind(), "Panic");
        assert_eq!(err.message(), "boom");

        let err = HandlerError::from_panic(Box::new(String::from("kaboom")));
        assert_eq!(err.message(), "kaboom");

        let err = HandlerError::from_panic(Box::new(42u8));
        assert_eq!(err.message(), "handler panicked");
    }

    #[test]
    fn test_contract_reason() {
        let err = DispatchError::Contract(ContractError::NotAPair { handler: "create" });
        let reason = err.reason();
        assert!(reason.starts_with("ContractError: "));
        assert!(reason.contains("does not return"));
    }

    #[test]
    fn test_only_timeout_is_fatal() {
        assert!(DispatchError::TimedOut.is_fatal());
        assert!(!DispatchError::Handler(HandlerError::msg("x")).is_fatal());
        assert!(!config_error!("bad {}", 1).is_fatal());
    }

    #[test]
    fn test_short_type_name_strips_path_and_generics() {
        assert_eq!(short_type_name::<std::io::Error>(), "Error");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }
}
