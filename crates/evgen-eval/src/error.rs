//! Runtime error types for the evgen evaluator.

use thiserror::Error;

use crate::world::InstanceId;

/// Evaluation error: a runtime function the host does not provide, a
/// dangling instance, or a run that did not terminate in time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The host has no implementation for a runtime symbol.
    #[error("unknown runtime function: {0}")]
    UnknownFunction(String),

    /// A call received the wrong number or kind of arguments.
    #[error("bad arguments to {symbol}: {message}")]
    BadArguments { symbol: String, message: String },

    #[error("instance {0} does not exist")]
    MissingInstance(InstanceId),

    #[error("instance {instance} has no automatism '{automatism}'")]
    MissingAutomatism {
        instance: InstanceId,
        automatism: String,
    },

    /// The step budget ran out (runaway loop).
    #[error("gas exhausted after {0} steps")]
    GasExhausted(u64),
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
