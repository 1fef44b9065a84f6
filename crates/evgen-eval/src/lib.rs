//! evgen tree-walking evaluator: reference implementation.
//!
//! Executes resolved programs directly from the IR, without emitting code,
//! against an in-memory [`World`]. Used to validate lowering semantics and as
//! the golden reference for what emitted code must do.
//!
//! Runtime functions are reached through the [`Host`] trait; [`StandardHost`]
//! covers the built-in catalog.

mod error;
mod evaluator;
mod host;
mod world;

pub use error::{EvalError, EvalResult};
pub use evaluator::{run_frame, Evaluator, FrameReport, DEFAULT_GAS_LIMIT};
pub use host::{Host, Receiver, StandardHost};
pub use world::{Instance, InstanceId, Picking, Value, World};
