//! Model checkpoint persistence.

pub mod checkpointer;

pub use checkpointer::{CheckpointError, CheckpointInfo, Checkpointer, CheckpointerConfig};
