//! passbook: a single-user password book stored in a local JSON file.

pub mod cli;
pub mod crypto;
pub mod error;
pub mod gate;
pub mod interactive;
pub mod models;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use error::{PassbookError, Result};
pub use gate::{GateState, MasterGate};
pub use models::{Entry, EntryUpdate, NewEntry};
pub use store::EntryStore;
