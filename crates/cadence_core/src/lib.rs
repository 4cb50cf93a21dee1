pub mod completion;
pub mod error;
pub mod generator;
pub mod initializer;
pub mod notifications;
pub mod occurrence;
pub mod period;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod task;

pub use crate::completion::CompletionOutcome;
pub use crate::error::{CadenceError, Result, StoreError};
pub use crate::service::{TaskService, TaskServiceBuilder};
