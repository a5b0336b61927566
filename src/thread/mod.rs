//! Thread process manager.

pub mod manager;
pub mod names;
mod worker;

pub use manager::{ThreadManager, ThreadManagerOptions};
pub use names::generate_name;
pub use worker::{ThreadEntry, ThreadState};
