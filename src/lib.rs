//! skein: a conversational coding-agent runtime.
//!
//! Many independent *threads*, each owning one [`Agent`](agent::Agent) that
//! alternates model calls and tool executions, plus single-level sub-agent
//! delegation through the `delegate` tool.
//!
//! # Quick Start
//!
//! ```no_run
//! use skein::config::SkeinConfig;
//! use skein::thread::ThreadManager;
//!
//! # async fn example() -> skein::error::Result<()> {
//! let config = SkeinConfig::load()?;
//! let manager = ThreadManager::from_config(config.provider()?, &config);
//!
//! let thread = manager.start_thread(None, None).await?;
//! let mut updates = manager.subscribe(&thread);
//! manager.send_message(&thread, "List the files in this project").await?;
//! if let Some(update) = updates.recv().await {
//!     println!("{update:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod bus;
pub mod config;
pub mod delegation;
pub mod error;
pub mod provider;
pub mod thread;
pub mod tools;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
