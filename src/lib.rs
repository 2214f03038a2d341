//! # x-checker
//!
//! A blocking client for the checknumber.ai bulk task API: upload a list of
//! phone numbers, wait for the server to check them, download the result
//! spreadsheet.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use x_checker::{
//!     api::{PollOptions, TaskClient, TaskInput},
//!     config::ClientConfig,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TaskClient::new(ClientConfig::new("YOUR_API_KEY"))?;
//!
//! let task = client.submit(TaskInput::from_numbers(["+1234567890", "+9876543210"]))?;
//! let done = client.poll_until_terminal(&task.task_id, "test", &PollOptions::default(), |t| {
//!     println!("{}: {}/{}", t.status, t.success, t.total);
//! })?;
//!
//! if let Some(url) = done.result_url() {
//!     client.fetch_result(url, "results.xlsx")?;
//! }
//! # Ok(())
//! # }
//! ```

/// Task client, transport seam and wire types
pub mod api;

/// Client configuration and defaults
pub mod config;

/// Request level error types
pub mod errors;
