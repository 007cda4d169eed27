mod aggregate;
mod common;
mod fetch;
mod init;
mod process;

pub use aggregate::{AggregateArgs, aggregate_data};
pub use fetch::{FetchArgs, fetch_repos};
pub use init::{InitArgs, init_workspace};
pub use process::{ProcessArgs, process_data};
