pub mod cli;
pub mod client;
pub mod logging;
pub mod manager;

pub use cli::{handle_command, FetchCommands, HumanDuration, QueryArgs};
pub use client::{SearchApi, SearchClient, SearchConfig};
pub use logging::{init_logging, Logger};
pub use manager::{describe_error, FetchManager};

pub mod prelude {
    pub use super::client::{SearchApi, SearchClient, SearchConfig};
    pub use super::manager::FetchManager;
    pub use eu_core::{Error, FetchOutcome, Result};
}
