//! Command handlers for the Docent CLI.

pub mod ask;
pub mod ingest;
pub mod init;
pub mod serve;

pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use init::InitCommand;
pub use serve::ServeCommand;
