//! Appender implementations

pub mod console;
pub mod database;
pub mod file;
pub mod memory;
pub mod tcp;

pub use console::{ConsoleAppender, ConsoleStream};
#[cfg(feature = "http")]
pub use database::HttpStore;
pub use database::{
    BufferedDatabaseAppender, DatabaseSettings, DocumentStore, JsonlStore, MemoryStore,
    StoredBatch,
};
pub use file::FileAppender;
pub use memory::{CapturedLines, MemoryAppender, NullAppender};
pub use tcp::TcpAppender;

pub use crate::core::Appender;
