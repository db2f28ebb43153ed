//! Filter implementations

pub mod context;
pub mod selection;

pub use context::{CorrelationIdFilter, HostFilter, IpAddressFilter, UsernameFilter};
pub use selection::{LevelFilter, NameFilter};

pub use crate::core::Filter;
