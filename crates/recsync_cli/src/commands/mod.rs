//! CLI command implementations.

pub mod clear_slave;
pub mod init;
pub mod inspect;
pub mod sync_all;
