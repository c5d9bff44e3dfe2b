//! CLI command implementations

pub mod classify;
pub mod evaluate;
pub mod init;
pub mod validate;
