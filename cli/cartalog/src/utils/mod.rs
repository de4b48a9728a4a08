use std::io::Stderr;
use std::sync::{LazyLock, Mutex};

pub mod errors;
pub mod init;
pub mod logger;
pub mod message;
pub mod token_store;

/// Shared handle to stderr so log lines and messages do not interleave.
pub static TERMINAL_STDERR: LazyLock<Mutex<Stderr>> =
    LazyLock::new(|| Mutex::new(std::io::stderr()));
