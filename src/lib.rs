mod common;
pub mod config;
mod ffi;
pub mod generic;
pub mod logging;
pub mod module;
pub mod path;
pub mod platform;
pub mod probe;
pub mod syscalls;

#[cfg(not(unix))]
compile_error!("fs-explain only supports Unix targets.");

pub use crate::common::error::{ConfigError, ExplainError, RegistryError, Result};
pub use crate::common::types::*;
pub use crate::config::ExplainConfig;
pub use crate::ffi::*;
pub use crate::module::{ExplainModule, ExplanationRegistry, LocalRegistry, ModuleEvent};
pub use crate::syscalls::{Explanation, ExplanationTable, Syscall, SyscallArgs};
