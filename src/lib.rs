#[cfg(not(all(target_arch = "x86_64", target_os = "linux")))]
compile_error!("codevolve runs native x86-64 code and requires an x86-64 Linux host");

pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod isa;

pub use error::{CodevolveError, Result};
