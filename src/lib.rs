//! Generates `os/initproc.S`, the assembly stub that tells the kernel which
//! program to run as its first user-space process.
//!
//! The stub defines one global label, `INIT_PROC`, pointing at a NUL-terminated
//! string holding the program name. The kernel's loader looks that name up in
//! its filesystem and starts it after boot.

#[macro_use]
extern crate log;

pub mod logger;
pub mod stub;

pub use stub::{
    DEFAULT_INIT_PROC, OUTPUT_PATH, SYMBOL, StubConfig, generate, generate_to, needs_escaping,
    render,
};
