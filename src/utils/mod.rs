//! Process-level helpers shared by the library and its binaries.

pub mod bootstrap;
pub mod retry;
