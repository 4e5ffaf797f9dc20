//! Application layer - services wiring the domain to the ports.

pub mod assembler;
pub mod workspace;

pub use assembler::{AssemblerConfig, AssemblerService, AssemblyResult, RunOutcome};
pub use workspace::Workspace;
