//! MIPS I (R2000/R3000 family) instruction set interpreter.
//!
//! The core executes against a host supplied [`Bus`] and exposes the
//! architectural state for inspection. Variants differ in cache sizes, MMU
//! (fixed mapping or TLB), byte order and FPU attachment; see [`Config`].

pub mod bus;
pub mod config;
pub mod cpu;
pub mod diag;

pub use bus::{Bus, BusError, Ram};
pub use config::{Config, ConfigError, Endianness, FpuConfig, MmuKind, Model};
pub use cpu::{BranchState, Cause, Exception, Intention, Mips1, Status, Tlb, TlbEntry};
pub use diag::{Diagnostic, DiagnosticSink, LogSink, NullSink, RecordingSink, TlbFaultKind};
