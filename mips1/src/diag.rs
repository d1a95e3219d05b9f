//! Structured diagnostic events.
//!
//! The core reports noteworthy architectural events (exceptions, privilege
//! changes, TLB maintenance) through a [`DiagnosticSink`] handed to it by the
//! host. Nothing is reported unless a sink is installed.

use std::cell::RefCell;
use std::rc::Rc;

use log::*;

use crate::cpu::{Exception, Intention};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlbFaultKind {
	Refill,
	Invalid,
	Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
	Exception { exception: Exception, epc: u32, vector: u32 },
	PrivilegeChange { user: bool },
	AddressError { address: u32, intention: Intention },
	TlbWrite { index: u8, hi: u32, lo: u32, random: bool },
	TlbProbe { hi: u32, index: Option<u8> },
	TlbFault { address: u32, asid: u32, kind: TlbFaultKind },
	FpuUnimplemented { op: u32 },
	Interrupt { line: u32, asserted: bool },
}

pub trait DiagnosticSink {
	fn event(&mut self, event: &Diagnostic);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
	fn event(&mut self, _event: &Diagnostic) {}
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
	fn event(&mut self, event: &Diagnostic) {
		match event {
			Diagnostic::AddressError { address, intention } => warn!("address error 0x{address:08X} ({intention:?})"),
			Diagnostic::TlbWrite { index, hi, lo, random } => {
				debug!(
					"asid {:2} tlb write {} {index:2} vpn 0x{:08X} pfn 0x{:08X} {}{}{}{}",
					(hi & 0xfc0) >> 6,
					if *random { "random" } else { "index" },
					hi & 0xfffff000,
					lo & 0xfffff000,
					if lo & 0x800 != 0 { 'N' } else { '-' },
					if lo & 0x400 != 0 { 'D' } else { '-' },
					if lo & 0x200 != 0 { 'V' } else { '-' },
					if lo & 0x100 != 0 { 'G' } else { '-' },
				)
			}
			_ => debug!("{event:?}"),
		}
	}
}

/// Collects events in memory. Clones share the same buffer, so a harness can
/// keep one handle and install the other in the CPU.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
	events: Rc<RefCell<Vec<Diagnostic>>>,
}

impl RecordingSink {
	pub fn events(&self) -> Vec<Diagnostic> {
		self.events.borrow().clone()
	}

	pub fn clear(&self) {
		self.events.borrow_mut().clear();
	}
}

impl DiagnosticSink for RecordingSink {
	fn event(&mut self, event: &Diagnostic) {
		self.events.borrow_mut().push(*event);
	}
}
