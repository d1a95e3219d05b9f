use log::*;

use crate::diag::{Diagnostic, TlbFaultKind};

use super::cop0::{Exception, Status, BAD_VADDR, ENTRY_HI};
use super::tlb::{Lookup, Tlb, EH_ASID, EH_VPN};
use super::Mips1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intention {
	Read,
	Write,
	Fetch,
}

impl Intention {
	pub(super) fn index(self) -> usize {
		match self {
			Intention::Read => 0,
			Intention::Write => 1,
			Intention::Fetch => 2,
		}
	}
}

/// Address translation strategy, fixed per model.
pub enum Mmu {
	Fixed,
	Tlb(Box<Tlb>),
	/// TLB registers and instructions work, mapped addresses pass through.
	Bypass(Box<Tlb>),
}

impl Mmu {
	pub fn tlb(&self) -> Option<&Tlb> {
		match self {
			Mmu::Fixed => None,
			Mmu::Tlb(tlb) | Mmu::Bypass(tlb) => Some(tlb),
		}
	}

	pub fn tlb_mut(&mut self) -> Option<&mut Tlb> {
		match self {
			Mmu::Fixed => None,
			Mmu::Tlb(tlb) | Mmu::Bypass(tlb) => Some(tlb),
		}
	}
}

impl Mips1 {
	/// Translate without raising exceptions or touching TLB state.
	pub fn translate(&mut self, address: u32, intention: Intention) -> Option<u32> {
		self.translate_inner(address, intention, true)
	}

	pub(super) fn translate_access(&mut self, address: u32, intention: Intention) -> Option<u32> {
		self.translate_inner(address, intention, false)
	}

	fn translate_inner(&mut self, address: u32, intention: Intention, debug: bool) -> Option<u32> {
		if address & 0x8000_0000 != 0 {
			if debug || !self.cop0.sr().contains(Status::KUC) {
				// kseg0 and kseg1 are unmapped
				if address & 0xc000_0000 == 0x8000_0000 {
					return Some(address & 0x1fff_ffff);
				}
			} else {
				self.address_error(address, intention);
				return None;
			}
		}

		match &mut self.mmu {
			Mmu::Fixed => {
				if address & 0x8000_0000 == 0 {
					Some(address.wrapping_add(0x4000_0000))
				} else {
					Some(address)
				}
			}
			Mmu::Bypass(_) => Some(address),
			Mmu::Tlb(tlb) => {
				let key = (address & EH_VPN) | (self.cop0.read_reg(ENTRY_HI) & EH_ASID);

				match tlb.lookup(key, intention, !debug) {
					Lookup::Hit(pfn) => Some((address & !EH_VPN) | pfn),
					fault => {
						if !debug {
							self.tlb_fault(address, key, intention, fault);
						}
						None
					}
				}
			}
		}
	}

	pub(super) fn address_error(&mut self, address: u32, intention: Intention) {
		debug!("address error 0x{address:08X} ({intention:?}) at 0x{:08X}", self.pc);

		self.cop0.regs[BAD_VADDR as usize] = address;
		self.report(Diagnostic::AddressError { address, intention });

		self.exception(match intention {
			Intention::Write => Exception::AddrStoreError,
			_ => Exception::AddrLoadError,
		});
	}

	fn tlb_fault(&mut self, address: u32, key: u32, intention: Intention, fault: Lookup) {
		let kuseg = address & 0x8000_0000 == 0;

		let kind = match fault {
			Lookup::Modified => TlbFaultKind::Modified,
			Lookup::Miss if kuseg => TlbFaultKind::Refill,
			_ => TlbFaultKind::Invalid,
		};

		trace!("tlb {kind:?} 0x{address:08X} asid {} ({intention:?})", (key & EH_ASID) >> 6);
		self.report(Diagnostic::TlbFault { address, asid: (key & EH_ASID) >> 6, kind });

		self.cop0.tlb_fault(address, key);

		let exception = match (kind, intention) {
			(TlbFaultKind::Modified, _) => Exception::TlbModified,
			(_, Intention::Write) => Exception::TlbStore,
			_ => Exception::TlbLoad,
		};

		self.exception_vectored(exception, kind == TlbFaultKind::Refill);
	}
}
