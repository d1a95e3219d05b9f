use bitflags::bitflags;
use log::*;

use crate::diag::Diagnostic;

use super::instructions::Instruction;
use super::tlb::{TlbEntry, EH_ASID, EH_VPN, EL_PFN};
use super::{DataSpace, Mips1};

pub const INDEX: u32 = 0;
pub const RANDOM: u32 = 1;
pub const ENTRY_LO: u32 = 2;
pub const BUS_CTRL: u32 = 2;
pub const CONFIG: u32 = 3;
pub const CONTEXT: u32 = 4;
pub const BAD_VADDR: u32 = 8;
pub const COUNT: u32 = 9;
pub const ENTRY_HI: u32 = 10;
pub const PORT_SIZE: u32 = 10;
pub const COMPARE: u32 = 11;
pub const STATUS: u32 = 12;
pub const CAUSE: u32 = 13;
pub const EPC: u32 = 14;
pub const PRID: u32 = 15;

const CONTEXT_PTE_BASE: u32 = 0xffe0_0000;
const CONTEXT_BAD_VPN: u32 = 0x001f_fffc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
	Interrupt,
	TlbModified,
	TlbLoad,
	TlbStore,
	AddrLoadError,
	AddrStoreError,
	BusFetchError,
	BusLoadStoreError,
	Syscall,
	Breakpoint,
	ReservedInstruction,
	CopUnusable(u8),
	ArithmeticOverflow,
}

impl Exception {
	/// ExcCode field value.
	pub fn code(self) -> u32 {
		match self {
			Exception::Interrupt => 0x00,
			Exception::TlbModified => 0x01,
			Exception::TlbLoad => 0x02,
			Exception::TlbStore => 0x03,
			Exception::AddrLoadError => 0x04,
			Exception::AddrStoreError => 0x05,
			Exception::BusFetchError => 0x06,
			Exception::BusLoadStoreError => 0x07,
			Exception::Syscall => 0x08,
			Exception::Breakpoint => 0x09,
			Exception::ReservedInstruction => 0x0A,
			Exception::CopUnusable(_) => 0x0B,
			Exception::ArithmeticOverflow => 0x0C,
		}
	}

	/// Bits this exception contributes to Cause (ExcCode and CE).
	pub fn cause_bits(self) -> u32 {
		let ce = match self {
			Exception::CopUnusable(cop) => u32::from(cop & 3) << 28,
			_ => 0,
		};

		(self.code() << 2) | ce
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct Status: u32 {
		const IEC = 1 << 0;
		const KUC = 1 << 1;
		const IEP = 1 << 2;
		const KUP = 1 << 3;
		const IEO = 1 << 4;
		const KUO = 1 << 5;
		const IM = 0xff << 8;
		const ISC = 1 << 16;
		const SWC = 1 << 17;
		const PZ = 1 << 18;
		const CM = 1 << 19;
		const PE = 1 << 20;
		const TS = 1 << 21;
		const BEV = 1 << 22;
		const RE = 1 << 25;
		const CU0 = 1 << 28;
		const CU1 = 1 << 29;
		const CU2 = 1 << 30;
		const CU3 = 1 << 31;

		const KUIE = 0x3f;
		const KUIE_PC = 0x0f;
		const KUIE_OP = 0x3c;
	}
}

impl Status {
	pub fn cop_usable(self, cop: u32) -> bool {
		self.bits() & (Status::CU0.bits() << (cop & 3)) != 0
	}
}

bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	pub struct Cause: u32 {
		const EXCCODE = 0x7c;
		const ISW = 0x0300;
		const IPEX = 0xfc00;
		const IP = 0xff00;
		const CE = 0x3000_0000;
		const BD = 0x8000_0000;
	}
}

/// System control coprocessor register bank.
pub struct Cop0 {
	pub regs: [u32; 32],
	tlb_masks: bool,
}

impl Cop0 {
	pub fn new(tlb_masks: bool) -> Self {
		Self {
			regs: [0; 32],
			tlb_masks,
		}
	}

	pub fn sr(&self) -> Status {
		Status::from_bits_retain(self.regs[STATUS as usize])
	}

	pub fn cause(&self) -> Cause {
		Cause::from_bits_retain(self.regs[CAUSE as usize])
	}

	pub fn read_reg(&self, reg: u32) -> u32 {
		self.regs[(reg & 0x1f) as usize]
	}

	/// Stores a value, applying the write masks of registers that have them.
	/// Status side effects are the caller's job.
	pub fn write_reg(&mut self, reg: u32, write: u32) {
		let reg = reg & 0x1f;

		let value = match reg {
			CAUSE => (self.regs[CAUSE as usize] & Cause::IPEX.bits()) | (write & !Cause::IPEX.bits()),
			PRID => return,
			ENTRY_HI if self.tlb_masks => write & (EH_VPN | EH_ASID),
			ENTRY_LO if self.tlb_masks => write & 0xffff_ff00,
			CONTEXT if self.tlb_masks => (self.regs[CONTEXT as usize] & !CONTEXT_PTE_BASE) | (write & CONTEXT_PTE_BASE),
			_ => write,
		};

		self.regs[reg as usize] = value;
	}

	pub fn push_exception(&mut self) {
		let sr = self.regs[STATUS as usize];

		self.regs[STATUS as usize] = (sr & !Status::KUIE.bits()) | ((sr << 2) & Status::KUIE_OP.bits());
	}

	// used by RFE
	pub fn pop_exception(&mut self) {
		let sr = self.regs[STATUS as usize];

		self.regs[STATUS as usize] = (sr & !Status::KUIE_PC.bits()) | ((sr >> 2) & Status::KUIE_PC.bits());
	}

	pub fn interrupt_pending(&self) -> bool {
		let sr = self.sr();

		sr.contains(Status::IEC) && (self.cause().bits() & sr.bits() & Status::IM.bits()) != 0
	}

	/// Record a TLB miss: BadVAddr, the faulting key in EntryHi, and the bad
	/// VPN in Context.
	pub fn tlb_fault(&mut self, address: u32, key: u32) {
		self.regs[BAD_VADDR as usize] = address;
		self.regs[ENTRY_HI as usize] = key;
		self.regs[CONTEXT as usize] =
			(self.regs[CONTEXT as usize] & CONTEXT_PTE_BASE) | ((address >> 10) & CONTEXT_BAD_VPN);
	}
}

impl Mips1 {
	pub(super) fn get_cop0_reg(&self, reg: u32) -> u32 {
		if reg == RANDOM && self.mmu.tlb().is_some() {
			return self.tlb_random() << 8;
		}

		self.cop0.read_reg(reg)
	}

	pub(super) fn set_cop0_reg(&mut self, reg: u32, write: u32) {
		if reg != STATUS {
			self.cop0.write_reg(reg, write);
			return;
		}

		let previous = self.cop0.sr();
		self.cop0.write_reg(STATUS, write);
		let sr = self.cop0.sr();

		self.data_space = if sr.contains(Status::ISC) {
			if sr.contains(Status::SWC) {
				DataSpace::ICache
			} else {
				DataSpace::DCache
			}
		} else {
			DataSpace::Program
		};

		if (previous ^ sr).contains(Status::KUC) && !self.branch.is_exception() {
			self.report(Diagnostic::PrivilegeChange { user: sr.contains(Status::KUC) });
		}
	}

	/// Index into the 56 non-wired slots, cycling with elapsed time since reset.
	fn tlb_random(&self) -> u32 {
		63 - (self.total_cycles.wrapping_sub(self.reset_time) % 56) as u32
	}

	pub(super) fn handle_cop0(&mut self, instr: Instruction) {
		let sr = self.cop0.sr();

		if sr.contains(Status::KUC) && !sr.contains(Status::CU0) {
			self.exception(Exception::CopUnusable(0));
			return;
		}

		if self.mmu.tlb().is_some() {
			match instr.raw() {
				0x4200_0001 => return self.op_tlbr(),
				0x4200_0002 => return self.op_tlbwi(),
				0x4200_0006 => return self.op_tlbwr(),
				0x4200_0008 => return self.op_tlbp(),
				_ => {}
			}
		}

		match instr.cop_opcode() {
			0x00 => self.op_mfc0(instr),
			0x04 => self.op_mtc0(instr),
			0x08 => self.op_bcz(instr, 0),
			0x10..=0x1F if instr.funct() == 0x10 => self.op_rfe(),
			_ => self.op_illegal(instr),
		}
	}

	fn op_mfc0(&mut self, instr: Instruction) {
		let value = self.get_cop0_reg(instr.reg_dst());

		self.registers.write_gpr(instr.reg_tgt(), value);
	}

	fn op_mtc0(&mut self, instr: Instruction) {
		let write = self.registers.read_gpr(instr.reg_tgt());

		self.set_cop0_reg(instr.reg_dst(), write);
	}

	fn op_rfe(&mut self) {
		let previous = self.cop0.sr();
		self.cop0.pop_exception();
		let sr = self.cop0.sr();

		if (previous ^ sr).contains(Status::KUC) {
			self.report(Diagnostic::PrivilegeChange { user: sr.contains(Status::KUC) });
		}
	}

	fn tlb_index(&self) -> usize {
		((self.cop0.read_reg(INDEX) >> 8) & 0x3f) as usize
	}

	fn op_tlbr(&mut self) {
		let index = self.tlb_index();

		let Some(tlb) = self.mmu.tlb() else { return };
		let entry = tlb.read(index);

		self.cop0.regs[ENTRY_HI as usize] = entry.hi;
		self.cop0.regs[ENTRY_LO as usize] = entry.lo;
	}

	fn op_tlbwi(&mut self) {
		let index = self.tlb_index();

		self.tlb_write(index, false);
	}

	fn op_tlbwr(&mut self) {
		let index = self.tlb_random() as usize;

		self.tlb_write(index, true);
	}

	fn tlb_write(&mut self, index: usize, random: bool) {
		let entry = TlbEntry {
			hi: self.cop0.read_reg(ENTRY_HI),
			lo: self.cop0.read_reg(ENTRY_LO),
		};

		let Some(tlb) = self.mmu.tlb_mut() else { return };
		tlb.write(index, entry);

		trace!("tlb write {index} hi 0x{:08X} lo 0x{:08X} pfn 0x{:08X}", entry.hi, entry.lo, entry.lo & EL_PFN);
		self.report(Diagnostic::TlbWrite { index: index as u8, hi: entry.hi, lo: entry.lo, random });
	}

	fn op_tlbp(&mut self) {
		let hi = self.cop0.read_reg(ENTRY_HI);

		let Some(tlb) = self.mmu.tlb() else { return };
		let found = tlb.probe(hi);

		self.cop0.regs[INDEX as usize] = match found {
			Some(index) => u32::from(index) << 8,
			None => 0x8000_0000,
		};

		self.report(Diagnostic::TlbProbe { hi, index: found });
	}
}
