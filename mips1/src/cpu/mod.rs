use std::fmt::Display;

use log::*;

use crate::bus::Bus;
use crate::config::{Config, MmuKind, Model};
use crate::diag::{Diagnostic, DiagnosticSink, NullSink};
use branch::Sequencer;
use cache::CacheRam;
use cop0::*;
use cop1::Fpu;
use instructions::Instruction;
use translate::Mmu;

pub use branch::BranchState;
pub use cop0::{Cause, Exception, Status};
pub use tlb::{Tlb, TlbEntry};
pub use translate::Intention;

mod access;
mod branch;
mod cache;
mod cop0;
mod cop1;
pub mod instructions;
mod softfloat;
mod tlb;
mod translate;

const RESET_VECTOR: u32 = 0xbfc0_0000;

/// Cycles charged on top of the base cycle.
const MULT_CYCLES: u64 = 11;
const DIV_CYCLES: u64 = 34;

#[derive(Debug, Default)]
pub struct Registers {
	gpr: [u32; 32],
	hi: u32,
	lo: u32,
}

impl Registers {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn read_gpr(&self, register: u32) -> u32 {
		self.gpr[(register & 0x1f) as usize]
	}

	pub fn write_gpr(&mut self, register: u32, write: u32) {
		if register == 0 {
			return;
		}

		self.gpr[(register & 0x1f) as usize] = write;
	}
}

/// One line per four registers, for exception traces.
impl Display for Registers {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for (row, chunk) in self.gpr.chunks(4).enumerate() {
			for (col, value) in chunk.iter().enumerate() {
				write!(f, "r{:<2} {value:08x}  ", row * 4 + col)?;
			}
			writeln!(f)?;
		}

		write!(f, "hi  {:08x}  lo  {:08x}", self.hi, self.lo)
	}
}

/// Where loads and stores go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataSpace {
	Program,
	ICache,
	DCache,
}

pub struct Mips1 {
	pub registers: Registers,
	pc: u32,

	config: Config,
	cop0: Cop0,
	mmu: Mmu,
	fpu: Option<Fpu>,

	branch: Sequencer,
	brcond: [bool; 4],

	data_space: DataSpace,
	icache: CacheRam,
	dcache: CacheRam,

	total_cycles: u64,
	reset_time: u64,

	sink: Box<dyn DiagnosticSink>,
}

impl Mips1 {
	/// Build a CPU in its reset state. `config` is taken as is; run
	/// [`Config::validate`] first when it comes from outside.
	pub fn new(config: Config) -> Self {
		let mmu = match config.mmu {
			MmuKind::Fixed => Mmu::Fixed,
			MmuKind::Tlb => Mmu::Tlb(Box::default()),
			MmuKind::TlbBypass => Mmu::Bypass(Box::default()),
		};

		let mut cpu = Self {
			registers: Registers::new(),
			pc: RESET_VECTOR,

			cop0: Cop0::new(config.mmu != MmuKind::Fixed),
			mmu,
			fpu: config.fpu.filter(|fpu| fpu.revision != 0).map(Fpu::new),

			branch: Sequencer::default(),
			brcond: [false; 4],

			data_space: DataSpace::Program,
			icache: CacheRam::new(config.icache_size),
			dcache: CacheRam::new(config.dcache_size),

			total_cycles: 0,
			reset_time: 0,

			sink: Box::new(NullSink),
			config,
		};

		cpu.reset();
		cpu
	}

	pub fn with_model(model: Model) -> Self {
		Self::new(Config::new(model))
	}

	pub fn reset(&mut self) {
		self.pc = RESET_VECTOR;
		self.branch.reset();

		self.set_cop0_reg(STATUS, (Status::BEV | Status::TS).bits());
		self.cop0.regs[CAUSE as usize] = 0;
		self.cop0.regs[PRID as usize] = self.config.cpurev;
		self.data_space = DataSpace::Program;

		match &mut self.mmu {
			Mmu::Fixed => {}
			Mmu::Tlb(tlb) => {
				tlb.reset_mru();
				self.cop0.regs[STATUS as usize] &= !Status::TS.bits();
				self.reset_time = self.total_cycles;
			}
			Mmu::Bypass(tlb) => {
				tlb.reset_mru();
				self.reset_time = self.total_cycles;
			}
		}

		if self.config.model.has_r3041_registers() {
			self.cop0.regs[BUS_CTRL as usize] = 0x2013_0b00;
			self.cop0.regs[CONFIG as usize] = 0x4000_0000;
			self.cop0.regs[PORT_SIZE as usize] = 0;
			self.cop0.regs[COUNT as usize] = 0;
			self.cop0.regs[COMPARE as usize] = 0x00ff_ffff;
		}

		debug!("{:?} reset, prid 0x{:04X}", self.config.model, self.config.cpurev);
	}

	/// Execute one instruction (or take one exception). Returns the cycles it cost.
	pub fn run_instruction(&mut self, bus: &mut dyn Bus) -> u64 {
		let start = self.total_cycles;
		self.total_cycles += 1;

		if let Some(op) = self.fetch(bus, self.pc) {
			if self.cop0.interrupt_pending() {
				self.exception(Exception::Interrupt);
			} else {
				self.decode_and_exec(Instruction::from_u32(op), bus);
			}
		}

		self.pc = self.branch.advance(self.pc);

		self.total_cycles - start
	}

	/// Run until at least `budget` cycles have elapsed. Returns the cycles used.
	pub fn run(&mut self, bus: &mut dyn Bus, budget: u64) -> u64 {
		let start = self.total_cycles;

		while self.total_cycles - start < budget {
			self.run_instruction(bus);
		}

		self.total_cycles - start
	}

	/// Drive hardware interrupt input `line` (0..6).
	pub fn set_input(&mut self, line: u32, asserted: bool) {
		if line >= 6 {
			warn!("ignoring interrupt input {line}");
			return;
		}

		let bit = 0x400 << line;

		if asserted {
			self.cop0.regs[CAUSE as usize] |= bit;

			let sr = self.cop0.sr();
			if sr.contains(Status::IEC) && sr.bits() & bit != 0 {
				self.report(Diagnostic::Interrupt { line, asserted });
			}
		} else {
			self.cop0.regs[CAUSE as usize] &= !bit;
		}
	}

	/// External branch condition sampled by BCzF/BCzT.
	pub fn set_brcond(&mut self, cop: usize, state: bool) {
		self.brcond[cop & 3] = state;
	}

	pub fn set_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
		self.sink = sink;
	}

	fn report(&mut self, event: Diagnostic) {
		self.sink.event(&event);
	}

	fn exception(&mut self, exception: Exception) {
		self.exception_vectored(exception, false);
	}

	/// Enter the handler. `refill` selects the user TLB refill vector.
	fn exception_vectored(&mut self, exception: Exception, refill: bool) {
		let mut epc = self.pc;
		let mut cause = (self.cop0.read_reg(CAUSE) & Cause::IP.bits()) | exception.cause_bits();

		if self.branch.in_delay_slot() {
			epc = epc.wrapping_sub(4);
			cause |= Cause::BD.bits();
		}

		self.branch.exception();

		self.cop0.regs[EPC as usize] = epc;
		self.cop0.regs[CAUSE as usize] = cause;
		self.cop0.push_exception();

		let bev = self.cop0.sr().contains(Status::BEV);
		self.pc = match (refill, bev) {
			(true, true) => 0xbfc0_0100,
			(true, false) => 0x8000_0000,
			(false, true) => 0xbfc0_0180,
			(false, false) => 0x8000_0080,
		};

		trace!("exception {exception:?} epc 0x{epc:08X} cause 0x{cause:08X} vector 0x{:08X}", self.pc);
		trace!("registers at exception:\n{}", self.registers);
		self.report(Diagnostic::Exception { exception, epc, vector: self.pc });

		if self.cop0.sr().contains(Status::KUP) {
			self.report(Diagnostic::PrivilegeChange { user: false });
		}
	}

	pub fn pc(&self) -> u32 {
		self.pc
	}

	/// Redirect execution, dropping any pending branch.
	pub fn set_pc(&mut self, pc: u32) {
		self.pc = pc;
		self.branch.reset();
	}

	pub fn gpr(&self, register: u32) -> u32 {
		self.registers.read_gpr(register)
	}

	pub fn set_gpr(&mut self, register: u32, write: u32) {
		self.registers.write_gpr(register, write);
	}

	pub fn hi(&self) -> u32 {
		self.registers.hi
	}

	pub fn lo(&self) -> u32 {
		self.registers.lo
	}

	pub fn cop0_reg(&self, reg: u32) -> u32 {
		self.get_cop0_reg(reg)
	}

	/// MTC0 semantics, including Status side effects.
	pub fn write_cop0_reg(&mut self, reg: u32, write: u32) {
		self.set_cop0_reg(reg, write);
	}

	pub fn status(&self) -> Status {
		self.cop0.sr()
	}

	pub fn cause(&self) -> Cause {
		self.cop0.cause()
	}

	/// 64-bit FPU register pair, `None` without an FPU.
	pub fn fpr(&self, pair: usize) -> Option<u64> {
		self.fpu.as_ref().map(|fpu| fpu.f[pair & 15])
	}

	pub fn set_fpr(&mut self, pair: usize, value: u64) {
		if let Some(fpu) = self.fpu.as_mut() {
			fpu.f[pair & 15] = value;
		}
	}

	pub fn fcr31(&self) -> Option<u32> {
		self.fpu.as_ref().map(|fpu| fpu.fcr31)
	}

	pub fn branch_state(&self) -> BranchState {
		self.branch.state()
	}

	pub fn branch_target(&self) -> u32 {
		self.branch.target()
	}

	pub fn total_cycles(&self) -> u64 {
		self.total_cycles
	}

	pub fn tlb(&self) -> Option<&Tlb> {
		self.mmu.tlb()
	}

	/// Instruction and data cache RAM sizes in bytes.
	pub fn cache_sizes(&self) -> (usize, usize) {
		(self.icache.size(), self.dcache.size())
	}

	pub fn config(&self) -> &Config {
		&self.config
	}
}
