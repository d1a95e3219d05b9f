#![allow(dead_code)]

use mips1::{Config, Mips1, Model, Ram, RecordingSink};

pub const CODE: u32 = 0x8000_1000;
pub const RAM_SIZE: usize = 0x10000;

pub const ZERO: u32 = 0;
pub const AT: u32 = 1;
pub const T0: u32 = 8;
pub const T1: u32 = 9;
pub const T2: u32 = 10;
pub const T3: u32 = 11;
pub const RA: u32 = 31;

// cop0 registers
pub const INDEX: u32 = 0;
pub const RANDOM: u32 = 1;
pub const ENTRY_LO: u32 = 2;
pub const CONTEXT: u32 = 4;
pub const BAD_VADDR: u32 = 8;
pub const ENTRY_HI: u32 = 10;
pub const STATUS: u32 = 12;
pub const CAUSE: u32 = 13;
pub const EPC: u32 = 14;
pub const PRID: u32 = 15;

pub fn init_logger() {
	let _ = env_logger::builder().is_test(true).try_init();
}

pub fn special(rs: u32, rt: u32, rd: u32, shamt: u32, funct: u32) -> u32 {
	(rs << 21) | (rt << 16) | (rd << 11) | (shamt << 6) | funct
}

pub fn imm(op: u32, rs: u32, rt: u32, imm: u16) -> u32 {
	(op << 26) | (rs << 21) | (rt << 16) | u32::from(imm)
}

pub fn jump(op: u32, target: u32) -> u32 {
	(op << 26) | ((target >> 2) & 0x03ff_ffff)
}

pub fn addiu(rt: u32, rs: u32, value: i16) -> u32 {
	imm(0x09, rs, rt, value as u16)
}

pub fn mtc0(rt: u32, rd: u32) -> u32 {
	0x4080_0000 | (rt << 16) | (rd << 11)
}

pub fn mfc0(rt: u32, rd: u32) -> u32 {
	0x4000_0000 | (rt << 16) | (rd << 11)
}

pub const NOP: u32 = 0;
pub const SYSCALL: u32 = 0x0000_000C;
pub const RFE: u32 = 0x4200_0010;
pub const TLBR: u32 = 0x4200_0001;
pub const TLBWI: u32 = 0x4200_0002;
pub const TLBWR: u32 = 0x4200_0006;
pub const TLBP: u32 = 0x4200_0008;

/// A CPU wired to plain RAM at physical zero, with code at [`CODE`] and the
/// boot exception vectors switched off.
pub struct Machine {
	pub cpu: Mips1,
	pub ram: Ram,
	pub events: RecordingSink,
}

impl Machine {
	pub fn new(model: Model, program: &[u32]) -> Self {
		Self::with_config(Config::new(model), program)
	}

	pub fn with_config(config: Config, program: &[u32]) -> Self {
		init_logger();

		let mut ram = Ram::new(0, RAM_SIZE, config.endianness);
		ram.load_words(CODE & 0x1fff_ffff, program);

		let events = RecordingSink::default();

		let mut cpu = Mips1::new(config);
		cpu.set_sink(Box::new(events.clone()));
		cpu.write_cop0_reg(STATUS, 0);
		cpu.set_pc(CODE);

		Self { cpu, ram, events }
	}

	pub fn step(&mut self) -> u64 {
		self.cpu.run_instruction(&mut self.ram)
	}

	pub fn steps(&mut self, count: usize) {
		for _ in 0..count {
			self.step();
		}
	}

	pub fn exc_code(&self) -> u32 {
		(self.cpu.cop0_reg(CAUSE) >> 2) & 0x1f
	}
}
