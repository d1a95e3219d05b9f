use log::*;
use rustc_apfloat::Status as FloatStatus;

use crate::bus::Bus;
use crate::config::FpuConfig;
use crate::diag::Diagnostic;

use super::access::Width;
use super::cop0::{Exception, Status};
use super::instructions::Instruction;
use super::softfloat::{rounding_mode, SoftFloat};
use super::Mips1;

// FCR31 fields
pub const FCR31_RM: u32 = 0x0000_0003;
pub const FCR31_FI: u32 = 0x0000_0004;
pub const FCR31_FU: u32 = 0x0000_0008;
pub const FCR31_FO: u32 = 0x0000_0010;
pub const FCR31_FZ: u32 = 0x0000_0020;
pub const FCR31_FV: u32 = 0x0000_0040;
pub const FCR31_EM: u32 = 0x0000_0f80;
pub const FCR31_CI: u32 = 0x0000_1000;
pub const FCR31_CU: u32 = 0x0000_2000;
pub const FCR31_CO: u32 = 0x0000_4000;
pub const FCR31_CZ: u32 = 0x0000_8000;
pub const FCR31_CV: u32 = 0x0001_0000;
pub const FCR31_CE: u32 = 0x0002_0000;
pub const FCR31_C: u32 = 0x0080_0000;

const FCR31_CM: u32 = 0x0001_f000;
const FCR31_FLAGS: u32 = FCR31_FI | FCR31_FU | FCR31_FO | FCR31_FZ | FCR31_FV;

const FMT_S: u32 = 0x10;
const FMT_D: u32 = 0x11;
const FMT_W: u32 = 0x14;

/// What an FPU operation wants done with its interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqUpdate {
	Keep,
	Set(bool),
}

/// Floating point coprocessor state.
///
/// Sixteen 64-bit registers; the 32 architectural single registers are the
/// low (even) and high (odd) halves.
pub struct Fpu {
	pub f: [u64; 16],
	pub fcr0: u32,
	pub fcr30: u32,
	pub fcr31: u32,
	pub irq: u32,
	sf: SoftFloat,
}

impl Fpu {
	pub fn new(config: FpuConfig) -> Self {
		Self {
			f: [0; 16],
			fcr0: config.revision,
			fcr30: 0,
			fcr31: 0,
			irq: config.irq,
			sf: SoftFloat::default(),
		}
	}

	pub fn condition(&self) -> bool {
		self.fcr31 & FCR31_C != 0
	}

	/// 32-bit view of single register `reg`.
	pub fn read_half(&self, reg: u32) -> u32 {
		let value = self.f[(reg >> 1) as usize];

		if reg & 1 != 0 {
			(value >> 32) as u32
		} else {
			value as u32
		}
	}

	pub fn write_half(&mut self, reg: u32, data: u32) {
		let value = &mut self.f[(reg >> 1) as usize];

		*value = if reg & 1 != 0 {
			(*value & 0x0000_0000_ffff_ffff) | (u64::from(data) << 32)
		} else {
			(*value & 0xffff_ffff_0000_0000) | u64::from(data)
		};
	}

	pub fn read_control(&self, reg: u32) -> Option<u32> {
		match reg {
			0 => Some(self.fcr0),
			30 => Some(self.fcr30),
			31 => Some(self.fcr31),
			_ => None,
		}
	}

	pub fn write_control(&mut self, reg: u32, data: u32) -> IrqUpdate {
		match reg {
			0 => IrqUpdate::Keep,
			30 => {
				self.fcr30 = data;
				IrqUpdate::Keep
			}
			31 => {
				self.fcr31 = data;
				self.sf.round = rounding_mode(data & FCR31_RM);

				IrqUpdate::Set(self.exception_pending())
			}
			_ => {
				error!("ctc1 to unimplemented control register {reg} (0x{data:08X})");
				IrqUpdate::Keep
			}
		}
	}

	fn exception_pending(&self) -> bool {
		(self.fcr31 & FCR31_CE != 0) || ((self.fcr31 & FCR31_CM) >> 5) & (self.fcr31 & FCR31_EM) != 0
	}

	/// Unimplemented-operation exception, always taken.
	pub fn unimplemented(&mut self) -> IrqUpdate {
		self.fcr31 |= FCR31_CE;
		IrqUpdate::Set(true)
	}

	/// Fold the operation's status into FCR31. Returns the interrupt update
	/// and whether the result may be written back.
	fn commit(&mut self) -> (IrqUpdate, bool) {
		let flags = self.sf.flags;

		if flags == FloatStatus::OK {
			return (IrqUpdate::Keep, true);
		}

		for (status, cause) in [
			(FloatStatus::INEXACT, FCR31_CI),
			(FloatStatus::UNDERFLOW, FCR31_CU),
			(FloatStatus::OVERFLOW, FCR31_CO),
			(FloatStatus::DIV_BY_ZERO, FCR31_CZ),
			(FloatStatus::INVALID_OP, FCR31_CV),
		] {
			if flags.contains(status) {
				self.fcr31 |= cause;
			}
		}

		// causes stick in the flag bits
		self.fcr31 |= ((self.fcr31 & FCR31_CM) >> 10) & FCR31_FLAGS;

		let exception = self.exception_pending();

		(IrqUpdate::Set(exception), !exception)
	}

	fn set_single(&mut self, reg: u32, data: u32) -> IrqUpdate {
		let (update, write) = self.commit();

		if write {
			let value = &mut self.f[(reg >> 1) as usize];
			*value = (*value & 0xffff_ffff_0000_0000) | u64::from(data);
		}

		update
	}

	fn set_double(&mut self, reg: u32, data: u64) -> IrqUpdate {
		let (update, write) = self.commit();

		if write {
			self.f[(reg >> 1) as usize] = data;
		}

		update
	}

	fn single(&self, reg: u32) -> u32 {
		self.f[(reg >> 1) as usize] as u32
	}

	fn double(&self, reg: u32) -> u64 {
		self.f[(reg >> 1) as usize]
	}

	/// Computational and compare instructions (fmt in S, D, W).
	pub fn execute(&mut self, instr: Instruction) -> Option<IrqUpdate> {
		self.sf.clear_flags();

		let (fs, ft, fd) = (instr.fs(), instr.ft(), instr.fd());

		let update = match (instr.cop_opcode(), instr.funct()) {
			(FMT_S, 0x00) => {
				let result = self.sf.f32_add(self.single(fs), self.single(ft));
				self.set_single(fd, result)
			}
			(FMT_S, 0x01) => {
				let result = self.sf.f32_sub(self.single(fs), self.single(ft));
				self.set_single(fd, result)
			}
			(FMT_S, 0x02) => {
				let result = self.sf.f32_mul(self.single(fs), self.single(ft));
				self.set_single(fd, result)
			}
			(FMT_S, 0x03) => {
				let result = self.sf.f32_div(self.single(fs), self.single(ft));
				self.set_single(fd, result)
			}
			(FMT_S, 0x05) => {
				let result = self.sf.f32_abs(self.single(fs));
				self.set_single(fd, result)
			}
			(FMT_S, 0x06) => {
				let value = self.read_half(fs);
				self.write_half(fd, value);
				IrqUpdate::Keep
			}
			(FMT_S, 0x07) => {
				let result = self.sf.f32_neg(self.single(fs));
				self.set_single(fd, result)
			}
			(FMT_S, 0x21) => {
				let result = self.sf.f32_to_f64(self.single(fs));
				self.set_double(fd, result)
			}
			(FMT_S, 0x24) => {
				let result = self.sf.f32_to_i32(self.single(fs));
				self.set_single(fd, result)
			}
			(FMT_S, 0x30..=0x3f) => {
				let (a, b) = (self.single(fs), self.single(ft));
				let order = self.sf.f32_compare(a, b);
				self.compare(instr.funct(), order)
			}

			(FMT_D, 0x00) => {
				let result = self.sf.f64_add(self.double(fs), self.double(ft));
				self.set_double(fd, result)
			}
			(FMT_D, 0x01) => {
				let result = self.sf.f64_sub(self.double(fs), self.double(ft));
				self.set_double(fd, result)
			}
			(FMT_D, 0x02) => {
				let result = self.sf.f64_mul(self.double(fs), self.double(ft));
				self.set_double(fd, result)
			}
			(FMT_D, 0x03) => {
				let result = self.sf.f64_div(self.double(fs), self.double(ft));
				self.set_double(fd, result)
			}
			(FMT_D, 0x05) => {
				let result = self.sf.f64_abs(self.double(fs));
				self.set_double(fd, result)
			}
			(FMT_D, 0x06) => {
				self.f[(fd >> 1) as usize] = self.double(fs);
				IrqUpdate::Keep
			}
			(FMT_D, 0x07) => {
				let result = self.sf.f64_neg(self.double(fs));
				self.set_double(fd, result)
			}
			(FMT_D, 0x20) => {
				let result = self.sf.f64_to_f32(self.double(fs));
				self.set_single(fd, result)
			}
			(FMT_D, 0x24) => {
				let result = self.sf.f64_to_i32(self.double(fs));
				self.set_single(fd, result)
			}
			(FMT_D, 0x30..=0x3f) => {
				let (a, b) = (self.double(fs), self.double(ft));
				let order = self.sf.f64_compare(a, b);
				self.compare(instr.funct(), order)
			}

			(FMT_W, 0x20) => {
				let result = self.sf.i32_to_f32(self.single(fs));
				self.set_single(fd, result)
			}
			(FMT_W, 0x21) => {
				let result = self.sf.i32_to_f64(self.single(fs));
				self.set_double(fd, result)
			}

			_ => return None,
		};

		Some(update)
	}

	/// C.cond.fmt. Low three predicate bits select unordered, equal and
	/// less-than; bit 3 makes the predicate signal on unordered operands.
	fn compare(&mut self, cond: u32, order: Option<std::cmp::Ordering>) -> IrqUpdate {
		use std::cmp::Ordering;

		let unordered = order.is_none();
		let result = (unordered && cond & 1 != 0)
			|| (order == Some(Ordering::Equal) && cond & 2 != 0)
			|| (order == Some(Ordering::Less) && cond & 4 != 0);

		if result {
			self.fcr31 |= FCR31_C;
		} else {
			self.fcr31 &= !FCR31_C;
		}

		if !unordered {
			return IrqUpdate::Keep;
		}

		self.fcr31 |= FCR31_FV;

		if cond & 8 == 0 {
			return IrqUpdate::Keep;
		}

		self.fcr31 |= FCR31_CV;

		if self.exception_pending() {
			IrqUpdate::Set(true)
		} else {
			IrqUpdate::Keep
		}
	}
}

impl Mips1 {
	fn apply_fpu_irq(&mut self, update: IrqUpdate) {
		let (IrqUpdate::Set(state), Some(line)) = (update, self.fpu.as_ref().map(|fpu| fpu.irq)) else {
			return;
		};

		self.set_input(line, state);
	}

	fn fpu_unimplemented(&mut self, instr: Instruction) {
		let Some(fpu) = self.fpu.as_mut() else { return };
		let update = fpu.unimplemented();

		debug!("fpu unimplemented operation 0x{:08X} at 0x{:08X}", instr.raw(), self.pc);
		self.report(Diagnostic::FpuUnimplemented { op: instr.raw() });
		self.apply_fpu_irq(update);
	}

	/// COP1, LWC1 and SWC1.
	pub(super) fn handle_cop1(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		if !self.cop0.sr().contains(Status::CU1) {
			self.exception(Exception::CopUnusable(1));
			return;
		}

		if self.fpu.is_none() {
			return;
		}

		match instr.opcode() {
			0x11 => self.op_cop1(instr),
			0x31 => self.op_lwc1(instr, bus),
			0x39 => self.op_swc1(instr, bus),
			_ => self.op_illegal(instr),
		}
	}

	fn op_cop1(&mut self, instr: Instruction) {
		match instr.cop_opcode() {
			0x00 => self.op_mfc1(instr),
			0x02 => self.op_cfc1(instr),
			0x04 => self.op_mtc1(instr),
			0x06 => self.op_ctc1(instr),
			0x08 => match instr.reg_tgt() {
				0x00..=0x03 => self.op_bcz(instr, 1),
				_ => self.fpu_unimplemented(instr),
			},
			_ => {
				let Some(fpu) = self.fpu.as_mut() else { return };

				match fpu.execute(instr) {
					Some(update) => self.apply_fpu_irq(update),
					None => self.fpu_unimplemented(instr),
				}
			}
		}
	}

	fn op_mfc1(&mut self, instr: Instruction) {
		let Some(fpu) = self.fpu.as_ref() else { return };
		let value = fpu.read_half(instr.fs());

		self.registers.write_gpr(instr.reg_tgt(), value);
	}

	fn op_mtc1(&mut self, instr: Instruction) {
		let write = self.registers.read_gpr(instr.reg_tgt());

		if let Some(fpu) = self.fpu.as_mut() {
			fpu.write_half(instr.fs(), write);
		}
	}

	fn op_cfc1(&mut self, instr: Instruction) {
		let Some(fpu) = self.fpu.as_ref() else { return };

		match fpu.read_control(instr.fs()) {
			Some(value) => self.registers.write_gpr(instr.reg_tgt(), value),
			None => error!("cfc1 from unimplemented control register {}", instr.fs()),
		}
	}

	fn op_ctc1(&mut self, instr: Instruction) {
		let write = self.registers.read_gpr(instr.reg_tgt());

		let Some(fpu) = self.fpu.as_mut() else { return };
		let update = fpu.write_control(instr.fs(), write);

		self.apply_fpu_irq(update);
	}

	fn op_lwc1(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.registers.read_gpr(instr.reg_src()).wrapping_add(instr.imm16_se());

		let Some(value) = self.load(bus, Width::Word, addr, true) else { return };

		if let Some(fpu) = self.fpu.as_mut() {
			fpu.write_half(instr.ft(), value);
		}
	}

	fn op_swc1(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.registers.read_gpr(instr.reg_src()).wrapping_add(instr.imm16_se());

		let Some(value) = self.fpu.as_ref().map(|fpu| fpu.read_half(instr.ft())) else { return };

		self.store(bus, Width::Word, addr, value, !0, true);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const ONE: u32 = 0x3f80_0000;
	const QNAN: u32 = 0x7fc0_0000;

	fn op(fmt: u32, ft: u32, fs: u32, fd: u32, funct: u32) -> Instruction {
		Instruction::from_u32((0x11 << 26) | (fmt << 21) | (ft << 16) | (fs << 11) | (fd << 6) | funct)
	}

	fn fpu() -> Fpu {
		Fpu::new(FpuConfig::new(FpuConfig::R3010))
	}

	#[test]
	fn halves_follow_register_parity() {
		let mut fpu = fpu();

		fpu.write_half(4, 0x1111_1111);
		fpu.write_half(5, 0x2222_2222);

		assert_eq!(fpu.f[2], 0x2222_2222_1111_1111);
		assert_eq!(fpu.read_half(5), 0x2222_2222);
	}

	#[test]
	fn add_single() {
		let mut fpu = fpu();
		fpu.write_half(2, ONE);
		fpu.write_half(4, ONE);

		assert_eq!(fpu.execute(op(FMT_S, 4, 2, 6, 0x00)), Some(IrqUpdate::Keep));
		assert_eq!(fpu.read_half(6), 0x4000_0000);
		assert_eq!(fpu.fcr31, 0);
	}

	#[test]
	fn inexact_sets_cause_and_flag() {
		let mut fpu = fpu();
		fpu.write_half(0, ONE);
		fpu.write_half(2, 0x4040_0000);

		assert_eq!(fpu.execute(op(FMT_S, 2, 0, 4, 0x03)), Some(IrqUpdate::Set(false)));
		assert_eq!(fpu.fcr31 & (FCR31_CI | FCR31_FI), FCR31_CI | FCR31_FI);
		assert_eq!(fpu.read_half(4), 0x3eaa_aaab);
	}

	#[test]
	fn enabled_exception_suppresses_write() {
		let mut fpu = fpu();
		fpu.write_control(31, 0x0000_0400); // EZ
		fpu.write_half(0, ONE);
		fpu.write_half(4, 0xdead_beef);

		assert_eq!(fpu.execute(op(FMT_S, 2, 0, 4, 0x03)), Some(IrqUpdate::Set(true)));
		assert_eq!(fpu.read_half(4), 0xdead_beef);
		assert_ne!(fpu.fcr31 & FCR31_CZ, 0);
	}

	#[test]
	fn quiet_compare_with_nan() {
		let mut fpu = fpu();
		fpu.fcr31 = FCR31_C;
		fpu.write_half(0, QNAN);
		fpu.write_half(2, QNAN);

		assert_eq!(fpu.execute(op(FMT_S, 2, 0, 0, 0x32)), Some(IrqUpdate::Keep));
		assert!(!fpu.condition());
		assert_ne!(fpu.fcr31 & FCR31_FV, 0);
		assert_eq!(fpu.fcr31 & FCR31_CV, 0);
	}

	#[test]
	fn signalling_compare_interrupts_when_enabled() {
		let mut fpu = fpu();
		fpu.write_control(31, 0x0000_0800); // EV
		fpu.write_half(0, QNAN);
		fpu.write_half(2, ONE);

		assert_eq!(fpu.execute(op(FMT_S, 2, 0, 0, 0x3a)), Some(IrqUpdate::Set(true)));
		assert!(!fpu.condition());
		assert_ne!(fpu.fcr31 & FCR31_CV, 0);
	}

	#[test]
	fn unordered_predicates_hold_on_nan() {
		let mut fpu = fpu();
		fpu.write_half(0, QNAN);
		fpu.write_half(2, ONE);

		fpu.execute(op(FMT_S, 2, 0, 0, 0x33)); // C.UEQ
		assert!(fpu.condition());

		fpu.write_half(0, 0);
		fpu.execute(op(FMT_S, 2, 0, 0, 0x34)); // C.OLT 0 < 1
		assert!(fpu.condition());
		fpu.execute(op(FMT_S, 0, 2, 0, 0x36)); // C.OLE 1 <= 0
		assert!(!fpu.condition());
	}

	#[test]
	fn conversions_use_rounding_mode() {
		let mut fpu = fpu();
		fpu.write_half(0, 0x4020_0000); // 2.5

		fpu.execute(op(FMT_S, 0, 0, 2, 0x24));
		assert_eq!(fpu.read_half(2), 2);

		fpu.write_control(31, 2);
		fpu.execute(op(FMT_S, 0, 0, 2, 0x24));
		assert_eq!(fpu.read_half(2), 3);

		fpu.write_half(4, 7);
		fpu.execute(op(FMT_W, 0, 4, 6, 0x21));
		assert_eq!(fpu.f[3], 0x401c_0000_0000_0000);
	}

	#[test]
	fn unknown_encoding_is_unimplemented() {
		let mut fpu = fpu();

		assert_eq!(fpu.execute(op(FMT_W, 0, 0, 0, 0x00)), None);
		assert_eq!(fpu.unimplemented(), IrqUpdate::Set(true));
		assert_ne!(fpu.fcr31 & FCR31_CE, 0);
	}
}
