use log::*;

use crate::bus::Bus;
use crate::config::Endianness;

use super::access::Width;
use super::cop0::Exception;
use super::{Mips1, DIV_CYCLES, MULT_CYCLES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
	raw: u32,
}

impl Instruction {
	pub fn from_u32(instr: u32) -> Self {
		Self { raw: instr }
	}

	pub fn raw(&self) -> u32 {
		self.raw
	}

	pub fn opcode(&self) -> u32 {
		self.raw >> 26
	}

	pub fn cop_opcode(&self) -> u32 {
		(self.raw >> 21) & 0x1F
	}

	pub fn cop_num(&self) -> u32 {
		(self.raw >> 26) & 3
	}

	pub fn reg_src(&self) -> u32 {
		(self.raw >> 21) & 0x1F
	}

	pub fn reg_tgt(&self) -> u32 {
		(self.raw >> 16) & 0x1F
	}

	pub fn reg_dst(&self) -> u32 {
		(self.raw >> 11) & 0x1F
	}

	pub fn imm16(&self) -> u32 {
		self.raw & 0xFFFF
	}

	// sign-extended version of imm16
	pub fn imm16_se(&self) -> u32 {
		let imm16 = (self.raw & 0xFFFF) as i16;

		imm16 as u32
	}

	pub fn imm26(&self) -> u32 {
		self.raw & 0x3FFFFFF
	}

	pub fn shamt(&self) -> u32 {
		(self.raw >> 6) & 0x1F
	}

	pub fn funct(&self) -> u32 {
		self.raw & 0x3F
	}

	// fpu register fields
	pub fn ft(&self) -> u32 {
		self.reg_tgt()
	}

	pub fn fs(&self) -> u32 {
		self.reg_dst()
	}

	pub fn fd(&self) -> u32 {
		self.shamt()
	}
}

impl Mips1 {
	pub fn decode_and_exec(&mut self, instr: Instruction, bus: &mut dyn Bus) {

		match instr.opcode() {

			0x00 => match instr.funct() {
				0x00 => self.op_sll(instr),
				0x02 => self.op_srl(instr),
				0x03 => self.op_sra(instr),
				0x04 => self.op_sllv(instr),
				0x06 => self.op_srlv(instr),
				0x07 => self.op_srav(instr),
				0x08 => self.op_jr(instr),
				0x09 => self.op_jalr(instr),
				0x0C => self.op_syscall(),
				0x0D => self.op_break(),
				0x0E => self.op_sdbbp(),
				0x0F => {} // SYNC
				0x10 => self.op_mfhi(instr),
				0x11 => self.op_mthi(instr),
				0x12 => self.op_mflo(instr),
				0x13 => self.op_mtlo(instr),
				0x18 => self.op_mult(instr),
				0x19 => self.op_multu(instr),
				0x1A => self.op_div(instr),
				0x1B => self.op_divu(instr),
				0x20 => self.op_add(instr),
				0x21 => self.op_addu(instr),
				0x22 => self.op_sub(instr),
				0x23 => self.op_subu(instr),
				0x24 => self.op_and(instr),
				0x25 => self.op_or(instr),
				0x26 => self.op_xor(instr),
				0x27 => self.op_nor(instr),
				0x2A => self.op_slt(instr),
				0x2B => self.op_sltu(instr),

				_ => self.op_illegal(instr),
			}

			0x01 => self.op_bcondz(instr),

			0x02 => self.op_j(instr),
			0x03 => self.op_jal(instr),
			0x04 => self.op_beq(instr),
			0x05 => self.op_bne(instr),
			0x06 => self.op_blez(instr),
			0x07 => self.op_bgtz(instr),
			0x08 => self.op_addi(instr),
			0x09 => self.op_addiu(instr),
			0x0A => self.op_slti(instr),
			0x0B => self.op_sltiu(instr),
			0x0C => self.op_andi(instr),
			0x0D => self.op_ori(instr),
			0x0E => self.op_xori(instr),
			0x0F => self.op_lui(instr),

			0x10 => self.handle_cop0(instr),
			0x11 => self.handle_cop1(instr, bus),
			0x12 | 0x13 => self.handle_copz(instr),

			0x14 => self.op_beql(instr),
			0x15 => self.op_bnel(instr),
			0x16 => self.op_blezl(instr),
			0x17 => self.op_bgtzl(instr),

			0x1C => self.op_madd(instr),

			0x20 => self.op_lb(instr, bus),
			0x21 => self.op_lh(instr, bus),
			0x22 => self.op_lwl(instr, bus),
			0x23 => self.op_lw(instr, bus),
			0x24 => self.op_lbu(instr, bus),
			0x25 => self.op_lhu(instr, bus),
			0x26 => self.op_lwr(instr, bus),
			0x28 => self.op_sb(instr, bus),
			0x29 => self.op_sh(instr, bus),
			0x2A => self.op_swl(instr, bus),
			0x2B => self.op_sw(instr, bus),
			0x2E => self.op_swr(instr, bus),
			0x2F => {} // CACHE

			0x31 | 0x39 => self.handle_cop1(instr, bus),
			0x32 | 0x33 | 0x3A | 0x3B => self.op_lwcz_swcz(instr),

			_ => self.op_illegal(instr),
		}

	}

	// ? Load/Store Instructions
	fn op_lui(&mut self, instr: Instruction) {
		let tgt = instr.reg_tgt();
		let imm = instr.imm16();

		self.registers.write_gpr(tgt, imm << 16);
	}

	fn effective_address(&self, instr: Instruction) -> u32 {
		self.registers.read_gpr(instr.reg_src()).wrapping_add(instr.imm16_se())
	}

	fn op_sw(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);

		self.store(bus, Width::Word, addr, self.registers.read_gpr(instr.reg_tgt()), !0, true);
	}

	fn op_lw(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);

		if let Some(value) = self.load(bus, Width::Word, addr, true) {
			self.registers.write_gpr(instr.reg_tgt(), value);
		}
	}

	fn op_sh(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);

		self.store(bus, Width::Half, addr, self.registers.read_gpr(instr.reg_tgt()), !0, true);
	}

	fn op_lh(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);

		if let Some(value) = self.load(bus, Width::Half, addr, true) {
			self.registers.write_gpr(instr.reg_tgt(), value as u16 as i16 as u32);
		}
	}

	fn op_lhu(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);

		if let Some(value) = self.load(bus, Width::Half, addr, true) {
			self.registers.write_gpr(instr.reg_tgt(), value);
		}
	}

	fn op_sb(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);

		self.store(bus, Width::Byte, addr, self.registers.read_gpr(instr.reg_tgt()), !0, true);
	}

	fn op_lb(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);

		if let Some(value) = self.load(bus, Width::Byte, addr, true) {
			// cast to i8 to sign extend
			self.registers.write_gpr(instr.reg_tgt(), value as u8 as i8 as u32);
		}
	}

	fn op_lbu(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);

		if let Some(value) = self.load(bus, Width::Byte, addr, true) {
			self.registers.write_gpr(instr.reg_tgt(), value);
		}
	}

	/// Byte lane shift for LWL/SWL. LWR/SWR use the mirrored lane.
	fn left_shift(&self, addr: u32) -> u32 {
		let lane = match self.config.endianness {
			Endianness::Big => addr & 3,
			Endianness::Little => (addr & 3) ^ 3,
		};

		lane << 3
	}

	fn right_shift(&self, addr: u32) -> u32 {
		let lane = match self.config.endianness {
			Endianness::Big => (addr & 3) ^ 3,
			Endianness::Little => addr & 3,
		};

		lane << 3
	}

	fn op_lwl(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);

		let Some(word) = self.load(bus, Width::Word, addr, false) else { return };

		let shift = self.left_shift(addr);
		let current = self.registers.read_gpr(instr.reg_tgt());

		self.registers.write_gpr(instr.reg_tgt(), (current & !(0xFFFF_FFFF << shift)) | (word << shift));
	}

	fn op_lwr(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);

		let Some(word) = self.load(bus, Width::Word, addr, false) else { return };

		let shift = self.right_shift(addr);
		let current = self.registers.read_gpr(instr.reg_tgt());

		self.registers.write_gpr(instr.reg_tgt(), (current & !(0xFFFF_FFFF >> shift)) | (word >> shift));
	}

	fn op_swl(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);
		let shift = self.left_shift(addr);
		let value = self.registers.read_gpr(instr.reg_tgt());

		self.store(bus, Width::Word, addr, value >> shift, 0xFFFF_FFFF >> shift, false);
	}

	fn op_swr(&mut self, instr: Instruction, bus: &mut dyn Bus) {
		let addr = self.effective_address(instr);
		let shift = self.right_shift(addr);
		let value = self.registers.read_gpr(instr.reg_tgt());

		self.store(bus, Width::Word, addr, value << shift, 0xFFFF_FFFF << shift, false);
	}

	fn op_mfhi(&mut self, instr: Instruction) {
		self.registers.write_gpr(instr.reg_dst(), self.registers.hi);
	}

	fn op_mflo(&mut self, instr: Instruction) {
		self.registers.write_gpr(instr.reg_dst(), self.registers.lo);
	}

	fn op_mthi(&mut self, instr: Instruction) {
		self.registers.hi = self.registers.read_gpr(instr.reg_src());
	}

	fn op_mtlo(&mut self, instr: Instruction) {
		self.registers.lo = self.registers.read_gpr(instr.reg_src());
	}

	// ? Logical Instructions
	fn op_ori(&mut self, instr: Instruction) {
		let result = self.registers.read_gpr(instr.reg_src()) | instr.imm16();

		self.registers.write_gpr(instr.reg_tgt(), result);
	}

	fn op_or(&mut self, instr: Instruction) {
		let result = self.registers.read_gpr(instr.reg_src()) | self.registers.read_gpr(instr.reg_tgt());

		self.registers.write_gpr(instr.reg_dst(), result);
	}

	fn op_xor(&mut self, instr: Instruction) {
		let result = self.registers.read_gpr(instr.reg_src()) ^ self.registers.read_gpr(instr.reg_tgt());

		self.registers.write_gpr(instr.reg_dst(), result);
	}

	fn op_xori(&mut self, instr: Instruction) {
		let result = self.registers.read_gpr(instr.reg_src()) ^ instr.imm16();

		self.registers.write_gpr(instr.reg_tgt(), result);
	}

	fn op_nor(&mut self, instr: Instruction) {
		let result = !(self.registers.read_gpr(instr.reg_src()) | self.registers.read_gpr(instr.reg_tgt()));

		self.registers.write_gpr(instr.reg_dst(), result);
	}

	fn op_andi(&mut self, instr: Instruction) {
		let result = self.registers.read_gpr(instr.reg_src()) & instr.imm16();

		self.registers.write_gpr(instr.reg_tgt(), result);
	}

	fn op_and(&mut self, instr: Instruction) {
		let result = self.registers.read_gpr(instr.reg_src()) & self.registers.read_gpr(instr.reg_tgt());

		self.registers.write_gpr(instr.reg_dst(), result);
	}

	// ? Arithmetic Instructions
	fn op_addiu(&mut self, instr: Instruction) {
		let result = self.registers.read_gpr(instr.reg_src()).wrapping_add(instr.imm16_se());

		self.registers.write_gpr(instr.reg_tgt(), result);
	}

	fn op_addu(&mut self, instr: Instruction) {
		let result = self.registers.read_gpr(instr.reg_src()).wrapping_add(self.registers.read_gpr(instr.reg_tgt()));

		self.registers.write_gpr(instr.reg_dst(), result);
	}

	// overflow leaves the destination untouched
	fn op_addi(&mut self, instr: Instruction) {
		let src = self.registers.read_gpr(instr.reg_src()) as i32;

		match src.checked_add(instr.imm16_se() as i32) {
			Some(result) => self.registers.write_gpr(instr.reg_tgt(), result as u32),
			None => self.exception(Exception::ArithmeticOverflow),
		}
	}

	fn op_add(&mut self, instr: Instruction) {
		let src = self.registers.read_gpr(instr.reg_src()) as i32;
		let tgt = self.registers.read_gpr(instr.reg_tgt()) as i32;

		match src.checked_add(tgt) {
			Some(result) => self.registers.write_gpr(instr.reg_dst(), result as u32),
			None => self.exception(Exception::ArithmeticOverflow),
		}
	}

	fn op_sub(&mut self, instr: Instruction) {
		let src = self.registers.read_gpr(instr.reg_src()) as i32;
		let tgt = self.registers.read_gpr(instr.reg_tgt()) as i32;

		match src.checked_sub(tgt) {
			Some(result) => self.registers.write_gpr(instr.reg_dst(), result as u32),
			None => self.exception(Exception::ArithmeticOverflow),
		}
	}

	fn op_subu(&mut self, instr: Instruction) {
		let result = self.registers.read_gpr(instr.reg_src()).wrapping_sub(self.registers.read_gpr(instr.reg_tgt()));

		self.registers.write_gpr(instr.reg_dst(), result);
	}

	fn op_slt(&mut self, instr: Instruction) {
		let src = self.registers.read_gpr(instr.reg_src()) as i32;
		let tgt = self.registers.read_gpr(instr.reg_tgt()) as i32;

		self.registers.write_gpr(instr.reg_dst(), (src < tgt) as u32);
	}

	fn op_sltu(&mut self, instr: Instruction) {
		let src = self.registers.read_gpr(instr.reg_src());
		let tgt = self.registers.read_gpr(instr.reg_tgt());

		self.registers.write_gpr(instr.reg_dst(), (src < tgt) as u32);
	}

	fn op_slti(&mut self, instr: Instruction) {
		let src = self.registers.read_gpr(instr.reg_src()) as i32;
		let imm = instr.imm16_se() as i32;

		self.registers.write_gpr(instr.reg_tgt(), (src < imm) as u32);
	}

	fn op_sltiu(&mut self, instr: Instruction) {
		let src = self.registers.read_gpr(instr.reg_src());
		let imm = instr.imm16_se();

		self.registers.write_gpr(instr.reg_tgt(), (src < imm) as u32);
	}

	// a zero divisor leaves HI/LO as they were
	fn op_div(&mut self, instr: Instruction) {
		let numerator = self.registers.read_gpr(instr.reg_src()) as i32;
		let denominator = self.registers.read_gpr(instr.reg_tgt()) as i32;

		if denominator != 0 {
			self.registers.lo = numerator.wrapping_div(denominator) as u32;
			self.registers.hi = numerator.wrapping_rem(denominator) as u32;
		}

		self.total_cycles += DIV_CYCLES;
	}

	fn op_divu(&mut self, instr: Instruction) {
		let numerator = self.registers.read_gpr(instr.reg_src());
		let denominator = self.registers.read_gpr(instr.reg_tgt());

		if denominator != 0 {
			self.registers.lo = numerator / denominator;
			self.registers.hi = numerator % denominator;
		}

		self.total_cycles += DIV_CYCLES;
	}

	// MULT and MULTU also copy the low word into rd
	fn op_mult(&mut self, instr: Instruction) {
		let multiplicand = (self.registers.read_gpr(instr.reg_src()) as i32) as i64;
		let multiplier = (self.registers.read_gpr(instr.reg_tgt()) as i32) as i64;

		let product = (multiplicand * multiplier) as u64;

		self.set_hilo(instr, product);
	}

	fn op_multu(&mut self, instr: Instruction) {
		let multiplicand = self.registers.read_gpr(instr.reg_src()) as u64;
		let multiplier = self.registers.read_gpr(instr.reg_tgt()) as u64;

		self.set_hilo(instr, multiplicand * multiplier);
	}

	/// MADD/MADDU: accumulate the product into HI:LO.
	fn op_madd(&mut self, instr: Instruction) {
		let src = self.registers.read_gpr(instr.reg_src());
		let tgt = self.registers.read_gpr(instr.reg_tgt());

		let product = if instr.raw & 1 != 0 {
			u64::from(src) * u64::from(tgt)
		} else {
			(i64::from(src as i32) * i64::from(tgt as i32)) as u64
		};

		let acc = (u64::from(self.registers.hi) << 32) | u64::from(self.registers.lo);

		self.set_hilo(instr, acc.wrapping_add(product));
	}

	fn set_hilo(&mut self, instr: Instruction, value: u64) {
		self.registers.hi = (value >> 32) as u32;
		self.registers.lo = value as u32;
		self.registers.write_gpr(instr.reg_dst(), value as u32);

		self.total_cycles += MULT_CYCLES;
	}

	// ? Shift Instructions
	fn op_sll(&mut self, instr: Instruction) {
		let new_val = self.registers.read_gpr(instr.reg_tgt()) << instr.shamt();

		self.registers.write_gpr(instr.reg_dst(), new_val);
	}

	fn op_sllv(&mut self, instr: Instruction) {
		let shamt = self.registers.read_gpr(instr.reg_src()) & 0x1F;
		let new_val = self.registers.read_gpr(instr.reg_tgt()) << shamt;

		self.registers.write_gpr(instr.reg_dst(), new_val);
	}

	fn op_srl(&mut self, instr: Instruction) {
		let new_val = self.registers.read_gpr(instr.reg_tgt()) >> instr.shamt();

		self.registers.write_gpr(instr.reg_dst(), new_val);
	}

	fn op_srlv(&mut self, instr: Instruction) {
		let shamt = self.registers.read_gpr(instr.reg_src()) & 0x1F;
		let new_val = self.registers.read_gpr(instr.reg_tgt()) >> shamt;

		self.registers.write_gpr(instr.reg_dst(), new_val);
	}

	fn op_sra(&mut self, instr: Instruction) {
		let result = (self.registers.read_gpr(instr.reg_tgt()) as i32) >> instr.shamt();

		self.registers.write_gpr(instr.reg_dst(), result as u32);
	}

	fn op_srav(&mut self, instr: Instruction) {
		let shamt = self.registers.read_gpr(instr.reg_src()) & 0x1F;
		let result = (self.registers.read_gpr(instr.reg_tgt()) as i32) >> shamt;

		self.registers.write_gpr(instr.reg_dst(), result as u32);
	}

	// ? Branch Instructions
	fn branch_dest(&self, instr: Instruction) -> u32 {
		self.pc.wrapping_add(4).wrapping_add(instr.imm16_se() << 2)
	}

	fn branch_if(&mut self, condition: bool, instr: Instruction) {
		if condition {
			self.branch.branch(self.branch_dest(instr));
		}
	}

	// not taken skips the delay slot
	fn branch_likely(&mut self, condition: bool, instr: Instruction) {
		if condition {
			self.branch.branch(self.branch_dest(instr));
		} else {
			self.pc = self.pc.wrapping_add(4);
		}
	}

	fn op_j(&mut self, instr: Instruction) {
		let target = (self.pc.wrapping_add(4) & 0xF000_0000) | (instr.imm26() << 2);

		self.branch.branch(target);
	}

	fn op_jal(&mut self, instr: Instruction) {
		self.op_j(instr);

		self.registers.write_gpr(31, self.pc.wrapping_add(8));
	}

	fn op_jalr(&mut self, instr: Instruction) {
		self.branch.branch(self.registers.read_gpr(instr.reg_src()));

		self.registers.write_gpr(instr.reg_dst(), self.pc.wrapping_add(8));
	}

	fn op_jr(&mut self, instr: Instruction) {
		self.branch.branch(self.registers.read_gpr(instr.reg_src()));
	}

	fn op_bne(&mut self, instr: Instruction) {
		let condition = self.registers.read_gpr(instr.reg_src()) != self.registers.read_gpr(instr.reg_tgt());
		self.branch_if(condition, instr);
	}

	fn op_beq(&mut self, instr: Instruction) {
		let condition = self.registers.read_gpr(instr.reg_src()) == self.registers.read_gpr(instr.reg_tgt());
		self.branch_if(condition, instr);
	}

	fn op_bgtz(&mut self, instr: Instruction) {
		let condition = self.registers.read_gpr(instr.reg_src()) as i32 > 0;
		self.branch_if(condition, instr);
	}

	fn op_blez(&mut self, instr: Instruction) {
		let condition = self.registers.read_gpr(instr.reg_src()) as i32 <= 0;
		self.branch_if(condition, instr);
	}

	fn op_beql(&mut self, instr: Instruction) {
		let condition = self.registers.read_gpr(instr.reg_src()) == self.registers.read_gpr(instr.reg_tgt());
		self.branch_likely(condition, instr);
	}

	fn op_bnel(&mut self, instr: Instruction) {
		let condition = self.registers.read_gpr(instr.reg_src()) != self.registers.read_gpr(instr.reg_tgt());
		self.branch_likely(condition, instr);
	}

	fn op_blezl(&mut self, instr: Instruction) {
		let condition = self.registers.read_gpr(instr.reg_src()) as i32 <= 0;
		self.branch_likely(condition, instr);
	}

	fn op_bgtzl(&mut self, instr: Instruction) {
		let condition = self.registers.read_gpr(instr.reg_src()) as i32 > 0;
		self.branch_likely(condition, instr);
	}

	// BLTZ, BGEZ, BLTZAL, BGEZAL. Bit 17 is not decoded, so the "likely"
	// encodings behave as plain branches.
	fn op_bcondz(&mut self, instr: Instruction) {
		let negative = (self.registers.read_gpr(instr.reg_src()) as i32) < 0;

		let (condition, link) = match instr.reg_tgt() & !0x02 {
			0x00 => (negative, false),
			0x01 => (!negative, false),
			0x10 => (negative, true),
			0x11 => (!negative, true),
			_ => return self.op_illegal(instr),
		};

		if link {
			self.registers.write_gpr(31, self.pc.wrapping_add(8));
		}

		self.branch_if(condition, instr);
	}

	/// BCzF, BCzT, BCzFL, BCzTL.
	pub(super) fn op_bcz(&mut self, instr: Instruction, cop: usize) {
		let condition = if cop == 1 {
			self.fpu.as_ref().is_some_and(|fpu| fpu.condition())
		} else {
			self.brcond[cop]
		};

		match instr.reg_tgt() {
			0x00 => self.branch_if(!condition, instr),
			0x01 => self.branch_if(condition, instr),
			0x02 => self.branch_likely(!condition, instr),
			0x03 => self.branch_likely(condition, instr),
			_ => self.op_illegal(instr),
		}
	}

	// ? Trap Instructions
	fn op_syscall(&mut self) {
		self.exception(Exception::Syscall);
	}

	fn op_break(&mut self) {
		self.exception(Exception::Breakpoint);
	}

	fn op_sdbbp(&mut self) {
		self.exception(Exception::Breakpoint);
	}

	pub(super) fn op_illegal(&mut self, instr: Instruction) {
		debug!("reserved instruction 0x{:08X} (PC: 0x{:08X}) (opcode: 0x{:X} funct: 0x{:X})", instr.raw, self.pc, instr.opcode(), instr.funct());

		self.exception(Exception::ReservedInstruction);
	}

	// ? Coprocessor Instructions
	/// COP2 and COP3 only know their branch-on-condition instructions.
	fn handle_copz(&mut self, instr: Instruction) {
		let cop = instr.cop_num();

		if !self.cop0.sr().cop_usable(cop) {
			self.exception(Exception::CopUnusable(cop as u8));
			return;
		}

		match instr.cop_opcode() {
			0x08 => self.op_bcz(instr, cop as usize),
			_ => self.op_illegal(instr),
		}
	}

	fn op_lwcz_swcz(&mut self, instr: Instruction) {
		let cop = instr.cop_num();

		if self.cop0.sr().cop_usable(cop) {
			self.op_illegal(instr);
		} else {
			self.exception(Exception::CopUnusable(cop as u8));
		}
	}
}
