mod common;

use common::*;
use mips1::{Diagnostic, Exception, Intention, Mips1, Model, Status};

#[test]
fn reset_state() {
	let cpu = Mips1::with_model(Model::R3081);

	assert_eq!(cpu.pc(), 0xBFC0_0000);
	assert_eq!(cpu.status(), Status::BEV);
	assert_eq!(cpu.cop0_reg(CAUSE), 0);
	assert_eq!(cpu.cop0_reg(PRID), 0x0200);
}

#[test]
fn syscall_pushes_mode_stack() {
	let mut m = Machine::new(Model::R3000A, &[SYSCALL]);
	m.cpu.write_cop0_reg(STATUS, 0x0000_0001);

	m.step();

	assert_eq!(m.exc_code(), 0x08);
	assert_eq!(m.cpu.cop0_reg(STATUS) & 0x3F, 0x04);
	assert_eq!(m.cpu.pc(), 0x8000_0080);
}

#[test]
fn boot_vector_when_bev_set() {
	let mut m = Machine::new(Model::R3000A, &[SYSCALL]);
	m.cpu.write_cop0_reg(STATUS, Status::BEV.bits());

	m.step();

	assert_eq!(m.cpu.pc(), 0xBFC0_0180);
}

#[test]
fn rfe_pops_mode_stack() {
	let mut m = Machine::new(Model::R3000A, &[RFE]);
	m.cpu.write_cop0_reg(STATUS, 0x0000_003C);

	m.step();

	assert_eq!(m.cpu.cop0_reg(STATUS) & 0x3F, 0x3F);
	assert!(m.events.events().contains(&Diagnostic::PrivilegeChange { user: true }));
}

#[test]
fn user_mode_kseg_fetch_is_address_error() {
	let mut m = Machine::new(Model::R3000A, &[NOP]);
	m.cpu.write_cop0_reg(STATUS, 0x0000_0002);
	m.events.clear();

	m.step();

	assert_eq!(m.exc_code(), 0x04);
	assert_eq!(m.cpu.cop0_reg(BAD_VADDR), CODE);
	assert_eq!(m.cpu.cop0_reg(EPC), CODE);
	assert_eq!(m.cpu.cop0_reg(STATUS) & 0x3F, 0x08);

	let events = m.events.events();
	assert_eq!(events[0], Diagnostic::AddressError { address: CODE, intention: Intention::Fetch });
	assert_eq!(
		events[1],
		Diagnostic::Exception { exception: Exception::AddrLoadError, epc: CODE, vector: 0x8000_0080 }
	);
	assert_eq!(events[2], Diagnostic::PrivilegeChange { user: false });
}

#[test]
fn pending_interrupt_preempts_instruction() {
	let mut m = Machine::new(Model::R3000A, &[addiu(T0, ZERO, 1)]);
	m.cpu.write_cop0_reg(STATUS, 0x0000_0401);
	m.cpu.set_input(0, true);

	m.step();

	assert_eq!(m.exc_code(), 0x00);
	assert_eq!(m.cpu.gpr(T0), 0);
	assert_eq!(m.cpu.cop0_reg(EPC), CODE);
	assert_eq!(m.cpu.cop0_reg(CAUSE) & 0xFF00, 0x0400);
}

#[test]
fn masked_interrupt_is_ignored() {
	let mut m = Machine::new(Model::R3000A, &[addiu(T0, ZERO, 1)]);
	m.cpu.write_cop0_reg(STATUS, 0x0000_0801);
	m.cpu.set_input(0, true);

	m.step();

	assert_eq!(m.cpu.gpr(T0), 1);
}

#[test]
fn software_interrupt_bits_are_writable() {
	let mut m = Machine::new(Model::R3000A, &[mtc0(T0, CAUSE)]);
	m.cpu.set_gpr(T0, 0x0000_0300);

	m.step();

	assert_eq!(m.cpu.cop0_reg(CAUSE), 0x0000_0300);
}

#[test]
fn cop2_unusable() {
	let mut m = Machine::new(Model::R3000A, &[0x4800_0000]);

	m.step();

	assert_eq!(m.cpu.cop0_reg(CAUSE), 0x2000_002C);
}

#[test]
fn cop3_usable_but_only_branches() {
	let mut m = Machine::new(Model::R3000A, &[0x4C00_0000, 0xEC00_0000]);
	m.cpu.write_cop0_reg(STATUS, Status::CU3.bits());

	m.step();
	assert_eq!(m.exc_code(), 0x0A);

	// swc3
	m.cpu.set_pc(CODE + 4);
	m.cpu.write_cop0_reg(STATUS, Status::CU3.bits());
	m.step();
	assert_eq!(m.exc_code(), 0x0A);
}

#[test]
fn fetch_bus_error() {
	let mut m = Machine::new(Model::R3000A, &[]);
	m.cpu.set_pc(0x8010_0000);

	m.step();

	assert_eq!(m.exc_code(), 0x06);
	assert_eq!(m.cpu.cop0_reg(EPC), 0x8010_0000);
	assert_eq!(m.cpu.pc(), 0x8000_0080);
}

#[test]
fn load_bus_error() {
	let mut m = Machine::new(Model::R3000A, &[imm(0x23, T0, T1, 0)]);
	m.ram.inject_fault(0x2000..0x2004);
	m.cpu.set_gpr(T0, 0x8000_2000);
	m.cpu.set_gpr(T1, 0x5555);

	m.step();

	assert_eq!(m.exc_code(), 0x07);
	assert_eq!(m.cpu.gpr(T1), 0x5555);
}

#[test]
fn store_bus_error() {
	let mut m = Machine::new(Model::R3000A, &[imm(0x2B, T0, T1, 0)]);
	m.cpu.set_gpr(T0, 0x8020_0000);

	m.step();

	assert_eq!(m.exc_code(), 0x07);
}

#[test]
fn misaligned_accesses() {
	let mut m = Machine::new(Model::R3000A, &[imm(0x23, T0, T1, 1)]);
	m.cpu.set_gpr(T0, 0x8000_2000);

	m.step();

	assert_eq!(m.exc_code(), 0x04);
	assert_eq!(m.cpu.cop0_reg(BAD_VADDR), 0x8000_2001);

	let mut m = Machine::new(Model::R3000A, &[imm(0x29, T0, T1, 3)]);
	m.cpu.set_gpr(T0, 0x8000_2000);

	m.step();

	assert_eq!(m.exc_code(), 0x05);
	assert_eq!(m.cpu.cop0_reg(BAD_VADDR), 0x8000_2003);
}

#[test]
fn break_and_sdbbp() {
	let mut m = Machine::new(Model::R3000A, &[0x0000_000D]);
	m.step();
	assert_eq!(m.exc_code(), 0x09);

	let mut m = Machine::new(Model::R3000A, &[0x0000_000E]);
	m.step();
	assert_eq!(m.exc_code(), 0x09);
}

#[test]
fn prid_is_read_only() {
	let mut m = Machine::new(Model::R3000A, &[mtc0(T0, PRID), mfc0(T1, PRID)]);
	m.cpu.set_gpr(T0, 0xFFFF);

	m.steps(2);

	assert_eq!(m.cpu.gpr(T1), 0x0230);
}
