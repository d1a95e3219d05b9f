mod common;

use common::*;
use mips1::{BranchState, Model};

fn beq(rs: u32, rt: u32, offset: i16) -> u32 {
	imm(0x04, rs, rt, offset as u16)
}

#[test]
fn delay_slot_runs_before_target() {
	let mut m = Machine::new(
		Model::R3000A,
		&[
			beq(ZERO, ZERO, 2),
			addiu(T0, ZERO, 1), // delay slot
			addiu(T1, ZERO, 1), // skipped
			addiu(T2, ZERO, 1),
		],
	);

	m.step();
	assert_eq!(m.cpu.branch_state(), BranchState::Delay);
	assert_eq!(m.cpu.branch_target(), CODE + 12);

	m.steps(2);

	assert_eq!(m.cpu.gpr(T0), 1);
	assert_eq!(m.cpu.gpr(T1), 0);
	assert_eq!(m.cpu.gpr(T2), 1);
	assert_eq!(m.cpu.pc(), CODE + 16);
}

#[test]
fn exception_in_delay_slot_sets_bd() {
	let mut m = Machine::new(Model::R3000A, &[beq(ZERO, ZERO, 4), SYSCALL]);

	m.steps(2);

	let cause = m.cpu.cop0_reg(CAUSE);
	assert_eq!(cause & 0x8000_0000, 0x8000_0000);
	assert_eq!(m.exc_code(), 0x08);
	assert_eq!(m.cpu.cop0_reg(EPC), CODE);
	assert_eq!(m.cpu.pc(), 0x8000_0080);
	assert_eq!(m.cpu.branch_state(), BranchState::None);

	// the handler is not in a delay slot
	m.step();
	assert_eq!(m.cpu.pc(), 0x8000_0084);
}

#[test]
fn likely_branch_nullifies_slot_when_not_taken() {
	let mut m = Machine::new(
		Model::R3000A,
		&[
			imm(0x14, T0, ZERO, 4), // beql
			addiu(T1, ZERO, 1),
			addiu(T2, ZERO, 1),
		],
	);
	m.cpu.set_gpr(T0, 1);

	m.step();
	assert_eq!(m.cpu.pc(), CODE + 8);

	m.step();
	assert_eq!(m.cpu.gpr(T1), 0);
	assert_eq!(m.cpu.gpr(T2), 1);
}

#[test]
fn likely_branch_taken_runs_slot() {
	let mut m = Machine::new(
		Model::R3000A,
		&[
			imm(0x15, T0, ZERO, 2), // bnel
			addiu(T1, ZERO, 1),
			NOP,
			addiu(T2, ZERO, 1),
		],
	);
	m.cpu.set_gpr(T0, 1);

	m.steps(3);

	assert_eq!(m.cpu.gpr(T1), 1);
	assert_eq!(m.cpu.gpr(T2), 1);
}

#[test]
fn regimm_ignores_likely_bit() {
	// bltzl $zero: not taken, but the slot still runs
	let mut m = Machine::new(Model::R3000A, &[imm(0x01, ZERO, 0x02, 4), addiu(T1, ZERO, 1)]);

	m.step();
	assert_eq!(m.cpu.pc(), CODE + 4);

	m.step();
	assert_eq!(m.cpu.gpr(T1), 1);
}

#[test]
fn branch_and_link_always_links() {
	// bgezal $t0 with $t0 negative
	let mut m = Machine::new(Model::R3000A, &[imm(0x01, T0, 0x11, 4)]);
	m.cpu.set_gpr(T0, 0xFFFF_FFFF);

	m.step();

	assert_eq!(m.cpu.gpr(RA), CODE + 8);
	assert_eq!(m.cpu.branch_state(), BranchState::None);
}

#[test]
fn unknown_regimm_is_reserved() {
	let mut m = Machine::new(Model::R3000A, &[imm(0x01, ZERO, 0x08, 0)]);

	m.step();

	assert_eq!(m.exc_code(), 0x0A);
}

#[test]
fn jal_and_jalr_link() {
	let mut m = Machine::new(
		Model::R3000A,
		&[
			jump(0x03, 0x8000_2000), // jal
			NOP,
		],
	);

	m.steps(2);

	assert_eq!(m.cpu.gpr(RA), CODE + 8);
	assert_eq!(m.cpu.pc(), 0x8000_2000);

	let mut m = Machine::new(Model::R3000A, &[special(T0, 0, T1, 0, 0x09), NOP]);
	m.cpu.set_gpr(T0, 0x8000_3000);

	m.steps(2);

	assert_eq!(m.cpu.gpr(T1), CODE + 8);
	assert_eq!(m.cpu.pc(), 0x8000_3000);
}

#[test]
fn bc0_follows_external_condition() {
	let bc0t = 0x4101_0000 | 3;
	let mut m = Machine::new(Model::R3000A, &[bc0t, NOP, bc0t]);

	m.steps(2);
	assert_eq!(m.cpu.pc(), CODE + 8);

	m.cpu.set_brcond(0, true);
	m.step();
	assert_eq!(m.cpu.branch_target(), CODE + 8 + 4 + 12);
}

#[test]
fn run_consumes_budget() {
	let mut m = Machine::new(Model::R3000A, &[NOP; 16]);

	let used = m.cpu.run(&mut m.ram, 10);

	assert_eq!(used, 10);
	assert_eq!(m.cpu.pc(), CODE + 40);
	assert_eq!(m.cpu.total_cycles(), 10);
}
