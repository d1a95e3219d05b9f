mod common;

use common::*;
use mips1::{Diagnostic, Exception, LogSink, Model, Status};

#[test]
fn enabled_interrupt_is_reported() {
	let mut m = Machine::new(Model::R3000A, &[NOP]);
	m.cpu.write_cop0_reg(STATUS, Status::IEC.bits() | 0x0800);

	m.cpu.set_input(0, true);
	assert!(m.events.events().is_empty());

	m.cpu.set_input(1, true);
	m.step();

	let events = m.events.events();
	assert_eq!(events[0], Diagnostic::Interrupt { line: 1, asserted: true });
	assert_eq!(
		events[1],
		Diagnostic::Exception { exception: Exception::Interrupt, epc: CODE, vector: 0x8000_0080 }
	);
}

#[test]
fn tlb_probe_reports_result() {
	let mut m = Machine::new(Model::R3000A, &[TLBP]);
	m.cpu.write_cop0_reg(ENTRY_HI, 0x0123_4000);

	m.step();

	assert_eq!(m.events.events(), vec![Diagnostic::TlbProbe { hi: 0x0123_4000, index: None }]);
}

#[test]
fn log_sink_runs_whole_program() {
	init_logger();

	let mut m = Machine::new(Model::R3000A, &[addiu(T0, ZERO, 5), SYSCALL]);
	m.cpu.set_sink(Box::new(LogSink));

	m.steps(2);

	assert_eq!(m.cpu.gpr(T0), 5);
	assert_eq!(m.exc_code(), 0x08);
	assert!(m.events.events().is_empty());
}
