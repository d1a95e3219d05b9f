use log::*;

use crate::bus::{Bus, BusError};

use super::cop0::Exception;
use super::{DataSpace, Intention, Mips1};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
	Byte,
	Half,
	Word,
}

impl Width {
	fn align_mask(self) -> u32 {
		match self {
			Width::Byte => 0,
			Width::Half => 1,
			Width::Word => 3,
		}
	}
}

fn read(space: &mut dyn Bus, width: Width, addr: u32) -> Result<u32, BusError> {
	match width {
		Width::Byte => space.read8(addr).map(u32::from),
		Width::Half => space.read16(addr).map(u32::from),
		Width::Word => space.read32(addr),
	}
}

fn write(space: &mut dyn Bus, width: Width, addr: u32, value: u32, mask: u32) -> Result<(), BusError> {
	match width {
		Width::Byte => space.write8(addr, value as u8),
		Width::Half => space.write16(addr, value as u16),
		Width::Word => space.write32(addr, value, mask),
	}
}

// helper functions
impl Mips1 {
	/// The space data accesses go to: the program bus, or a cache while
	/// Status.IsC isolates it.
	fn data_bus<'a>(&'a mut self, bus: &'a mut dyn Bus) -> &'a mut dyn Bus {
		match self.data_space {
			DataSpace::Program => bus,
			DataSpace::DCache => &mut self.dcache,
			DataSpace::ICache => &mut self.icache,
		}
	}

	/// Unaligned accesses (LWL/LWR) skip the alignment check and use the
	/// containing word.
	pub(super) fn load(&mut self, bus: &mut dyn Bus, width: Width, address: u32, aligned: bool) -> Option<u32> {
		if aligned && address & width.align_mask() != 0 {
			self.address_error(address, Intention::Read);
			return None;
		}

		let mut physical = self.translate_access(address, Intention::Read)?;

		if !aligned {
			physical &= !3;
		}

		match read(self.data_bus(bus), width, physical) {
			Ok(value) => Some(value),
			Err(err) => {
				debug!("load 0x{address:08X} at 0x{:08X}: {err}", self.pc);
				self.exception(Exception::BusLoadStoreError);
				None
			}
		}
	}

	pub(super) fn store(&mut self, bus: &mut dyn Bus, width: Width, address: u32, value: u32, mask: u32, aligned: bool) {
		if aligned && address & width.align_mask() != 0 {
			self.address_error(address, Intention::Write);
			return;
		}

		let Some(mut physical) = self.translate_access(address, Intention::Write) else { return };

		if !aligned {
			physical &= !3;
		}

		if let Err(err) = write(self.data_bus(bus), width, physical, value, mask) {
			debug!("store 0x{address:08X} at 0x{:08X}: {err}", self.pc);
			self.exception(Exception::BusLoadStoreError);
		}
	}

	/// Instruction fetch always goes to the program bus.
	pub(super) fn fetch(&mut self, bus: &mut dyn Bus, address: u32) -> Option<u32> {
		if address & 3 != 0 {
			self.address_error(address, Intention::Fetch);
			return None;
		}

		let physical = self.translate_access(address, Intention::Fetch)?;

		match bus.read32(physical) {
			Ok(op) => Some(op),
			Err(err) => {
				debug!("fetch 0x{address:08X}: {err}");
				self.exception(Exception::BusFetchError);
				None
			}
		}
	}
}
