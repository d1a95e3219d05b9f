use std::ops::Range;

use log::*;
use thiserror::Error;

use crate::config::Endianness;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
	#[error("bus error at physical address 0x{0:08X}")]
	Fault(u32),
	#[error("nothing decodes physical address 0x{0:08X}")]
	Unmapped(u32),
}

/// Memory backend behind the program address space.
///
/// Addresses are physical and already aligned by the CPU. Values are returned
/// as host integers; the backend owns the byte order of the space. Any `Err`
/// is turned into a bus error exception by the CPU and the access is dropped.
pub trait Bus {
	fn read8(&mut self, addr: u32) -> Result<u8, BusError>;
	fn read16(&mut self, addr: u32) -> Result<u16, BusError>;
	fn read32(&mut self, addr: u32) -> Result<u32, BusError>;

	fn write8(&mut self, addr: u32, write: u8) -> Result<(), BusError>;
	fn write16(&mut self, addr: u32, write: u16) -> Result<(), BusError>;
	/// Only the bits set in `mask` reach memory (SWL/SWR store partial words).
	fn write32(&mut self, addr: u32, write: u32, mask: u32) -> Result<(), BusError>;
}

/// Flat RAM at a fixed physical base, with optional ranges that answer with a
/// bus error. Used by tests and by hosts that only need plain memory.
pub struct Ram {
	base: u32,
	data: Vec<u8>,
	endianness: Endianness,
	faults: Vec<Range<u32>>,
}

impl Ram {
	pub fn new(base: u32, size: usize, endianness: Endianness) -> Self {
		Self {
			base,
			data: vec![0; size],
			endianness,
			faults: Vec::new(),
		}
	}

	/// Accesses touching `range` fail with [`BusError::Fault`].
	pub fn inject_fault(&mut self, range: Range<u32>) {
		self.faults.push(range);
	}

	pub fn clear_faults(&mut self) {
		self.faults.clear();
	}

	/// Store instruction or data words in the configured byte order.
	pub fn load_words(&mut self, addr: u32, words: &[u32]) {
		for (i, word) in words.iter().enumerate() {
			let addr = addr.wrapping_add(i as u32 * 4);

			if let Err(err) = self.write32(addr, *word, !0) {
				warn!("dropping word 0x{word:08X}: {err}");
			}
		}
	}

	pub fn bytes(&self) -> &[u8] {
		&self.data
	}

	fn offset(&self, addr: u32, len: usize) -> Result<usize, BusError> {
		if self.faults.iter().any(|range| range.contains(&addr)) {
			return Err(BusError::Fault(addr));
		}

		let offset = addr.wrapping_sub(self.base) as usize;

		if offset.checked_add(len).is_some_and(|end| end <= self.data.len()) {
			Ok(offset)
		} else {
			Err(BusError::Unmapped(addr))
		}
	}

	fn read_bytes<const N: usize>(&mut self, addr: u32) -> Result<[u8; N], BusError> {
		let offset = self.offset(addr, N)?;
		let mut bytes = [0; N];

		bytes.copy_from_slice(&self.data[offset..offset + N]);

		Ok(bytes)
	}

	fn write_bytes<const N: usize>(&mut self, addr: u32, bytes: [u8; N]) -> Result<(), BusError> {
		let offset = self.offset(addr, N)?;

		self.data[offset..offset + N].copy_from_slice(&bytes);

		Ok(())
	}
}

impl Bus for Ram {
	fn read8(&mut self, addr: u32) -> Result<u8, BusError> {
		let [byte] = self.read_bytes::<1>(addr)?;

		Ok(byte)
	}

	fn read16(&mut self, addr: u32) -> Result<u16, BusError> {
		let bytes = self.read_bytes::<2>(addr)?;

		Ok(match self.endianness {
			Endianness::Big => u16::from_be_bytes(bytes),
			Endianness::Little => u16::from_le_bytes(bytes),
		})
	}

	fn read32(&mut self, addr: u32) -> Result<u32, BusError> {
		let bytes = self.read_bytes::<4>(addr)?;

		Ok(match self.endianness {
			Endianness::Big => u32::from_be_bytes(bytes),
			Endianness::Little => u32::from_le_bytes(bytes),
		})
	}

	fn write8(&mut self, addr: u32, write: u8) -> Result<(), BusError> {
		self.write_bytes(addr, [write])
	}

	fn write16(&mut self, addr: u32, write: u16) -> Result<(), BusError> {
		let bytes = match self.endianness {
			Endianness::Big => write.to_be_bytes(),
			Endianness::Little => write.to_le_bytes(),
		};

		self.write_bytes(addr, bytes)
	}

	fn write32(&mut self, addr: u32, write: u32, mask: u32) -> Result<(), BusError> {
		let merged = if mask == !0 {
			write
		} else {
			(self.read32(addr)? & !mask) | (write & mask)
		};

		let bytes = match self.endianness {
			Endianness::Big => merged.to_be_bytes(),
			Endianness::Little => merged.to_le_bytes(),
		};

		self.write_bytes(addr, bytes)
	}
}
