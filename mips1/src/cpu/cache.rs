use crate::bus::{Bus, BusError};

/// Cache RAM window. Only reachable through data accesses while the data
/// cache is isolated (Status.IsC), optionally swapped with the instruction
/// cache (Status.SwC). Mirrored across the whole address range; big-endian.
pub struct CacheRam {
	data: Vec<u8>,
	mask: u32,
}

impl CacheRam {
	/// `size` is zero or a power of two.
	pub fn new(size: usize) -> Self {
		Self {
			data: vec![0; size],
			mask: (size as u32).wrapping_sub(1),
		}
	}

	pub fn size(&self) -> usize {
		self.data.len()
	}

	fn read_bytes<const N: usize>(&self, addr: u32) -> [u8; N] {
		let mut bytes = [0; N];

		if !self.data.is_empty() {
			for (i, byte) in bytes.iter_mut().enumerate() {
				*byte = self.data[(addr.wrapping_add(i as u32) & self.mask) as usize];
			}
		}

		bytes
	}

	fn write_bytes<const N: usize>(&mut self, addr: u32, bytes: [u8; N]) {
		if self.data.is_empty() {
			return;
		}

		for (i, byte) in bytes.into_iter().enumerate() {
			self.data[(addr.wrapping_add(i as u32) & self.mask) as usize] = byte;
		}
	}
}

impl Bus for CacheRam {
	fn read8(&mut self, addr: u32) -> Result<u8, BusError> {
		Ok(self.read_bytes::<1>(addr)[0])
	}

	fn read16(&mut self, addr: u32) -> Result<u16, BusError> {
		Ok(u16::from_be_bytes(self.read_bytes(addr)))
	}

	fn read32(&mut self, addr: u32) -> Result<u32, BusError> {
		Ok(u32::from_be_bytes(self.read_bytes(addr)))
	}

	fn write8(&mut self, addr: u32, write: u8) -> Result<(), BusError> {
		self.write_bytes(addr, [write]);
		Ok(())
	}

	fn write16(&mut self, addr: u32, write: u16) -> Result<(), BusError> {
		self.write_bytes(addr, write.to_be_bytes());
		Ok(())
	}

	fn write32(&mut self, addr: u32, write: u32, mask: u32) -> Result<(), BusError> {
		let current = u32::from_be_bytes(self.read_bytes(addr));

		self.write_bytes(addr, ((current & !mask) | (write & mask)).to_be_bytes());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mirrors_across_address_range() {
		let mut cache = CacheRam::new(1024);

		cache.write32(0x0000_0010, 0xCAFEBABE, !0).unwrap();

		assert_eq!(cache.read32(0x0000_0410).unwrap(), 0xCAFEBABE);
		assert_eq!(cache.read8(0x1FC0_0410).unwrap(), 0xCA);
	}

	#[test]
	fn absent_cache_reads_zero() {
		let mut cache = CacheRam::new(0);

		cache.write32(0, 0xFFFF_FFFF, !0).unwrap();

		assert_eq!(cache.size(), 0);
		assert_eq!(cache.read32(0).unwrap(), 0);
	}
}
