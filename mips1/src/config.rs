use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endianness {
	Big,
	Little,
}

/// How mapped (kuseg/kseg2) addresses reach the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MmuKind {
	/// Hard-wired translation: kuseg gets a 1GiB physical offset, kseg2 passes through.
	Fixed,
	/// 64-entry software managed TLB.
	Tlb,
	/// The TLB exists and answers TLBR/TLBWI/TLBWR/TLBP, but mapped addresses are
	/// passed to the bus untranslated (on-chip peripheral windows live there).
	TlbBypass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Model {
	R2000,
	R2000A,
	R3000,
	R3000A,
	R3041,
	R3051,
	R3052,
	R3052E,
	R3071,
	R3081,
	Iop,
	Tx3927,
}

impl Model {
	/// Value exposed through PRId.
	pub fn cpurev(self) -> u32 {
		match self {
			Model::R2000 => 0x0100,
			Model::R2000A => 0x0210,
			Model::R3000 => 0x0220,
			Model::R3000A => 0x0230,
			Model::R3041 => 0x0700,
			Model::R3051 | Model::R3052 | Model::R3052E | Model::R3071 | Model::R3081 => 0x0200,
			Model::Iop => 0x001f,
			Model::Tx3927 => 0x3927,
		}
	}

	/// Default (instruction, data) cache sizes in bytes.
	pub fn cache_sizes(self) -> (usize, usize) {
		match self {
			Model::R2000 | Model::R2000A | Model::R3000 | Model::R3000A => (0, 0),
			Model::R3041 => (2048, 512),
			Model::R3051 => (4096, 2048),
			Model::R3052 | Model::R3052E => (8192, 2048),
			Model::R3071 | Model::R3081 => (16384, 4096),
			Model::Iop => (4096, 1024),
			Model::Tx3927 => (8192, 4096),
		}
	}

	pub fn mmu(self) -> MmuKind {
		match self {
			Model::R3041 | Model::R3051 | Model::R3052 | Model::Iop => MmuKind::Fixed,
			Model::Tx3927 => MmuKind::TlbBypass,
			_ => MmuKind::Tlb,
		}
	}

	pub fn endianness(self) -> Endianness {
		match self {
			Model::Iop => Endianness::Little,
			_ => Endianness::Big,
		}
	}

	pub fn fpu(self) -> Option<FpuConfig> {
		match self {
			Model::R3081 => Some(FpuConfig::new(0x0300)),
			_ => None,
		}
	}

	/// R3041 carries the extra BusCtrl/Config/Count/PortSize/Compare registers.
	pub fn has_r3041_registers(self) -> bool {
		self == Model::R3041
	}
}

/// Floating point coprocessor attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FpuConfig {
	/// Implementation/revision reported through FCR0. Zero means no FPU.
	pub revision: u32,
	/// Interrupt input the FPU drives.
	pub irq: u32,
}

impl FpuConfig {
	// revision numbers recognised by RISC/os 4.52 and IRIX
	pub const R2360: u32 = 0x0100;
	pub const R2010: u32 = 0x0200;
	pub const R2010A: u32 = 0x0310;
	pub const R3010: u32 = 0x0320;
	pub const R3010A: u32 = 0x0330;
	pub const R3010AV4: u32 = 0x0340;
	pub const R6010: u32 = 0x0400;

	pub fn new(revision: u32) -> Self {
		Self { revision, irq: 3 }
	}

	pub fn with_irq(revision: u32, irq: u32) -> Self {
		Self { revision, irq }
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
	#[error("{which} cache size {size} is not a power of two")]
	CacheSize { which: &'static str, size: usize },

	#[error("fpu interrupt line {0} out of range (expected 0..6)")]
	FpuInterrupt(u32),
}

/// Per-instance parameters, fixed once the CPU is built.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
	pub model: Model,
	pub cpurev: u32,
	pub endianness: Endianness,
	pub icache_size: usize,
	pub dcache_size: usize,
	pub mmu: MmuKind,
	pub fpu: Option<FpuConfig>,
}

impl Config {
	pub fn new(model: Model) -> Self {
		let (icache_size, dcache_size) = model.cache_sizes();

		Self {
			model,
			cpurev: model.cpurev(),
			endianness: model.endianness(),
			icache_size,
			dcache_size,
			mmu: model.mmu(),
			fpu: model.fpu(),
		}
	}

	pub fn endianness(mut self, endianness: Endianness) -> Self {
		self.endianness = endianness;
		self
	}

	/// Attach an FPU; a zero revision detaches it.
	pub fn fpu(mut self, fpu: FpuConfig) -> Self {
		self.fpu = (fpu.revision != 0).then_some(fpu);
		self
	}

	pub fn caches(mut self, icache_size: usize, dcache_size: usize) -> Self {
		self.icache_size = icache_size;
		self.dcache_size = dcache_size;
		self
	}

	/// Checks cache sizes and the FPU interrupt line. An FPU with a zero
	/// revision is dropped, as with [`Config::fpu`].
	pub fn validate(mut self) -> Result<Self, ConfigError> {
		self.fpu = self.fpu.filter(|fpu| fpu.revision != 0);

		for (which, size) in [("instruction", self.icache_size), ("data", self.dcache_size)] {
			if size != 0 && !size.is_power_of_two() {
				return Err(ConfigError::CacheSize { which, size });
			}
		}

		if let Some(fpu) = self.fpu {
			if fpu.irq >= 6 {
				return Err(ConfigError::FpuInterrupt(fpu.irq));
			}
		}

		Ok(self)
	}

	/// Minimum and maximum cycles a single instruction can take.
	pub fn cycle_bounds(&self) -> (u32, u32) {
		(1, 40)
	}
}

impl From<Model> for Config {
	fn from(model: Model) -> Self {
		Config::new(model)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn r3081_has_fpu_on_line_3() {
		let config = Config::new(Model::R3081);

		assert_eq!(config.fpu, Some(FpuConfig { revision: 0x0300, irq: 3 }));
		assert_eq!(config.mmu, MmuKind::Tlb);
		assert_eq!((config.icache_size, config.dcache_size), (16384, 4096));
	}

	#[test]
	fn iop_is_little_endian_without_tlb() {
		let config = Config::new(Model::Iop);

		assert_eq!(config.endianness, Endianness::Little);
		assert_eq!(config.mmu, MmuKind::Fixed);
		assert_eq!(config.cpurev, 0x001f);
	}

	#[test]
	fn rejects_odd_cache_size() {
		let err = Config::new(Model::R3051).caches(3000, 2048).validate().unwrap_err();

		assert_eq!(err, ConfigError::CacheSize { which: "instruction", size: 3000 });
	}

	#[test]
	fn rejects_fpu_irq_out_of_range() {
		let err = Config::new(Model::R3000)
			.fpu(FpuConfig::with_irq(FpuConfig::R3010, 6))
			.validate()
			.unwrap_err();

		assert_eq!(err, ConfigError::FpuInterrupt(6));
	}

	#[test]
	fn zero_revision_detaches_fpu() {
		let config = Config::new(Model::R3081).fpu(FpuConfig::new(0));

		assert!(config.fpu.is_none());
	}

	#[test]
	fn validate_drops_zero_revision_fpu() {
		let mut config = Config::new(Model::R3081);
		config.fpu = Some(FpuConfig::with_irq(0, 9));

		assert_eq!(config.validate().map(|config| config.fpu), Ok(None));
	}
}
