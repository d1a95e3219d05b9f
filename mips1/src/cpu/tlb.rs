use super::Intention;

pub const TLB_ENTRIES: usize = 64;

pub const EH_VPN: u32 = 0xffff_f000;
pub const EH_ASID: u32 = 0x0000_0fc0;

pub const EL_PFN: u32 = 0xffff_f000;
pub const EL_D: u32 = 0x0000_0400;
pub const EL_V: u32 = 0x0000_0200;
pub const EL_G: u32 = 0x0000_0100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "use-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TlbEntry {
	pub hi: u32,
	pub lo: u32,
}

impl TlbEntry {
	/// VPN plus ASID comparison. Global entries ignore the ASID.
	pub fn matches(&self, key: u32) -> bool {
		let mask = if self.lo & EL_G != 0 { EH_VPN } else { EH_VPN | EH_ASID };

		(self.hi & mask) == (key & mask)
	}

	pub fn valid(&self) -> bool {
		self.lo & EL_V != 0
	}

	pub fn dirty(&self) -> bool {
		self.lo & EL_D != 0
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
	/// Physical frame (EntryLo PFN bits) of the matching entry.
	Hit(u32),
	Miss,
	Invalid,
	Modified,
}

/// Translation lookaside buffer with one most-recently-used ordering per
/// access kind. A hit moves the entry one position towards the front of the
/// list it was found in.
pub struct Tlb {
	entries: [TlbEntry; TLB_ENTRIES],
	mru: [[u8; TLB_ENTRIES]; 3],
}

impl Default for Tlb {
	fn default() -> Self {
		Self::new()
	}
}

impl Tlb {
	pub fn new() -> Self {
		let mut tlb = Self {
			entries: [TlbEntry::default(); TLB_ENTRIES],
			mru: [[0; TLB_ENTRIES]; 3],
		};

		tlb.reset_mru();
		tlb
	}

	pub fn reset_mru(&mut self) {
		for order in self.mru.iter_mut() {
			for (i, slot) in order.iter_mut().enumerate() {
				*slot = i as u8;
			}
		}
	}

	pub fn read(&self, index: usize) -> TlbEntry {
		self.entries[index % TLB_ENTRIES]
	}

	pub fn write(&mut self, index: usize, entry: TlbEntry) {
		self.entries[index % TLB_ENTRIES] = entry;
	}

	pub fn entries(&self) -> &[TlbEntry; TLB_ENTRIES] {
		&self.entries
	}

	pub fn mru(&self, intention: Intention) -> &[u8; TLB_ENTRIES] {
		&self.mru[intention.index()]
	}

	/// Lowest index matching the VPN/ASID in `hi`.
	pub fn probe(&self, hi: u32) -> Option<u8> {
		self.entries.iter().position(|entry| entry.matches(hi)).map(|index| index as u8)
	}

	/// Scan in MRU order. `promote` is false for side-effect free lookups.
	pub fn lookup(&mut self, key: u32, intention: Intention, promote: bool) -> Lookup {
		let order = &mut self.mru[intention.index()];

		for i in 0..TLB_ENTRIES {
			let entry = self.entries[order[i] as usize];

			if !entry.matches(key) {
				continue;
			}

			if !entry.valid() {
				return Lookup::Invalid;
			}

			if intention == Intention::Write && !entry.dirty() {
				return Lookup::Modified;
			}

			if promote && i > 0 {
				order.swap(i - 1, i);
			}

			return Lookup::Hit(entry.lo & EL_PFN);
		}

		Lookup::Miss
	}
}
