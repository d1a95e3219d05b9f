/// Where the CPU is relative to a pending branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchState {
	#[default]
	None,
	/// A branch instruction just executed and requested `target`.
	Branch,
	/// The delay slot instruction is executing.
	Delay,
	/// An exception redirected the PC during this step.
	Exception,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sequencer {
	state: BranchState,
	target: u32,
}

impl Sequencer {
	pub fn state(&self) -> BranchState {
		self.state
	}

	pub fn target(&self) -> u32 {
		self.target
	}

	pub fn branch(&mut self, target: u32) {
		self.state = BranchState::Branch;
		self.target = target;
	}

	pub fn in_delay_slot(&self) -> bool {
		self.state == BranchState::Delay
	}

	pub fn is_exception(&self) -> bool {
		self.state == BranchState::Exception
	}

	pub fn exception(&mut self) {
		self.state = BranchState::Exception;
	}

	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// End-of-step PC update.
	pub fn advance(&mut self, pc: u32) -> u32 {
		match self.state {
			BranchState::None => pc.wrapping_add(4),
			BranchState::Branch => {
				self.state = BranchState::Delay;
				pc.wrapping_add(4)
			}
			BranchState::Delay => {
				self.state = BranchState::None;
				self.target
			}
			BranchState::Exception => {
				self.state = BranchState::None;
				pc
			}
		}
	}
}
