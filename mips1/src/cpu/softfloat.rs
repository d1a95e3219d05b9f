//! IEEE-754 single and double precision arithmetic on raw bit patterns.
//!
//! Every operation accumulates its exception status into [`SoftFloat::flags`]
//! and rounds with [`SoftFloat::round`], which the FPU keeps in step with
//! FCR31's rounding mode.

use std::cmp::Ordering;

use rustc_apfloat::ieee::{Double, Single};
use rustc_apfloat::{Float, FloatConvert, Round, Status, StatusAnd};

const MINUS_ONE_SINGLE: u32 = 0xbf80_0000;
const MINUS_ONE_DOUBLE: u64 = 0xbff0_0000_0000_0000;

#[derive(Debug, Clone, Copy)]
pub struct SoftFloat {
	pub round: Round,
	pub flags: Status,
}

impl Default for SoftFloat {
	fn default() -> Self {
		Self {
			round: Round::NearestTiesToEven,
			flags: Status::OK,
		}
	}
}

fn single(bits: u32) -> Single {
	Single::from_bits(u128::from(bits))
}

fn double(bits: u64) -> Double {
	Double::from_bits(u128::from(bits))
}

/// FCR31 RM field to rounding direction.
pub fn rounding_mode(rm: u32) -> Round {
	match rm & 3 {
		0 => Round::NearestTiesToEven,
		1 => Round::TowardZero,
		2 => Round::TowardPositive,
		_ => Round::TowardNegative,
	}
}

impl SoftFloat {
	pub fn clear_flags(&mut self) {
		self.flags = Status::OK;
	}

	fn raise(&mut self, status: Status) {
		self.flags |= status;
	}

	fn take_single(&mut self, result: StatusAnd<Single>) -> u32 {
		self.raise(result.status);
		result.value.to_bits() as u32
	}

	fn take_double(&mut self, result: StatusAnd<Double>) -> u64 {
		self.raise(result.status);
		result.value.to_bits() as u64
	}

	pub fn f32_add(&mut self, a: u32, b: u32) -> u32 {
		let result = single(a).add_r(single(b), self.round);
		self.take_single(result)
	}

	pub fn f32_sub(&mut self, a: u32, b: u32) -> u32 {
		let result = single(a).sub_r(single(b), self.round);
		self.take_single(result)
	}

	pub fn f32_mul(&mut self, a: u32, b: u32) -> u32 {
		let result = single(a).mul_r(single(b), self.round);
		self.take_single(result)
	}

	pub fn f32_div(&mut self, a: u32, b: u32) -> u32 {
		let result = single(a).div_r(single(b), self.round);
		self.take_single(result)
	}

	pub fn f64_add(&mut self, a: u64, b: u64) -> u64 {
		let result = double(a).add_r(double(b), self.round);
		self.take_double(result)
	}

	pub fn f64_sub(&mut self, a: u64, b: u64) -> u64 {
		let result = double(a).sub_r(double(b), self.round);
		self.take_double(result)
	}

	pub fn f64_mul(&mut self, a: u64, b: u64) -> u64 {
		let result = double(a).mul_r(double(b), self.round);
		self.take_double(result)
	}

	pub fn f64_div(&mut self, a: u64, b: u64) -> u64 {
		let result = double(a).div_r(double(b), self.round);
		self.take_double(result)
	}

	/// Negation as the hardware does it: multiply by -1, so NaNs still signal.
	pub fn f32_neg(&mut self, a: u32) -> u32 {
		self.f32_mul(a, MINUS_ONE_SINGLE)
	}

	pub fn f64_neg(&mut self, a: u64) -> u64 {
		self.f64_mul(a, MINUS_ONE_DOUBLE)
	}

	pub fn f32_abs(&mut self, a: u32) -> u32 {
		if self.f32_lt(a, 0) {
			self.f32_neg(a)
		} else {
			a
		}
	}

	pub fn f64_abs(&mut self, a: u64) -> u64 {
		if self.f64_lt(a, 0) {
			self.f64_neg(a)
		} else {
			a
		}
	}

	pub fn f32_to_f64(&mut self, a: u32) -> u64 {
		let mut loses_info = false;
		let result: StatusAnd<Double> = single(a).convert_r(self.round, &mut loses_info);

		self.take_double(result)
	}

	pub fn f64_to_f32(&mut self, a: u64) -> u32 {
		let mut loses_info = false;
		let result: StatusAnd<Single> = double(a).convert_r(self.round, &mut loses_info);

		self.take_single(result)
	}

	pub fn i32_to_f32(&mut self, a: u32) -> u32 {
		let result = Single::from_i128_r(i128::from(a as i32), self.round);
		self.take_single(result)
	}

	pub fn i32_to_f64(&mut self, a: u32) -> u64 {
		let result = Double::from_i128_r(i128::from(a as i32), self.round);
		self.take_double(result)
	}

	pub fn f32_to_i32(&mut self, a: u32) -> u32 {
		let value = single(a);
		let mut is_exact = false;
		let result = value.to_i128_r(32, self.round, &mut is_exact);

		self.to_word(result, value.is_nan(), value.is_negative())
	}

	pub fn f64_to_i32(&mut self, a: u64) -> u32 {
		let value = double(a);
		let mut is_exact = false;
		let result = value.to_i128_r(32, self.round, &mut is_exact);

		self.to_word(result, value.is_nan(), value.is_negative())
	}

	// invalid conversions saturate, NaN counts as positive
	fn to_word(&mut self, result: StatusAnd<i128>, nan: bool, negative: bool) -> u32 {
		self.raise(result.status);

		if result.status.contains(Status::INVALID_OP) {
			if nan || !negative {
				i32::MAX as u32
			} else {
				i32::MIN as u32
			}
		} else {
			result.value as i32 as u32
		}
	}

	/// Ordering of two singles, `None` when unordered. Raises nothing.
	pub fn f32_compare(&self, a: u32, b: u32) -> Option<Ordering> {
		single(a).partial_cmp(&single(b))
	}

	pub fn f64_compare(&self, a: u64, b: u64) -> Option<Ordering> {
		double(a).partial_cmp(&double(b))
	}

	/// Signalling less-than: any NaN raises invalid.
	pub fn f32_lt(&mut self, a: u32, b: u32) -> bool {
		match self.f32_compare(a, b) {
			Some(order) => order == Ordering::Less,
			None => {
				self.raise(Status::INVALID_OP);
				false
			}
		}
	}

	pub fn f64_lt(&mut self, a: u64, b: u64) -> bool {
		match self.f64_compare(a, b) {
			Some(order) => order == Ordering::Less,
			None => {
				self.raise(Status::INVALID_OP);
				false
			}
		}
	}
}
