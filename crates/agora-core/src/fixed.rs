//! Fixed-point arithmetic for prices, quantities, cash and fees.
//!
//! Every value on the wire is a whole number, so prices and quantities
//! are plain integers. The fee rate is the only fractional quantity and
//! is kept as parts-per-million to stay deterministic (no floats).

use core::fmt;
use core::ops::{Add, Sub};

/// Price per unit, in whole currency units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Price(pub u64);

impl Price {
    /// Get raw internal value.
    #[inline(always)]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Value of `qty` units traded at this price.
    #[inline(always)]
    pub const fn value_of(self, qty: Quantity) -> u64 {
        self.0.saturating_mul(qty.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quantity in whole product units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Quantity(pub u64);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Self = Self(0);

    /// Check if quantity is zero.
    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Get raw value.
    #[inline(always)]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Saturating addition.
    #[inline(always)]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction.
    #[inline(always)]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Multiplier applied to a trade's value to obtain its fee.
///
/// Stored as parts-per-million: `FeeRate(1_000_000)` multiplies by one,
/// `FeeRate(10_000)` by 0.01. The multiplier is applied literally, it is
/// not interpreted as a percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FeeRate(pub u64);

impl FeeRate {
    /// Fixed-point scale (one whole unit).
    pub const SCALE: u64 = 1_000_000;

    /// Number of fractional digits representable.
    pub const DECIMAL_PLACES: u32 = 6;

    /// No fee.
    pub const ZERO: Self = Self(0);

    /// Multiplier of exactly one: the fee equals the trade value.
    pub const ONE: Self = Self(Self::SCALE);

    /// Largest accepted multiplier. At this rate the fee on the largest
    /// possible trade value still fits an `i64` cash balance.
    pub const MAX: Self = Self(1_000_000 * Self::SCALE);

    /// Create from parts-per-million.
    #[inline(always)]
    pub const fn from_ppm(ppm: u64) -> Self {
        Self(ppm)
    }

    /// `round_half_up(value * rate)`.
    #[inline]
    pub const fn fee_for(self, value: u64) -> u64 {
        let scaled = value as u128 * self.0 as u128 + (Self::SCALE / 2) as u128;
        let fee = scaled / Self::SCALE as u128;
        if fee > u64::MAX as u128 {
            u64::MAX
        } else {
            fee as u64
        }
    }
}

impl Default for FeeRate {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::SCALE;
        let frac = self.0 % Self::SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let mut digits = frac;
        let mut width = Self::DECIMAL_PLACES as usize;
        while digits % 10 == 0 {
            digits /= 10;
            width -= 1;
        }
        write!(f, "{}.{:0width$}", whole, digits, width = width)
    }
}
