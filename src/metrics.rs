//! Lattice operators over robustness values.
//!
//! Robustness is combined with the greatest lower bound for conjunction and the least upper
//! bound for disjunction. For `f64` these are the minimum and maximum, except that an undefined
//! (NaN) operand is never discarded. `f64::min` and `f64::max` return the other operand when one
//! of them is NaN, which would turn an undefined robustness value into a defined one.

/// Trait representing the binary operator that computes the greatest lower bound of two values.
///
/// In general, this equates to the minimum of the two values, but this behavior is not guaranteed.
/// When provided along with a partial ordering, the type forms a Meet-Semilattice.
pub trait Meet<Other = Self> {
    /// Compute the greatest lower bound of self and other
    fn meet(self, other: Other) -> Self;
}

/// Meet trait implementation for f64 by value
///
/// If either of the values being compared is NaN then the result is also NaN, so that undefined
/// values surface when the final robustness value is checked.
impl Meet for f64 {
    fn meet(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            f64::NAN
        } else {
            f64::min(self, other)
        }
    }
}

impl Meet<&Self> for f64 {
    fn meet(self, other: &Self) -> Self {
        self.meet(*other)
    }
}

/// Trait representing the binary operator that computes the least upper bound of two values.
///
/// In general, this equates to the maximum of the two values, but this behavior is not guaranteed.
/// When provided along with a partial ordering, the type forms a Join-Semilattice.
pub trait Join<Other = Self> {
    /// Compute the least upper bound of self and other
    fn join(self, other: Other) -> Self;
}

/// Join trait implementation for f64 by value
///
/// NaN values propagate in the same way as for [Meet].
impl Join for f64 {
    fn join(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            f64::NAN
        } else {
            f64::max(self, other)
        }
    }
}

impl Join<&Self> for f64 {
    fn join(self, other: &Self) -> Self {
        self.join(*other)
    }
}
