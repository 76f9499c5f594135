//! Handles to BDD nodes.
//!
//! A [`Ref`] is a signed index into the node table of a [`Bdd`][crate::bdd::Bdd] manager.
//! The sign carries the complement bit: `-f` is the negation of `f` and costs nothing.
//! Because the manager keeps every diagram reduced and canonical, two handles obtained
//! from the same manager are equal exactly when they denote the same set of headers.

use std::fmt::{Display, Formatter};
use std::ops::Neg;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(i32);

impl Ref {
    /// The shared terminal node. `Ref::ONE` is "all headers", its complement is "none".
    pub const ONE: Ref = Ref(1);
    pub const ZERO: Ref = Ref(-1);

    pub const fn positive(index: u32) -> Self {
        Self(index as i32)
    }

    pub const fn negative(index: u32) -> Self {
        Self(-(index as i32))
    }

    pub const fn is_negated(self) -> bool {
        self.0 < 0
    }

    /// Index of the referenced node in the manager's table.
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Raw signed representation.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Strip the complement bit.
    pub const fn regular(self) -> Self {
        Self(self.0.abs())
    }

    /// Unsigned encoding used as a hashing key: `2 * index + negated`.
    pub(crate) const fn as_lit(self) -> u64 {
        ((self.0.unsigned_abs() as u64) << 1) | (self.0 < 0) as u64
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation_roundtrip() {
        let r = Ref::positive(7);
        assert!(!r.is_negated());
        assert!((-r).is_negated());
        assert_eq!(-(-r), r);
        assert_eq!((-r).index(), 7);
        assert_eq!((-r).regular(), r);
    }

    #[test]
    fn test_terminals() {
        assert_eq!(-Ref::ONE, Ref::ZERO);
        assert_eq!(Ref::ZERO.index(), Ref::ONE.index());
        assert_eq!(format!("{}", Ref::ZERO), "~@1");
        assert_eq!(format!("{}", Ref::ONE), "@1");
    }

    #[test]
    fn test_lit_encoding_is_injective() {
        assert_eq!(Ref::positive(3).as_lit(), 6);
        assert_eq!(Ref::negative(3).as_lit(), 7);
        assert_ne!(Ref::ONE.as_lit(), Ref::ZERO.as_lit());
    }
}
