//! Header transforms carried by graph edges.
//!
//! A [`Transition`] maps the header set at an edge's pre-state to the header set at
//! its post-state (`traverse_forward`) and a header set at the post-state back to the
//! pre-state headers that can produce it (`traverse_backward`). All built-in variants
//! are exact: `traverse_backward(P)` is precisely the pre-image of `P`.

use std::fmt;
use std::sync::Arc;

use crate::bdd::Bdd;
use crate::reference::Ref;

/// A builder-supplied transform pair for edges the built-in variants cannot express.
///
/// Implementations must distribute over union in both directions, and
/// `traverse_backward` should be the exact pre-image of `traverse_forward`;
/// the loop-detection strategies only agree with each other under that contract.
pub trait HeaderTransform: Send + Sync {
    fn traverse_forward(&self, bdd: &Bdd, headers: Ref) -> Ref;
    fn traverse_backward(&self, bdd: &Bdd, headers: Ref) -> Ref;

    fn describe(&self) -> String {
        "custom".to_string()
    }
}

#[derive(Clone)]
pub enum Transition {
    /// Headers pass unchanged.
    Identity,
    /// Only headers in the constraint pass (an ACL permit set, a route's destination space, ...).
    Constraint(Ref),
    /// The given header bits become arbitrary.
    Erase(Vec<u32>),
    /// The given header bits are overwritten with any assignment in `value`,
    /// which must only mention `vars` (NAT pools, rewrites to a constant).
    Assign { vars: Vec<u32>, value: Ref },
    /// Apply each transition in turn.
    Sequence(Vec<Transition>),
    Custom(Arc<dyn HeaderTransform>),
}

impl Transition {
    pub fn constraint(headers: Ref) -> Self {
        Transition::Constraint(headers)
    }

    /// Filter by `guard`, then apply `then`.
    pub fn guarded(guard: Ref, then: Transition) -> Self {
        Transition::Sequence(vec![Transition::Constraint(guard), then])
    }

    pub fn traverse_forward(&self, bdd: &Bdd, headers: Ref) -> Ref {
        if bdd.is_zero(headers) {
            return headers;
        }
        match self {
            Transition::Identity => headers,
            Transition::Constraint(c) => bdd.apply_and(headers, *c),
            Transition::Erase(vars) => bdd.exists(headers, vars),
            Transition::Assign { vars, value } => bdd.apply_and(bdd.exists(headers, vars), *value),
            Transition::Sequence(steps) => steps
                .iter()
                .fold(headers, |acc, step| step.traverse_forward(bdd, acc)),
            Transition::Custom(t) => t.traverse_forward(bdd, headers),
        }
    }

    pub fn traverse_backward(&self, bdd: &Bdd, headers: Ref) -> Ref {
        if bdd.is_zero(headers) {
            return headers;
        }
        match self {
            Transition::Identity => headers,
            Transition::Constraint(c) => bdd.apply_and(headers, *c),
            Transition::Erase(vars) => bdd.exists(headers, vars),
            Transition::Assign { vars, value } => bdd.exists(bdd.apply_and(headers, *value), vars),
            Transition::Sequence(steps) => steps
                .iter()
                .rev()
                .fold(headers, |acc, step| step.traverse_backward(bdd, acc)),
            Transition::Custom(t) => t.traverse_backward(bdd, headers),
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Identity => write!(f, "Identity"),
            Transition::Constraint(c) => write!(f, "Constraint({})", c),
            Transition::Erase(vars) => write!(f, "Erase({:?})", vars),
            Transition::Assign { vars, value } => write!(f, "Assign({:?} := {})", vars, value),
            Transition::Sequence(steps) => f.debug_list().entries(steps).finish(),
            Transition::Custom(t) => write!(f, "Custom({})", t.describe()),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Identity => write!(f, "id"),
            Transition::Constraint(c) => write!(f, "∧{}", c),
            Transition::Erase(vars) => write!(f, "∃{}", vars.len()),
            Transition::Assign { vars, .. } => write!(f, ":={}", vars.len()),
            Transition::Sequence(steps) => {
                for (i, step) in steps.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", step)?;
                }
                Ok(())
            }
            Transition::Custom(t) => write!(f, "{}", t.describe()),
        }
    }
}
