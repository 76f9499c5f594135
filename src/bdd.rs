//! The BDD manager: the predicate algebra over packet-header bits.
//!
//! Every header set used by the reachability engine is a [`Ref`] into one [`Bdd`].
//! The manager hash-conses nodes, so diagrams are reduced and ordered (variable `1`
//! closest to the root), and uses complement edges, so negation is free.
//! Canonicity gives the engine its termination check: two predicates describe the
//! same header set iff their handles are equal.
//!
//! Both the node table and the computed table sit behind `parking_lot` mutexes that
//! are only held for a single lookup or insertion, so a `Bdd` can be shared between
//! threads and queried concurrently.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::debug;
use parking_lot::Mutex;

use crate::cache::Cache;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::ZERO,
            high: Ref::ZERO,
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(self.variable as u64, self.low.as_lit(), self.high.as_lit())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct IteKey(Ref, Ref, Ref);

impl MyHash for IteKey {
    fn hash(&self) -> u64 {
        pairing3(self.0.as_lit(), self.1.as_lit(), self.2.as_lit())
    }
}

/// Sizing of the manager's tables.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BddConfig {
    /// Initial number of unique-table buckets, as a power of two.
    pub storage_bits: usize,
    /// Number of computed-table slots, as a power of two.
    pub cache_bits: usize,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self {
            storage_bits: 16,
            cache_bits: 16,
        }
    }
}

impl BddConfig {
    pub fn with_storage_bits(mut self, bits: usize) -> Self {
        self.storage_bits = bits;
        self
    }

    pub fn with_cache_bits(mut self, bits: usize) -> Self {
        self.cache_bits = bits;
        self
    }
}

pub struct Bdd {
    storage: Mutex<Table<Node>>,
    cache: Mutex<Cache<IteKey, Ref>>,
}

impl Bdd {
    pub fn with_config(config: BddConfig) -> Self {
        let mut storage = Table::new(config.storage_bits);

        // Allocate the terminal node:
        let one = storage.add(Node::default());
        assert_eq!(one, Ref::ONE.index() as usize); // Make sure the terminal node is (1).

        Self {
            storage: Mutex::new(storage),
            cache: Mutex::new(Cache::new(config.cache_bits)),
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::with_config(BddConfig::default())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.lock();
        f.debug_struct("Bdd")
            .field("nodes", &storage.len())
            .field("buckets", &storage.num_buckets())
            .finish()
    }
}

impl Bdd {
    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }
    pub fn one(&self) -> Ref {
        Ref::ONE
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == Ref::ONE.index()
    }

    /// Number of nodes allocated so far, the terminal included.
    pub fn num_nodes(&self) -> usize {
        self.storage.lock().len()
    }

    pub fn cache_hits(&self) -> usize {
        self.cache.lock().hits()
    }
    pub fn cache_misses(&self) -> usize {
        self.cache.lock().misses()
    }

    fn node(&self, index: u32) -> Node {
        *self.storage.lock().value(index as usize)
    }

    /// Decision variable of the node, `0` for the terminal.
    pub fn variable(&self, index: u32) -> u32 {
        self.node(index).variable
    }

    /// Position of `node` in the variable order; terminals sit below every variable.
    fn level(&self, node: Ref) -> u32 {
        if self.is_terminal(node) {
            u32::MAX
        } else {
            self.variable(node.index())
        }
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.node(node.index()).low;
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.node(node.index()).high;
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        debug_assert!(v < self.level(low) && v < self.level(high), "variable order violated");

        if low == high {
            return low;
        }

        // Keep the high edge regular; push the complement to the result.
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        let index = self.storage.lock().put(Node { variable: v, low, high });
        Ref::positive(index as u32)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        self.mk_node(v, Ref::ZERO, Ref::ONE)
    }

    /// Conjunction of DIMACS-style literals (`3` is x3, `-3` is ¬x3).
    pub fn mk_cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|&lit| std::cmp::Reverse(lit.unsigned_abs()));
        let mut current = Ref::ONE;
        for lit in literals {
            assert_ne!(lit, 0, "Variable index should not be zero");
            let v = lit.unsigned_abs();
            current = if lit < 0 {
                self.mk_node(v, current, Ref::ZERO)
            } else {
                self.mk_node(v, Ref::ZERO, current)
            };
        }
        current
    }

    /// Disjunction of DIMACS-style literals.
    pub fn mk_clause(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        -self.mk_cube(literals.into_iter().map(|lit| -lit))
    }

    /// Cofactors of `node` with respect to variable `v`, which must not be below its top variable.
    fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        if self.level(node) != v {
            return (node, node);
        }
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(f, g, h) = (f ∧ g) ∨ (¬f ∧ h)
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        // Terminal cases
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,G,~F) => ite(F,G,1)
        let (mut f, mut g, mut h) = (f, g, h);
        if g == f {
            g = Ref::ONE;
        } else if g == -f {
            g = Ref::ZERO;
        }
        if h == f {
            h = Ref::ZERO;
        } else if h == -f {
            h = Ref::ONE;
        }
        if g == h {
            return g;
        }

        // ite(~F,G,H) => ite(F,H,G)
        if f.is_negated() {
            f = -f;
            std::mem::swap(&mut g, &mut h);
        }
        // ite(F,~G,H) => ~ite(F,G,~H)
        let negate = g.is_negated();
        if negate {
            g = -g;
            h = -h;
        }

        let key = IteKey(f, g, h);
        if let Some(&res) = self.cache.lock().get(&key) {
            return if negate { -res } else { res };
        }

        let m = self.level(f).min(self.level(g)).min(self.level(h));
        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);
        let res = self.mk_node(m, e, t);
        debug!("computed: ite({}, {}, {}) -> {}", f, g, h, res);
        self.cache.lock().insert(key, res);

        if negate {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ZERO)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, Ref::ONE, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ONE)
    }

    /// Set difference `u ∧ ¬v`.
    pub fn apply_diff(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(v, Ref::ZERO, u)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ONE;
        for node in nodes {
            res = self.apply_and(res, node);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ZERO;
        for node in nodes {
            res = self.apply_or(res, node);
            if self.is_one(res) {
                break;
            }
        }
        res
    }

    /// Whether every assignment satisfying `f` also satisfies `g` (`f ⊆ g`).
    pub fn is_implies(&self, f: Ref, g: Ref) -> bool {
        self.is_zero(self.apply_diff(f, g))
    }

    /// Existential quantification `∃vars. f`.
    pub fn exists(&self, f: Ref, vars: &[u32]) -> Ref {
        let Some(&last) = vars.iter().max() else {
            return f;
        };
        let vars: HashSet<u32> = vars.iter().copied().collect();
        let mut cache = HashMap::new();
        self.exists_(f, &vars, last, &mut cache)
    }

    fn exists_(&self, f: Ref, vars: &HashSet<u32>, last: u32, cache: &mut HashMap<Ref, Ref>) -> Ref {
        let v = self.level(f);
        if v > last {
            // Terminal, or no quantified variable below.
            return f;
        }
        if let Some(&res) = cache.get(&f) {
            return res;
        }

        let low = self.exists_(self.low_node(f), vars, last, cache);
        let res = if vars.contains(&v) {
            if self.is_one(low) {
                low
            } else {
                let high = self.exists_(self.high_node(f), vars, last, cache);
                self.apply_or(low, high)
            }
        } else {
            let high = self.exists_(self.high_node(f), vars, last, cache);
            self.mk_node(v, low, high)
        };
        cache.insert(f, res);
        res
    }

    /// Indices of all nodes reachable from `nodes`, the terminal included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<u32> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from_iter(nodes);
        while let Some(node) = queue.pop_front() {
            if visited.insert(node.index()) && !self.is_terminal(node) {
                let n = self.node(node.index());
                queue.push_back(n.low);
                queue.push_back(n.high);
            }
        }
        visited
    }

    pub fn size(&self, f: Ref) -> u64 {
        self.descendants([f]).len() as u64
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        } else if self.is_one(node) {
            return "(1)".to_string();
        }

        format!(
            "{}:(x{}, {}, {})",
            node,
            self.variable(node.index()),
            self.to_bracket_string(self.high_node(node)),
            self.to_bracket_string(self.low_node(node))
        )
    }
}
