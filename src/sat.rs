use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Returns one satisfying assignment as DIMACS-style literals, if any exists.
    ///
    /// Only the variables on the chosen path are listed; the rest are "don't care".
    pub fn one_sat(&self, node: Ref) -> Option<Vec<i32>> {
        if self.is_zero(node) {
            return None;
        }

        let mut path = Vec::new();
        let mut current = node;
        while !self.is_one(current) {
            let var = self.variable(current.index()) as i32;
            let high = self.high_node(current);
            if !self.is_zero(high) {
                path.push(var);
                current = high;
            } else {
                path.push(-var);
                current = self.low_node(current);
            }
        }
        Some(path)
    }

    /// Number of assignments to variables `1..=num_vars` that satisfy `node`.
    ///
    /// `num_vars` must cover every variable `node` depends on.
    pub fn sat_count(&self, node: Ref, num_vars: usize) -> BigUint {
        let max = BigUint::from(1u32) << num_vars;
        let mut cache = HashMap::new();
        self.sat_count_(node, &max, &mut cache)
    }

    fn sat_count_(&self, node: Ref, max: &BigUint, cache: &mut HashMap<u32, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return max.clone();
        }

        let regular = node.regular();
        let count = match cache.get(&regular.index()) {
            Some(count) => count.clone(),
            None => {
                let low = self.sat_count_(self.low_node(regular), max, cache);
                let high = self.sat_count_(self.high_node(regular), max, cache);
                let count: BigUint = (low + high) >> 1;
                cache.insert(regular.index(), count.clone());
                count
            }
        };

        if node.is_negated() {
            max - count
        } else {
            count
        }
    }
}
