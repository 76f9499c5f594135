use crate::loops::LoopStrategy;

/// Tuning knobs of a [`ReachabilityAnalysis`][crate::analysis::ReachabilityAnalysis].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AnalysisConfig {
    /// Longest device-level path a packet is assumed to take.
    pub max_hops: usize,
    /// Graph edges traversed per device-level hop.
    pub graph_hops_per_hop: usize,
    /// Explicit bound on candidate-search rounds; overrides `max_hops * graph_hops_per_hop`.
    pub candidate_rounds: Option<usize>,
    /// Strategy used by `detect_loops`.
    pub loop_strategy: LoopStrategy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_hops: 256,
            graph_hops_per_hop: 5,
            candidate_rounds: None,
            loop_strategy: LoopStrategy::BoundedRounds,
        }
    }
}

impl AnalysisConfig {
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    pub fn with_graph_hops_per_hop(mut self, graph_hops_per_hop: usize) -> Self {
        self.graph_hops_per_hop = graph_hops_per_hop;
        self
    }

    pub fn with_candidate_rounds(mut self, rounds: usize) -> Self {
        self.candidate_rounds = Some(rounds);
        self
    }

    pub fn with_loop_strategy(mut self, strategy: LoopStrategy) -> Self {
        self.loop_strategy = strategy;
        self
    }

    /// Number of forward rounds the candidate search may run.
    pub fn candidate_rounds(&self) -> usize {
        self.candidate_rounds
            .unwrap_or(self.max_hops.saturating_mul(self.graph_hops_per_hop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rounds() {
        let config = AnalysisConfig::default();
        assert_eq!(config.candidate_rounds(), 256 * 5);
        assert_eq!(config.loop_strategy, LoopStrategy::BoundedRounds);
    }

    #[test]
    fn test_setters() {
        let config = AnalysisConfig::default().with_max_hops(10).with_graph_hops_per_hop(3);
        assert_eq!(config.candidate_rounds(), 30);

        let config = config.with_candidate_rounds(7).with_loop_strategy(LoopStrategy::PathHistoryDfs);
        assert_eq!(config.candidate_rounds(), 7);
        assert_eq!(config.loop_strategy, LoopStrategy::PathHistoryDfs);
    }
}
