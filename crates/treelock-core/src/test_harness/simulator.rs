//! Lock simulator - randomized differential testing for the engine
//!
//! Drives a [`LockEngine`] with a seeded stream of Lock/Unlock/Upgrade
//! requests. Every outcome is compared with [`reference_outcome`] and with
//! the prediction of [`LockEngine::check`], and the brute-force invariant
//! checker runs every `check_interval` operations.

use crate::engine::LockEngine;
use crate::error::TreeError;
use crate::invariants::{self, reference_outcome, InvariantViolation};
use crate::tree::Tree;
use crate::types::{NodeId, Operation, UserId};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeMap;

/// Simulator configuration
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Total operations to execute
    pub total_operations: u64,
    /// Tree shape
    pub node_count: usize,
    pub arity: usize,
    /// Distinct users issuing requests
    pub user_count: u32,
    /// Distribution of operation types
    pub operation_distribution: OperationDistribution,
    /// Run the full invariant scan every this many operations (0 = only at the end)
    pub check_interval: u64,
    /// Stop conditions
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 10_000,
            node_count: 63,
            arity: 2,
            user_count: 3,
            operation_distribution: OperationDistribution::default(),
            check_interval: 1,
            stop_on_first_violation: true,
        }
    }
}

/// Relative weights for operation generation
#[derive(Debug, Clone, Serialize)]
pub struct OperationDistribution {
    pub lock: f64,
    pub unlock: f64,
    pub upgrade: f64,
    /// Chance that unlock/upgrade aims at an existing lock instead of a
    /// random node (keeps the success rate interesting)
    pub targeted: f64,
}

impl Default for OperationDistribution {
    fn default() -> Self {
        Self {
            lock: 0.50,
            unlock: 0.30,
            upgrade: 0.20,
            targeted: 0.75,
        }
    }
}

impl OperationDistribution {
    fn pick(&self, rng: &mut StdRng) -> Operation {
        let total = self.lock + self.unlock + self.upgrade;
        if total <= 0.0 {
            return Operation::Lock;
        }
        let roll = rng.gen::<f64>() * total;
        if roll < self.lock {
            Operation::Lock
        } else if roll < self.lock + self.unlock {
            Operation::Unlock
        } else {
            Operation::Upgrade
        }
    }
}

/// One generated request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulatedOperation {
    pub op: Operation,
    pub node: NodeId,
    pub user: UserId,
}

/// A violation detected during simulation
#[derive(Debug, Clone, Serialize)]
pub enum Violation {
    /// Engine outcome differs from the brute-force reference
    UnexpectedOutcome {
        operation_index: u64,
        operation: SimulatedOperation,
        expected: bool,
        actual: bool,
    },
    /// `check` predicted a different outcome than the operation produced
    RejectionMismatch {
        operation_index: u64,
        operation: SimulatedOperation,
        predicted: bool,
        actual: bool,
    },
    /// An invariant failed after an operation
    Invariant {
        operation_index: u64,
        violation: InvariantViolation,
    },
}

/// Per-operation counters
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OutcomeCounts {
    pub granted: u64,
    pub refused: u64,
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct OperationStats {
    pub total_operations: u64,
    pub granted_operations: u64,
    pub refused_operations: u64,
    pub invariant_scans: u64,
    pub by_operation: BTreeMap<String, OutcomeCounts>,
    pub refusals_by_reason: BTreeMap<String, u64>,
}

impl OperationStats {
    fn record(&mut self, operation: &SimulatedOperation, granted: bool) {
        self.total_operations += 1;
        let counts = self
            .by_operation
            .entry(operation.op.as_str().to_string())
            .or_default();
        if granted {
            self.granted_operations += 1;
            counts.granted += 1;
        } else {
            self.refused_operations += 1;
            counts.refused += 1;
        }
    }

    fn record_refusal(&mut self, reason: &str) {
        *self.refusals_by_reason.entry(reason.to_string()).or_insert(0) += 1;
    }
}

/// Final report from the simulator
#[derive(Debug, Clone, Serialize)]
pub struct SimulatorReport {
    pub config: SimulatorConfig,
    pub stats: OperationStats,
    pub violations: Vec<Violation>,
    pub final_locked_count: usize,
    pub tree_height: usize,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Lock Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!(
            "Tree: {} nodes, arity {}, height {}\n",
            self.config.node_count, self.config.arity, self.tree_height
        ));
        report.push_str(&format!("Total Operations: {}\n", self.stats.total_operations));
        report.push_str(&format!("Granted: {}\n", self.stats.granted_operations));
        report.push_str(&format!("Refused: {}\n", self.stats.refused_operations));
        report.push_str(&format!("Invariant Scans: {}\n", self.stats.invariant_scans));
        report.push_str(&format!("Final Locks: {}\n", self.final_locked_count));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.stats.by_operation.is_empty() {
            report.push_str("\n=== By Operation ===\n");
            for (op, counts) in &self.stats.by_operation {
                report.push_str(&format!(
                    "{op}: {} granted, {} refused\n",
                    counts.granted, counts.refused
                ));
            }
        }

        if !self.stats.refusals_by_reason.is_empty() {
            report.push_str("\n=== Refusals ===\n");
            for (reason, count) in &self.stats.refusals_by_reason {
                report.push_str(&format!("{reason}: {count}\n"));
            }
        }

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

/// Build the simulated tree: nodes named `n0`, `n1`, ...
fn build_tree(config: &SimulatorConfig) -> Result<Tree, TreeError> {
    let names = (0..config.node_count).map(|i| format!("n{i}"));
    Tree::build(names, config.arity)
}

/// Compare one outcome with the reference and with the `check` prediction
fn outcome_violations(
    operation_index: u64,
    operation: SimulatedOperation,
    expected: bool,
    predicted: bool,
    actual: bool,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    if expected != actual {
        tracing::warn!(
            index = operation_index,
            ?operation,
            expected,
            actual,
            "outcome mismatch"
        );
        violations.push(Violation::UnexpectedOutcome {
            operation_index,
            operation,
            expected,
            actual,
        });
    }
    if predicted != actual {
        tracing::warn!(
            index = operation_index,
            ?operation,
            predicted,
            actual,
            "check disagrees with outcome"
        );
        violations.push(Violation::RejectionMismatch {
            operation_index,
            operation,
            predicted,
            actual,
        });
    }
    violations
}

/// Run the lock simulator
///
/// # Errors
/// [`TreeError`] if `node_count` or `arity` cannot form a tree.
pub fn run_simulator(config: SimulatorConfig) -> Result<SimulatorReport, TreeError> {
    let tree = build_tree(&config)?;

    let tree_height = tree.height();
    let mut engine = LockEngine::new(tree);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = OperationStats::default();
    let mut violations = Vec::new();

    tracing::info!(
        seed = config.seed,
        operations = config.total_operations,
        nodes = engine.tree().len(),
        "starting lock simulation"
    );

    for i in 0..config.total_operations {
        let operation = generate_operation(&mut rng, &config, &engine);

        let expected = reference_outcome(&engine, operation.op, operation.node, operation.user);
        let predicted = match engine.check(operation.op, operation.node, operation.user) {
            Ok(()) => true,
            Err(rejection) => {
                stats.record_refusal(rejection.label());
                false
            }
        };
        let actual = engine.apply(operation.op, operation.node, operation.user);
        stats.record(&operation, actual);

        violations.extend(outcome_violations(i, operation, expected, predicted, actual));

        let last = i + 1 == config.total_operations;
        let due = config.check_interval > 0 && (i + 1) % config.check_interval == 0;
        if due || last {
            stats.invariant_scans += 1;
            violations.extend(
                invariants::check_engine(&engine)
                    .into_iter()
                    .map(|violation| Violation::Invariant {
                        operation_index: i,
                        violation,
                    }),
            );
        }

        if config.stop_on_first_violation && !violations.is_empty() {
            tracing::warn!(index = i, "stopping on first violation");
            break;
        }
    }

    Ok(SimulatorReport {
        final_locked_count: engine.locked_count(),
        tree_height,
        config,
        stats,
        violations,
    })
}

fn generate_operation(
    rng: &mut StdRng,
    config: &SimulatorConfig,
    engine: &LockEngine,
) -> SimulatedOperation {
    let op = config.operation_distribution.pick(rng);
    let user = UserId(i64::from(rng.gen_range(0..config.user_count.max(1))));
    let random_node = NodeId(rng.gen_range(0..engine.tree().len()));

    let targeted = rng.gen_bool(config.operation_distribution.targeted.clamp(0.0, 1.0));
    let held: Vec<(NodeId, UserId)> = if targeted && op != Operation::Lock {
        engine.locked_nodes().collect()
    } else {
        Vec::new()
    };

    if held.is_empty() {
        return SimulatedOperation {
            op,
            node: random_node,
            user,
        };
    }

    let (node, owner) = held[rng.gen_range(0..held.len())];
    match op {
        Operation::Unlock => SimulatedOperation { op, node, user: owner },
        // Aim at some ancestor of an existing lock, on behalf of its holder.
        _ => {
            let ancestors: Vec<NodeId> = engine.tree().ancestors_of(node).collect();
            let node = if ancestors.is_empty() {
                node
            } else {
                ancestors[rng.gen_range(0..ancestors.len())]
            };
            SimulatedOperation { op, node, user: owner }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_run_passes() {
        let report = run_simulator(SimulatorConfig {
            total_operations: 2_000,
            ..Default::default()
        })
        .unwrap();
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.total_operations, 2_000);
        assert!(report.stats.granted_operations > 0);
        assert!(report.stats.refused_operations > 0);
    }

    #[test]
    fn same_seed_same_report() {
        let config = SimulatorConfig {
            seed: 7,
            total_operations: 500,
            ..Default::default()
        };
        let a = run_simulator(config.clone()).unwrap();
        let b = run_simulator(config).unwrap();
        assert_eq!(a.stats.granted_operations, b.stats.granted_operations);
        assert_eq!(a.final_locked_count, b.final_locked_count);
    }

    #[test]
    fn upgrades_are_exercised() {
        let report = run_simulator(SimulatorConfig {
            total_operations: 3_000,
            user_count: 1,
            ..Default::default()
        })
        .unwrap();
        assert!(report.passed());
        let upgrades = report.stats.by_operation.get("upgrade").copied().unwrap_or_default();
        assert!(upgrades.granted > 0);
    }

    #[test]
    fn chain_tree() {
        let report = run_simulator(SimulatorConfig {
            node_count: 40,
            arity: 1,
            total_operations: 1_000,
            ..Default::default()
        })
        .unwrap();
        assert!(report.passed());
        assert_eq!(report.tree_height, 39);
    }

    #[test]
    fn report_text_mentions_result() {
        let report = run_simulator(SimulatorConfig {
            total_operations: 10,
            ..Default::default()
        })
        .unwrap();
        assert!(report.generate_text().contains("Result: PASS"));
    }

    #[test]
    fn invalid_shape_is_an_error() {
        let err = run_simulator(SimulatorConfig {
            arity: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, TreeError::InvalidArity(0));

        let err = run_simulator(SimulatorConfig {
            node_count: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, TreeError::EmptyTree);
    }

    #[test]
    fn check_disagreement_is_a_violation() {
        let operation = SimulatedOperation {
            op: Operation::Lock,
            node: NodeId(1),
            user: UserId(1),
        };
        assert!(outcome_violations(0, operation, true, true, true).is_empty());

        let violations = outcome_violations(4, operation, true, false, true);
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0],
            Violation::RejectionMismatch {
                operation_index: 4,
                predicted: false,
                actual: true,
                ..
            }
        ));

        assert_eq!(outcome_violations(4, operation, false, false, true).len(), 2);
    }
}
