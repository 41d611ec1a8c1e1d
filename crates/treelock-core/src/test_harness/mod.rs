// Test harness module
// Randomized simulation, stress runs and multi-seed certification

pub mod simulator;

pub use simulator::*;

use crate::error::TreeError;
use std::time::Instant;

/// Test harness for running stress tests and certification
pub struct TestHarness;

impl TestHarness {
    /// Run a stress test on a binary tree of `nodes` nodes
    ///
    /// Outcomes are cross-checked on every operation; the full invariant scan
    /// runs ten times over the run to keep large trees affordable.
    ///
    /// # Errors
    /// [`TreeError::EmptyTree`] when `nodes` is zero.
    pub fn run_stress_test(
        nodes: usize,
        iterations: usize,
    ) -> Result<StressTestReport, TreeError> {
        tracing::info!(nodes, iterations, "running stress test");

        let total_operations = iterations as u64;
        let config = SimulatorConfig {
            seed: 12345,
            total_operations,
            node_count: nodes,
            user_count: 8,
            check_interval: (total_operations / 10).max(1),
            stop_on_first_violation: false,
            ..Default::default()
        };

        let start = Instant::now();
        let report = run_simulator(config)?;
        let elapsed_ms = start.elapsed().as_millis();

        Ok(StressTestReport {
            nodes,
            iterations,
            elapsed_ms,
            violations: report.violations.len(),
            success: report.passed(),
        })
    }

    /// Run the simulator over several seeds and tree shapes
    ///
    /// # Errors
    /// Propagates tree construction errors from the simulator.
    pub fn run_certification() -> Result<CertificationReport, TreeError> {
        tracing::info!("running certification simulation");

        let mut all_passed = true;
        let mut total_violations = 0;
        let seeds = 10u64;

        for seed in 0..seeds {
            let config = SimulatorConfig {
                seed,
                total_operations: 20_000,
                // Cycle through chain, binary and wide trees.
                arity: [1, 2, 5][(seed % 3) as usize],
                node_count: 40 + (seed as usize) * 10,
                user_count: [1, 2, 3, 4][(seed % 4) as usize],
                ..Default::default()
            };

            let report = run_simulator(config)?;
            if !report.passed() {
                all_passed = false;
            }
            total_violations += report.violations.len();
        }

        Ok(CertificationReport {
            passed: all_passed && total_violations == 0,
            total_violations,
            seeds_tested: seeds,
        })
    }
}

/// Report from a stress test
#[derive(Debug, Clone, serde::Serialize)]
pub struct StressTestReport {
    pub nodes: usize,
    pub iterations: usize,
    pub elapsed_ms: u128,
    pub violations: usize,
    pub success: bool,
}

/// Report from certification
#[derive(Debug, Clone, serde::Serialize)]
pub struct CertificationReport {
    pub passed: bool,
    pub total_violations: usize,
    pub seeds_tested: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_stress_run_succeeds() {
        let report = TestHarness::run_stress_test(500, 2_000).unwrap();
        assert!(report.success);
        assert_eq!(report.violations, 0);
    }

    #[test]
    fn empty_stress_tree_is_rejected() {
        assert_eq!(
            TestHarness::run_stress_test(0, 10).unwrap_err(),
            TreeError::EmptyTree
        );
    }
}
