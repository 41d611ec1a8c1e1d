//! Query harness and configuration tests
//!
use std::io::Write;
use treelock_core::config::HarnessConfig;
use treelock_core::query::{parse_input, render, run};
use treelock_core::sync::SharedLockTree;
use treelock_core::{ConfigError, Operation};

const SCENARIO: &str = "\
7 2 6
0 1 2 3 4 5 6
1 4 1
1 1 1
2 4 1
1 1 1
3 0 1
1 2 2
";

#[test]
fn test_scenario_output() {
    let problem = parse_input(SCENARIO).unwrap();
    let results = run(&problem, &HarnessConfig::default()).unwrap();
    assert_eq!(
        render(&results),
        "true\nfalse\ntrue\ntrue\ntrue\nfalse\n"
    );
}

#[test]
fn test_scenario_with_verification() {
    let problem = parse_input(SCENARIO).unwrap();
    let config = HarnessConfig::new().with_strict(true).with_verify_invariants(true);
    assert_eq!(run(&problem, &config).unwrap().len(), 6);
}

#[test]
fn test_multiline_names_and_extra_whitespace() {
    let text = "  3\t1  2\nroot\nmid\n\nleaf\n1 leaf 5\n3 root 5\n";
    let problem = parse_input(text).unwrap();
    assert_eq!(problem.names, vec!["root", "mid", "leaf"]);
    assert_eq!(run(&problem, &HarnessConfig::default()).unwrap(), vec![true, true]);
}

#[test]
fn test_config_file_roundtrip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "strict = true").unwrap();
    writeln!(file, "verify_invariants = true").unwrap();
    writeln!(file, "log_filter = \"treelock_core=debug\"").unwrap();

    let config = HarnessConfig::load(file.path()).unwrap();
    assert!(config.strict);
    assert!(config.verify_invariants);
    assert_eq!(config.log_filter, "treelock_core=debug");
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = HarnessConfig::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_shared_tree_matches_harness() {
    let problem = parse_input(SCENARIO).unwrap();
    let expected = run(&problem, &HarnessConfig::default()).unwrap();

    let shared = SharedLockTree::new(
        treelock_core::tree::Tree::build(problem.names.clone(), problem.arity).unwrap(),
    );
    let actual: Vec<bool> = problem
        .queries
        .iter()
        .map(|q| {
            let op = Operation::try_from(q.opcode).unwrap();
            shared.apply_by_name(op, &q.node, q.user).unwrap()
        })
        .collect();

    assert_eq!(actual, expected);
}
