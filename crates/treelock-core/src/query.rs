//! Textual query stream
//!
//! Input is whitespace separated:
//!
//! ```text
//! N m Q
//! name_0 .. name_{N-1}
//! opcode name uid      (Q times; opcode 1 = lock, 2 = unlock, 3 = upgrade)
//! ```
//!
//! Each query produces one boolean, rendered as `true` / `false`.

use crate::config::HarnessConfig;
use crate::engine::LockEngine;
use crate::error::{QueryError, TreeLockError};
use crate::invariants;
use crate::types::{NodeId, Operation, UserId};
use std::str::SplitWhitespace;

impl TryFrom<i64> for Operation {
    type Error = QueryError;

    fn try_from(opcode: i64) -> Result<Self, Self::Error> {
        match opcode {
            1 => Ok(Operation::Lock),
            2 => Ok(Operation::Unlock),
            3 => Ok(Operation::Upgrade),
            other => Err(QueryError::UnknownOpcode(other)),
        }
    }
}

/// One `opcode name uid` record, opcode not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Raw opcode, any integer
    pub opcode: i64,
    /// Target node name
    pub node: String,
    /// Requesting user
    pub user: UserId,
}

impl Query {
    /// Decode the opcode
    ///
    /// # Errors
    /// [`QueryError::UnknownOpcode`] outside 1..=3.
    pub fn operation(&self) -> Result<Operation, QueryError> {
        Operation::try_from(self.opcode)
    }
}

/// A fully parsed input: tree definition plus queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// Arity used to wire the tree
    pub arity: usize,
    /// Node names in construction order
    pub names: Vec<String>,
    /// Queries in arrival order
    pub queries: Vec<Query>,
    /// Tokens found after the last declared query
    pub trailing_tokens: usize,
}

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
        }
    }

    fn word(&mut self, expected: &'static str) -> Result<&'a str, QueryError> {
        self.inner.next().ok_or(QueryError::UnexpectedEof { expected })
    }

    fn number<T: std::str::FromStr>(&mut self, field: &'static str) -> Result<T, QueryError> {
        let token = self.word(field)?;
        token.parse().map_err(|_| QueryError::InvalidNumber {
            field,
            token: token.to_string(),
        })
    }
}

/// Parse a complete input text
///
/// # Errors
/// Any [`QueryError`] other than `UnknownOpcode` (opcodes are checked when
/// the query runs) and `TrailingInput` (reported by [`run`] in strict mode).
pub fn parse_input(text: &str) -> Result<Problem, QueryError> {
    let mut tokens = Tokens::new(text);

    let node_count: usize = tokens.number("node count")?;
    let arity: usize = tokens.number("arity")?;
    let query_count: usize = tokens.number("query count")?;

    let names = (0..node_count)
        .map(|_| tokens.word("node name").map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;

    let queries = (0..query_count)
        .map(|_| -> Result<Query, QueryError> {
            Ok(Query {
                opcode: tokens.number("opcode")?,
                node: tokens.word("query node")?.to_string(),
                user: UserId(tokens.number("user id")?),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let trailing_tokens = tokens.inner.count();

    Ok(Problem {
        arity,
        names,
        queries,
        trailing_tokens,
    })
}

/// Build the tree and run every query in order
///
/// In lenient mode (the default) an unknown opcode or node name answers
/// `false`; in strict mode it aborts the run.
///
/// # Errors
/// Tree construction errors, strict-mode input errors, or an invariant
/// violation when `verify_invariants` is set.
pub fn run(problem: &Problem, config: &HarnessConfig) -> Result<Vec<bool>, TreeLockError> {
    if config.strict && problem.trailing_tokens > 0 {
        return Err(QueryError::TrailingInput(problem.trailing_tokens).into());
    }
    if problem.trailing_tokens > 0 {
        tracing::warn!(tokens = problem.trailing_tokens, "ignoring trailing input");
    }

    let mut engine = LockEngine::from_names(problem.names.iter().map(String::as_str), problem.arity)?;
    let mut results = Vec::with_capacity(problem.queries.len());

    for (index, query) in problem.queries.iter().enumerate() {
        let outcome = match resolve(&engine, query) {
            Ok((op, node)) => engine.apply(op, node, query.user),
            Err(err) if config.strict => return Err(err),
            Err(err) => {
                tracing::warn!(query = index, "answering false: {err}");
                false
            }
        };

        if config.verify_invariants {
            if let Some(violation) = invariants::check_engine(&engine).into_iter().next() {
                return Err(TreeLockError::InvariantViolated {
                    query_index: index,
                    details: violation.to_string(),
                });
            }
        }

        results.push(outcome);
    }

    tracing::debug!(
        queries = results.len(),
        granted = results.iter().filter(|r| **r).count(),
        "query stream complete"
    );

    Ok(results)
}

fn resolve(engine: &LockEngine, query: &Query) -> Result<(Operation, NodeId), TreeLockError> {
    let op = query.operation()?;
    let node = engine.tree().lookup(&query.node)?;
    Ok((op, node))
}

/// Render results one per line, as `true` / `false`
#[must_use]
pub fn render(results: &[bool]) -> String {
    let mut out = String::with_capacity(results.len() * 6);
    for result in results {
        out.push_str(if *result { "true\n" } else { "false\n" });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TreeError;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "7 2 5\n0 1 2 3 4 5 6\n1 4 1\n1 1 1\n2 4 1\n1 1 1\n3 0 1\n";

    #[test]
    fn parses_header_names_and_queries() {
        let problem = parse_input(SAMPLE).unwrap();
        assert_eq!(problem.arity, 2);
        assert_eq!(problem.names.len(), 7);
        assert_eq!(problem.queries.len(), 5);
        assert_eq!(
            problem.queries[0],
            Query {
                opcode: 1,
                node: "4".into(),
                user: UserId(1),
            }
        );
        assert_eq!(problem.trailing_tokens, 0);
    }

    #[test]
    fn runs_sample() {
        let problem = parse_input(SAMPLE).unwrap();
        let results = run(&problem, &HarnessConfig::default()).unwrap();
        assert_eq!(results, vec![true, false, true, true, true]);
        assert_eq!(render(&results), "true\nfalse\ntrue\ntrue\ntrue\n");
    }

    #[test]
    fn truncated_input() {
        assert_eq!(
            parse_input("3 2 1\na b").unwrap_err(),
            QueryError::UnexpectedEof {
                expected: "node name"
            }
        );
        assert_eq!(
            parse_input("1 2 1\na 1 a").unwrap_err(),
            QueryError::UnexpectedEof { expected: "user id" }
        );
    }

    #[test]
    fn bad_numbers() {
        assert_eq!(
            parse_input("x 2 1").unwrap_err(),
            QueryError::InvalidNumber {
                field: "node count",
                token: "x".into(),
            }
        );
        assert!(matches!(
            parse_input("1 2 1\na x a 3"),
            Err(QueryError::InvalidNumber { field: "opcode", .. })
        ));
        assert!(matches!(
            parse_input("1 2 1\na 1 a 1.5"),
            Err(QueryError::InvalidNumber { field: "user id", .. })
        ));
    }

    #[test]
    fn lenient_mode_answers_false() {
        let problem = parse_input("2 2 3\na b\n9 a 1\n1 zz 1\n1 b 1\n").unwrap();
        let results = run(&problem, &HarnessConfig::default()).unwrap();
        assert_eq!(results, vec![false, false, true]);
    }

    #[test]
    fn out_of_range_opcodes_answer_false() {
        let problem = parse_input("2 2 3\na b\n300 a 1\n-1 a 1\n1 b 1\n").unwrap();
        assert_eq!(problem.queries[0].opcode, 300);
        assert_eq!(problem.queries[1].opcode, -1);
        assert_eq!(
            run(&problem, &HarnessConfig::default()).unwrap(),
            vec![false, false, true]
        );

        let strict = HarnessConfig::new().with_strict(true);
        assert!(matches!(
            run(&problem, &strict),
            Err(TreeLockError::Query(QueryError::UnknownOpcode(300)))
        ));
    }

    #[test]
    fn negative_user_ids_are_ordinary_users() {
        let problem = parse_input("2 2 3\na b\n1 a -5\n2 a 5\n2 a -5\n").unwrap();
        assert_eq!(problem.queries[0].user, UserId(-5));
        assert_eq!(
            run(&problem, &HarnessConfig::default()).unwrap(),
            vec![true, false, true]
        );
    }

    #[test]
    fn strict_mode_aborts() {
        let strict = HarnessConfig::new().with_strict(true);

        let problem = parse_input("2 2 1\na b\n9 a 1\n").unwrap();
        assert!(matches!(
            run(&problem, &strict),
            Err(TreeLockError::Query(QueryError::UnknownOpcode(9)))
        ));

        let problem = parse_input("2 2 1\na b\n1 zz 1\n").unwrap();
        assert!(matches!(
            run(&problem, &strict),
            Err(TreeLockError::Tree(TreeError::UnknownNode(_)))
        ));

        let problem = parse_input("2 2 1\na b\n1 a 1\nextra\n").unwrap();
        assert_eq!(problem.trailing_tokens, 1);
        assert!(matches!(
            run(&problem, &strict),
            Err(TreeLockError::Query(QueryError::TrailingInput(1)))
        ));
        assert_eq!(run(&problem, &HarnessConfig::default()).unwrap(), vec![true]);
    }

    #[test]
    fn construction_errors_propagate() {
        let problem = parse_input("2 0 0\na b\n").unwrap();
        assert!(matches!(
            run(&problem, &HarnessConfig::default()),
            Err(TreeLockError::Tree(TreeError::InvalidArity(0)))
        ));

        let problem = parse_input("2 2 0\na a\n").unwrap();
        assert!(matches!(
            run(&problem, &HarnessConfig::default()),
            Err(TreeLockError::Tree(TreeError::DuplicateName(_)))
        ));
    }

    #[test]
    fn verify_mode_passes_on_correct_engine() {
        let problem = parse_input(SAMPLE).unwrap();
        let config = HarnessConfig::new().with_verify_invariants(true);
        assert_eq!(run(&problem, &config).unwrap().len(), 5);
    }
}
