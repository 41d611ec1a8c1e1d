use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use treelock_core::config::HarnessConfig;
use treelock_core::query;
use treelock_core::test_harness::{run_simulator, SimulatorConfig, TestHarness};

fn run_args() -> [Arg; 5] {
    [
        Arg::new("input")
            .long("input")
            .short('i')
            .value_parser(value_parser!(PathBuf))
            .help("Read the query stream from a file instead of stdin"),
        Arg::new("config")
            .long("config")
            .value_parser(value_parser!(PathBuf))
            .help("TOML harness configuration"),
        Arg::new("strict")
            .long("strict")
            .action(ArgAction::SetTrue)
            .help("Abort on unknown opcodes, unknown nodes or trailing input"),
        Arg::new("verify")
            .long("verify")
            .action(ArgAction::SetTrue)
            .help("Check all invariants after every query"),
        Arg::new("log-level")
            .long("log-level")
            .help("Log filter directive (overridden by RUST_LOG)"),
    ]
}

fn cli() -> Command {
    Command::new("treelock")
        .version(treelock_core::VERSION)
        .about("Exclusive hierarchical locking over an m-ary tree")
        .args(run_args())
        .subcommand(
            Command::new("run")
                .about("Apply a query stream and print true/false per query (default)")
                .args(run_args()),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the randomized lock simulator")
                .arg(
                    Arg::new("operations")
                        .long("ops")
                        .default_value("10000")
                        .value_parser(value_parser!(u64))
                        .help("Number of operations to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("nodes")
                        .long("nodes")
                        .default_value("63")
                        .value_parser(value_parser!(usize))
                        .help("Number of tree nodes"),
                )
                .arg(
                    Arg::new("arity")
                        .long("arity")
                        .default_value("2")
                        .value_parser(value_parser!(usize))
                        .help("Tree arity"),
                )
                .arg(
                    Arg::new("users")
                        .long("users")
                        .default_value("3")
                        .value_parser(value_parser!(u32))
                        .help("Number of distinct users"),
                )
                .arg(
                    Arg::new("keep-going")
                        .long("keep-going")
                        .action(ArgAction::SetTrue)
                        .help("Continue after the first violation"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("stress")
                .about("Run stress test")
                .arg(
                    Arg::new("nodes")
                        .long("nodes")
                        .default_value("10000")
                        .value_parser(value_parser!(usize))
                        .help("Number of nodes to create"),
                )
                .arg(
                    Arg::new("iterations")
                        .long("iterations")
                        .default_value("5000")
                        .value_parser(value_parser!(usize))
                        .help("Number of iterations"),
                ),
        )
        .subcommand(Command::new("certify").about("Run the multi-seed certification suite"))
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(args: &ArgMatches) -> Result<HarnessConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => HarnessConfig::default(),
    };

    if args.get_flag("strict") {
        config.strict = true;
    }
    if args.get_flag("verify") {
        config.verify_invariants = true;
    }
    if let Some(level) = args.get_one::<String>("log-level") {
        config.log_filter.clone_from(level);
    }
    config.validate()?;
    Ok(config)
}

fn run_queries(args: &ArgMatches) -> Result<()> {
    let config = load_config(args)?;
    init_tracing(&config.log_filter);

    let mut text = String::new();
    match args.get_one::<PathBuf>("input") {
        Some(path) => {
            text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
        }
    }

    let problem = query::parse_input(&text).context("parsing query stream")?;
    let results = query::run(&problem, &config).context("running queries")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(query::render(&results).as_bytes())?;
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("run", args)) => run_queries(args),
        Some(("simulate", args)) => {
            init_tracing("warn");

            let config = SimulatorConfig {
                seed: *args.get_one::<u64>("seed").unwrap_or(&42),
                total_operations: *args.get_one::<u64>("operations").unwrap_or(&10_000),
                node_count: *args.get_one::<usize>("nodes").unwrap_or(&63),
                arity: *args.get_one::<usize>("arity").unwrap_or(&2),
                user_count: *args.get_one::<u32>("users").unwrap_or(&3),
                stop_on_first_violation: !args.get_flag("keep-going"),
                ..Default::default()
            };

            let report = run_simulator(config).context("invalid simulator tree shape")?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.generate_text());
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("stress", args)) => {
            init_tracing("warn");

            let nodes = *args.get_one::<usize>("nodes").unwrap_or(&10_000);
            let iterations = *args.get_one::<usize>("iterations").unwrap_or(&5_000);

            let report = TestHarness::run_stress_test(nodes, iterations)
                .context("invalid stress tree shape")?;

            println!("Stress Test Report:");
            println!("  Nodes: {}", report.nodes);
            println!("  Iterations: {}", report.iterations);
            println!("  Elapsed: {}ms", report.elapsed_ms);
            println!("  Violations: {}", report.violations);
            println!("  Success: {}", report.success);

            std::process::exit(if report.success { 0 } else { 1 });
        }
        Some(("certify", _)) => {
            init_tracing("warn");

            let report = TestHarness::run_certification()?;

            println!("Certification Report:");
            println!("  Seeds Tested: {}", report.seeds_tested);
            println!("  Total Violations: {}", report.total_violations);
            println!("  Status: {}", if report.passed { "PASSED" } else { "FAILED" });

            std::process::exit(if report.passed { 0 } else { 1 });
        }
        _ => run_queries(&matches),
    }
}
