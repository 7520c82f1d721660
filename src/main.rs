//! Entail - logic entailment frontend
//!
//! Command-line interface for proving and satisfiability queries.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};

use entail::cache::ProofCache;
use entail::config::EntailConfig;
use entail::query::{Engine, ProofReason, ProveRequest, SolveRequest};
use entail::server::{run_server, ServerConfig};
use entail::solver::term::Value;

#[derive(Parser)]
#[command(name = "entail")]
#[command(version = "0.1.0")]
#[command(about = "Logic entailment and satisfiability queries with declaration inference", long_about = None)]
struct Cli {
    /// Path to a configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Disable the verdict cache
    #[arg(long, global = true)]
    no_cache: bool,

    /// Cache database path (overrides config)
    #[arg(long, global = true, value_name = "FILE")]
    cache: Option<PathBuf>,

    /// Print verdicts as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decide whether a conclusion follows from premises
    Prove(ProveArgs),
    /// Decide whether a constraint set is satisfiable
    Solve(SolveArgs),
    /// Run the HTTP query server
    Serve(ServeArgs),
    /// Print the default configuration file
    Config,
}

#[derive(Args)]
struct ProveArgs {
    /// Premise statement (repeatable); omit to read one per line from stdin
    #[arg(short, long = "premise", value_name = "STATEMENT")]
    premises: Vec<String>,

    /// The conclusion to prove
    #[arg(short, long, value_name = "STATEMENT")]
    conclusion: String,

    /// Alias mapping, e.g. -a H=Human (repeatable)
    #[arg(short, long = "alias", value_name = "SHORT=CANONICAL")]
    aliases: Vec<String>,

    /// Type hint, e.g. -t s=individual (repeatable)
    #[arg(short = 't', long = "hint", value_name = "NAME=HINT")]
    hints: Vec<String>,
}

#[derive(Args)]
struct SolveArgs {
    /// Constraint statements; pass `-` to read one per line from stdin
    #[arg(value_name = "STATEMENT", required = true)]
    constraints: Vec<String>,

    /// Variable declaration, e.g. --var x=int (repeatable)
    #[arg(long = "var", value_name = "NAME=SORT")]
    variables: Vec<String>,

    /// Alias mapping, e.g. -a H=Human (repeatable)
    #[arg(short, long = "alias", value_name = "SHORT=CANONICAL")]
    aliases: Vec<String>,

    /// Type hint, e.g. -t s=individual (repeatable)
    #[arg(short = 't', long = "hint", value_name = "NAME=HINT")]
    hints: Vec<String>,
}

#[derive(Args)]
struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,
}

/// Global flags shared by every subcommand
struct Globals {
    no_cache: bool,
    cache: Option<PathBuf>,
    json: bool,
    verbose: bool,
}

fn main() -> Result<()> {
    let Cli { config: config_path, no_cache, cache, json, verbose, command } = Cli::parse();
    let globals = Globals { no_cache, cache, json, verbose };

    let config = match &config_path {
        Some(path) => EntailConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EntailConfig::load().context("loading config")?,
    };

    match command {
        Command::Prove(args) => run_prove(&globals, &config, args),
        Command::Solve(args) => run_solve(&globals, &config, args),
        Command::Serve(args) => run_serve(&globals, &config, args),
        Command::Config => {
            print!("{}", EntailConfig::default_config_content());
            Ok(())
        }
    }
}

fn build_engine(globals: &Globals, config: &EntailConfig) -> Result<Engine> {
    let cache = if globals.no_cache || (!config.cache.enabled && globals.cache.is_none()) {
        None
    } else {
        let path = globals.cache.clone().unwrap_or_else(|| config.cache.path.clone());
        if globals.verbose {
            eprintln!("using verdict cache at {}", path.display());
        }
        Some(ProofCache::open(&path).map_err(|e| anyhow!(e.to_string()))?)
    };
    Ok(Engine::new(cache, config.solver.limits()).with_default_arity(config.solver.default_arity))
}

fn run_prove(globals: &Globals, config: &EntailConfig, args: ProveArgs) -> Result<()> {
    let premises = if args.premises.is_empty() {
        read_stdin_statements()?
    } else {
        args.premises
    };
    let request = ProveRequest {
        premises,
        conclusion: args.conclusion,
        aliases: parse_pairs(&args.aliases, "alias")?,
        type_hints: parse_pairs(&args.hints, "hint")?,
    };

    let engine = build_engine(globals, config)?;
    let verdict = engine.prove(&request).map_err(|e| anyhow!(e.to_string()))?;

    if globals.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    for warning in &verdict.warnings {
        eprintln!("warning: {}", warning);
    }
    match verdict.reason {
        ProofReason::Proved => println!("proven"),
        ProofReason::Refuted => {
            println!("not proven");
            if let Some(model) = &verdict.counterexample {
                println!("counterexample:");
                print_model(model);
            }
        }
        ProofReason::Undecided => println!("undecided"),
        ProofReason::EvaluationError => {
            return Err(anyhow!(verdict.error.unwrap_or_else(|| "evaluation failed".to_string())));
        }
    }
    if verdict.cached && globals.verbose {
        eprintln!("(served from cache)");
    }
    Ok(())
}

fn run_solve(globals: &Globals, config: &EntailConfig, args: SolveArgs) -> Result<()> {
    let constraints = if args.constraints == ["-"] {
        read_stdin_statements()?
    } else {
        args.constraints
    };
    let request = SolveRequest {
        constraints,
        variables: parse_pairs(&args.variables, "variable")?,
        aliases: parse_pairs(&args.aliases, "alias")?,
        type_hints: parse_pairs(&args.hints, "hint")?,
    };

    let engine = build_engine(globals, config)?;
    let verdict = engine.solve(&request).map_err(|e| anyhow!(e.to_string()))?;

    if globals.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        return Ok(());
    }

    for warning in &verdict.warnings {
        eprintln!("warning: {}", warning);
    }
    match verdict.satisfiable {
        Some(true) => {
            println!("satisfiable");
            if let Some(model) = &verdict.model {
                print_model(model);
            }
        }
        Some(false) => println!("unsatisfiable"),
        None => match verdict.error {
            Some(error) => return Err(anyhow!(error)),
            None => println!("undecided"),
        },
    }
    if verdict.cached && globals.verbose {
        eprintln!("(served from cache)");
    }
    Ok(())
}

fn run_serve(globals: &Globals, config: &EntailConfig, args: ServeArgs) -> Result<()> {
    let engine = build_engine(globals, config)?;
    let server_config = ServerConfig::new(args.port.unwrap_or(config.server.port))
        .with_host(args.host.clone().unwrap_or_else(|| config.server.host.clone()))
        .with_cors(config.server.cors_enabled);

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime
        .block_on(run_server(engine, server_config))
        .map_err(|e| anyhow!(e.to_string()))
}

/// Read statements from stdin, one per line, skipping blanks
fn read_stdin_statements() -> Result<Vec<String>> {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let mut statements = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.context("reading statements from stdin")?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            statements.push(trimmed.to_string());
        }
    }
    Ok(statements)
}

/// Parse repeated `key=value` flags into a map
fn parse_pairs(pairs: &[String], what: &str) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("invalid {} '{}', expected KEY=VALUE", what, pair))?;
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(map)
}

fn print_model(model: &BTreeMap<String, Value>) {
    for (name, value) in model {
        println!("  {} = {}", name, value);
    }
}
