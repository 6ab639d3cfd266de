use clap::{Parser as ClapParser, Subcommand};
use std::io::{self, Read};
use udq_lang::cli::{self, CheckOptions, CheckResult, CliError, EvalOptions};
use udq_lang::output::{to_json, to_json_pretty};

#[derive(ClapParser)]
#[command(name = "udq")]
#[command(about = "udq - check and evaluate user defined quantity expressions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an expression and evaluate it against a summary state
    Check {
        /// The expression, e.g. "SUM(WOPR) / 2"
        expression: String,

        /// Keyword or prefix of the kind to evaluate for (W, G, F, S, R)
        #[arg(short, long)]
        target: Option<String>,

        /// Summary state as JSON (reads from stdin if not provided)
        #[arg(short, long)]
        state: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't evaluate
        #[arg(long)]
        syntax_only: bool,
    },

    /// Evaluate every quantity of the UDQ blocks in a deck file
    Eval {
        /// Deck file holding UDQ blocks
        #[arg(short, long)]
        deck: String,

        /// Summary state as JSON (reads from stdin if not provided)
        #[arg(short, long)]
        state: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            expression,
            target,
            state,
            pretty,
            syntax_only,
        } => run_check(expression, target, state, pretty, syntax_only),
        Commands::Eval { deck, state, pretty } => run_eval(deck, state, pretty),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

/// The state given on the command line, or piped JSON on stdin.
fn read_state(state: Option<String>) -> Result<Option<String>, CliError> {
    match state {
        Some(s) => Ok(Some(s)),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(CliError::Io)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}

fn run_check(
    expression: String,
    target: Option<String>,
    state: Option<String>,
    pretty: bool,
    syntax_only: bool,
) -> Result<(), CliError> {
    let state = if syntax_only { None } else { read_state(state)? };

    let options = CheckOptions {
        expression,
        target,
        state,
        syntax_only,
    };

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid(canonical) => println!("Syntax is valid: {}", canonical),
        CheckResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)?
            } else {
                serde_json::to_string(&output)?
            };
            println!("{}", json);
        }
    }
    Ok(())
}

fn run_eval(deck: String, state: Option<String>, pretty: bool) -> Result<(), CliError> {
    let text = std::fs::read_to_string(&deck)?;
    let options = EvalOptions {
        deck: text,
        filename: deck,
        state: read_state(state)?,
    };

    let sets = cli::execute_eval(&options)?;
    if pretty {
        println!("{}", to_json_pretty(&sets));
    } else {
        println!("{}", to_json(&sets));
    }
    Ok(())
}
