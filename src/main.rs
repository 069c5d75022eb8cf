//! Purpose: `temporalz` CLI entry point for exercising the engine from a shell.
//! Role: Binary crate root; parses args, runs one command, emits JSON on stdout.
//! Invariants: Results are JSON on stdout; errors are a JSON object on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Tracing goes to stderr so stdout stays machine-readable.
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use temporalz::api::{
    CompareOptions, Duration, EngineConfig, Error, ErrorKind, Instant, PlainDate, RoundOptions,
    RoundingMode, Temporal, TotalOptions, Unit, to_exit_code,
};
use temporalz::core::wasm::WasmEngine;

#[derive(Parser)]
#[command(
    name = "temporalz",
    version,
    about = "Temporal values computed by the temporalz engine",
    after_help = r#"EXAMPLES
  $ temporalz instant 2020-01-01T00:00:00Z --round hour
  $ temporalz instant --epoch-ms 0
  $ temporalz duration PT25H --largest-unit day
  $ temporalz duration P1M --total day --relative-to 2020-01-01
  $ temporalz compare-durations P1M P30D --relative-to 2020-02-01"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Path to the compiled engine module [default: $TEMPORALZ_WASM, then zig-out/bin/temporalz.wasm]"
    )]
    wasm: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the engine's `_start` self-test and print its console output.
    Start,
    /// Build an instant from text or epoch values.
    Instant(InstantArgs),
    /// Parse a duration, optionally rounding or totaling it.
    Duration(DurationArgs),
    /// Parse a calendar date.
    Date { value: String },
    /// Compare two durations (-1, 0 or 1).
    CompareDurations {
        left: String,
        right: String,
        #[arg(long)]
        relative_to: Option<String>,
    },
}

#[derive(Args)]
struct InstantArgs {
    value: Option<String>,
    #[arg(long, allow_hyphen_values = true, conflicts_with_all = ["value", "epoch_ns"])]
    epoch_ms: Option<f64>,
    #[arg(long, allow_hyphen_values = true, conflicts_with = "value")]
    epoch_ns: Option<i128>,
    #[arg(long, help = "Duration to add before printing")]
    add: Option<String>,
    #[arg(long, help = "Duration to subtract before printing")]
    subtract: Option<String>,
    #[arg(long, help = "Smallest unit to round to")]
    round: Option<Unit>,
    #[arg(long, requires = "round")]
    rounding_mode: Option<RoundingMode>,
    #[arg(long, requires = "round")]
    rounding_increment: Option<f64>,
}

#[derive(Args)]
struct DurationArgs {
    value: String,
    #[arg(long)]
    smallest_unit: Option<Unit>,
    #[arg(long)]
    largest_unit: Option<Unit>,
    #[arg(long)]
    rounding_mode: Option<RoundingMode>,
    #[arg(long)]
    rounding_increment: Option<f64>,
    #[arg(long, help = "Calendar reference date for calendar units")]
    relative_to: Option<String>,
    #[arg(long, help = "Also report the duration's total in this unit")]
    total: Option<Unit>,
}

fn main() {
    init_tracing();
    let exit_code = match run(Cli::parse()) {
        Ok(value) => {
            emit_json(value);
            0
        }
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<Value, Error> {
    let config = cli.wasm.map(EngineConfig::new).unwrap_or_default();
    match cli.command {
        Command::Start => {
            let mut engine = WasmEngine::load(&config)?;
            engine.run_start()?;
            Ok(json!({ "console": engine.console_output() }))
        }
        Command::Instant(args) => run_instant(&Temporal::load(&config)?, args),
        Command::Duration(args) => run_duration(&Temporal::load(&config)?, args),
        Command::Date { value } => {
            let temporal = Temporal::load(&config)?;
            let date = PlainDate::parse(&temporal, &value)?;
            Ok(json!({ "date": date.to_iso_string()? }))
        }
        Command::CompareDurations {
            left,
            right,
            relative_to,
        } => {
            let temporal = Temporal::load(&config)?;
            let mut options = CompareOptions::new();
            if let Some(relative_to) = relative_to {
                options = options.with_relative_to(relative_to);
            }
            let ordering = Duration::compare(&temporal, left, right, &options)?;
            Ok(json!({ "ordering": ordering as i8 }))
        }
    }
}

fn run_instant(temporal: &Temporal, args: InstantArgs) -> Result<Value, Error> {
    let mut instant = match (args.value, args.epoch_ms, args.epoch_ns) {
        (Some(text), None, None) => Instant::parse(temporal, &text)?,
        (None, Some(epoch_ms), None) => Instant::from_epoch_milliseconds(temporal, epoch_ms)?,
        (None, None, Some(epoch_ns)) => Instant::from_epoch_nanoseconds(temporal, epoch_ns)?,
        _ => {
            return Err(Error::new(ErrorKind::Type)
                .with_message("instant needs exactly one of <VALUE>, --epoch-ms, --epoch-ns"));
        }
    };
    if let Some(duration) = args.add {
        instant = instant.add(duration)?;
    }
    if let Some(duration) = args.subtract {
        instant = instant.subtract(duration)?;
    }
    if let Some(unit) = args.round {
        let mut options = RoundOptions::new().with_smallest_unit(unit);
        if let Some(mode) = args.rounding_mode {
            options = options.with_rounding_mode(mode);
        }
        if let Some(increment) = args.rounding_increment {
            options = options.with_rounding_increment(increment);
        }
        instant = instant.round(&options)?;
    }
    Ok(json!({
        "instant": instant.to_iso_string()?,
        "epochMilliseconds": instant.epoch_milliseconds()?,
        // i128 does not fit a JSON number.
        "epochNanoseconds": instant.epoch_nanoseconds()?.to_string(),
    }))
}

fn run_duration(temporal: &Temporal, args: DurationArgs) -> Result<Value, Error> {
    let mut duration = Duration::parse(temporal, &args.value)?;
    if args.smallest_unit.is_some() || args.largest_unit.is_some() {
        let options = RoundOptions {
            smallest_unit: args.smallest_unit,
            largest_unit: args.largest_unit,
            rounding_mode: args.rounding_mode,
            rounding_increment: args.rounding_increment,
            relative_to: args.relative_to.clone().map(Into::into),
        };
        duration = duration.round(&options)?;
    }

    let mut output = Map::new();
    output.insert("duration".to_string(), json!(duration.to_iso_string()?));
    output.insert("fields".to_string(), json!(duration.to_fields()?));
    output.insert("sign".to_string(), json!(duration.sign()?));
    output.insert("blank".to_string(), json!(duration.is_blank()?));
    if let Some(unit) = args.total {
        let mut options = TotalOptions::new(unit);
        if let Some(relative_to) = args.relative_to {
            options = options.with_relative_to(relative_to);
        }
        output.insert("total".to_string(), json!(duration.total(&options)?));
    }
    Ok(Value::Object(output))
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Generic\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert(
        "message".to_string(),
        json!(err.message().unwrap_or("temporalz error")),
    );
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }
    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = std::error::Error::source(err);
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}
