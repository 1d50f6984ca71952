//! nichebind CLI - inspect and call nichebind modules
//!
//! ## Usage
//!
//! ```bash
//! # List wrapped exports and their descriptors
//! nichebind inspect module.wasm
//!
//! # Call one export and print the decoded result as JSON
//! nichebind call module.wasm add 1 2
//!
//! # 64-bit integer arguments take an `n` suffix
//! nichebind call module.wasm shift 9007199254740993n --always-copy
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use nichebind::{Arg, Bindings, WrapOptions};
use serde_json::json;

#[derive(Parser)]
#[command(name = "nichebind")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and call nichebind WebAssembly modules", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with wrap options (e.g. `{"alwaysCopyData": true}`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the exports a module describes
    Inspect {
        /// Input module (.wasm)
        input: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Call one wrapped export and print its decoded result as JSON
    Call {
        /// Input module (.wasm)
        input: PathBuf,

        /// Export name (without the `_info_` suffix)
        name: String,

        /// Arguments: numbers, `true`/`false`, or integers with an `n` suffix
        #[arg(allow_negative_numbers = true)]
        args: Vec<String>,

        /// Copy array results out of linear memory
        #[arg(long)]
        always_copy: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let options = match &cli.config {
        Some(path) => load_options(path)?,
        None => WrapOptions::default(),
    };

    match cli.command {
        Commands::Inspect { input, json } => inspect_command(&input, options, json),
        Commands::Call {
            input,
            name,
            args,
            always_copy,
        } => {
            let options = WrapOptions {
                always_copy_data: options.always_copy_data || always_copy,
            };
            call_command(&input, &name, &args, options)
        }
    }
}

fn load_options(path: &Path) -> Result<WrapOptions> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let options = serde_json::from_str(&text)
        .with_context(|| format!("Invalid options in {}", path.display()))?;
    debug!("loaded {options:?} from {}", path.display());
    Ok(options)
}

fn load(input: &Path, options: WrapOptions) -> Result<Bindings> {
    let wasm = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    Bindings::instantiate(&wasm, options)
        .with_context(|| format!("Failed to wrap {}", input.display()))
}

fn inspect_command(input: &Path, options: WrapOptions, as_json: bool) -> Result<()> {
    let bindings = load(input, options)?;

    if as_json {
        let exports: Vec<_> = bindings
            .functions()
            .map(|f| {
                json!({
                    "name": f.name(),
                    "arity": f.arity(),
                    "params": f.params().iter().map(|p| format!("{p:?}")).collect::<Vec<_>>(),
                    "descriptor": f.descriptor(),
                    "copiesOut": f.copies_out(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&exports)?);
        return Ok(());
    }

    println!("{}", input.display());
    println!("  memory: {} bytes", bindings.memory_size());
    println!();
    for f in bindings.functions() {
        let params: Vec<String> = f.params().iter().map(|p| format!("{p:?}")).collect();
        let copy = if f.copies_out() { " [copied]" } else { "" };
        println!("  {}({}) -> {}{copy}", f.name(), params.join(", "), f.descriptor());
    }
    Ok(())
}

fn call_command(input: &Path, name: &str, raw_args: &[String], options: WrapOptions) -> Result<()> {
    let mut bindings = load(input, options)?;
    let args = raw_args
        .iter()
        .map(|s| parse_arg(s))
        .collect::<Result<Vec<_>>>()?;

    let value = bindings
        .call(name, &args)
        .with_context(|| format!("{name} failed"))?;
    let value = bindings.resolve(&value)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn parse_arg(s: &str) -> Result<Arg> {
    match s {
        "true" => return Ok(Arg::from(true)),
        "false" => return Ok(Arg::from(false)),
        _ => {}
    }
    if let Some(int) = s.strip_suffix('n') {
        if let Ok(x) = int.parse::<i64>() {
            return Ok(Arg::BigInt(x));
        }
        if let Ok(x) = int.parse::<u64>() {
            return Ok(Arg::from(x));
        }
    }
    s.parse::<f64>()
        .map(Arg::Number)
        .map_err(|_| anyhow!("Invalid argument: {s}"))
}
