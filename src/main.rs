use std::fs;
use std::process::ExitCode;

use lineprobe::harness::RunState;
use lineprobe::{execute, instrument, CancellationHandle, LineResult, RunConfig};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config_path: Option<String> = None;
    let mut script_path: Option<String> = None;
    let mut timeout_override: Option<u64> = None;
    let mut instrument_only = false;
    let mut json_output = false;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--instrument-only" => instrument_only = true,
            "--json" => json_output = true,
            "--config" => {
                i += 1;
                config_path = args.get(i).cloned();
            }
            "--timeout" => {
                i += 1;
                timeout_override = args.get(i).and_then(|v| v.parse().ok());
            }
            "--help" | "-h" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            other => {
                if script_path.is_none() {
                    script_path = Some(other.to_string());
                } else {
                    eprintln!("unexpected argument: {}", other);
                    return ExitCode::FAILURE;
                }
            }
        }
        i += 1;
    }

    let Some(script_path) = script_path else {
        print_usage();
        return ExitCode::FAILURE;
    };

    let mut config = match config_path {
        Some(path) => match load_config(&path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("could not load config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => RunConfig::default(),
    };
    if let Some(ms) = timeout_override {
        config.timeout_ms = ms;
    }

    let source = match fs::read_to_string(&script_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("could not read {}: {}", script_path, e);
            return ExitCode::FAILURE;
        }
    };

    let generated = instrument(&source, &config);

    if instrument_only {
        print!("{}", generated.program);
        return ExitCode::SUCCESS;
    }

    let cancel = CancellationHandle::new();
    let outcome = match execute(&generated, &config, &cancel) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if json_output {
        match serde_json::to_string_pretty(&outcome.results) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("could not serialize results: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        render(&outcome.results, &source, &config);
        if outcome.state == RunState::TimedOut {
            eprintln!("(run timed out after {} ms)", config.timeout_ms);
        }
    }

    ExitCode::SUCCESS
}

fn print_usage() {
    eprintln!(
        "usage: lineprobe [--config <file>] [--timeout <ms>] [--instrument-only] [--json] <script>"
    );
}

fn load_config(path: &str) -> Result<RunConfig, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}

/// Print each source line with its observed value alongside. Indices past
/// EOF (defensively possible on mangled output) are clamped to the last
/// line.
fn render(results: &[LineResult], source: &str, config: &RunConfig) {
    let lines: Vec<&str> = source.lines().collect();
    let reset = "\x1b[0m";

    for result in results {
        if result.value.is_empty() {
            continue;
        }
        let shown = result.line.min(lines.len().saturating_sub(1));
        let text = lines.get(shown).copied().unwrap_or("");
        let color = if result.is_error {
            ansi_color(&config.colors.error)
        } else {
            ansi_color(&config.colors.normal)
        };
        println!(
            "{:>4} | {:<40} {}{}{}",
            result.line + 1,
            text,
            color,
            result.value,
            reset
        );
    }
}

fn ansi_color(name: &str) -> &'static str {
    match name {
        "red" => "\x1b[31m",
        "green" => "\x1b[32m",
        "yellow" => "\x1b[33m",
        "blue" => "\x1b[34m",
        "magenta" => "\x1b[35m",
        "cyan" => "\x1b[36m",
        _ => "",
    }
}
