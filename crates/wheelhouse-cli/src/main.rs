use std::io::{self, IsTerminal};

use clap::Parser;
use color_eyre::Result;
use serde_json::Value;
use wheelhouse_core::{CommandContext, CommandInfo, ExecutionOutcome};

mod cli;
mod dispatch;
mod style;

use cli::{CommandGroupCli, WheelhouseCli};
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = WheelhouseCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let (info, outcome) = match CommandContext::new() {
        Ok(ctx) => dispatch::dispatch_command(&ctx, &cli.command)?,
        Err(err) => (
            dispatch::command_info(&cli.command),
            dispatch::context_failure_outcome(&err),
        ),
    };
    let code = emit_output(&cli, info, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter =
        format!("wheelhouse={level},wheelhouse_core={level},wheelhouse_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn emit_output(
    cli: &WheelhouseCli,
    info: CommandInfo,
    outcome: &ExecutionOutcome,
) -> Result<i32> {
    let code = outcome.status.exit_code();

    if cli.json {
        let payload = wheelhouse_core::to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    let style = Style::new(cli.no_color, io::stdout().is_terminal());
    if outcome.status.is_error() {
        let message = wheelhouse_core::format_status_message(info, &outcome.message);
        eprintln!("{}", style.status(&outcome.status, &message));
        if let Some(hint) = hint_from_details(&outcome.details) {
            eprintln!("{}", style.info(&format!("Hint: {hint}")));
        }
        return Ok(code);
    }
    if cli.quiet {
        return Ok(code);
    }

    if matches!(cli.command, CommandGroupCli::Resolve(_)) {
        for url in string_list(&outcome.details, "urls") {
            println!("{url}");
        }
    }
    for line in diagnostic_lines(&outcome.details) {
        eprintln!("{}", style.warning(&line));
    }
    if let Some(errors) = outcome.details.pointer("/mirror/errors") {
        for error in errors.as_array().into_iter().flatten().filter_map(Value::as_str) {
            eprintln!("{}", style.warning(error));
        }
    }

    let message = wheelhouse_core::format_status_message(info, &outcome.message);
    println!("{}", style.status(&outcome.status, &message));
    if let Some(hint) = hint_from_details(&outcome.details) {
        println!("{}", style.info(&format!("Hint: {hint}")));
    }
    if let Some(root) = outcome.details.pointer("/mirror/root").and_then(Value::as_str) {
        println!("{}", style.dimmed(&format!("mirror root: {root}")));
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

fn string_list<'a>(details: &'a Value, key: &str) -> impl Iterator<Item = &'a str> {
    details
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn diagnostic_lines(details: &Value) -> Vec<String> {
    details
        .get("diagnostics")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|diagnostic| {
            let package = diagnostic.get("package")?.as_str()?;
            let message = diagnostic.get("message")?.as_str()?;
            Some(format!("{package}: {message}"))
        })
        .collect()
}
