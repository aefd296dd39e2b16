//! testlock-cli entry point.
//!
//! Standalone harness for the session engine: drives a full attempt from a
//! local question file, with answers read from stdin (or blank in `--auto`
//! mode) and the submission payload printed by the local transport.
//!
//! ## CLI Subcommands
//!
//! - `testlock-cli run <questions.json>` - Run an attempt end to end
//! - `testlock-cli sequence <questions.json>` - Print the sequenced order
//! - `testlock-cli config show` - Show effective configuration

use std::process::ExitCode;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::{JoinError, JoinHandle};

use testlock_core::config;
use testlock_core::host::NoHost;
use testlock_core::integrity::SignalHub;
use testlock_core::presentation::AlwaysGranted;
use testlock_core::question::sequence;
use testlock_core::session::{
    Identity, Outcome, SessionError, SessionHandle, SessionReport, UiEvent,
};
use testlock_core::submit::JsonWriterTransport;
use testlock_core::telemetry::init_logging;
use testlock_core::wire::{normalize_questions, parse_questions};
use testlock_core::{Capabilities, SessionRuntime};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match command {
        "run" => run_attempt(&args).await,
        "sequence" => run_sequence(&args),
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => {
                    println!("{:#?}", config::load());
                    ExitCode::SUCCESS
                }
                _ => {
                    eprintln!("Unknown config subcommand: {subcommand}");
                    ExitCode::from(2)
                }
            }
        }
        "version" | "--version" | "-V" => {
            println!("testlock-cli {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {command}");
            print_usage();
            ExitCode::from(2)
        }
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "testlock-cli - assessment session engine harness v{version}

USAGE:
    testlock-cli [COMMAND] [OPTIONS]

COMMANDS:
    run <FILE>       Run a full attempt from a question JSON file
    sequence <FILE>  Print the sequenced question order and exit
    config show      Show effective configuration
    version          Show version information
    help             Show this help message

RUN OPTIONS:
    --auto             Submit a blank answer for every question immediately
    --owner <ID>       Test owner id (or TESTLOCK_OWNER)
    --email <EMAIL>    Student email (or TESTLOCK_EMAIL)
    --matric <NUMBER>  Matriculation number (or TESTLOCK_MATRIC)

ENVIRONMENT:
    TESTLOCK_LOG_LEVEL    Log level filter (default: info)
    TESTLOCK_LOG_FORMAT   json or pretty (default: json)
    TESTLOCK_TICK_MILLIS  Clock sampling cadence (default: 100)

EXIT CODES:
    0  Attempt finished and submission delivered
    1  Attempt finished but submission failed, or engine error
    2  Usage or input error
"
    );
}

struct RunArgs {
    path: String,
    auto: bool,
    identity: Identity,
}

fn parse_run_args(args: &[String]) -> Result<RunArgs, String> {
    let mut path = None;
    let mut auto = false;
    let mut owner = std::env::var("TESTLOCK_OWNER").unwrap_or_default();
    let mut email = std::env::var("TESTLOCK_EMAIL").unwrap_or_default();
    let mut matric = std::env::var("TESTLOCK_MATRIC").unwrap_or_default();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--auto" => {
                auto = true;
                i += 1;
            }
            "--owner" | "--email" | "--matric" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| format!("Missing value for {}", args[i]))?
                    .clone();
                match args[i].as_str() {
                    "--owner" => owner = value,
                    "--email" => email = value,
                    _ => matric = value,
                }
                i += 2;
            }
            flag if flag.starts_with("--") => return Err(format!("Unknown option: {flag}")),
            positional => {
                if path.replace(positional.to_string()).is_some() {
                    return Err("More than one question file given".to_string());
                }
                i += 1;
            }
        }
    }

    Ok(RunArgs {
        path: path.ok_or("Missing question file argument")?,
        auto,
        identity: Identity {
            owner,
            student_email: email,
            matriculation_number: matric,
        },
    })
}

async fn run_attempt(args: &[String]) -> ExitCode {
    let run = match parse_run_args(args) {
        Ok(run) => run,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("Usage: testlock-cli run <questions.json> [--auto] [--owner ID] [--email EMAIL] [--matric NUMBER]");
            return ExitCode::from(2);
        }
    };

    let env = config::load();
    if let Err(error) = init_logging(&env.log) {
        eprintln!("Logging init failed: {error}");
    }

    let raw = match std::fs::read_to_string(&run.path) {
        Ok(raw) => raw,
        Err(error) => {
            eprintln!("Cannot read {}: {error}", run.path);
            return ExitCode::from(2);
        }
    };
    let batch = match parse_questions(&raw) {
        Ok(batch) => batch,
        Err(error) => {
            eprintln!("Cannot parse {}: {error}", run.path);
            return ExitCode::from(2);
        }
    };

    let runtime = SessionRuntime::new(
        env.driver,
        Capabilities {
            signals: Arc::new(SignalHub::new()),
            presentation: Arc::new(AlwaysGranted),
            host: Arc::new(NoHost),
            transport: Arc::new(JsonWriterTransport),
        },
    );
    let handle = runtime.handle;
    let ui = runtime.ui;
    let driver_task = tokio::spawn(runtime.driver.run());

    let loaded = handle
        .load_questions(batch)
        .and_then(|()| handle.set_identity(run.identity))
        .and_then(|()| handle.accept());
    if let Err(error) = loaded {
        eprintln!("Engine rejected startup: {error}");
        return ExitCode::FAILURE;
    }

    drive_attempt(
        run.auto,
        handle,
        ui,
        driver_task,
        BufReader::new(tokio::io::stdin()),
    )
    .await
}

/// Pump the UI/stdin loop until the engine reaches its terminal report.
///
/// Each closed source disables its own select arm, so the loop parks once
/// stdin hits EOF instead of re-polling a ready read.
async fn drive_attempt<R>(
    auto: bool,
    handle: SessionHandle,
    mut ui: UnboundedReceiver<UiEvent>,
    mut driver_task: JoinHandle<Result<SessionReport, SessionError>>,
    reader: R,
) -> ExitCode
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut ui_open = true;
    let mut stdin_open = !auto;
    loop {
        tokio::select! {
            joined = &mut driver_task => return report_outcome(joined),
            event = ui.recv(), if ui_open => match event {
                Some(UiEvent::ActiveQuestion { index, total, prompt, choices }) => {
                    eprintln!("\n[{}/{}] {prompt}", index + 1, total);
                    for (n, choice) in choices.iter().enumerate() {
                        eprintln!("  {}. {choice}", n + 1);
                    }
                    if auto {
                        let _ = handle.submit_answer();
                    } else {
                        eprintln!("> answer and press enter (empty line submits blank):");
                    }
                }
                Some(UiEvent::NoQuestions) => {
                    eprintln!("No test questions are currently loaded.");
                }
                Some(UiEvent::MissingIdentity(field)) => {
                    eprintln!("Missing identity field: {field}");
                }
                Some(UiEvent::FullscreenDenied(reason)) => {
                    eprintln!("Fullscreen denied: {reason}");
                }
                Some(_) => {}
                None => ui_open = false,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(text)) => {
                    let _ = handle.draft(text);
                    let _ = handle.submit_answer();
                }
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    }
}

fn report_outcome(
    joined: Result<Result<SessionReport, SessionError>, JoinError>,
) -> ExitCode {
    match joined {
        Ok(Ok(report)) => {
            eprintln!(
                "Attempt finished: {}",
                match report.outcome {
                    Outcome::Completed => "completed",
                    Outcome::Penalized => "penalized",
                }
            );
            match report.delivery {
                Ok(receipt) => {
                    eprintln!("Submission delivered after {} attempt(s)", receipt.attempts);
                    ExitCode::SUCCESS
                }
                Err(error) => {
                    eprintln!("Submission failed: {error}");
                    ExitCode::FAILURE
                }
            }
        }
        Ok(Err(error)) => {
            eprintln!("Engine error: {error}");
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("Engine task panicked: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run_sequence(args: &[String]) -> ExitCode {
    let Some(path) = args.get(2) else {
        eprintln!("Usage: testlock-cli sequence <questions.json>");
        return ExitCode::from(2);
    };
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            eprintln!("Cannot read {path}: {error}");
            return ExitCode::from(2);
        }
    };
    let questions = match parse_questions(&raw).map_err(|e| e.to_string()).and_then(|batch| {
        normalize_questions(batch).map_err(|e| e.to_string())
    }) {
        Ok(questions) => questions,
        Err(message) => {
            eprintln!("Cannot parse {path}: {message}");
            return ExitCode::from(2);
        }
    };

    let mut rng = StdRng::from_entropy();
    for (i, question) in sequence(questions, &mut rng).iter().enumerate() {
        println!(
            "{:>3}. [{}] {} ({})",
            i + 1,
            question.kind.as_wire_str(),
            question.id,
            match question.duration {
                Some(d) => format!("{}ms", d.as_millis()),
                None => "untimed".to_string(),
            }
        );
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use testlock_core::wire::WireQuestion;

    fn runtime() -> SessionRuntime {
        SessionRuntime::new(
            Default::default(),
            Capabilities {
                signals: Arc::new(SignalHub::new()),
                presentation: Arc::new(AlwaysGranted),
                host: Arc::new(NoHost),
                transport: Arc::new(JsonWriterTransport),
            },
        )
    }

    fn timed_question(dur_millis: i64) -> WireQuestion {
        WireQuestion {
            id: "q1".into(),
            query: "prompt".into(),
            test_id: "t1".into(),
            kind: "SHORT".into(),
            dur_millis,
            options: None,
        }
    }

    fn identity() -> Identity {
        Identity {
            owner: "owner-1".into(),
            student_email: "s@example.edu".into(),
            matriculation_number: "MAT/123".into(),
        }
    }

    // Paused time only advances while every task is parked; a loop that kept
    // re-polling stdin after EOF would starve the clock and hang this test.
    #[tokio::test(start_paused = true)]
    async fn interactive_loop_parks_after_stdin_eof() {
        let runtime = runtime();
        let handle = runtime.handle;
        let ui = runtime.ui;
        let driver_task = tokio::spawn(runtime.driver.run());

        handle.load_questions(vec![timed_question(300)]).unwrap();
        handle.set_identity(identity()).unwrap();
        handle.accept().unwrap();

        // Stdin is already at EOF; the question finishes via clock expiry.
        let exit = drive_attempt(
            false,
            handle,
            ui,
            driver_task,
            BufReader::new(&b""[..]),
        )
        .await;
        assert_eq!(format!("{exit:?}"), format!("{:?}", ExitCode::SUCCESS));
    }

    #[tokio::test(start_paused = true)]
    async fn stdin_lines_submit_answers() {
        let runtime = runtime();
        let handle = runtime.handle;
        let ui = runtime.ui;
        let driver_task = tokio::spawn(runtime.driver.run());

        handle.load_questions(vec![timed_question(60_000)]).unwrap();
        handle.set_identity(identity()).unwrap();
        handle.accept().unwrap();

        let exit = drive_attempt(
            false,
            handle,
            ui,
            driver_task,
            BufReader::new(&b"my answer\n"[..]),
        )
        .await;
        assert_eq!(format!("{exit:?}"), format!("{:?}", ExitCode::SUCCESS));
    }
}
