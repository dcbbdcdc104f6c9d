//! Fathom - run a command, capture its failure, explain it one hint at a time.
//!
//! The binary is a thin orchestrator: it sequences subprocess execution,
//! context extraction, the external analysis call, state persistence, and
//! the disclosure/fix/translate/sync interactions. All of the actual logic
//! lives in the library crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::ProgressBar;

use fathom::backend::{LogBackend, LogRecord, UrBackend, STATUS_SOLVED};
use fathom::config::Config;
use fathom::context::extract_error_context;
use fathom::error::{FathomError, Result};
use fathom::fix::apply_fix;
use fathom::llm::{ErrorAnalyzer, GroqProvider};
use fathom::runner::run_command;
use fathom::session::{Disclosure, SessionState, StateStore};
use fathom::translate::{localize_best_effort, LingoProvider};

#[derive(Parser)]
#[command(name = "fathom")]
#[command(version = "0.1.0")]
#[command(about = "Run a command and explain its failure one hint at a time", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command, capturing and analyzing its failure output
    Run {
        /// Target locale for the explanation (e.g. hi, es, fr)
        #[arg(long, value_name = "LOCALE", env = "FATHOM_LANG")]
        lang: Option<String>,

        /// The command to run, followed by its arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },

    /// Show the next hint for the last captured failure
    Next,

    /// Apply the suggested single-line fix from the last analysis
    Fix,

    /// Push the current session to the log backend
    Sync,

    /// List the five most recent backend records
    History,

    /// Mark the synced session's backend record as solved
    Solved {
        /// Optional resolution note
        note: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "fathom=debug,info"
    } else {
        "fathom=info,warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Resolve project path
    let project_path = cli.project.canonicalize().unwrap_or(cli.project.clone());

    if !project_path.exists() {
        eprintln!(
            "{} Project directory does not exist: {}",
            "Error:".red().bold(),
            project_path.display()
        );
        std::process::exit(1);
    }

    let exit_code = match dispatch(cli.command, &project_path).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            e.exit_code()
        }
    };
    std::process::exit(exit_code);
}

async fn dispatch(command: Commands, project: &Path) -> Result<i32> {
    match command {
        Commands::Run { lang, command } => cmd_run(project, &command, lang.as_deref()).await,
        Commands::Next => cmd_next(project).map(|()| 0),
        Commands::Fix => cmd_fix(project).map(|()| 0),
        Commands::Sync => cmd_sync(project).await.map(|()| 0),
        Commands::History => cmd_history(project).await.map(|()| 0),
        Commands::Solved { note } => cmd_solved(project, &note).await.map(|()| 0),
    }
}

/// Execute the wrapped command and, on failure, analyze and persist.
///
/// The returned exit code always mirrors the child's, whether or not the
/// post-hoc analysis succeeded.
async fn cmd_run(project: &Path, command: &[String], lang: Option<&str>) -> Result<i32> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| FathomError::config("no command given"))?;
    let command_line = command.join(" ");

    println!("{} {}", "Running:".blue().bold(), command_line);
    let capture = run_command(program, args).await?;

    if capture.is_failure() {
        println!("\n{}", "--- Command failed, analyzing ---".yellow());
        if let Err(e) = analyze_failure(project, &command_line, &capture.stderr, lang).await {
            eprintln!("{} {}", "Analysis failed:".red(), e);
        }
    }

    Ok(capture.exit_code)
}

/// Analyze captured stderr, localize on request, and persist a fresh session.
async fn analyze_failure(
    project: &Path,
    command_line: &str,
    stderr: &str,
    lang: Option<&str>,
) -> Result<()> {
    let config = Config::load(project)?;
    let context = extract_error_context(stderr, project);

    let analyzer = GroqProvider::new()
        .with_model(&config.model)
        .with_timeout(config.timeout_secs);

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Consulting {}...", analyzer.model_name()));
    spinner.enable_steady_tick(Duration::from_millis(120));
    let analyzed = analyzer
        .analyze(stderr, command_line, context.as_ref())
        .await;
    spinner.finish_and_clear();
    let mut analysis = analyzed?;

    if let Some(target) = lang {
        println!("{} {}", "Translating to".blue(), target);
        let translator = LingoProvider::new().with_timeout(config.timeout_secs);
        let (localized, translated) =
            localize_best_effort(&translator, analysis, &config.source_locale, target).await;
        if !translated {
            eprintln!(
                "{} Translation failed, falling back to {}",
                "Warning:".yellow(),
                config.source_locale
            );
        }
        analysis = localized;
    }

    let state = SessionState::new(command_line, stderr, analysis);
    StateStore::new(project).save(&state)?;

    print_summary(&state);
    print_disclosure(&state.current_disclosure());
    print_follow_ups(&state);

    Ok(())
}

/// Advance the disclosure one step and show it.
fn cmd_next(project: &Path) -> Result<()> {
    let store = StateStore::new(project);
    let Some(mut state) = store.load() else {
        print_no_session();
        return Ok(());
    };

    state.advance();
    print_disclosure(&state.current_disclosure());
    if state.is_terminal() {
        print_follow_ups(&state);
    }
    store.save(&state)?;
    Ok(())
}

/// Apply the stored single-line fix suggestion.
fn cmd_fix(project: &Path) -> Result<()> {
    let store = StateStore::new(project);
    let Some(state) = store.load() else {
        print_no_session();
        return Ok(());
    };
    let Some(fix) = &state.analysis.fix_action else {
        println!(
            "{}",
            "The last analysis carried no fix suggestion.".yellow()
        );
        return Ok(());
    };

    println!("{} {}", "Fix:".cyan().bold(), fix.description);
    println!("   target: {}:{}", fix.file_path, fix.line_number);

    if apply_fix(fix, project)? {
        println!(
            "{} Applied fix to {}:{}",
            "OK".green().bold(),
            fix.file_path,
            fix.line_number
        );
    } else {
        eprintln!(
            "{} Could not apply the fix; the file may have changed since analysis",
            "Failed:".red().bold()
        );
    }
    Ok(())
}

/// Push the current session to the log backend and remember its id.
async fn cmd_sync(project: &Path) -> Result<()> {
    let store = StateStore::new(project);
    let Some(mut state) = store.load() else {
        print_no_session();
        return Ok(());
    };

    let config = Config::load(project)?;
    let backend = backend_from_config(&config);
    let id = backend.create(&LogRecord::from_state(&state)).await?;

    state.log_id = Some(id.clone());
    store.save(&state)?;
    println!("{} Session synced (id: {id})", "OK".green().bold());
    Ok(())
}

/// List the five most recent backend records, newest first.
async fn cmd_history(project: &Path) -> Result<()> {
    let config = Config::load(project)?;
    let backend = backend_from_config(&config);
    let mut records = backend.list().await?;

    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records.truncate(5);

    if records.is_empty() {
        println!("No synced sessions yet.");
        return Ok(());
    }

    println!("\n{} Recent failures", "History:".cyan().bold());
    println!("{}", "─".repeat(60));
    for record in &records {
        let status = match record.status.as_deref() {
            Some(STATUS_SOLVED) => STATUS_SOLVED.green(),
            _ => "OPEN".yellow(),
        };
        println!(
            "   {} [{}] {}",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            status,
            record.command
        );
        if let Some(error_type) = &record.error_type {
            println!("      {error_type}");
        }
    }
    Ok(())
}

/// Mark the synced backend record solved and detach its id locally.
async fn cmd_solved(project: &Path, note: &[String]) -> Result<()> {
    let store = StateStore::new(project);
    let Some(mut state) = store.load() else {
        print_no_session();
        return Ok(());
    };
    let Some(log_id) = state.log_id.clone() else {
        println!(
            "{}",
            "The current session has not been synced; run 'fathom sync' first.".yellow()
        );
        return Ok(());
    };

    let config = Config::load(project)?;
    let backend = backend_from_config(&config);
    let patch = serde_json::json!({
        "status": STATUS_SOLVED,
        "solution": note.join(" "),
    });
    backend.update(&log_id, &patch).await?;

    state.log_id = None;
    store.save(&state)?;
    println!("{} Marked solved", "OK".green().bold());
    Ok(())
}

fn backend_from_config(config: &Config) -> UrBackend {
    UrBackend::new()
        .with_api_base(&config.backend_url)
        .with_timeout(config.timeout_secs)
}

fn print_no_session() {
    println!(
        "{}",
        "No active session. Run a command with 'fathom run' first.".yellow()
    );
}

fn print_summary(state: &SessionState) {
    let analysis = &state.analysis;
    if !analysis.error_type.is_empty() {
        let confidence = if analysis.confidence.is_empty() {
            "unknown"
        } else {
            analysis.confidence.as_str()
        };
        println!(
            "\n{} {} ({} confidence)",
            "Diagnosis:".cyan().bold(),
            analysis.error_type,
            confidence
        );
    }
    if !analysis.likely_cause.is_empty() {
        println!("   {}", analysis.likely_cause);
    }
    println!();
}

fn print_disclosure(disclosure: &Disclosure) {
    match disclosure {
        Disclosure::Hint { index, text } => {
            println!("{}", format!("Hint {}:", index + 1).cyan().bold());
            println!("{text}");
        }
        Disclosure::Final { text } => {
            println!("{}", "Full explanation:".green().bold());
            println!("{text}");
        }
    }
}

fn print_follow_ups(state: &SessionState) {
    if state.analysis.fix_action.is_some() {
        println!(
            "{}",
            "(a single-line fix is available: run 'fathom fix')".dimmed()
        );
    }
    if !state.is_terminal() {
        println!("{}", "(run 'fathom next' for the next hint)".dimmed());
    }
}
