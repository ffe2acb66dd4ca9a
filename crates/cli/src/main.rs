mod boot;
mod config;
mod serve;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use cutover_core::documents::check_documents;
use cutover_core::{
    seed_project, summarize, FixtureName, FixtureSet, StageDataAccessor, UnlockModel,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Overrides, Settings};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Migration cutover dashboard.
#[derive(Parser)]
#[command(name = "cutover", version, about = "Migration cutover dashboard")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a cutover.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed the store (if empty) and start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind
        #[arg(long)]
        host: Option<String>,
        /// JSON store file (in-memory when omitted)
        #[arg(long)]
        store: Option<PathBuf>,
        /// Fixture directory (embedded fixtures when omitted)
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },

    /// Seed the store with the fixture project if it holds none
    Seed {
        /// JSON store file
        #[arg(long)]
        store: Option<PathBuf>,
        /// Fixture directory
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },

    /// Show stage status, accessibility and progress for the project
    Stages {
        /// JSON store file; the fixture project is used when it holds none
        #[arg(long)]
        store: Option<PathBuf>,
        /// Fixture directory
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },

    /// Print the document for one stage (0-5)
    Show {
        /// Stage index
        #[arg(allow_negative_numbers = true)]
        stage: i64,
        /// Print the stage summary instead of the full document
        #[arg(long)]
        summary: bool,
        /// Fixture directory
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },

    /// Check the fixture set against its schemas
    Validate {
        /// Fixture directory
        #[arg(long)]
        fixtures: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Serve {
            port,
            host,
            store,
            fixtures,
        } => {
            let overrides = Overrides {
                host,
                port,
                store,
                fixtures,
            };
            let settings = load_settings(config, overrides, cli.output, cli.quiet);
            let rt = runtime(cli.output, cli.quiet);
            if let Err(e) = rt.block_on(serve::start_server(&settings)) {
                report_error(&format!("server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
        Commands::Seed { store, fixtures } => {
            let overrides = Overrides {
                store,
                fixtures,
                ..Overrides::default()
            };
            let settings = load_settings(config, overrides, cli.output, cli.quiet);
            cmd_seed(&settings, cli.output, cli.quiet);
        }
        Commands::Stages { store, fixtures } => {
            let overrides = Overrides {
                store,
                fixtures,
                ..Overrides::default()
            };
            let settings = load_settings(config, overrides, cli.output, cli.quiet);
            cmd_stages(&settings, cli.output, cli.quiet);
        }
        Commands::Show {
            stage,
            summary,
            fixtures,
        } => {
            let overrides = Overrides {
                fixtures,
                ..Overrides::default()
            };
            let settings = load_settings(config, overrides, cli.output, cli.quiet);
            cmd_show(&settings, stage, summary, cli.output, cli.quiet);
        }
        Commands::Validate { fixtures } => {
            let overrides = Overrides {
                fixtures,
                ..Overrides::default()
            };
            let settings = load_settings(config, overrides, cli.output, cli.quiet);
            cmd_validate(&settings, cli.output, cli.quiet);
        }
    }
}

/// Logs go to stderr. `RUST_LOG` filters (default `info`);
/// `CUTOVER_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("CUTOVER_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_settings(
    config: Option<&Path>,
    overrides: Overrides,
    output: OutputFormat,
    quiet: bool,
) -> Settings {
    match Settings::load(config, overrides) {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("config error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn runtime(output: OutputFormat, quiet: bool) -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to create tokio runtime: {}", e),
                output,
                quiet,
            );
            process::exit(1);
        }
    }
}

fn fixtures_or_exit(settings: &Settings, output: OutputFormat, quiet: bool) -> FixtureSet {
    match boot::load_fixtures(settings.fixtures.as_deref()) {
        Ok(f) => f,
        Err(e) => {
            report_error(&format!("fixture error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn print_json(value: &serde_json::Value) {
    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}

fn cmd_seed(settings: &Settings, output: OutputFormat, quiet: bool) {
    let fixtures = fixtures_or_exit(settings, output, quiet);
    if settings.store.is_none() && !quiet && output == OutputFormat::Text {
        eprintln!("note: no --store given; seeding an in-memory store that is discarded on exit");
    }

    let rt = runtime(output, quiet);
    let result = rt.block_on(async {
        let store = boot::open_store(settings.store.as_deref()).await?;
        seed_project(store.as_ref(), &fixtures).await
    });

    match result {
        Ok(outcome) => match output {
            OutputFormat::Text => {
                if !quiet {
                    if outcome.seeded {
                        println!("seeded project {}", outcome.project_id);
                    } else {
                        println!("project {} already seeded", outcome.project_id);
                    }
                }
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "project_id": outcome.project_id,
                "seeded": outcome.seeded,
            })),
        },
        Err(e) => {
            report_error(&format!("seed failed: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_stages(settings: &Settings, output: OutputFormat, quiet: bool) {
    let fixtures = fixtures_or_exit(settings, output, quiet);

    let rt = runtime(output, quiet);
    let stored = rt.block_on(async {
        let store = boot::open_store(settings.store.as_deref()).await?;
        boot::first_project(store.as_ref()).await
    });
    let stored = match stored {
        Ok(p) => p,
        Err(e) => {
            report_error(&format!("store error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let (project_id, metadata) = match &stored {
        Some(project) => (Some(project.id.as_str()), &project.metadata),
        None => (None, fixtures.project()),
    };
    let model = UnlockModel::for_project(metadata);
    let views = model.views();

    match output {
        OutputFormat::Text => {
            println!(
                "{} (stage {}, {}% overall)",
                metadata.name,
                metadata.current_stage,
                metadata.overall_progress()
            );
            for view in &views {
                let lock = if view.accessible { "open" } else { "locked" };
                println!(
                    "  {}  {:<22} {:<12} {:<7} {:>3}%",
                    view.definition.id,
                    view.definition.title,
                    view.status.as_str(),
                    lock,
                    view.progress
                );
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "project_id": project_id,
            "name": metadata.name,
            "current_stage": metadata.current_stage,
            "overall_progress": metadata.overall_progress(),
            "stages": views,
        })),
    }
}

fn cmd_show(settings: &Settings, stage: i64, summary: bool, output: OutputFormat, quiet: bool) {
    let fixtures = fixtures_or_exit(settings, output, quiet);
    let accessor = StageDataAccessor::new(std::sync::Arc::new(fixtures));

    let document = match accessor.stage_document(stage) {
        Some(doc) => doc,
        None => {
            report_error(&format!("stage {} not found", stage), output, quiet);
            process::exit(1);
        }
    };

    if !summary {
        print_json(document);
        return;
    }

    match summarize(stage, document) {
        Ok(Some(s)) => print_json(&serde_json::to_value(s).unwrap_or_default()),
        Ok(None) => {
            report_error(&format!("stage {} not found", stage), output, quiet);
            process::exit(1);
        }
        Err(e) => {
            report_error(
                &format!("stage {} document is malformed: {}", stage, e),
                output,
                quiet,
            );
            process::exit(1);
        }
    }
}

static PROJECT_SCHEMA_STR: &str = include_str!("../schemas/project-metadata.schema.json");

fn cmd_validate(settings: &Settings, output: OutputFormat, quiet: bool) {
    let schema: serde_json::Value = match serde_json::from_str(PROJECT_SCHEMA_STR) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("internal error: failed to parse embedded schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("internal error: failed to compile schema: {}", e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let raw = match boot::load_raw_fixtures(settings.fixtures.as_deref()) {
        Ok(raw) => raw,
        Err(e) => {
            report_error(&format!("fixture error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let mut errors: Vec<String> = validator
        .iter_errors(raw.document(FixtureName::ProjectMetadata))
        .map(|e| format!("{}: {}", FixtureName::ProjectMetadata, e))
        .collect();
    match raw.into_fixture_set() {
        Ok(fixtures) => errors.extend(
            check_documents(&fixtures)
                .into_iter()
                .map(|issue| format!("{}: {}", issue.fixture, issue.message)),
        ),
        Err(e) => errors.push(e.to_string()),
    }

    if errors.is_empty() {
        if !quiet {
            match output {
                OutputFormat::Text => println!("valid"),
                OutputFormat::Json => println!("{{\"valid\": true}}"),
            }
        }
        return;
    }

    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("invalid fixtures");
                for err in &errors {
                    eprintln!("  - {}", err);
                }
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({ "valid": false, "errors": errors });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
    process::exit(1);
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
