//! lineage CLI: rebuild provenance from history and report stale outputs.

use clap::{Args, Parser, Subcommand};
use lineage_core::config::ProjectConfig;
use lineage_core::path::ContainmentPolicy;
use lineage_exec::{
    generate, status, CancelToken, GenerateOptions, Project, StatusReport, TracingProgress,
};
use lineage_io::{GitHistory, HeadState};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lineage")]
#[command(about = "Provenance and dependency tracking for recorded commands", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct GlobalArgs {
    /// Project root (a git work tree)
    #[arg(long, global = true, env = "LINEAGE_PROJECT", default_value = ".")]
    project: PathBuf,

    /// Metadata directory, relative to the project root (overrides env)
    #[arg(long, global = true)]
    metadata_dir: Option<String>,

    /// Base URL for document URIs (overrides env)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Path containment policy: ancestor or exact (overrides env)
    #[arg(long, global = true)]
    containment: Option<ContainmentPolicy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the dependency and provenance graphs from the full history
    Generate {
        /// Overwrite graphs that already exist
        #[arg(long)]
        force: bool,

        /// Skip records whose inputs or outputs cannot be resolved
        #[arg(long)]
        skip_errors: bool,
    },

    /// Show outputs made stale by changed or deleted paths
    Status {
        /// Restrict the report to these paths (and everything below them)
        paths: Vec<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lineage=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { force, skip_errors } => {
            if let Err(e) = run_generate(&cli.global, force, skip_errors) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Status { paths, json } => match run_status(&cli.global, &paths, json) {
            Ok(code) => std::process::exit(code),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}

fn open_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let mut config = ProjectConfig::from_env()?;
    apply_overrides(&mut config, global);
    Ok(Project::new(global.project.clone(), config)?)
}

fn apply_overrides(config: &mut ProjectConfig, global: &GlobalArgs) {
    if let Some(dir) = &global.metadata_dir {
        config.metadata_dir = dir.clone();
    }
    if let Some(url) = &global.base_url {
        config.base_url = url.clone();
    }
    if let Some(policy) = global.containment {
        config.containment = policy;
    }
}

fn run_generate(
    global: &GlobalArgs,
    force: bool,
    skip_errors: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let project = open_project(global)?;
    let history = GitHistory::open(project.root())?;
    let mut options = GenerateOptions::from_project(&project);
    options.force = force;
    options.skip_on_error |= skip_errors;

    let manifest = generate(
        &project,
        &history,
        options,
        &TracingProgress,
        &CancelToken::new(),
    )?;

    println!("✓ Graphs generated");
    println!("  Commits walked: {}", manifest.commits_walked);
    println!(
        "  Records: {} converted, {} skipped",
        manifest.records_converted, manifest.records_skipped
    );
    println!(
        "  Plans: {}, activities: {}",
        manifest.plans, manifest.activities
    );
    println!(
        "  Duration: {}ms",
        manifest.finished_ms - manifest.started_ms
    );
    Ok(())
}

fn run_status(
    global: &GlobalArgs,
    paths: &[String],
    json: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    let project = open_project(global)?;
    let graphs = project.store()?.load()?;
    let history = GitHistory::open(project.root())?;
    let state = HeadState::new(&history)?;

    let report = status(&graphs, &state, paths)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report.exit_code())
}

fn print_report(report: &StatusReport) {
    if report.updates.is_empty() {
        println!("Everything is up to date.");
    } else {
        println!("Outdated outputs:");
        for (changed, outputs) in &report.updates {
            for output in outputs {
                println!("  {}: {}", output, changed);
            }
        }
    }
    if !report.modified.is_empty() {
        println!();
        println!("Modified inputs:");
        for path in &report.modified {
            println!("  {}", path);
        }
    }
    if !report.deleted.is_empty() {
        println!();
        println!("Deleted files:");
        for path in &report.deleted {
            println!("  {}", path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_environment_defaults() {
        let mut config = ProjectConfig::default();
        let global = GlobalArgs {
            metadata_dir: Some(".meta".into()),
            containment: Some(ContainmentPolicy::Exact),
            ..Default::default()
        };
        apply_overrides(&mut config, &global);
        assert_eq!(config.metadata_dir, ".meta");
        assert_eq!(config.containment, ContainmentPolicy::Exact);
        assert_eq!(config.base_url, lineage_core::config::DEFAULT_BASE_URL);
    }

    #[test]
    fn parses_status_paths() {
        let cli = Cli::parse_from(["lineage", "--project", "/tmp/p", "status", "a.txt", "b"]);
        assert_eq!(cli.global.project, PathBuf::from("/tmp/p"));
        match cli.command {
            Commands::Status { paths, json } => {
                assert_eq!(paths, vec!["a.txt".to_string(), "b".to_string()]);
                assert!(!json);
            }
            _ => panic!("expected status"),
        }
    }

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::parse_from(["lineage", "generate", "--force", "--containment", "exact"]);
        assert_eq!(cli.global.containment, Some(ContainmentPolicy::Exact));
        assert!(matches!(
            cli.command,
            Commands::Generate {
                force: true,
                skip_errors: false
            }
        ));
    }
}
