//! k8s-yaml-schema CLI
//!
//! Adds or updates `yaml-language-server` schema directives in Kubernetes
//! manifests. Intended to run as a pre-commit hook.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use k8s_yaml_schema::{
    Annotator, Config, ConfigArgs, FileReport, FileStatus, RunReport, DEFAULT_CONFIG_PATH,
};
use tracing_subscriber::EnvFilter;

const PREFIX: &str = "k8s-yaml-schema";

#[derive(Parser)]
#[command(name = "k8s-yaml-schema")]
#[command(about = "Add yaml-language-server schema directives to Kubernetes manifests")]
#[command(version)]
struct Cli {
    /// Schema host (or full base without path). Falls back to config or env YAML_SCHEMA_DOMAIN/DOMAIN
    #[arg(long)]
    domain: Option<String>,

    /// Config file path
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// apiGroup used for core resources (apiVersion without '/'). Default: core
    #[arg(long)]
    core_group: Option<String>,

    /// Template for the default schema URL
    #[arg(long)]
    schema_template: Option<String>,

    /// Also add/update schemas for core API resources (apiVersion like 'v1')
    #[arg(long, overrides_with = "no_include_core")]
    include_core: bool,

    /// Do not add/update schemas for core API resources
    #[arg(long, overrides_with = "include_core")]
    no_include_core: bool,

    /// Print a JSON run report to stdout
    #[arg(long)]
    json: bool,

    /// Log rule matching decisions to stderr
    #[arg(long, short)]
    verbose: bool,

    /// Files to annotate
    files: Vec<PathBuf>,
}

impl Cli {
    fn config_args(&self) -> ConfigArgs {
        let include_core = match (self.include_core, self.no_include_core) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        ConfigArgs {
            config_path: self.config.clone(),
            domain: self.domain.clone(),
            core_group: self.core_group.clone(),
            schema_template: self.schema_template.clone(),
            include_core,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match Config::load(&cli.config_args()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{PREFIX}: {e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let annotator = Annotator::new(&config);
    let mut reports = Vec::with_capacity(cli.files.len());
    for file in &cli.files {
        let report = annotator.annotate_file(file);
        print_report(&report);
        reports.push(report);
    }

    let report = RunReport { files: reports };
    let status = report.status();
    if cli.json {
        let output = serde_json::json!({ "status": status, "files": report.files });
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("{PREFIX}: failed to serialize report: {e}"),
        }
    }
    ExitCode::from(status.exit_code() as u8)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "k8s_yaml_schema=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Write per-file diagnostics and change notices to stderr.
fn print_report(report: &FileReport) {
    let file = report.file.display();
    for diag in &report.diagnostics {
        match diag.document {
            Some(n) => eprintln!("{PREFIX}: YAML parse error in {file} (document #{n}): {}", diag.message),
            None => eprintln!("{PREFIX}: {}", diag.message),
        }
    }
    if report.status == FileStatus::Updated {
        eprintln!("{PREFIX}: updated {file}");
    }
}
