//! Binary entry point for the Caravan CLI.

use std::io::{self, Write};
use std::process;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use thiserror::Error;

use caravan::{
    AbortedRun, AwsBackend, AwsBackendError, CleanupSweeper, ProvisionConfig,
    ProvisionOrchestrator, ProvisionPlan, Registry, RegistryStore, RegistryWriter, RunId,
    StdoutProgress, cancel_pair, sample_data,
};

mod cli;

use cli::{Cli, CleanupCommand, PopulateCommand, ProvisionCommand, SeedCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("registry error: {0}")]
    Registry(String),
    #[error("sample data error: {0}")]
    SampleData(String),
    #[error("provisioning failed: {0}")]
    Provision(#[from] AbortedRun<AwsBackendError>),
    #[error("cleanup failed: {0}")]
    Cleanup(String),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Provision(command) => provision_command(command).await,
        Cli::Seed(command) => seed_command(&command),
        Cli::Populate(command) => populate_command(command).await,
        Cli::Cleanup(command) => cleanup_command(command).await,
    }
}

fn load_config() -> Result<ProvisionConfig, CliError> {
    let config =
        ProvisionConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    config
        .validate()
        .map_err(|err| CliError::Config(err.to_string()))?;
    Ok(config)
}

fn registry_store(config: &ProvisionConfig, override_path: Option<String>) -> RegistryStore {
    let path = override_path.unwrap_or_else(|| config.registry_path.clone());
    RegistryStore::new(Utf8PathBuf::from(path))
}

async fn backend_from(config: &ProvisionConfig) -> AwsBackend {
    AwsBackend::from_env()
        .await
        .with_wait_timeout(Duration::from_secs(config.wait_timeout_secs))
        .with_poll_interval(Duration::from_secs(config.poll_interval_secs))
        .with_project_tag(config.project_name.clone())
}

async fn provision_command(args: ProvisionCommand) -> Result<i32, CliError> {
    let config = load_config()?;
    let run_id = RunId::generate();
    let context = config
        .run_context(run_id)
        .map_err(|err| CliError::Config(err.to_string()))?;
    let plan = ProvisionPlan::resolve(&context, &config.table_attributes())
        .map_err(|err| CliError::Config(err.to_string()))?;

    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let backend = backend_from(&config).await.with_cancel(token);
    let store = registry_store(&config, args.registry);
    let orchestrator = ProvisionOrchestrator::new(backend, store.clone(), StdoutProgress);
    let outcome = orchestrator.execute(&plan).await?;

    let mut stdout = io::stdout();
    writeln!(
        stdout,
        "provisioned {} resources; names recorded in {}",
        outcome.resources.len(),
        store.path()
    )
    .ok();
    Ok(0)
}

fn seed_command(args: &SeedCommand) -> Result<i32, CliError> {
    let config = load_config()?;
    let out_dir = args
        .out
        .clone()
        .unwrap_or_else(|| config.sample_data_dir.clone());
    let written = sample_data::write_fixtures(Utf8Path::new(&out_dir))
        .map_err(|err| CliError::SampleData(err.to_string()))?;

    let mut stdout = io::stdout();
    for path in &written {
        writeln!(stdout, "wrote {path}").ok();
    }
    Ok(0)
}

async fn populate_command(args: PopulateCommand) -> Result<i32, CliError> {
    let config = load_config()?;
    let store = registry_store(&config, args.registry);
    let registry = store
        .load()
        .map_err(|err| CliError::Registry(err.to_string()))?;
    let table = registry
        .resources()
        .into_iter()
        .find(|resource| Some(resource.name.as_str()) == registry.source_table.as_deref())
        .ok_or_else(|| {
            CliError::Registry(format!("{} records no source table", store.path()))
        })?;

    let backend = backend_from(&config).await;
    let users = sample_data::sample_users();
    let loaded = backend
        .populate_table(&table, &users)
        .await
        .map_err(|err| CliError::Backend(err.to_string()))?;

    writeln!(io::stdout(), "loaded {loaded} users into {table}").ok();
    Ok(0)
}

async fn cleanup_command(args: CleanupCommand) -> Result<i32, CliError> {
    let config = load_config()?;
    let store = registry_store(&config, args.registry);
    let registry = store
        .load()
        .map_err(|err| CliError::Registry(err.to_string()))?;

    let backend = backend_from(&config).await;
    let sweeper = CleanupSweeper::new(backend, StdoutProgress);
    let summary = sweeper
        .sweep(&registry)
        .await
        .map_err(|err| CliError::Cleanup(err.to_string()))?;

    store
        .save(&Registry::default())
        .map_err(|err| CliError::Registry(err.to_string()))?;

    writeln!(
        io::stdout(),
        "removed {} buckets ({} objects) and {} tables",
        summary.deleted_buckets,
        summary.deleted_objects,
        summary.deleted_tables
    )
    .ok();
    Ok(0)
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
    let CliError::Provision(aborted) = err else {
        return;
    };
    if aborted.created.is_empty() {
        writeln!(target, "no resources were created").ok();
        return;
    }
    writeln!(
        target,
        "created before the failure (not rolled back, remove via `caravan cleanup`):"
    )
    .ok();
    for provisioned in &aborted.created {
        writeln!(target, "  {} ({})", provisioned.resource, provisioned.status).ok();
    }
}
