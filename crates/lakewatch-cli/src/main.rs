use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lakewatch_core::app::{
    PollingConfig, WorkflowBuilder, WorkflowConfig, refresh_and_wait, wait_for_monitor,
    wait_for_refresh, weighted_error_metrics,
};
use lakewatch_core::domain::{
    CreateMonitor, Granularity, InferenceLog, ProblemType, RefreshId, TableName,
};
use lakewatch_core::impls::{HttpMonitorClient, InMemoryMonitorClient};
use lakewatch_core::ports::{Clock, ManualClock, MonitorClient, SystemClock};
use lakewatch_core::wait::Waiter;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "lakewatch", about = "Provision and watch Lakehouse inference monitors")]
struct Cli {
    /// Workflow configuration (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workspace host, e.g. https://adb-123.azuredatabricks.net
    #[arg(long, global = true, env = "DATABRICKS_HOST")]
    host: Option<String>,

    #[arg(long, global = true, env = "DATABRICKS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Run against an in-memory platform with a virtual clock.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the monitor, wait for it, attach custom metrics and refresh.
    Setup,

    /// Wait until the monitor on a table is ACTIVE.
    WaitMonitor {
        /// Defaults to the table in --config.
        #[arg(long)]
        table: Option<TableName>,
    },

    /// Wait until one refresh is SUCCESS.
    WaitRefresh {
        #[arg(long)]
        table: Option<TableName>,
        #[arg(long)]
        refresh_id: i64,
    },

    /// Trigger a refresh and wait for it.
    Refresh {
        #[arg(long)]
        table: Option<TableName>,
    },

    /// Delete the monitor on a table.
    Delete {
        #[arg(long)]
        table: Option<TableName>,
    },

    /// Print an example configuration with the weighted-error metric suite.
    InitConfig {
        #[arg(long)]
        table: TableName,
        /// Boolean column whose rows count double in the weighted error.
        #[arg(long, default_value = "Critical")]
        critical_col: String,
    },
}

impl Command {
    /// Table named with `--table`, if the subcommand takes one.
    fn table(&self) -> Option<&TableName> {
        match self {
            Command::WaitMonitor { table }
            | Command::WaitRefresh { table, .. }
            | Command::Refresh { table }
            | Command::Delete { table } => table.as_ref(),
            Command::Setup | Command::InitConfig { .. } => None,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!(error = %err, "lakewatch failed");
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}

/// Client, clock and optional config shared by every subcommand.
struct Context {
    client: Arc<dyn MonitorClient>,
    clock: Arc<dyn Clock>,
    config: Option<WorkflowConfig>,
}

impl Context {
    fn polling(&self) -> PollingConfig {
        self.config
            .as_ref()
            .map(|c| c.polling.clone())
            .unwrap_or_default()
    }

    fn waiter(&self) -> Waiter {
        Waiter::new(self.clock.clone()).with_retry(self.polling().retry_policy())
    }

    fn table(&self, explicit: Option<TableName>) -> CliResult<TableName> {
        explicit
            .or_else(|| self.config.as_ref().map(|c| c.table.clone()))
            .ok_or_else(|| "--table is required without --config".into())
    }

    fn config(&self) -> CliResult<WorkflowConfig> {
        self.config
            .clone()
            .ok_or_else(|| "this command needs --config".into())
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    if let Command::InitConfig {
        table,
        critical_col,
    } = &cli.command
    {
        return print_example_config(table, critical_col);
    }

    let config = cli
        .config
        .as_deref()
        .map(WorkflowConfig::load)
        .transpose()?;
    let ctx = connect(&cli, config).await?;

    match cli.command {
        Command::Setup => {
            let workflow = WorkflowBuilder::new()
                .config(ctx.config()?)
                .client(ctx.client.clone())
                .clock(ctx.clock.clone())
                .build()?;
            let report = workflow.run().await?;
            print_json(&report)
        }
        Command::WaitMonitor { table } => {
            let table = ctx.table(table)?;
            let outcome = wait_for_monitor(
                ctx.client.as_ref(),
                &ctx.waiter(),
                &table,
                &ctx.polling().monitor_spec(),
            )
            .await?;
            info!(%table, status = %outcome.status, polls = outcome.polls, "monitor active");
            print_json(&ctx.client.get_monitor(&table).await?)
        }
        Command::WaitRefresh { table, refresh_id } => {
            let table = ctx.table(table)?;
            let report = wait_for_refresh(
                ctx.client.as_ref(),
                &ctx.waiter(),
                &table,
                RefreshId(refresh_id),
                &ctx.polling().refresh_spec(),
            )
            .await?;
            print_json(&report)
        }
        Command::Refresh { table } => {
            let table = ctx.table(table)?;
            let report = refresh_and_wait(
                ctx.client.as_ref(),
                &ctx.waiter(),
                &table,
                &ctx.polling().refresh_spec(),
            )
            .await?;
            print_json(&report)
        }
        Command::Delete { table } => {
            let table = ctx.table(table)?;
            ctx.client.delete_monitor(&table).await?;
            info!(%table, "monitor deleted");
            Ok(())
        }
        Command::InitConfig { .. } => Ok(()),
    }
}

async fn connect(cli: &Cli, config: Option<WorkflowConfig>) -> CliResult<Context> {
    if cli.dry_run {
        info!("dry run: in-memory platform, virtual clock");
        let client = InMemoryMonitorClient::new();
        // Everything but `setup` expects an existing monitor on the table it targets.
        let target = cli
            .command
            .table()
            .or_else(|| config.as_ref().map(|c| &c.table));
        if !matches!(cli.command, Command::Setup)
            && let Some(table) = target
        {
            seed_dry_run_monitor(&client, table, config.as_ref()).await?;
        }
        return Ok(Context {
            client: Arc::new(client),
            clock: Arc::new(ManualClock::default()),
            config,
        });
    }

    let (Some(host), Some(token)) = (cli.host.as_deref(), cli.token.as_deref()) else {
        return Err("--host and --token (or DATABRICKS_HOST / DATABRICKS_TOKEN) are required".into());
    };
    let client = HttpMonitorClient::new(host, token)?;
    info!(base_url = client.base_url(), "connected");
    Ok(Context {
        client: Arc::new(client),
        clock: Arc::new(SystemClock),
        config,
    })
}

async fn seed_dry_run_monitor(
    client: &InMemoryMonitorClient,
    table: &TableName,
    config: Option<&WorkflowConfig>,
) -> CliResult<()> {
    if let Some(config) = config {
        let mut config = config.clone();
        config.table = table.clone();
        let workflow = WorkflowBuilder::new()
            .config(config)
            .client(Arc::new(client.clone()))
            .clock(Arc::new(ManualClock::default()))
            .build()?;
        workflow.create_monitor().await?;
        return Ok(());
    }

    let request = CreateMonitor {
        assets_dir: format!("/Workspace/Shared/lakewatch/{}", table.table()),
        output_schema_name: table.schema_name(),
        inference_log: InferenceLog {
            problem_type: ProblemType::Regression,
            prediction_col: "prediction".to_string(),
            timestamp_col: "timestamp".to_string(),
            granularities: vec![Granularity::OneDay],
            model_id_col: "model_version".to_string(),
            label_col: None,
            prediction_proba_col: None,
        },
        baseline_table_name: None,
        custom_metrics: Vec::new(),
    };
    client.create_monitor(table, &request).await?;
    Ok(())
}

fn print_example_config(table: &TableName, critical_col: &str) -> CliResult<()> {
    print_json(&example_config(table, critical_col)?)
}

fn example_config(table: &TableName, critical_col: &str) -> CliResult<WorkflowConfig> {
    let custom_metrics = weighted_error_metrics(critical_col)?;
    let example = serde_json::json!({
        "table": table,
        "assets_dir": format!("/Workspace/Shared/lakewatch/{}", table.table()),
        "inference_log": {
            "problem_type": "PROBLEM_TYPE_REGRESSION",
            "prediction_col": "Prediction",
            "timestamp_col": "TransactionDate",
            "granularities": ["1 day"],
            "model_id_col": "ModelVersion",
            "label_col": "ProductRating"
        },
        "custom_metrics": custom_metrics,
        "polling": PollingConfig::default(),
    });
    // Round-trip through the real type so the printed file always loads.
    let config: WorkflowConfig = serde_json::from_value(example)?;
    config.validate()?;
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands_and_globals() {
        let cli = Cli::try_parse_from([
            "lakewatch",
            "wait-refresh",
            "--table",
            "main.retail.predictions",
            "--refresh-id",
            "7",
            "--dry-run",
        ])
        .unwrap();
        assert!(cli.dry_run);
        assert!(matches!(
            cli.command,
            Command::WaitRefresh { table: Some(t), refresh_id: 7 } if t.table() == "predictions"
        ));
    }

    #[test]
    fn rejects_malformed_table_names() {
        let err = Cli::try_parse_from(["lakewatch", "delete", "--table", "predictions"]);
        assert!(err.is_err());
    }

    #[test]
    fn init_config_prints_loadable_config() {
        let table: TableName = "main.retail.predictions".parse().unwrap();
        print_example_config(&table, "Critical").unwrap();
        assert!(print_example_config(&table, "not a column").is_err());
    }

    #[tokio::test]
    async fn dry_run_refresh_needs_a_table() {
        let cli = Cli::try_parse_from(["lakewatch", "refresh", "--dry-run"]).unwrap();
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("--table"));
    }

    #[tokio::test]
    async fn dry_run_seeds_the_table_given_on_the_command_line() {
        let cli = Cli::try_parse_from([
            "lakewatch",
            "--dry-run",
            "wait-monitor",
            "--table",
            "main.retail.other",
        ])
        .unwrap();
        let ctx = connect(&cli, None).await.unwrap();
        let other: TableName = "main.retail.other".parse().unwrap();
        assert!(ctx.client.get_monitor(&other).await.is_ok());

        run(cli).await.unwrap();
    }

    #[tokio::test]
    async fn dry_run_table_flag_overrides_config_table() {
        let cli = Cli::try_parse_from([
            "lakewatch",
            "--dry-run",
            "refresh",
            "--table",
            "main.retail.other",
        ])
        .unwrap();
        let configured: TableName = "main.retail.predictions".parse().unwrap();
        let config = example_config(&configured, "Critical").unwrap();
        let ctx = connect(&cli, Some(config)).await.unwrap();

        let other: TableName = "main.retail.other".parse().unwrap();
        assert!(ctx.client.get_monitor(&other).await.is_ok());
        assert!(ctx.client.get_monitor(&configured).await.is_err());
    }

    #[tokio::test]
    async fn live_mode_needs_credentials() {
        let cli = Cli {
            config: None,
            host: None,
            token: None,
            dry_run: false,
            command: Command::Delete {
                table: Some("main.retail.predictions".parse().unwrap()),
            },
        };
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("--host"));
    }
}
