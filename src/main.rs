use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use warehouse_fulfillment::{
    config::{self, AppConfig},
    db::{self, DbPool},
    errors::ServiceError,
    events::{self, EventSender},
    models::{RequestContext, Workflow},
    repositories::DocumentStore,
    services::{
        collection::ScanRequest, erp::StaticErpCatalog, generation::GenerateOrderRequest,
        locks::HeaderLocks, reconciliation::QuantityPolicy, AppServices, WorkflowServices,
    },
    OperationResponse,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    if let Commands::InitSchema = cli.command {
        db::create_schema(&context.db)
            .await
            .context("failed to create schema")?;
        println!("Schema ready");
        return Ok(());
    }

    let ctx = RequestContext::new(
        cli.user_id,
        cli.branch
            .clone()
            .unwrap_or_else(|| context.config.default_branch_code.clone()),
    );

    let result = match cli.workflow {
        Workflow::Production => run(&context.services.production, cli.command, &ctx).await,
        Workflow::Shipping => run(&context.services.shipping, cli.command, &ctx).await,
        Workflow::Subcontracting => {
            run(&context.services.subcontracting, cli.command, &ctx).await
        }
    };

    let response = OperationResponse::from_result(result);
    print_json(&response)?;
    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "fulfillment",
    about = "Order fulfillment reconciliation for PR/SH/SIT workflows",
    version
)]
struct Cli {
    #[arg(long, global = true, default_value = "pr", help = "Workflow: pr, sh or sit")]
    workflow: Workflow,
    #[arg(long, global = true, default_value_t = 1, help = "Acting user id")]
    user_id: i64,
    #[arg(long, global = true, help = "Branch code; defaults to the configured branch")]
    branch: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tables of every workflow
    InitSchema,
    SetPolicy(PolicyArgs),
    /// Generate an order hierarchy from a JSON file
    Generate {
        file: PathBuf,
    },
    Scan(ScanArgs),
    Complete(HeaderArgs),
    Approve(HeaderArgs),
    Reject(HeaderArgs),
    DeleteRoute(IdArgs),
    DeleteLineSerial(IdArgs),
    DeleteImportLine(IdArgs),
    Summary(HeaderArgs),
    Detail(HeaderArgs),
    /// Open orders assigned to the acting user
    Assigned,
    /// Completed orders of the branch waiting for approval
    PendingApprovals,
}

#[derive(Args)]
struct PolicyArgs {
    #[arg(long, action = ArgAction::SetTrue)]
    allow_less: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    allow_more: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    require_all: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    require_approval: bool,
}

#[derive(Args)]
struct ScanArgs {
    #[arg(long)]
    header_id: i64,
    #[arg(long)]
    barcode: String,
    #[arg(long)]
    stock: String,
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    quantity: Decimal,
    #[arg(long, num_args = 1..=4, help = "Up to four serial numbers")]
    serial: Vec<String>,
    #[arg(long)]
    source_cell: Option<String>,
    #[arg(long)]
    target_cell: Option<String>,
}

impl From<ScanArgs> for ScanRequest {
    fn from(args: ScanArgs) -> Self {
        let mut serials = args.serial.into_iter();
        ScanRequest {
            header_id: args.header_id,
            scanned_barcode: args.barcode,
            stock_code: args.stock,
            configuration_code: args.config,
            quantity: args.quantity,
            serial_no: serials.next(),
            serial_no2: serials.next(),
            serial_no3: serials.next(),
            serial_no4: serials.next(),
            source_cell_code: args.source_cell,
            target_cell_code: args.target_cell,
            ..Default::default()
        }
    }
}

#[derive(Args)]
struct HeaderArgs {
    header_id: i64,
}

#[derive(Args)]
struct IdArgs {
    id: i64,
}

async fn run<S: DocumentStore>(
    services: &WorkflowServices<S>,
    command: Commands,
    ctx: &RequestContext,
) -> Result<Value, ServiceError> {
    match command {
        Commands::InitSchema => Ok(Value::Null),
        Commands::SetPolicy(args) => to_value(
            services
                .completion
                .set_policy(QuantityPolicy {
                    allow_less: args.allow_less,
                    allow_more: args.allow_more,
                    require_all_collected: args.require_all,
                    require_approval: args.require_approval,
                })
                .await?,
        ),
        Commands::Generate { file } => {
            let request = read_order_request(&file)?;
            to_value(services.generation.generate(request, ctx).await?)
        }
        Commands::Scan(args) => to_value(services.collection.scan(args.into(), ctx).await?),
        Commands::Complete(args) => {
            to_value(services.completion.complete(args.header_id, ctx).await?)
        }
        Commands::Approve(args) => {
            to_value(services.approval.approve(args.header_id, true, ctx).await?)
        }
        Commands::Reject(args) => {
            to_value(services.approval.approve(args.header_id, false, ctx).await?)
        }
        Commands::DeleteRoute(args) => {
            to_value(services.lifecycle.delete_route(args.id, ctx).await?)
        }
        Commands::DeleteLineSerial(args) => {
            to_value(services.lifecycle.delete_line_serial(args.id, ctx).await?)
        }
        Commands::DeleteImportLine(args) => {
            to_value(services.lifecycle.delete_import_line(args.id, ctx).await?)
        }
        Commands::Summary(args) => {
            to_value(services.completion.collection_summary(args.header_id).await?)
        }
        Commands::Detail(args) => to_value(services.queries.order_detail(args.header_id).await?),
        Commands::Assigned => to_value(services.queries.assigned_orders(ctx).await?),
        Commands::PendingApprovals => to_value(services.approval.pending_approvals(ctx).await?),
    }
}

/// An unreadable or malformed request file is the caller's mistake, not a server failure.
fn read_order_request(file: &Path) -> Result<GenerateOrderRequest, ServiceError> {
    let raw = fs::read_to_string(file).map_err(|e| {
        ServiceError::ValidationError(format!("Cannot read {}: {}", file.display(), e))
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| ServiceError::ValidationError(format!("Malformed request: {}", e)))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ServiceError> {
    serde_json::to_value(value)
        .map_err(|e| ServiceError::InternalError(format!("Failed to serialize result: {}", e)))
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
    services: AppServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        if config.auto_create_schema {
            db::create_schema(&db_pool)
                .await
                .context("failed to create schema")?;
        }
        let db = Arc::new(db_pool);

        let (event_sender, event_rx) = EventSender::channel(config.event_channel_capacity);
        tokio::spawn(events::process_events(event_rx));

        let locks = Arc::new(HeaderLocks::new(config.serialize_scans_per_header));
        let services = AppServices::new(
            db.clone(),
            Arc::new(StaticErpCatalog::new()),
            Arc::new(event_sender),
            locks,
        );
        info!(environment = %config.environment, "Fulfillment CLI ready");

        Ok(Self {
            config,
            db,
            services,
        })
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_request_file_is_a_client_error() {
        let dir = TempDir::new().unwrap();
        let err = read_order_request(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        assert_eq!(err.status_code().as_u16(), 400);
    }

    #[test]
    fn malformed_request_file_is_a_client_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("order.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(
            read_order_request(&path).unwrap_err().status_code().as_u16(),
            400
        );
    }

    #[test]
    fn request_file_is_parsed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("order.json");
        fs::write(&path, r#"{ "headers": [ { "key": "H1" } ] }"#).unwrap();
        let request = read_order_request(&path).unwrap();
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.headers[0].key.as_deref(), Some("H1"));
    }
}
