mod alexa;
mod args;
mod attributes;
mod config;
mod db;
mod dispatcher;
mod domain;
mod error;
mod handlers;
mod logging;
mod provisioning;
mod sheets;
mod slots;

use std::sync::Arc;

use args::parse_args;
use axum::{Router, routing::get};
use config::{DATA_RANGE, HEADER_RANGE, SkillConfig};
use db::{PgAttributeStore, create_attributes_table, create_pool};
use dispatcher::Dispatcher;
use handlers::{health, skill_request};
use logging::setup_logging;
use provisioning::{ReceiptProvisioner, SpreadsheetSource};
use sheets::SheetsClient;

pub struct AppState {
    dispatcher: Dispatcher,
    skill_id: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = parse_args();

    setup_logging(&args.base_log_dir);

    let source = match (args.spreadsheet_id, args.database_url) {
        (Some(spreadsheet_id), _) => {
            tracing::info!("Writing all receipts to spreadsheet_id={}", &spreadsheet_id);
            SpreadsheetSource::Fixed(spreadsheet_id)
        }
        (None, Some(database_url)) => {
            let pool = create_pool(&database_url)
                .await
                .expect("Failed to create PostgreSQL pool");
            if args.auto_create_table {
                create_attributes_table(&pool)
                    .await
                    .expect("Failed to create the skill_attributes table");
            }
            SpreadsheetSource::PerUser(Arc::new(PgAttributeStore::new(pool)))
        }
        (None, None) => {
            tracing::error!("Either --spreadsheet-id or --database-url must be provided");
            std::process::exit(2);
        }
    };

    let gateway = SheetsClient::new(&args.sheets_api_url, DATA_RANGE, HEADER_RANGE)
        .expect("Invalid Sheets API URL");

    let mut config = SkillConfig::new(args.skill_name);
    config.keep_session_on_error = args.keep_session_on_error;

    let provisioner =
        ReceiptProvisioner::new(Arc::new(gateway), source, config.spreadsheet_title.clone());

    let app_state = Arc::new(AppState {
        dispatcher: Dispatcher::new(config, provisioner),
        skill_id: args.skill_id,
    });

    let app = Router::new()
        .route("/", get(health).post(skill_request))
        .with_state(app_state);

    let bind_address = format! {"0.0.0.0:{}", args.port};
    tracing::info!("Server listening on {}...", bind_address);

    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
