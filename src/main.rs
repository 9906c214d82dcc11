use std::process::ExitCode;

use hopsworks_sdk::config::{config_schema, load_config};
use hopsworks_sdk::connection::Connection;
use hopsworks_sdk::utils::logger::init_logging;
use tracing::error;

const DEFAULT_CONFIG: &str = "./config.yaml";
const USAGE: &str = "usage: hopsworks-sdk <schema | opensearch-config [config.yaml]>";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("schema") => match config_schema() {
            Ok(schema) => {
                println!("{}", schema);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error rendering schema: {}", e);
                ExitCode::FAILURE
            }
        },
        Some("opensearch-config") => {
            let path = args.get(1).map(String::as_str).unwrap_or(DEFAULT_CONFIG);
            print_opensearch_config(path).await
        }
        _ => {
            eprintln!("{}", USAGE);
            ExitCode::FAILURE
        }
    }
}

async fn print_opensearch_config(path: &str) -> ExitCode {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    let connection = match Connection::connect(&config) {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let project = match connection.get_project(None).await {
        Ok(project) => project,
        Err(e) => {
            error!("Failed to resolve project: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match project.get_opensearch_api().get_default_config().await {
        Ok(opensearch) => match serde_json::to_string_pretty(&opensearch) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to serialize OpenSearch config: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!("Failed to build OpenSearch config: {}", e);
            ExitCode::FAILURE
        }
    }
}
