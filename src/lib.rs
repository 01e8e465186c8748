//! GCP resource inventory
//!
//! Lists the resources of one or more GCP projects, flattens them into
//! sheets, writes an `.xlsx` workbook and uploads it to Cloud Storage.

pub mod cli;
pub mod config;
pub mod error;
pub mod gcp;
pub mod inventory;
pub mod output;
pub mod resource;

use config::InventoryConfig;
use gcp::auth::GcpCredentials;
use gcp::client::GcpClient;
use inventory::{InventoryPipeline, InventoryRun, RunOptions};
use output::{object_name_for, GcsUploader, XlsxWorkbookWriter};
use resource::GcpFetcher;

/// Run a complete inventory against the live APIs
pub async fn execute(config: &InventoryConfig) -> InventoryRun {
    let credentials = match GcpCredentials::new(&config.credentials).await {
        Ok(credentials) => credentials,
        Err(e) => return failed_run(config, e),
    };

    let client = match GcpClient::new(credentials, config.endpoints.clone()) {
        Ok(client) => client,
        Err(e) => return failed_run(config, format!("{:#}", e)),
    };

    let fetcher = GcpFetcher::new(client.clone(), config.fetch);
    let uploader = GcsUploader::new(client);
    let writer = XlsxWorkbookWriter;

    let options = RunOptions {
        mode: config.mode,
        concurrency: config.concurrency,
        expand_nested: config.expand_nested,
        output: config.output.clone(),
        bucket: config.bucket.clone(),
        object_name: object_name_for(&config.output),
    };

    InventoryPipeline::new(&fetcher, &writer, &uploader, options)
        .run(config.projects.clone())
        .await
}

fn failed_run(config: &InventoryConfig, error: impl std::fmt::Display) -> InventoryRun {
    let mut run = InventoryRun::new(config.projects.clone(), config.mode);
    run.fail(error);
    run
}
