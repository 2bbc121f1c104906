//! One-off batch import: summarize every pending URL in the migration
//! spreadsheet and record the result per row.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Confirm;
use tracing::{info, warn};

use ai_client::Gemini;
use airtable_client::AirtableClient;
use google_client::{scopes, ServiceAccountAuth, Sheets};
use linkbrief_common::Config;
use telegram_client::TelegramClient;

use linkbrief_bot::logging::init_tracing;
use linkbrief_bot::migration::{GoogleSheetSource, Migration, MigrationOptions, MigrationReport};
use linkbrief_bot::narration::GoogleNarrator;
use linkbrief_bot::notify::TelegramNotifier;
use linkbrief_bot::pipeline::{Enricher, Pipeline};
use linkbrief_bot::reconcile::{WritePolicy, Workflow};
use linkbrief_bot::scraper::HttpScraper;
use linkbrief_bot::store::AirtableStore;
use linkbrief_bot::summarizer::GeminiSummarizer;

const PREVIEW_ROWS: usize = 5;

#[derive(Parser)]
#[command(name = "linkbrief-migrate")]
#[command(about = "Import URLs from the migration spreadsheet")]
#[command(version)]
struct Cli {
    /// Process at most this many rows
    #[arg(short, long)]
    limit: Option<usize>,

    /// Skip narration even when it is configured
    #[arg(long)]
    no_tts: bool,

    /// List what would be processed without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Seconds to wait between rows (defaults to PROCESS_DELAY_SECS)
    #[arg(long)]
    delay: Option<u64>,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let config = Config::migration_from_env()?;
    config.log_redacted();

    let credentials = config
        .google_credentials
        .as_deref()
        .context("GOOGLE_APPLICATION_CREDENTIALS is required to read the spreadsheet")?;
    let auth = Arc::new(ServiceAccountAuth::from_file(
        credentials,
        &[scopes::SPREADSHEETS, scopes::CLOUD_PLATFORM, scopes::DRIVE_FILE],
    )?);

    let store = Arc::new(AirtableStore::new(AirtableClient::new(
        &config.airtable_api_key,
        &config.airtable_base_id,
        &config.airtable_table_name,
    )?));

    let gemini = Gemini::new(config.gemini_api_key.clone(), config.gemini_model.clone());
    let mut enricher = Enricher::new(
        Arc::new(HttpScraper::new()?),
        Arc::new(GeminiSummarizer::new(Arc::new(gemini))),
    );
    if config.tts_enabled && !cli.no_tts {
        enricher = enricher.with_narrator(Arc::new(GoogleNarrator::new(
            auth.clone(),
            &config.tts_voice,
            &config.drive_folder_id,
        )));
    }
    let narrates = enricher.narrates();

    let mut pipeline = Pipeline::new(Workflow::new(store.clone()), enricher);
    if let Some((token, chat_id)) = config.telegram() {
        pipeline = pipeline.with_notifier(Arc::new(TelegramNotifier::new(
            TelegramClient::new(token)?,
            chat_id,
        )));
    }

    let source = GoogleSheetSource::new(
        Sheets::new(auth),
        &config.migration_sheet_id,
        &config.migration_sheet_name,
    );
    let migration = Migration::new(
        Arc::new(source),
        store,
        Arc::new(pipeline),
        WritePolicy {
            check_duplicates: config.check_duplicates,
            update_if_duplicate: config.update_if_duplicate,
        },
    );

    let options = MigrationOptions {
        limit: cli.limit,
        dry_run: cli.dry_run,
        delay: cli.delay.map(Duration::from_secs).unwrap_or(config.process_delay),
    };

    let plan = migration.prepare(options.limit).await?;
    println!("Sheet: {} / {}", config.migration_sheet_id, config.migration_sheet_name);
    println!("Mode: {}", if options.dry_run { "dry run" } else { "live" });
    println!("Narration: {}", if narrates { "on" } else { "off" });
    println!(
        "Pending: {}  Duplicates: {}  Already handled: {}  Invalid: {}",
        plan.pending.len(),
        plan.duplicates.len(),
        plan.already_handled,
        plan.invalid
    );
    for row in plan.pending.iter().take(PREVIEW_ROWS) {
        println!("  row {}: {}", row.row, row.url);
    }
    if plan.pending.len() > PREVIEW_ROWS {
        println!("  ... and {} more", plan.pending.len() - PREVIEW_ROWS);
    }

    if plan.pending.is_empty() && plan.duplicates.is_empty() {
        println!("Nothing to migrate.");
        return Ok(());
    }

    if !options.dry_run {
        let estimate = options.estimated_delay(plan.pending.len());
        println!("Estimated time (delays only): {} min", estimate.as_secs().div_ceil(60));
        if !cli.yes && !Confirm::new().with_prompt("Continue?").default(false).interact()? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let report = migration
        .run(&plan, &options, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    print_report(&report);
    info!("Migration done");
    Ok(())
}

fn print_report(report: &MigrationReport) {
    println!();
    if report.interrupted {
        println!("Interrupted.");
    }
    if report.would_process > 0 {
        println!("Would process: {}", report.would_process);
    }
    println!("Succeeded:  {}", report.succeeded);
    println!("Failed:     {}", report.failed);
    println!("Duplicates: {}", report.duplicates);
    println!("Processed:  {}", report.processed());
    println!("Elapsed:    {:.1} min", report.elapsed.as_secs_f64() / 60.0);
}
