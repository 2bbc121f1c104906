use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use ai_client::Gemini;
use airtable_client::AirtableClient;
use discord_client::DiscordClient;
use google_client::{scopes, ServiceAccountAuth};
use linkbrief_common::Config;
use telegram_client::TelegramClient;

use linkbrief_bot::listener::{ChatListener, ListenerPolicy};
use linkbrief_bot::logging::init_tracing;
use linkbrief_bot::narration::GoogleNarrator;
use linkbrief_bot::notify::TelegramNotifier;
use linkbrief_bot::pipeline::{Enricher, Pipeline};
use linkbrief_bot::reconcile::{WritePolicy, Workflow};
use linkbrief_bot::scraper::HttpScraper;
use linkbrief_bot::store::AirtableStore;
use linkbrief_bot::summarizer::GeminiSummarizer;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    info!("linkbrief starting...");

    let config = Config::bot_from_env()?;
    config.log_redacted();

    let airtable = AirtableClient::new(
        &config.airtable_api_key,
        &config.airtable_base_id,
        &config.airtable_table_name,
    )?;
    let store = Arc::new(AirtableStore::new(airtable));

    let gemini = Gemini::new(config.gemini_api_key.clone(), config.gemini_model.clone());
    let summarizer = GeminiSummarizer::new(Arc::new(gemini));
    let mut enricher = Enricher::new(Arc::new(HttpScraper::new()?), Arc::new(summarizer));

    if config.tts_enabled {
        match narrator(&config) {
            Ok(narrator) => enricher = enricher.with_narrator(Arc::new(narrator)),
            Err(e) => warn!(error = %e, "Narration disabled: credentials could not be loaded"),
        }
    }

    let mut pipeline = Pipeline::new(Workflow::new(store), enricher);
    if let Some((token, chat_id)) = config.telegram() {
        pipeline = pipeline.with_notifier(Arc::new(TelegramNotifier::new(
            TelegramClient::new(token)?,
            chat_id,
        )));
    } else {
        info!("Telegram not configured, notifications go to the chat channel only");
    }

    let policy = ListenerPolicy {
        duplicate_mode: config.duplicate_mode,
        write: WritePolicy {
            check_duplicates: config.check_duplicates,
            update_if_duplicate: config.update_if_duplicate,
        },
        prompt_timeout: config.duplicate_prompt_timeout,
    };

    let discord = Arc::new(DiscordClient::new(&config.discord_token)?);
    let listener = ChatListener::new(discord, &config.discord_channel_id, Arc::new(pipeline), policy)
        .with_poll_interval(config.poll_interval)
        .with_max_concurrent(config.max_concurrent_messages);

    listener
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("linkbrief stopped");
    Ok(())
}

fn narrator(config: &Config) -> Result<GoogleNarrator> {
    let path = config
        .google_credentials
        .as_deref()
        .context("GOOGLE_APPLICATION_CREDENTIALS is not set")?;
    let auth = ServiceAccountAuth::from_file(path, &[scopes::CLOUD_PLATFORM, scopes::DRIVE_FILE])?;
    info!(account = auth.client_email(), voice = %config.tts_voice, "Narration enabled");
    Ok(GoogleNarrator::new(
        Arc::new(auth),
        &config.tts_voice,
        &config.drive_folder_id,
    ))
}
