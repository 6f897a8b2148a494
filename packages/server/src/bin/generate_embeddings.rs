use anyhow::{bail, Context, Result};
use aria_core::config::Config;
use aria_core::domains::interactions::Interaction;
use aria_core::kernel::ai::OpenAIEmbeddingClient;
use aria_core::kernel::BaseEmbeddingService;
use sqlx::PgPool;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const BATCH_SIZE: i64 = 50;
const PAUSE_BETWEEN_CALLS: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,aria_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    // Load config
    let config = Config::from_env()?;

    let Some(openai_api_key) = config.openai_api_key else {
        bail!("OPENAI_API_KEY must be set to generate embeddings");
    };

    // Connect to database
    let pool = PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    println!("Connected to database");

    let embedding_client = OpenAIEmbeddingClient::new(openai_api_key);

    println!("\nStarting embedding backfill...\n");

    let mut updated = 0;
    let mut failed = 0;
    loop {
        let interactions = Interaction::find_without_embeddings(BATCH_SIZE, &pool)
            .await
            .context("Failed to find interactions without embeddings")?;
        if interactions.is_empty() {
            break;
        }

        println!("Found {} interactions without embeddings", interactions.len());

        let batch_len = interactions.len();
        let mut batch_updated = 0;
        for interaction in interactions {
            match embedding_client.generate(&interaction.embedding_text()).await {
                Ok(embedding) => {
                    if let Err(e) = Interaction::update_embedding(
                        interaction.id,
                        pgvector::Vector::from(embedding),
                        &pool,
                    )
                    .await
                    {
                        eprintln!(
                            "Failed to store embedding for interaction {}: {}",
                            interaction.id, e
                        );
                        failed += 1;
                    } else {
                        updated += 1;
                        batch_updated += 1;
                        println!("  Updated embedding for interaction {}", interaction.id);
                    }
                }
                Err(e) => {
                    eprintln!(
                        "Failed to generate embedding for interaction {}: {}",
                        interaction.id, e
                    );
                    failed += 1;
                }
            }
            tokio::time::sleep(PAUSE_BETWEEN_CALLS).await;
        }

        // Failed rows come back in the next query; stop instead of
        // spinning on them forever.
        if batch_updated == 0 || (batch_len as i64) < BATCH_SIZE {
            break;
        }
    }

    println!("\nEmbedding backfill complete!");
    println!("  Interactions: {updated} updated, {failed} failed");

    Ok(())
}
