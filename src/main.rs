use anyhow::Context;
use std::path::Path;
use tracing::{info, Level};
use url::Url;

use piso_scout::crawler::{Crawler, HttpFetcher};
use piso_scout::sink;

const DEFAULT_START_URL: &str = "https://www.pisos.com/alquiler/pisos-a_coruna_capital";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("🏠 Piso Scout - pisos.com rental crawler");
    info!("========================================");

    let start = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_START_URL.to_string());
    let start = Url::parse(&start).context("Invalid start URL")?;

    info!("Starting crawl from {start}");

    let fetcher = HttpFetcher::new()?;
    let crawler = Crawler::new(fetcher);
    let records = crawler.run(start).await?;

    info!("\n✅ Extracted {} listings\n", records.len());

    for (i, record) in records.iter().enumerate() {
        let title = record.title.as_deref().unwrap_or("(sin título)");
        let price = record
            .price_eur
            .map(|p| format!("{p} €"))
            .unwrap_or_else(|| "precio desconocido".to_string());
        println!("{}. {} ({})", i + 1, title, price);
        if let Some(neighborhood) = &record.neighborhood {
            println!("   Zona: {neighborhood}");
        }
        if let Some(id) = &record.listing_id {
            println!("   ID: {id}");
        }
        println!("   URL: {}", record.url);
        println!();
    }

    sink::write_jsonl(Path::new("listings.jsonl"), &records).await?;
    info!("💾 Saved {} records to listings.jsonl", records.len());

    Ok(())
}
