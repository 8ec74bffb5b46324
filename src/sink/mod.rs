//! Line-delimited JSON export: one record per line, so downstream indexers
//! can upsert by `listing_id` without parsing the whole file.

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::ListingRecord;

pub async fn write_jsonl(path: &Path, records: &[ListingRecord]) -> Result<()> {
    let mut out = String::new();
    for record in records {
        let line = serde_json::to_string(record)
            .with_context(|| format!("Failed to serialize record for {}", record.url))?;
        out.push_str(&line);
        out.push('\n');
    }
    tokio::fs::write(path, out)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ListingRecord;

    #[tokio::test]
    async fn writes_one_line_per_record() {
        let dir = std::env::temp_dir().join("piso-scout-sink-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("listings.jsonl");

        let mut a = ListingRecord::new("https://www.pisos.com/inmueble/a-111111/".into());
        a.price_eur = Some(900);
        let mut b = ListingRecord::new("https://www.pisos.com/inmueble/b-222222/".into());
        b.listing_id = Some("222222".into());

        write_jsonl(&path, &[a, b]).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: ListingRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.listing_id.as_deref(), Some("222222"));
    }
}
