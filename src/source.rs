//! Producers of observation sequences.
//!
//! [`ObservationSource`] is the seam between the engine and wherever the
//! passenger counts come from: a local CSV export, an HTTP endpoint, or the
//! synthetic [`SampleGenerator`].

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::model::Observation;
use crate::parser::parse_observations;
use crate::sample::SampleGenerator;

#[async_trait]
pub trait ObservationSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Observation>>;

    /// Short human-readable label for logs.
    fn describe(&self) -> String;
}

/// CSV file on disk, optionally gzip-compressed.
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ObservationSource for CsvFileSource {
    async fn load(&self) -> Result<Vec<Observation>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("reading {}", self.path.display()))?;
        parse_observations(&bytes)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// CSV served over HTTP(S).
pub struct HttpSource<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> HttpSource<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> ObservationSource for HttpSource<C> {
    async fn load(&self) -> Result<Vec<Observation>> {
        let bytes = fetch_bytes(&self.client, &self.url)
            .await
            .with_context(|| format!("fetching {}", self.url))?;
        parse_observations(&bytes)
    }

    fn describe(&self) -> String {
        format!("url {}", self.url)
    }
}

/// Generated demo data.
pub struct SampleSource(pub SampleGenerator);

#[async_trait]
impl ObservationSource for SampleSource {
    async fn load(&self) -> Result<Vec<Observation>> {
        self.0.generate()
    }

    fn describe(&self) -> String {
        format!("sample data for {}-{:02}", self.0.year, self.0.month)
    }
}

/// Picks a source from a CLI argument: `sample`, an `http(s)://` URL, or a path.
pub fn source_for(arg: &str) -> Result<Box<dyn ObservationSource>> {
    let source: Box<dyn ObservationSource> = if arg == "sample" {
        Box::new(SampleSource(SampleGenerator::default()))
    } else if arg.starts_with("http://") || arg.starts_with("https://") {
        Box::new(HttpSource::new(BasicClient::new()?, arg))
    } else {
        Box::new(CsvFileSource::new(arg))
    };
    info!(source = %source.describe(), "Observation source selected");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[tokio::test]
    async fn test_csv_file_source_loads_rows() {
        let path = env::temp_dir().join("shuttle_planner_source_test.csv");
        fs::write(
            &path,
            "date,time_block,pickup_location,passenger_count,day_of_week\n\
             2024-01-01,07:00,Hilton Anchorage,4,Monday\n",
        )
        .unwrap();

        let rows = CsvFileSource::new(&path).load().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].passenger_count, 4);

        fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let path = env::temp_dir().join("shuttle_planner_does_not_exist.csv");
        let _ = fs::remove_file(&path);
        assert!(CsvFileSource::new(&path).load().await.is_err());
    }

    #[tokio::test]
    async fn test_sample_source_uses_generator() {
        let source = SampleSource(SampleGenerator::default().with_seed(5));
        let rows = source.load().await.unwrap();
        assert_eq!(rows.len(), 30 * 48 * 3);
        assert_eq!(source.describe(), "sample data for 2024-01");
    }

    #[test]
    fn test_source_for_dispatch() {
        assert_eq!(
            source_for("sample").unwrap().describe(),
            "sample data for 2024-01"
        );
        assert_eq!(
            source_for("data/pickups.csv").unwrap().describe(),
            "file data/pickups.csv"
        );
        assert_eq!(
            source_for("https://example.com/pickups.csv")
                .unwrap()
                .describe(),
            "url https://example.com/pickups.csv"
        );
    }
}
