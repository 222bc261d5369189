/*
    spotify-liked-snapshot | Rust CLI tool to snapshot Liked Songs into datasets.
    Copyright (C) 2025  Israel Alberto Roldan Vega

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::auth::{get_request_capability, AuthError, SpotifySession};
use crate::config::{AuthMode, ConfigError, SnapshotConfig, SpotifyCredentials};
use crate::fetch::{FetchError, PaginatedFetcher, SavedTracksSource};
use crate::models::{ConnectionReport, LikedTracksTable};
use crate::normalize::{normalize, ARTIST_DELIMITER};
use crate::store::{self, SnapshotFormat, StoreError};
use log::info;
use std::path::PathBuf;
use thiserror::Error;

const CHECK_SAMPLE_SIZE: usize = 5;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Invalid snapshot configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Fetching Liked Songs failed: {0}")]
    Fetch(#[from] FetchError),
    /// The snapshot was built but could not be written. The table is kept so the
    /// caller can retry just the save.
    #[error("Saving snapshot failed: {source}")]
    Store {
        source: StoreError,
        table: Box<LikedTracksTable>,
    },
}

impl SnapshotError {
    /// True when the run stopped before any request was sent.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SnapshotError::Config(_) | SnapshotError::Auth(AuthError::Config(_))
        )
    }

    /// Recovers the assembled table from a failed save.
    pub fn into_table(self) -> Option<LikedTracksTable> {
        match self {
            SnapshotError::Store { table, .. } => Some(*table),
            _ => None,
        }
    }
}

/// Outcome of one snapshot run.
#[derive(Debug)]
pub struct SnapshotRun {
    pub table: LikedTracksTable,
    /// Raw entries returned by the remote, before dropping unusable ones.
    pub fetched: usize,
    pub saved: Option<(PathBuf, SnapshotFormat)>,
}

/// Drives fetch, normalization and the optional save for one library.
pub struct SnapshotAssembler<S: SavedTracksSource> {
    source: S,
    fetcher: PaginatedFetcher,
}

impl<S: SavedTracksSource> SnapshotAssembler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            fetcher: PaginatedFetcher::default(),
        }
    }

    pub fn with_fetcher(mut self, fetcher: PaginatedFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Fetches, flattens and, if `config.save_path` is set, persists a snapshot.
    pub async fn run(&self, config: &SnapshotConfig) -> Result<SnapshotRun, SnapshotError> {
        config.validate()?;

        let entries = self
            .fetcher
            .fetch(&self.source, config.max_tracks, &config.market)
            .await?;
        let fetched = entries.len();
        let table = normalize(&entries);
        info!(
            "Snapshot {}: {} rows from {} liked entries",
            table.snapshot_utc(),
            table.len(),
            fetched
        );

        let saved = match &config.save_path {
            Some(path) => match store::save(&table, path) {
                Ok(format) => Some((path.clone(), format)),
                Err(source) => {
                    return Err(SnapshotError::Store {
                        source,
                        table: Box::new(table),
                    })
                }
            },
            None => None,
        };

        Ok(SnapshotRun {
            table,
            fetched,
            saved,
        })
    }
}

impl SnapshotAssembler<SpotifySession> {
    /// Confirms the session works: whose account it is, plus the first few liked tracks.
    pub async fn check_connection(&self, market: &str) -> Result<ConnectionReport, SnapshotError> {
        let profile = self.source.current_profile().await?;
        let entries = PaginatedFetcher::with_page_size(CHECK_SAMPLE_SIZE as u32)
            .fetch(&self.source, CHECK_SAMPLE_SIZE, market)
            .await?;

        let sample = normalize(&entries)
            .into_rows()
            .into_iter()
            .map(|row| {
                let artists = row
                    .artist_names
                    .split(ARTIST_DELIMITER)
                    .collect::<Vec<&str>>()
                    .join(", ");
                format!("{} - {}", row.track_name.unwrap_or_default(), artists)
            })
            .collect();

        Ok(ConnectionReport {
            display_name: profile.display_name,
            country: profile.country,
            sample,
        })
    }
}

/// Authenticates, then runs one snapshot.
///
/// The config is validated first, so a bad cap or market never opens a browser.
pub async fn pull_liked_snapshot(
    creds: &SpotifyCredentials,
    mode: AuthMode,
    config: &SnapshotConfig,
) -> Result<SnapshotRun, SnapshotError> {
    config.validate()?;
    let session = get_request_capability(creds, mode).await?;
    SnapshotAssembler::new(session).run(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::tests::{entry, FakeLibrary};
    use crate::models::{RawLikedEntry, RawTrack};
    use crate::store::read_csv;

    fn config(max_tracks: usize, save_path: Option<PathBuf>) -> SnapshotConfig {
        SnapshotConfig {
            max_tracks,
            market: "US".to_string(),
            save_path,
        }
    }

    #[tokio::test]
    async fn test_run_without_save_returns_table() {
        let assembler = SnapshotAssembler::new(FakeLibrary::with_tracks(107));
        let run = assembler.run(&config(200, None)).await.unwrap();

        assert_eq!(run.fetched, 107);
        assert_eq!(run.table.len(), 107);
        assert!(run.saved.is_none());
        assert_eq!(run.table.rows()[0].track_id, "t0");
        assert_eq!(run.table.rows()[106].track_id, "t106");
    }

    #[tokio::test]
    async fn test_dropped_entries_do_not_count_as_rows() {
        let entries = vec![
            entry("keep-1"),
            RawLikedEntry {
                added_at: Some("2024-01-01T00:00:00Z".to_string()),
                track: None,
            },
            RawLikedEntry {
                added_at: None,
                track: Some(RawTrack::default()),
            },
            entry("keep-2"),
        ];
        let assembler = SnapshotAssembler::new(FakeLibrary::with_entries(entries));
        let run = assembler.run(&config(10, None)).await.unwrap();

        assert_eq!(run.fetched, 4);
        let ids: Vec<&str> = run.table.rows().iter().map(|r| r.track_id.as_str()).collect();
        assert_eq!(ids, vec!["keep-1", "keep-2"]);
    }

    #[tokio::test]
    async fn test_run_saves_csv_that_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/raw/liked_songs.csv");
        let assembler = SnapshotAssembler::new(FakeLibrary::with_tracks(12));

        let run = assembler
            .run(&config(10, Some(path.clone())))
            .await
            .unwrap();

        assert_eq!(run.saved, Some((path.clone(), SnapshotFormat::Csv)));
        assert_eq!(read_csv(&path).unwrap(), run.table);
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_fetching() {
        let library = FakeLibrary::with_tracks(5);
        let assembler = SnapshotAssembler::new(library);

        let err = assembler.run(&config(0, None)).await.unwrap_err();

        assert!(matches!(err, SnapshotError::Config(ConfigError::ZeroMaxTracks)));
        assert!(err.is_configuration());
        assert_eq!(assembler.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_save_failure_keeps_table() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let assembler = SnapshotAssembler::new(FakeLibrary::with_tracks(3));

        let err = assembler
            .run(&config(10, Some(blocker.join("liked.parquet"))))
            .await
            .unwrap_err();

        assert!(!err.is_configuration());
        let table = err.into_table().unwrap();
        assert_eq!(table.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_failure_produces_no_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("liked.csv");
        let mut library = FakeLibrary::with_tracks(80);
        library.fail_at_call = Some(1);
        let assembler = SnapshotAssembler::new(library);

        let err = assembler
            .run(&config(80, Some(path.clone())))
            .await
            .unwrap_err();

        assert!(matches!(err, SnapshotError::Fetch(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_pull_with_missing_credentials_is_configuration_error() {
        let creds = SpotifyCredentials {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: String::new(),
            cache_path: PathBuf::from(".spotify_token_cache.json"),
        };

        let err = pull_liked_snapshot(&creds, AuthMode::Interactive, &SnapshotConfig::default())
            .await
            .unwrap_err();

        assert!(err.is_configuration());
    }
}
