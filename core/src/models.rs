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

use serde::{Deserialize, Serialize};

/// One item of the `me/tracks` page as Spotify returns it.
///
/// Every field is optional: a liked entry can point at a track that was pulled
/// from the catalog, and such entries must decode instead of failing the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLikedEntry {
    pub added_at: Option<String>,
    pub track: Option<RawTrack>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTrack {
    pub id: Option<String>,
    pub name: Option<String>,
    pub explicit: Option<bool>,
    pub popularity: Option<u32>,
    pub duration_ms: Option<u64>,
    pub artists: Option<Vec<RawArtist>>,
    pub album: Option<RawAlbum>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawArtist {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAlbum {
    pub id: Option<String>,
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
}

/// A single offset-paged response. `next` is null on the last page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPage {
    pub items: Vec<RawLikedEntry>,
    pub next: Option<String>,
    pub total: Option<u32>,
}

/// The subset of `me` used by the connection check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProfile {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub country: Option<String>,
}

/// Flat row of the liked-tracks dataset. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikedTrackRow {
    pub snapshot_utc: String,
    pub added_at: Option<String>,
    pub track_id: String,
    pub track_name: Option<String>,
    pub explicit: Option<bool>,
    pub popularity: Option<u32>,
    pub duration_ms: Option<u64>,
    pub artist_names: String,
    pub artist_ids: String,
    pub album_id: Option<String>,
    pub album_name: Option<String>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
}

/// An immutable snapshot of the liked tracks, one row per kept entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LikedTracksTable {
    snapshot_utc: String,
    rows: Vec<LikedTrackRow>,
}

impl LikedTracksTable {
    pub const COLUMNS: [&'static str; 13] = [
        "snapshot_utc",
        "added_at",
        "track_id",
        "track_name",
        "explicit",
        "popularity",
        "duration_ms",
        "artist_names",
        "artist_ids",
        "album_id",
        "album_name",
        "release_date",
        "release_date_precision",
    ];

    pub fn new(snapshot_utc: impl Into<String>, rows: Vec<LikedTrackRow>) -> Self {
        Self {
            snapshot_utc: snapshot_utc.into(),
            rows,
        }
    }

    pub fn snapshot_utc(&self) -> &str {
        &self.snapshot_utc
    }

    pub fn rows(&self) -> &[LikedTrackRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> &[LikedTrackRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn into_rows(self) -> Vec<LikedTrackRow> {
        self.rows
    }
}

/// Result of the connection check: who we are and a taste of the library.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub display_name: Option<String>,
    pub country: Option<String>,
    pub sample: Vec<String>,
}
