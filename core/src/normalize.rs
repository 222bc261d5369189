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

use crate::models::{LikedTrackRow, LikedTracksTable, RawArtist, RawLikedEntry};
use chrono::{SecondsFormat, Utc};
use log::debug;

/// Separator for multi-artist columns. Not expected inside artist names or ids.
pub const ARTIST_DELIMITER: &str = "|";

/// Current UTC time in RFC 3339, the stamp shared by every row of one run.
pub fn snapshot_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Joins one artist field in source order, skipping artists where it is absent.
///
/// Names and ids are filtered independently: an artist with only a name still
/// shows up in `artist_names` but not in `artist_ids`, so the two columns can
/// differ in length. Consumers pairing them by position must account for that.
fn join_artists<F>(artists: &[RawArtist], field: F) -> String
where
    F: Fn(&RawArtist) -> Option<&str>,
{
    artists
        .iter()
        .filter_map(field)
        .filter(|v| !v.is_empty())
        .collect::<Vec<&str>>()
        .join(ARTIST_DELIMITER)
}

/// Flattens one liked entry. `None` when there is no track or the track has no id.
pub fn normalize_entry(entry: &RawLikedEntry, snapshot_utc: &str) -> Option<LikedTrackRow> {
    let track = entry.track.as_ref()?;
    let track_id = track.id.as_deref().filter(|id| !id.is_empty())?;

    let artists = track.artists.as_deref().unwrap_or_default();
    let album = track.album.as_ref();

    Some(LikedTrackRow {
        snapshot_utc: snapshot_utc.to_string(),
        added_at: entry.added_at.clone(),
        track_id: track_id.to_string(),
        track_name: track.name.clone(),
        explicit: track.explicit,
        popularity: track.popularity,
        duration_ms: track.duration_ms,
        artist_names: join_artists(artists, |a| a.name.as_deref()),
        artist_ids: join_artists(artists, |a| a.id.as_deref()),
        album_id: album.and_then(|a| a.id.clone()),
        album_name: album.and_then(|a| a.name.clone()),
        release_date: album.and_then(|a| a.release_date.clone()),
        release_date_precision: album.and_then(|a| a.release_date_precision.clone()),
    })
}

/// Builds a table from `entries` stamped with the given snapshot time.
/// Input order is kept; unusable entries are dropped.
pub fn normalize_at(entries: &[RawLikedEntry], snapshot_utc: &str) -> LikedTracksTable {
    let rows: Vec<LikedTrackRow> = entries
        .iter()
        .filter_map(|entry| normalize_entry(entry, snapshot_utc))
        .collect();

    let dropped = entries.len() - rows.len();
    if dropped > 0 {
        debug!("Dropped {} liked entries without a track id", dropped);
    }

    LikedTracksTable::new(snapshot_utc, rows)
}

/// [`normalize_at`] with the timestamp taken once, now.
pub fn normalize(entries: &[RawLikedEntry]) -> LikedTracksTable {
    normalize_at(entries, &snapshot_timestamp())
}
