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

pub mod auth;
pub mod config;
pub mod fetch;
pub mod models;
pub mod normalize;
pub mod snapshot;
pub mod store;

// Re-export key items for convenience
pub use auth::{get_request_capability, AuthError, SpotifySession};
pub use config::{AuthMode, ConfigError, SnapshotConfig, SpotifyCredentials};
pub use fetch::{FetchError, PaginatedFetcher, SavedTracksSource};
pub use models::{LikedTrackRow, LikedTracksTable, RawLikedEntry};
pub use normalize::{normalize, normalize_at};
pub use snapshot::{pull_liked_snapshot, SnapshotAssembler, SnapshotError, SnapshotRun};
pub use store::{SnapshotFormat, StoreError};
