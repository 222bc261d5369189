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

use crate::auth::SpotifySession;
use crate::config::PAGE_SIZE;
use crate::models::{RawLikedEntry, RawPage, RawProfile};
use async_trait::async_trait;
use log::{debug, info};
use rspotify::{
    http::{HttpError, Query},
    prelude::*,
    ClientError,
};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Spotify API error: {0}")]
    Spotify(rspotify::ClientError),
    #[error("Spotify rejected the credential: {0}")]
    Unauthorized(String),
    #[error("Unreadable Spotify response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// 401/403 mean the credential itself is bad; anything else is worth a rerun.
fn rejected_status(err: &ClientError) -> Option<u16> {
    match err {
        ClientError::Http(http) => match &**http {
            HttpError::StatusCode(resp) => {
                let status = resp.status().as_u16();
                matches!(status, 401 | 403).then_some(status)
            }
            _ => None,
        },
        _ => None,
    }
}

impl From<ClientError> for FetchError {
    fn from(err: ClientError) -> Self {
        match rejected_status(&err) {
            Some(status) => FetchError::Unauthorized(format!("HTTP {}: {}", status, err)),
            None => FetchError::Spotify(err),
        }
    }
}

/// A paged read of the user's saved tracks.
#[async_trait]
pub trait SavedTracksSource: Send + Sync {
    /// Returns the page starting at `offset`, at most `limit` items long.
    async fn saved_tracks_page(
        &self,
        limit: u32,
        offset: u32,
        market: &str,
    ) -> Result<RawPage, FetchError>;
}

impl SpotifySession {
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &Query<'_>,
    ) -> Result<T, FetchError> {
        let body = match self {
            SpotifySession::User(spotify) => spotify.api_get(url, params).await?,
            SpotifySession::Service(spotify) => spotify.api_get(url, params).await?,
        };
        Ok(serde_json::from_str(&body)?)
    }

    /// `GET me`, used to confirm whose library we are reading.
    pub async fn current_profile(&self) -> Result<RawProfile, FetchError> {
        self.get_json("me", &Query::new()).await
    }
}

#[async_trait]
impl SavedTracksSource for SpotifySession {
    async fn saved_tracks_page(
        &self,
        limit: u32,
        offset: u32,
        market: &str,
    ) -> Result<RawPage, FetchError> {
        let limit = limit.to_string();
        let offset = offset.to_string();
        let mut params = Query::with_capacity(3);
        params.insert("limit", limit.as_str());
        params.insert("offset", offset.as_str());
        params.insert("market", market);
        self.get_json("me/tracks", &params).await
    }
}

/// Offset-based walker over [`SavedTracksSource`].
#[derive(Debug, Clone, Copy)]
pub struct PaginatedFetcher {
    page_size: u32,
}

impl Default for PaginatedFetcher {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
        }
    }
}

impl PaginatedFetcher {
    /// Page size is clamped to what the endpoint accepts (1..=50).
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size: page_size.clamp(1, PAGE_SIZE),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Pulls up to `max_items` liked entries in library order.
    ///
    /// Stops on an empty page, on a page without `next`, or once enough items are
    /// held. The offset advances by the number of items actually returned, so
    /// short pages do not skip entries. Request failures are returned as-is and
    /// whatever was accumulated so far is dropped.
    pub async fn fetch<S>(
        &self,
        source: &S,
        max_items: usize,
        market: &str,
    ) -> Result<Vec<RawLikedEntry>, FetchError>
    where
        S: SavedTracksSource + ?Sized,
    {
        let mut items: Vec<RawLikedEntry> = Vec::new();
        let mut offset: u32 = 0;

        while items.len() < max_items {
            let page = source
                .saved_tracks_page(self.page_size, offset, market)
                .await?;

            if page.items.is_empty() {
                debug!("Empty page at offset {}, collection exhausted", offset);
                break;
            }

            offset += page.items.len() as u32;
            items.extend(page.items);
            info!("Fetched {} liked tracks (cap {})", items.len(), max_items);

            if page.next.is_none() {
                debug!("No next page after offset {}", offset);
                break;
            }
        }

        items.truncate(max_items);
        Ok(items)
    }
}
