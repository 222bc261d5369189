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

use std::path::PathBuf;
use thiserror::Error;

/// Largest `limit` Spotify accepts on `me/tracks`.
pub const PAGE_SIZE: u32 = 50;

pub const DEFAULT_CACHE_PATH: &str = ".spotify_token_cache.json";
pub const DEFAULT_MAX_TRACKS: usize = 2000;
pub const DEFAULT_MARKET: &str = "US";

pub const ENV_CLIENT_ID: &str = "RSPOTIFY_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "RSPOTIFY_CLIENT_SECRET";
pub const ENV_REDIRECT_URI: &str = "RSPOTIFY_REDIRECT_URI";
pub const ENV_CACHE_PATH: &str = "RSPOTIFY_CACHE_PATH";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing Spotify settings: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
    #[error("{0} is required")]
    MissingCredential(&'static str),
    #[error("max_tracks must be greater than zero")]
    ZeroMaxTracks,
    #[error("market must not be empty")]
    EmptyMarket,
}

/// How the request capability is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Authorization code flow; opens the browser when no valid token is cached.
    #[default]
    Interactive,
    /// Only reuse the token cache, refreshing it if expired. Never prompts.
    CachedToken,
    /// Client credentials flow. Has no user context.
    ServiceCredential,
}

/// Application credentials, resolved once at the program boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub cache_path: PathBuf,
}

impl SpotifyCredentials {
    /// Reads `RSPOTIFY_CLIENT_ID`, `RSPOTIFY_CLIENT_SECRET`, `RSPOTIFY_REDIRECT_URI`
    /// and the optional `RSPOTIFY_CACHE_PATH` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SpotifyCredentials::from_env`] over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| match lookup(key) {
            Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => Err(key.to_string()),
        };

        let mut missing = Vec::new();
        let client_id = required(ENV_CLIENT_ID).map_err(|k| missing.push(k)).ok();
        let client_secret = required(ENV_CLIENT_SECRET).map_err(|k| missing.push(k)).ok();
        let redirect_uri = required(ENV_REDIRECT_URI).map_err(|k| missing.push(k)).ok();

        match (client_id, client_secret, redirect_uri) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => {
                let cache_path = lookup(ENV_CACHE_PATH)
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH));
                Ok(Self {
                    client_id,
                    client_secret,
                    redirect_uri,
                    cache_path,
                })
            }
            _ => Err(ConfigError::MissingEnv(missing)),
        }
    }
}

/// What to pull and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    pub max_tracks: usize,
    pub market: String,
    pub save_path: Option<PathBuf>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_tracks: DEFAULT_MAX_TRACKS,
            market: DEFAULT_MARKET.to_string(),
            save_path: None,
        }
    }
}

impl SnapshotConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tracks == 0 {
            return Err(ConfigError::ZeroMaxTracks);
        }
        if self.market.trim().is_empty() {
            return Err(ConfigError::EmptyMarket);
        }
        Ok(())
    }
}
