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

use crate::config::{AuthMode, ConfigError, SpotifyCredentials};
use log::{info, warn};
use rspotify::{
    prelude::*, scopes, AuthCodeSpotify, ClientCredsSpotify, Config, Credentials, OAuth,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid Spotify configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Spotify authorization failed: {0}")]
    Authorization(#[from] rspotify::ClientError),
    #[error("No usable cached token: {0}")]
    TokenCache(String),
}

/// An authenticated handle able to call the Web API on the user's behalf.
///
/// Every snapshot run owns its own session; nothing here is shared globally.
#[derive(Debug)]
pub enum SpotifySession {
    User(AuthCodeSpotify),
    Service(ClientCredsSpotify),
}

fn oauth_for(creds: &SpotifyCredentials) -> OAuth {
    // - user-library-read: To page through Liked Songs.
    // - user-read-private: To resolve the account country for the connection check.
    OAuth {
        redirect_uri: creds.redirect_uri.clone(),
        scopes: scopes!("user-library-read", "user-read-private"),
        ..Default::default()
    }
}

fn client_config(creds: &SpotifyCredentials, token_cached: bool) -> Config {
    Config {
        cache_path: creds.cache_path.clone(),
        token_cached,
        token_refreshing: true,
        ..Default::default()
    }
}

fn check_credentials(creds: &SpotifyCredentials, mode: AuthMode) -> Result<(), AuthError> {
    if creds.client_id.trim().is_empty() {
        return Err(ConfigError::MissingCredential("client id").into());
    }
    if creds.client_secret.trim().is_empty() {
        return Err(ConfigError::MissingCredential("client secret").into());
    }
    if mode != AuthMode::ServiceCredential && creds.redirect_uri.trim().is_empty() {
        return Err(ConfigError::MissingCredential("redirect URI").into());
    }
    Ok(())
}

/// Obtains a request capability for the given mode.
///
/// Credentials are checked before anything touches the network, so a
/// misconfigured run fails with [`AuthError::Config`].
///
/// In [`AuthMode::Interactive`] a cached token is reused when valid; otherwise
/// the user is sent to the consent page (browser, or the URL printed to stdout)
/// and the redirect is awaited.
pub async fn get_request_capability(
    creds: &SpotifyCredentials,
    mode: AuthMode,
) -> Result<SpotifySession, AuthError> {
    check_credentials(creds, mode)?;
    let credentials = Credentials::new(&creds.client_id, &creds.client_secret);

    match mode {
        AuthMode::Interactive => {
            let spotify = AuthCodeSpotify::with_config(
                credentials,
                oauth_for(creds),
                client_config(creds, true),
            );
            let url = spotify.get_authorize_url(false)?;
            spotify.prompt_for_token(&url).await?;
            info!("Authorized with Spotify (interactive consent)");
            Ok(SpotifySession::User(spotify))
        }
        AuthMode::CachedToken => {
            let spotify = AuthCodeSpotify::with_config(
                credentials,
                oauth_for(creds),
                client_config(creds, true),
            );
            let cache_path = creds.cache_path.display();
            let token = spotify
                .read_token_cache(true)
                .await
                .map_err(|e| AuthError::TokenCache(format!("{}: {}", cache_path, e)))?
                .ok_or_else(|| {
                    AuthError::TokenCache(format!("{}: token lacks required scopes", cache_path))
                })?;
            let expired = token.is_expired();
            *spotify
                .get_token()
                .lock()
                .await
                .map_err(|_| AuthError::TokenCache("token lock unavailable".to_string()))? =
                Some(token);
            if expired {
                warn!("Cached token expired, refreshing");
                spotify.refresh_token().await?;
            }
            info!("Authorized with Spotify (cached token)");
            Ok(SpotifySession::User(spotify))
        }
        AuthMode::ServiceCredential => {
            let spotify =
                ClientCredsSpotify::with_config(credentials, client_config(creds, false));
            spotify.request_token().await?;
            info!("Authorized with Spotify (client credentials)");
            Ok(SpotifySession::Service(spotify))
        }
    }
}
