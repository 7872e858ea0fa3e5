//! Authentication header strategies
//!
//! Maps a tool's stored `AuthConfig` onto request headers. No network access,
//! no token refresh: OAuth2 tools carry a static bearer token.

use crate::errors::{Result, ToolError};
use crate::tools::types::AuthConfig;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::RequestBuilder;
use tracing::debug;

/// Custom header accepted by endpoints that don't read `Authorization`
pub const API_KEY_HEADER: &str = "x-api-key";

/// Headers required by the given auth configuration
pub fn auth_headers(auth: &AuthConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    match auth {
        AuthConfig::None => {}
        AuthConfig::ApiKey { key } => {
            // Sent both ways; endpoints expect one convention or the other
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", key))?);
            headers.insert(HeaderName::from_static(API_KEY_HEADER), header_value(key)?);
        }
        AuthConfig::Basic { username, password } => {
            let encoded = STANDARD.encode(format!("{}:{}", username, password));
            headers.insert(AUTHORIZATION, header_value(&format!("Basic {}", encoded))?);
        }
        AuthConfig::OAuth2 { token } => {
            debug!("OAuth2 token refresh not implemented; using stored token");
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", token))?);
        }
    }

    Ok(headers)
}

/// Attach auth headers to a request under construction
pub fn authenticate(builder: RequestBuilder, auth: &AuthConfig) -> Result<RequestBuilder> {
    Ok(builder.headers(auth_headers(auth)?))
}

fn header_value(raw: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(raw).map_err(|_| {
        ToolError::Validation("Credential contains characters not allowed in a header".to_string())
    })?;
    value.set_sensitive(true);
    Ok(value)
}
