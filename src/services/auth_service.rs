use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::{Identity, UserId};

pub const AUTH_COOKIE: &str = "auth_token";

/// Resolves the credentials of an incoming request to an identity.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap, query_token: Option<&str>) -> Option<Identity>;

    /// Number of identities currently cached, for diagnostics
    fn cached_identities(&self) -> u64 {
        0
    }
}

/// Claims carried by identity tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub uid: UserId,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

// Get the auth token from the request headers, falling back to the query token
pub fn get_auth_token(headers: &HeaderMap, query_token: Option<&str>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        return Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string());
    }

    // 2. Try to get token from cookies
    if let Some(cookie_header) = headers.get(header::COOKIE) {
        let cookie_str = cookie_header.to_str().map_err(|_| "Invalid Cookie header".to_string())?;
        for cookie in cookie::Cookie::split_parse(cookie_str).flatten() {
            if cookie.name() == AUTH_COOKIE {
                return Ok(cookie.value().to_string());
            }
        }
    }

    // 3. Browsers cannot set headers on websocket upgrades, so allow ?token=
    match query_token {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => Err("Missing Authorization header, auth_token cookie or token parameter".to_string()),
    }
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &validation)
}

fn now_secs() -> usize {
    chrono::Utc::now().timestamp().max(0) as usize
}

/// HS256 token verification with a short-lived cache of verified tokens.
pub struct JwtIdentityResolver {
    secret: Option<String>,
    cache: Cache<String, (Identity, usize)>,
}

impl JwtIdentityResolver {
    pub fn new(secret: Option<String>, ttl: Duration) -> Self {
        if secret.is_none() {
            warn!("No JWT secret configured - every connection will be refused");
        }
        let cache = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(ttl)
            .build();
        info!("Identity cache initialized");
        Self { secret, cache }
    }

    fn verify(&self, token: &str) -> Option<Identity> {
        if let Some((identity, exp)) = self.cache.get(token) {
            if exp > now_secs() {
                return Some(identity);
            }
            self.cache.invalidate(token);
        }

        let secret = self.secret.as_deref()?;
        match validate_jwt(token, secret) {
            Ok(token_data) => {
                let claims = token_data.claims;
                info!("JWT token validated successfully for user: {}", claims.sub);
                let identity = Identity::new(claims.uid, claims.sub, claims.admin);
                self.cache.insert(token.to_string(), (identity.clone(), claims.exp));
                Some(identity)
            }
            Err(e) => {
                warn!("JWT validation failed: {}", e);
                None
            }
        }
    }
}

impl IdentityResolver for JwtIdentityResolver {
    fn resolve(&self, headers: &HeaderMap, query_token: Option<&str>) -> Option<Identity> {
        match get_auth_token(headers, query_token) {
            Ok(token) => self.verify(&token),
            Err(e) => {
                debug!("No credentials on request: {}", e);
                None
            }
        }
    }

    fn cached_identities(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub(crate) const SECRET: &str = "test-secret";

    pub(crate) fn token_for(identity: &Identity) -> String {
        let claims = Claims {
            sub: identity.username.clone(),
            uid: identity.id,
            admin: identity.is_admin,
            exp: now_secs() + 3600,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }

    fn resolver() -> JwtIdentityResolver {
        JwtIdentityResolver::new(Some(SECRET.to_string()), Duration::from_secs(60))
    }

    #[test]
    fn token_is_taken_from_header_then_cookie_then_query() {
        let mut headers = HeaderMap::new();
        assert!(get_auth_token(&headers, None).is_err());
        assert_eq!(get_auth_token(&headers, Some("q")).unwrap(), "q");

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; auth_token=c"));
        assert_eq!(get_auth_token(&headers, Some("q")).unwrap(), "c");

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer h"));
        assert_eq!(get_auth_token(&headers, Some("q")).unwrap(), "h");
    }

    #[test]
    fn valid_token_resolves_to_its_identity() {
        let alice = Identity::new(7, "alice", true);
        let resolver = resolver();
        let identity = resolver.resolve(&HeaderMap::new(), Some(&token_for(&alice)));
        assert_eq!(identity, Some(alice.clone()));
        assert_eq!(resolver.resolve(&HeaderMap::new(), Some(&token_for(&alice))), Some(alice));
    }

    #[test]
    fn bad_or_missing_tokens_resolve_to_nothing() {
        let resolver = resolver();
        assert_eq!(resolver.resolve(&HeaderMap::new(), None), None);
        assert_eq!(resolver.resolve(&HeaderMap::new(), Some("garbage")), None);

        let unconfigured = JwtIdentityResolver::new(None, Duration::from_secs(60));
        let token = token_for(&Identity::new(1, "bob", false));
        assert_eq!(unconfigured.resolve(&HeaderMap::new(), Some(&token)), None);
    }
}
