use axum::http::{self};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation, TokenData};

use crate::auth::auth::Principal;

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string())
    }
    // 2. Try to get token from cookies, browsers can't set headers on a WebSocket upgrade
    else {
        let cookie_header = req.headers().get(http::header::COOKIE)
            .ok_or_else(|| "Missing Authorization header or Cookie".to_string())?
            .to_str()
            .map_err(|_| "Invalid Cookie header".to_string())?;

        for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
            if cookie.name() == "auth_token" {
                return Ok(cookie.value().to_string());
            }
        }
        Err("auth_token cookie not found".to_string())
    }
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<serde_json::Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<serde_json::Value>(token, &decoding_key, &validation)
}

// Turn validated claims into the caller's identity
pub fn principal_from_claims(claims: &serde_json::Value) -> Result<Principal, String> {
    let sub = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "JWT token does not contain 'sub' claim".to_string())?;

    match claims.get("type").and_then(|v| v.as_str()) {
        Some("user") => {
            let name = claims
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or(sub);
            Ok(Principal::User {
                id: sub.to_string(),
                name: name.to_string(),
            })
        }
        Some("service") => Ok(Principal::Service { name: sub.to_string() }),
        Some(other) => Err(format!("Invalid token type: {}", other)),
        None => Err("JWT token does not contain 'type' claim".to_string()),
    }
}
