use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{encode, EncodingKey, Header};
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of issued bearer tokens.
pub const TOKEN_TTL_HOURS: i64 = 24;

fn encode_claims(claims: &JwtClaims, jwt_secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| format!("Failed to sign token: {}", e))
}

/// Issues an HS256 token for `user_id`, valid for [`TOKEN_TTL_HOURS`].
pub fn generate_token(user_id: &str, email: &str, jwt_secret: &str) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        email: Some(email.to_string()),
        iat: Some(now.timestamp() as u64),
        exp: Some((now + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as u64),
    };

    let token = encode_claims(&claims, jwt_secret)?;

    debug!("Issued token for user: {}", user_id);
    Ok(token)
}

pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signature_string = format!("{}.{}", header_b64, claims_b64);

    let mut mac = match HmacSha256::new_from_slice(jwt_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };

    mac.update(signature_string.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: JwtClaims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp() as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let issued_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        issued_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_issued_token_validates() {
        let token = generate_token("user-1", "jane@example.com", SECRET).unwrap();
        let user = validate_token(&token, SECRET).unwrap();

        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("jane@example.com"));
        assert!(user.issued_at.is_some());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = generate_token("user-1", "jane@example.com", SECRET).unwrap();
        assert_eq!(
            validate_token(&token, "other-secret").unwrap_err(),
            "Invalid token signature"
        );
    }

    #[test]
    fn test_malformed_token_is_rejected() {
        assert_eq!(validate_token("abc", SECRET).unwrap_err(), "Invalid token format");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let claims = JwtClaims {
            sub: "user-1".to_string(),
            email: None,
            iat: Some(1),
            exp: Some(2),
        };
        let token = encode_claims(&claims, SECRET).unwrap();

        assert_eq!(validate_token(&token, SECRET).unwrap_err(), "Token expired");
    }

    #[test]
    fn test_issued_token_is_standard_hs256() {
        let token = generate_token("user-1", "jane@example.com", SECRET).unwrap();
        let header = token.split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).unwrap()).unwrap();

        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn test_empty_secret_refuses_to_sign() {
        assert!(generate_token("user-1", "jane@example.com", "").is_err());
    }
}
