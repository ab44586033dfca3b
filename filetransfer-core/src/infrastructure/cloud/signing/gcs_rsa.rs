// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # GCS Signed URL v4 + OAuth JWT Signing (§4.I)
//!
//! Shares SigV4's canonical-request shape (see [`super::sigv4`]) but signs
//! with the service account's RSA private key (PKCS#1 v1.5 over SHA-256)
//! instead of an HMAC chain, and carries `X-Goog-*` query parameters
//! instead of `X-Amz-*`.

use chrono::{DateTime, Utc};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};

use filetransfer_domain::errors::CloudError;

use super::sigv4::{canonical_query_string, percent_encode};

pub const ALGORITHM: &str = "GOOG4-RSA-SHA256";

#[derive(Debug, Clone)]
pub struct GcsCredentials {
    pub client_email: String,
    /// PEM- or DER-encoded PKCS#8 private key bytes for the service
    /// account, as downloaded from the GCP console.
    pub private_key_pkcs8: Vec<u8>,
}

fn scope(date8: &str) -> String {
    format!("{date8}/auto/storage/goog4_request")
}

fn sign_rsa_sha256(private_key_pkcs8: &[u8], message: &[u8]) -> Result<Vec<u8>, CloudError> {
    let key_pair = RsaKeyPair::from_pkcs8(private_key_pkcs8)
        .map_err(|e| CloudError::ConfigInvalid(format!("invalid GCS service-account key: {e}")))?;
    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(&RSA_PKCS1_SHA256, &SystemRandom::new(), message, &mut signature)
        .map_err(|_| CloudError::InternalError("RSA-SHA256 signing failed".to_string()))?;
    Ok(signature)
}

fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data))
}

/// Builds a V4 signed URL for `object` in `bucket`, matching the SigV4
/// canonical-request shape with `X-Goog-*` parameters and an RSA-SHA256
/// signature in place of SigV4's HMAC chain (§4.I).
pub fn sign_url(credentials: &GcsCredentials, bucket: &str, object: &str, expiration_secs: u64, now: DateTime<Utc>) -> Result<String, CloudError> {
    let goog_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date8 = now.format("%Y%m%d").to_string();
    let host = "storage.googleapis.com";
    let credential = format!("{}/{}", credentials.client_email, scope(&date8));

    let query_params = [
        ("X-Goog-Algorithm", ALGORITHM.to_string()),
        ("X-Goog-Credential", credential),
        ("X-Goog-Date", goog_date.clone()),
        ("X-Goog-Expires", expiration_secs.to_string()),
        ("X-Goog-SignedHeaders", "host".to_string()),
    ];
    let query_refs: Vec<(&str, &str)> = query_params.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let canonical_query = canonical_query_string(&query_refs);

    let uri = format!("/{bucket}/{}", object.split('/').map(|s| percent_encode(s, true)).collect::<Vec<_>>().join("/"));
    let canonical_request = format!("GET\n{uri}\n{canonical_query}\nhost:{host}\n\nhost\nUNSIGNED-PAYLOAD");

    let string_to_sign = format!("{ALGORITHM}\n{goog_date}\n{}\n{}", scope(&date8), sha256_hex(canonical_request.as_bytes()));

    let signature = hex::encode(sign_rsa_sha256(&credentials.private_key_pkcs8, string_to_sign.as_bytes())?);

    Ok(format!("https://{host}{uri}?{canonical_query}&X-Goog-Signature={signature}"))
}

/// Claims for the OAuth bearer-token exchange JWT (§4.I): `RS256`, signed
/// with the same service-account key, claims
/// `{iss, scope, aud, iat, exp}`. Returns the unsigned
/// `header.payload` and its RSA-SHA256 signature, ready to be
/// base64url-joined by the HTTP client.
pub fn build_oauth_jwt(
    credentials: &GcsCredentials,
    scope: &str,
    token_endpoint: &str,
    issued_at: DateTime<Utc>,
    lifetime_secs: i64,
) -> Result<String, CloudError> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let header = serde_json::json!({"alg": "RS256", "typ": "JWT"});
    let claims = serde_json::json!({
        "iss": credentials.client_email,
        "scope": scope,
        "aud": token_endpoint,
        "iat": issued_at.timestamp(),
        "exp": issued_at.timestamp() + lifetime_secs,
    });

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header.to_string()),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    );
    let signature = sign_rsa_sha256(&credentials.private_key_pkcs8, signing_input.as_bytes())?;
    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Whether a cached bearer token should be refreshed: within the 5-minute
/// buffer of its expiry (§4.I).
pub fn needs_refresh(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now + chrono::Duration::minutes(5) >= expires_at
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_window_is_five_minutes() {
        let now = Utc::now();
        assert!(needs_refresh(now + chrono::Duration::minutes(4), now));
        assert!(!needs_refresh(now + chrono::Duration::minutes(10), now));
    }
}
