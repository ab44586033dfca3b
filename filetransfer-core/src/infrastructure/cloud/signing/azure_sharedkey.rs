// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Azure Blob SharedKey Signing (§4.I)

use ring::hmac;

use filetransfer_domain::errors::CloudError;

#[derive(Debug, Clone)]
pub struct AzureCredentials {
    pub account: String,
    /// Base64-encoded account key, as issued by the Azure portal.
    pub account_key: String,
}

/// The fixed, position-sensitive header block every Azure SharedKey
/// `StringToSign` starts with (§4.I).
#[derive(Debug, Clone, Default)]
pub struct StandardHeaders {
    pub content_encoding: String,
    pub content_language: String,
    pub content_length: String,
    pub content_md5: String,
    pub content_type: String,
    pub date: String,
    pub if_modified_since: String,
    pub if_match: String,
    pub if_none_match: String,
    pub if_unmodified_since: String,
    pub range: String,
}

/// Canonicalizes `x-ms-*` headers: lowercase name, sorted, `name:value\n`.
pub fn canonicalized_headers(ms_headers: &[(&str, &str)]) -> String {
    let mut sorted: Vec<(String, String)> =
        ms_headers.iter().map(|(k, v)| (k.to_lowercase(), v.to_string())).collect();
    sorted.sort();
    sorted.iter().map(|(k, v)| format!("{k}:{v}\n")).collect()
}

/// Canonicalizes the resource path and query string:
/// `/<account>/<resource_path>` followed by each sorted, decoded query
/// parameter as `\n<name>:<comma-joined-values>` (§4.I).
pub fn canonicalized_resource(account: &str, resource_path: &str, query: &[(&str, &str)]) -> String {
    let mut resource = format!("/{account}/{resource_path}");
    let mut grouped: std::collections::BTreeMap<String, Vec<String>> = std::collections::BTreeMap::new();
    for (k, v) in query {
        grouped.entry(k.to_lowercase()).or_default().push(v.to_string());
    }
    for (key, mut values) in grouped {
        values.sort();
        resource.push_str(&format!("\n{key}:{}", values.join(",")));
    }
    resource
}

fn string_to_sign(verb: &str, headers: &StandardHeaders, canonicalized_headers: &str, canonicalized_resource: &str) -> String {
    format!(
        "{verb}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}{}",
        headers.content_encoding,
        headers.content_language,
        headers.content_length,
        headers.content_md5,
        headers.content_type,
        headers.date,
        headers.if_modified_since,
        headers.if_match,
        headers.if_none_match,
        headers.if_unmodified_since,
        headers.range,
        canonicalized_headers,
        canonicalized_resource,
    )
}

/// Computes `Authorization: SharedKey <account>:<signature>` for one
/// request (§4.I).
pub fn sign_request(
    credentials: &AzureCredentials,
    verb: &str,
    headers: &StandardHeaders,
    ms_headers: &[(&str, &str)],
    resource_path: &str,
    query: &[(&str, &str)],
) -> Result<String, CloudError> {
    use base64::Engine;
    let key_bytes = base64::engine::general_purpose::STANDARD
        .decode(&credentials.account_key)
        .map_err(|e| CloudError::ConfigInvalid(format!("invalid Azure account key: {e}")))?;

    let to_sign = string_to_sign(
        verb,
        headers,
        &canonicalized_headers(ms_headers),
        &canonicalized_resource(&credentials.account, resource_path, query),
    );

    let key = hmac::Key::new(hmac::HMAC_SHA256, &key_bytes);
    let signature = hmac::sign(&key, to_sign.as_bytes());
    let encoded = base64::engine::general_purpose::STANDARD.encode(signature.as_ref());

    Ok(format!("SharedKey {}:{encoded}", credentials.account))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalized_headers_are_sorted_and_lowercased() {
        let headers = canonicalized_headers(&[("x-ms-version", "2021-08-06"), ("x-ms-date", "Fri, 24 May 2013 00:00:00 GMT")]);
        assert_eq!(headers, "x-ms-date:Fri, 24 May 2013 00:00:00 GMT\nx-ms-version:2021-08-06\n");
    }

    #[test]
    fn canonicalized_resource_groups_and_sorts_query_values() {
        let resource = canonicalized_resource("myaccount", "mycontainer/blob.txt", &[("comp", "list"), ("restype", "container")]);
        assert_eq!(resource, "/myaccount/mycontainer/blob.txt\ncomp:list\nrestype:container");
    }

    #[test]
    fn sign_request_produces_sharedkey_header() {
        use base64::Engine;
        let account_key = base64::engine::general_purpose::STANDARD.encode(vec![0u8; 32]);
        let credentials = AzureCredentials { account: "myaccount".to_string(), account_key };
        let header = sign_request(&credentials, "GET", &StandardHeaders::default(), &[], "mycontainer/blob.txt", &[]).unwrap();
        assert!(header.starts_with("SharedKey myaccount:"));
    }
}
