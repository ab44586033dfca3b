// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # QUIC Endpoint Configuration (§4.J)
//!
//! Thin wiring around `quinn`/`rustls` to build a client or server
//! endpoint configured for this system's ALPN protocol and 0-RTT
//! resumption. No example in the retrieval pack touches QUIC directly, so
//! these builders follow `quinn`'s own documented configuration pattern
//! rather than a specific prior-art file (see DESIGN.md).
//!
//! Kept deliberately small: the actual accept loop and stream handling
//! belong to the caller, which hands each accepted bidirectional stream
//! to [`crate::infrastructure::protocol::ServerSession`] exactly as a
//! `TcpStream` would be.

use std::sync::Arc;
use std::time::Duration;

use filetransfer_domain::errors::TransferError;

/// The ALPN protocol identifier this system negotiates, matching the
/// `alpn_protocol` field carried in a persisted [`filetransfer_domain::value_objects::SessionTicket`].
pub const ALPN_PROTOCOL: &[u8] = b"ft/1";

/// Idle timeout applied to both client and server QUIC endpoints before a
/// connection with no activity is dropped.
const IDLE_TIMEOUT_SECS: u64 = 30;

/// Builds a `quinn::ServerConfig` from a certificate chain and private
/// key in DER form, enabling 0-RTT early data (§4.J).
pub fn server_config(cert_chain: Vec<rustls::pki_types::CertificateDer<'static>>, key: rustls::pki_types::PrivateKeyDer<'static>) -> Result<quinn::ServerConfig, TransferError> {
    let mut crypto = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(cert_chain, key)
        .map_err(|e| TransferError::ConfigTransportError(e.to_string()))?;
    crypto.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];
    crypto.max_early_data_size = u32::MAX;

    let quic_crypto = quinn::crypto::rustls::QuicServerConfig::try_from(crypto).map_err(|e| TransferError::ConfigTransportError(e.to_string()))?;
    let mut server_config = quinn::ServerConfig::with_crypto(Arc::new(quic_crypto));
    let transport = Arc::get_mut(&mut server_config.transport).expect("fresh Arc has no other owners");
    transport.max_idle_timeout(Some(Duration::from_secs(IDLE_TIMEOUT_SECS).try_into().map_err(|_| TransferError::ConfigTransportError("idle timeout out of range".to_string()))?));

    Ok(server_config)
}

/// Builds a `quinn::ClientConfig` trusting `roots`, for connecting to a
/// server configured via [`server_config`]. Callers populate `roots` from
/// whatever CA source fits their deployment (platform trust store,
/// pinned cert, or a test fixture's self-signed cert).
pub fn client_config(roots: rustls::RootCertStore) -> Result<quinn::ClientConfig, TransferError> {
    let mut crypto = rustls::ClientConfig::builder().with_root_certificates(roots).with_no_client_auth();
    crypto.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    let quic_crypto = quinn::crypto::rustls::QuicClientConfig::try_from(crypto).map_err(|e| TransferError::ConfigTransportError(e.to_string()))?;
    Ok(quinn::ClientConfig::new(Arc::new(quic_crypto)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpn_protocol_matches_session_ticket_convention() {
        assert_eq!(ALPN_PROTOCOL, b"ft/1");
    }
}
