// /////////////////////////////////////////////////////////////////////////////
// Chunked File Transfer System
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Provider Request-Signing Schemes (§4.I)

pub mod azure_sharedkey;
pub mod gcs_rsa;
pub mod sigv4;

pub use azure_sharedkey::AzureCredentials;
pub use gcs_rsa::GcsCredentials;
pub use sigv4::AwsCredentials;
