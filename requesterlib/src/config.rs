// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Compile-time sizing for buffers and tables.

/// Largest raw SPDM message, and the capacity of every managed transcript.
/// Transcript concatenations (VCA + certificates + handshake messages) must
/// fit as well.
pub const MAX_SPDM_MESSAGE_BUFFER_SIZE: usize = 0x1200;

/// Largest transport frame: a full SPDM message plus transport and secured
/// message overhead.
pub const DATA_TRANSFER_SIZE: usize = 0x1400;

pub const MAX_SPDM_VERSION_COUNT: usize = 5;
pub const MAX_SPDM_SESSION_COUNT: usize = 4;
pub const SPDM_MAX_SLOT_NUMBER: usize = 8;

pub const MAX_SPDM_CERT_CHAIN_DATA_SIZE: usize = 1536;
/// Chunk size for the GET_CERTIFICATE offset/length loop.
pub const MAX_SPDM_CERT_PORTION_LEN: usize = 512;

pub const MAX_SPDM_MEASUREMENT_RECORD_SIZE: usize = 512;
pub const MAX_SPDM_OPAQUE_SIZE: usize = 64;
pub const MAX_SPDM_PSK_HINT_SIZE: usize = 32;
pub const MAX_SPDM_PSK_CONTEXT_SIZE: usize = 64;

/// Response deadline in microseconds before the responder CT exponent is
/// known (GET_VERSION / GET_CAPABILITIES).
pub const ST1: usize = 1_000_000;

/// Largest CT exponent honored when computing 2^CT microsecond deadlines.
pub const MAX_SPDM_CT_EXPONENT: u8 = 24;
