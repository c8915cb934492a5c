// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! SPDM Requester library.
//!
//! Implements the Requester (initiator) role of the DMTF Security Protocol
//! and Data Model: version, capability and algorithm negotiation, responder
//! authentication, session establishment over key exchange or pre-shared
//! keys, and secured-session messaging. Cryptographic primitives, transport
//! framing and device I/O are supplied by the embedding application through
//! the [`crypto`], [`common::SpdmTransportEncap`] and
//! [`common::SpdmDeviceIo`] capability interfaces.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

#[macro_use]
extern crate bitflags;

pub mod config;
pub mod error;

pub mod common;
pub mod crypto;
pub mod message;
pub mod protocol;
pub mod requester;
pub mod time;

#[cfg(test)]
pub mod testlib;
