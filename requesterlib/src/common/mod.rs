// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

pub mod key_schedule;
pub mod opaque;
pub mod session;
pub mod spdm_codec;

pub use crate::error;
pub use opaque::SpdmOpaqueStruct;
pub use session::*;
pub use spdm_codec::SpdmCodec;

use crate::config;
use crate::crypto;
use crate::error::SpdmResult;
use crate::protocol::*;
use crate::{spdm_err, spdm_result_err};

/// Blocking device I/O supplied by the caller.
///
/// `receive` returns the number of bytes placed in `buffer`; an `Err` is a
/// transport fault, a deadline expiry included.
pub trait SpdmDeviceIo {
    fn send(&mut self, buffer: &[u8], timeout_us: usize) -> SpdmResult;

    fn receive(&mut self, buffer: &mut [u8], timeout_us: usize) -> Result<usize, usize>;

    fn flush_all(&mut self) -> SpdmResult;
}

/// Transport codec: frames an SPDM message for the wire and back,
/// discriminating normal from secured (session) messages.
pub trait SpdmTransportEncap {
    fn encap(
        &mut self,
        spdm_buffer: &[u8],
        transport_buffer: &mut [u8],
        secured_message: bool,
    ) -> SpdmResult<usize>;

    fn decap(
        &mut self,
        transport_buffer: &[u8],
        spdm_buffer: &mut [u8],
    ) -> SpdmResult<(usize, bool)>;

    fn encap_app(
        &mut self,
        spdm_buffer: &[u8],
        app_buffer: &mut [u8],
        is_app_message: bool,
    ) -> SpdmResult<usize>;

    fn decap_app(
        &mut self,
        app_buffer: &[u8],
        spdm_buffer: &mut [u8],
    ) -> SpdmResult<(usize, bool)>;

    fn get_sequence_number_count(&mut self) -> u8;

    fn get_max_random_count(&mut self) -> u16;
}

/// Append-only byte log with a fixed capacity, used as a hash input for
/// the cryptographic bindings.
#[derive(Debug, Clone, Copy)]
pub struct ManagedBuffer(usize, [u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE]);

impl ManagedBuffer {
    pub fn append_message(&mut self, bytes: &[u8]) -> Option<usize> {
        let used = self.0;
        if used + bytes.len() > config::MAX_SPDM_MESSAGE_BUFFER_SIZE {
            return None;
        }
        self.1[used..(used + bytes.len())].copy_from_slice(bytes);
        self.0 = used + bytes.len();
        Some(self.0)
    }

    /// Logical truncation by `size` bytes from the tail; undoes a
    /// speculative append.
    pub fn shrink_message(&mut self, size: usize) -> Option<usize> {
        if size > self.0 {
            return None;
        }
        self.0 -= size;
        Some(self.0)
    }

    pub fn reset_message(&mut self) {
        self.0 = 0;
    }

    pub fn size(&self) -> usize {
        self.0
    }
}

impl AsRef<[u8]> for ManagedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.1[0..self.0]
    }
}

impl Default for ManagedBuffer {
    fn default() -> ManagedBuffer {
        ManagedBuffer(0usize, [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE])
    }
}

/// Connection transcripts addressable by a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmTranscript {
    MessageA,
    MessageB,
    MessageC,
    MessageM,
}

/// Receipt for a speculative transcript append.
///
/// Every transaction appends its request before sending, runs its body in
/// an inner function, and the single outer match either `commit`s this
/// reservation or hands it to [`SpdmContext::rollback_transcript`], which
/// restores the transcript to its pre-transaction image (any response
/// bytes appended after the reservation are discarded with it).
#[must_use = "a speculative transcript append must be committed or rolled back"]
#[derive(Debug)]
pub struct SpdmTranscriptReservation {
    transcript: SpdmTranscript,
    offset: usize,
}

impl SpdmTranscriptReservation {
    pub fn commit(self) {}
}

/// Ordered connection states; a transaction is permitted only when the
/// connection is at or above its floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd)]
pub enum SpdmConnectionState {
    SpdmConnectionNotStarted,
    SpdmConnectionAfterVersion,
    SpdmConnectionAfterCapabilities,
    SpdmConnectionAfterNegotiateAlgorithms,
    SpdmConnectionAfterDigests,
    SpdmConnectionAfterCertificate,
    SpdmConnectionAfterAuthenticate,
    SpdmConnectionNegotiated,
}

impl Default for SpdmConnectionState {
    fn default() -> SpdmConnectionState {
        SpdmConnectionState::SpdmConnectionNotStarted
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmConfigInfo {
    pub spdm_version: [SpdmVersion; config::MAX_SPDM_VERSION_COUNT],
    pub req_capabilities: SpdmRequestCapabilityFlags,
    pub req_ct_exponent: u8,
    pub measurement_specification: SpdmMeasurementSpecification,
    pub measurement_hash_algo: SpdmMeasurementHashAlgo,
    pub base_hash_algo: SpdmBaseHashAlgo,
    pub base_asym_algo: SpdmBaseAsymAlgo,
    pub req_asym_algo: SpdmReqAsymAlgo,
    pub dhe_algo: SpdmDheAlgo,
    pub aead_algo: SpdmAeadAlgo,
    pub key_schedule_algo: SpdmKeyScheduleAlgo,
}

#[derive(Clone, Default)]
pub struct SpdmProvisionInfo {
    /// Requester certificate chain, raw DER, served over the encapsulated
    /// GET_CERTIFICATE flow during mutual authentication.
    pub my_cert_chain_data: Option<SpdmCertChainData>,
    /// Same chain in SPDM framing (length header, root hash, DER chain).
    pub my_cert_chain: Option<SpdmCertChainBuffer>,
    /// Trusted root for the responder chain.
    pub peer_root_cert_data: Option<SpdmCertChainData>,
    /// Raw responder public key, used when `slot_id` is 0xFF.
    pub peer_pub_key: Option<SpdmCertChainData>,
    pub psk: Option<SpdmPskStruct>,
    pub psk_hint: SpdmPskHintStruct,
}

#[derive(Debug, Clone, Default)]
pub struct SpdmNegotiateInfo {
    pub spdm_version_sel: SpdmVersion,
    pub spdm_version_count: u8,
    pub spdm_version_peer: [SpdmVersionStruct; config::MAX_SPDM_VERSION_COUNT],
    pub req_ct_exponent_sel: u8,
    pub req_capabilities_sel: SpdmRequestCapabilityFlags,
    pub rsp_ct_exponent_sel: u8,
    pub rsp_capabilities_sel: SpdmResponseCapabilityFlags,
    pub measurement_specification_sel: SpdmMeasurementSpecification,
    pub measurement_hash_sel: SpdmMeasurementHashAlgo,
    pub base_hash_sel: SpdmBaseHashAlgo,
    pub base_asym_sel: SpdmBaseAsymAlgo,
    pub dhe_sel: SpdmDheAlgo,
    pub aead_sel: SpdmAeadAlgo,
    pub req_asym_sel: SpdmReqAsymAlgo,
    pub key_schedule_sel: SpdmKeyScheduleAlgo,
}

#[derive(Debug, Clone, Default)]
pub struct SpdmRuntimeInfo {
    pub connection_state: SpdmConnectionState,
    /// VCA: GET_VERSION/VERSION, GET_CAPABILITIES/CAPABILITIES,
    /// NEGOTIATE_ALGORITHMS/ALGORITHMS.
    pub message_a: ManagedBuffer,
    /// GET_DIGESTS/DIGESTS and GET_CERTIFICATE/CERTIFICATE.
    pub message_b: ManagedBuffer,
    /// CHALLENGE/CHALLENGE_AUTH.
    pub message_c: ManagedBuffer,
    /// GET_MEASUREMENTS/MEASUREMENTS (L1/L2).
    pub message_m: ManagedBuffer,
    /// Encapsulated digest/certificate exchanges (mutual auth).
    pub message_mut_b: ManagedBuffer,
    /// Encapsulated CHALLENGE exchange (mutual auth).
    pub message_mut_c: ManagedBuffer,
    /// Whether the in-flight request asked for a measurement summary hash;
    /// governs the presence of that response field.
    pub need_measurement_summary_hash: bool,
    /// Whether the in-flight GET_MEASUREMENTS asked for a signature.
    pub need_measurement_signature: bool,
    latest_half_session_id: u16,
}

#[derive(Debug, Clone, Default)]
pub struct SpdmPeerInfo {
    pub peer_cert_chain: [Option<SpdmCertChainBuffer>; config::SPDM_MAX_SLOT_NUMBER],
    pub peer_slot_mask: u8,
    pub peer_digests: [Option<SpdmDigestStruct>; config::SPDM_MAX_SLOT_NUMBER],
}

pub struct SpdmContext<'a> {
    pub device_io: &'a mut dyn SpdmDeviceIo,
    pub transport_encap: &'a mut dyn SpdmTransportEncap,

    pub config_info: SpdmConfigInfo,
    pub provision_info: SpdmProvisionInfo,
    pub negotiate_info: SpdmNegotiateInfo,
    pub runtime_info: SpdmRuntimeInfo,
    pub peer_info: SpdmPeerInfo,

    pub session: [SpdmSession; config::MAX_SPDM_SESSION_COUNT],
}

impl<'a> SpdmContext<'a> {
    pub fn new(
        device_io: &'a mut dyn SpdmDeviceIo,
        transport_encap: &'a mut dyn SpdmTransportEncap,
        config_info: SpdmConfigInfo,
        provision_info: SpdmProvisionInfo,
    ) -> Self {
        let mut context = SpdmContext {
            device_io,
            transport_encap,
            config_info,
            provision_info,
            negotiate_info: SpdmNegotiateInfo::default(),
            runtime_info: SpdmRuntimeInfo::default(),
            peer_info: SpdmPeerInfo::default(),
            session: [SpdmSession::default(); config::MAX_SPDM_SESSION_COUNT],
        };
        context.negotiate_info.spdm_version_sel = SpdmVersion::SpdmVersion10;
        context
    }

    /// Returns the connection to the state preceding GET_VERSION: all
    /// transcripts emptied, negotiation forgotten, peer certificates
    /// dropped, every session destroyed.
    pub fn reset_context(&mut self) {
        self.negotiate_info = SpdmNegotiateInfo::default();
        self.negotiate_info.spdm_version_sel = SpdmVersion::SpdmVersion10;
        self.reset_runtime_info();
        self.peer_info = SpdmPeerInfo::default();
        for session in self.session.iter_mut() {
            let session_id = session.get_session_id();
            if session_id != INVALID_SESSION_ID {
                let _ = session.teardown(session_id);
            }
        }
    }

    pub fn reset_runtime_info(&mut self) {
        self.runtime_info = SpdmRuntimeInfo::default();
    }

    pub fn get_session_via_id(&mut self, session_id: u32) -> Option<&mut SpdmSession> {
        self.session
            .iter_mut()
            .find(|session| session.get_session_id() == session_id)
    }

    pub fn get_free_session(&mut self) -> Option<&mut SpdmSession> {
        self.get_session_via_id(INVALID_SESSION_ID)
    }

    pub fn get_next_half_session_id(&mut self) -> SpdmResult<u16> {
        let next = self.runtime_info.latest_half_session_id.wrapping_add(1);
        let next = if next == 0 { 1 } else { next };
        self.runtime_info.latest_half_session_id = next;
        Ok(next)
    }

    pub fn append_transcript(
        &mut self,
        transcript: SpdmTranscript,
        bytes: &[u8],
    ) -> SpdmResult<SpdmTranscriptReservation> {
        let buffer = self.transcript_mut(transcript);
        let offset = buffer.size();
        buffer.append_message(bytes).ok_or(spdm_err!(ENOMEM))?;
        Ok(SpdmTranscriptReservation { transcript, offset })
    }

    pub fn rollback_transcript(&mut self, reservation: SpdmTranscriptReservation) {
        let buffer = self.transcript_mut(reservation.transcript);
        let size = buffer.size();
        if reservation.offset < size {
            let _ = buffer.shrink_message(size - reservation.offset);
        }
    }

    fn transcript_mut(&mut self, transcript: SpdmTranscript) -> &mut ManagedBuffer {
        match transcript {
            SpdmTranscript::MessageA => &mut self.runtime_info.message_a,
            SpdmTranscript::MessageB => &mut self.runtime_info.message_b,
            SpdmTranscript::MessageC => &mut self.runtime_info.message_c,
            SpdmTranscript::MessageM => &mut self.runtime_info.message_m,
        }
    }

    /// Assembles the transcript bound by session handshake signatures and
    /// HMACs: message_a, the certificate transcript (skipped for PSK),
    /// then the session handshake messages handed in by the caller.
    pub fn calc_req_transcript_data(
        &self,
        use_psk: bool,
        message_k: Option<&ManagedBuffer>,
        message_f: Option<&ManagedBuffer>,
    ) -> SpdmResult<ManagedBuffer> {
        let mut message = ManagedBuffer::default();
        message
            .append_message(self.runtime_info.message_a.as_ref())
            .ok_or(spdm_err!(ENOMEM))?;
        if !use_psk {
            message
                .append_message(self.runtime_info.message_b.as_ref())
                .ok_or(spdm_err!(ENOMEM))?;
        }
        if let Some(message_k) = message_k {
            message
                .append_message(message_k.as_ref())
                .ok_or(spdm_err!(ENOMEM))?;
        }
        if let Some(message_f) = message_f {
            message
                .append_message(message_f.as_ref())
                .ok_or(spdm_err!(ENOMEM))?;
        }
        Ok(message)
    }

    pub fn calc_req_transcript_hash(
        &self,
        use_psk: bool,
        message_k: Option<&ManagedBuffer>,
        message_f: Option<&ManagedBuffer>,
    ) -> SpdmResult<SpdmDigestStruct> {
        let transcript = self.calc_req_transcript_data(use_psk, message_k, message_f)?;
        crypto::hash::hash_all(self.negotiate_info.base_hash_sel, transcript.as_ref())
            .ok_or(spdm_err!(EUNSUP))
    }

    /// Response deadline: 2^CT microseconds once the responder CT exponent
    /// is negotiated, ST1 before that.
    pub fn rsp_timeout_us(&self) -> usize {
        let ct_exponent = self.negotiate_info.rsp_ct_exponent_sel;
        if ct_exponent == 0 {
            config::ST1
        } else {
            let ct_exponent = ct_exponent.min(config::MAX_SPDM_CT_EXPONENT);
            1usize << ct_exponent
        }
    }

    /// Verifies the peer certificate material for `slot_id` and returns the
    /// leaf certificate region, honoring the 0xFF raw-public-key convention.
    pub fn peer_leaf_cert_data(&self, slot_id: u8) -> SpdmResult<(SpdmCertChainData, usize, usize)> {
        if slot_id == 0xFF {
            let key = self
                .provision_info
                .peer_pub_key
                .as_ref()
                .ok_or(spdm_err!(EUNSUP))?;
            return Ok((*key, 0, key.data_size as usize));
        }
        let slot = slot_id as usize;
        if slot >= config::SPDM_MAX_SLOT_NUMBER {
            return spdm_result_err!(EINVAL);
        }
        let cert_chain = self.peer_info.peer_cert_chain[slot]
            .as_ref()
            .ok_or(spdm_err!(EUNSUP))?;
        let hash_size = self.negotiate_info.base_hash_sel.get_size() as usize;
        let der_offset = 4 + hash_size;
        if (cert_chain.data_size as usize) <= der_offset {
            return spdm_result_err!(EINVAL);
        }
        let mut data = SpdmCertChainData::default();
        let der = &cert_chain.as_ref()[der_offset..];
        data.data[..der.len()].copy_from_slice(der);
        data.data_size = der.len() as u16;
        let (leaf_begin, leaf_end) =
            crypto::cert_operation::get_cert_from_cert_chain(data.as_ref(), -1)?;
        Ok((data, leaf_begin, leaf_end))
    }
}
