// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmContext;
use crate::config;
use crate::protocol::SpdmVersion;
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

mod algorithm;
mod capability;
mod certificate;
mod challenge;
mod digest;
mod encapsulated;
mod end_session;
mod error;
mod finish;
mod heartbeat;
mod key_exchange;
mod key_update;
mod measurement;
mod psk_exchange;
mod psk_finish;
mod version;

pub use algorithm::*;
pub use capability::*;
pub use certificate::*;
pub use challenge::*;
pub use digest::*;
pub use encapsulated::*;
pub use end_session::*;
pub use error::*;
pub use finish::*;
pub use heartbeat::*;
pub use key_exchange::*;
pub use key_update::*;
pub use measurement::*;
pub use psk_exchange::*;
pub use psk_finish::*;
pub use version::*;

enum_builder! {
    @U8
    EnumName: SpdmRequestResponseCode;
    EnumVal{
        SpdmResponseDigests => 0x01,
        SpdmResponseCertificate => 0x02,
        SpdmResponseChallengeAuth => 0x03,
        SpdmResponseVersion => 0x04,
        SpdmResponseMeasurements => 0x60,
        SpdmResponseCapabilities => 0x61,
        SpdmResponseAlgorithms => 0x63,
        SpdmResponseKeyExchangeRsp => 0x64,
        SpdmResponseFinishRsp => 0x65,
        SpdmResponsePskExchangeRsp => 0x66,
        SpdmResponsePskFinishRsp => 0x67,
        SpdmResponseHeartbeatAck => 0x68,
        SpdmResponseKeyUpdateAck => 0x69,
        SpdmResponseEncapsulatedRequest => 0x6A,
        SpdmResponseEncapsulatedResponseAck => 0x6B,
        SpdmResponseEndSessionAck => 0x6C,
        SpdmResponseError => 0x7F,
        SpdmRequestGetDigests => 0x81,
        SpdmRequestGetCertificate => 0x82,
        SpdmRequestChallenge => 0x83,
        SpdmRequestGetVersion => 0x84,
        SpdmRequestGetMeasurements => 0xE0,
        SpdmRequestGetCapabilities => 0xE1,
        SpdmRequestNegotiateAlgorithms => 0xE3,
        SpdmRequestKeyExchange => 0xE4,
        SpdmRequestFinish => 0xE5,
        SpdmRequestPskExchange => 0xE6,
        SpdmRequestPskFinish => 0xE7,
        SpdmRequestHeartbeat => 0xE8,
        SpdmRequestKeyUpdate => 0xE9,
        SpdmRequestGetEncapsulatedRequest => 0xEA,
        SpdmRequestDeliverEncapsulatedResponse => 0xEB,
        SpdmRequestEndSession => 0xEC,
        SpdmRequestRespondIfReady => 0xFF
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SpdmMessageHeader {
    pub version: SpdmVersion,
    pub request_response_code: SpdmRequestResponseCode,
}

impl Codec for SpdmMessageHeader {
    fn encode(&self, bytes: &mut Writer) {
        self.version.encode(bytes);
        self.request_response_code.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmMessageHeader> {
        let version = SpdmVersion::read(r)?;
        let request_response_code = SpdmRequestResponseCode::read(r)?;
        Some(SpdmMessageHeader {
            version,
            request_response_code,
        })
    }
}

/// The two parameter bytes every message carries after its header.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SpdmMessageGeneralPayload {
    pub param1: u8,
    pub param2: u8,
}

impl Codec for SpdmMessageGeneralPayload {
    fn encode(&self, bytes: &mut Writer) {
        self.param1.encode(bytes);
        self.param2.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmMessageGeneralPayload> {
        let param1 = u8::read(r)?;
        let param2 = u8::read(r)?;
        Some(SpdmMessageGeneralPayload { param1, param2 })
    }
}

/// A raw response handed back by the error-recovery subsystem after a
/// successful RESPOND_IF_READY retry.
pub struct ReceivedMessage {
    pub receive_buffer: [u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE],
    pub used: usize,
}

impl ReceivedMessage {
    pub fn new(bytes: &[u8]) -> Option<ReceivedMessage> {
        if bytes.len() > config::MAX_SPDM_MESSAGE_BUFFER_SIZE {
            return None;
        }
        let mut rm = ReceivedMessage {
            receive_buffer: [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE],
            used: bytes.len(),
        };
        rm.receive_buffer[..bytes.len()].copy_from_slice(bytes);
        Some(rm)
    }
}

impl AsRef<[u8]> for ReceivedMessage {
    fn as_ref(&self) -> &[u8] {
        &self.receive_buffer[..self.used]
    }
}

#[derive(Debug)]
pub enum SpdmMessagePayload {
    SpdmGetVersionRequest(SpdmGetVersionRequestPayload),
    SpdmVersionResponse(SpdmVersionResponsePayload),

    SpdmGetCapabilitiesRequest(SpdmGetCapabilitiesRequestPayload),
    SpdmCapabilitiesResponse(SpdmCapabilitiesResponsePayload),

    SpdmNegotiateAlgorithmsRequest(SpdmNegotiateAlgorithmsRequestPayload),
    SpdmAlgorithmsResponse(SpdmAlgorithmsResponsePayload),

    SpdmGetDigestsRequest(SpdmGetDigestsRequestPayload),
    SpdmDigestsResponse(SpdmDigestsResponsePayload),

    SpdmGetCertificateRequest(SpdmGetCertificateRequestPayload),
    SpdmCertificateResponse(SpdmCertificateResponsePayload),

    SpdmChallengeRequest(SpdmChallengeRequestPayload),
    SpdmChallengeAuthResponse(SpdmChallengeAuthResponsePayload),

    SpdmGetMeasurementsRequest(SpdmGetMeasurementsRequestPayload),
    SpdmMeasurementsResponse(SpdmMeasurementsResponsePayload),

    SpdmKeyExchangeRequest(SpdmKeyExchangeRequestPayload),
    SpdmKeyExchangeResponse(SpdmKeyExchangeResponsePayload),

    SpdmFinishRequest(SpdmFinishRequestPayload),
    SpdmFinishResponse(SpdmFinishResponsePayload),

    SpdmPskExchangeRequest(SpdmPskExchangeRequestPayload),
    SpdmPskExchangeResponse(SpdmPskExchangeResponsePayload),

    SpdmPskFinishRequest(SpdmPskFinishRequestPayload),
    SpdmPskFinishResponse(SpdmPskFinishResponsePayload),

    SpdmHeartbeatRequest(SpdmHeartbeatRequestPayload),
    SpdmHeartbeatResponse(SpdmHeartbeatResponsePayload),

    SpdmKeyUpdateRequest(SpdmKeyUpdateRequestPayload),
    SpdmKeyUpdateResponse(SpdmKeyUpdateResponsePayload),

    SpdmGetEncapsulatedRequest(SpdmGetEncapsulatedRequestPayload),
    SpdmEncapsulatedRequest(SpdmEncapsulatedRequestPayload),
    SpdmDeliverEncapsulatedResponse(SpdmDeliverEncapsulatedResponsePayload),
    SpdmEncapsulatedResponseAck(SpdmEncapsulatedResponseAckPayload),

    SpdmEndSessionRequest(SpdmEndSessionRequestPayload),
    SpdmEndSessionResponse(SpdmEndSessionResponsePayload),

    SpdmErrorResponse(SpdmErrorResponsePayload),
}

#[derive(Debug)]
pub struct SpdmMessage {
    pub header: SpdmMessageHeader,
    pub payload: SpdmMessagePayload,
}

impl SpdmCodec for SpdmMessage {
    fn spdm_encode(&self, context: &mut SpdmContext, bytes: &mut Writer) {
        self.header.encode(bytes);
        match &self.payload {
            SpdmMessagePayload::SpdmGetVersionRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmVersionResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmGetCapabilitiesRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmCapabilitiesResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmNegotiateAlgorithmsRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmAlgorithmsResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmGetDigestsRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmDigestsResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmGetCertificateRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmCertificateResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmChallengeRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmChallengeAuthResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmGetMeasurementsRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmMeasurementsResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmKeyExchangeRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmKeyExchangeResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmFinishRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmFinishResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmPskExchangeRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmPskExchangeResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmPskFinishRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmPskFinishResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmHeartbeatRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmHeartbeatResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmKeyUpdateRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmKeyUpdateResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmGetEncapsulatedRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmEncapsulatedRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmDeliverEncapsulatedResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmEncapsulatedResponseAck(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmEndSessionRequest(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmEndSessionResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
            SpdmMessagePayload::SpdmErrorResponse(payload) => {
                payload.spdm_encode(context, bytes);
            }
        }
    }

    fn spdm_read(context: &mut SpdmContext, r: &mut Reader) -> Option<SpdmMessage> {
        let header = SpdmMessageHeader::read(r)?;
        let payload = match header.request_response_code {
            SpdmRequestResponseCode::SpdmRequestGetVersion => {
                Some(SpdmMessagePayload::SpdmGetVersionRequest(
                    SpdmGetVersionRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseVersion => {
                Some(SpdmMessagePayload::SpdmVersionResponse(
                    SpdmVersionResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestGetCapabilities => {
                Some(SpdmMessagePayload::SpdmGetCapabilitiesRequest(
                    SpdmGetCapabilitiesRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseCapabilities => {
                Some(SpdmMessagePayload::SpdmCapabilitiesResponse(
                    SpdmCapabilitiesResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestNegotiateAlgorithms => {
                Some(SpdmMessagePayload::SpdmNegotiateAlgorithmsRequest(
                    SpdmNegotiateAlgorithmsRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseAlgorithms => {
                Some(SpdmMessagePayload::SpdmAlgorithmsResponse(
                    SpdmAlgorithmsResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestGetDigests => {
                Some(SpdmMessagePayload::SpdmGetDigestsRequest(
                    SpdmGetDigestsRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseDigests => {
                Some(SpdmMessagePayload::SpdmDigestsResponse(
                    SpdmDigestsResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestGetCertificate => {
                Some(SpdmMessagePayload::SpdmGetCertificateRequest(
                    SpdmGetCertificateRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseCertificate => {
                Some(SpdmMessagePayload::SpdmCertificateResponse(
                    SpdmCertificateResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestChallenge => {
                Some(SpdmMessagePayload::SpdmChallengeRequest(
                    SpdmChallengeRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseChallengeAuth => {
                Some(SpdmMessagePayload::SpdmChallengeAuthResponse(
                    SpdmChallengeAuthResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestGetMeasurements => {
                Some(SpdmMessagePayload::SpdmGetMeasurementsRequest(
                    SpdmGetMeasurementsRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseMeasurements => {
                Some(SpdmMessagePayload::SpdmMeasurementsResponse(
                    SpdmMeasurementsResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestKeyExchange => {
                Some(SpdmMessagePayload::SpdmKeyExchangeRequest(
                    SpdmKeyExchangeRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseKeyExchangeRsp => {
                Some(SpdmMessagePayload::SpdmKeyExchangeResponse(
                    SpdmKeyExchangeResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestFinish => {
                Some(SpdmMessagePayload::SpdmFinishRequest(
                    SpdmFinishRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseFinishRsp => {
                Some(SpdmMessagePayload::SpdmFinishResponse(
                    SpdmFinishResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestPskExchange => {
                Some(SpdmMessagePayload::SpdmPskExchangeRequest(
                    SpdmPskExchangeRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponsePskExchangeRsp => {
                Some(SpdmMessagePayload::SpdmPskExchangeResponse(
                    SpdmPskExchangeResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestPskFinish => {
                Some(SpdmMessagePayload::SpdmPskFinishRequest(
                    SpdmPskFinishRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponsePskFinishRsp => {
                Some(SpdmMessagePayload::SpdmPskFinishResponse(
                    SpdmPskFinishResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestHeartbeat => {
                Some(SpdmMessagePayload::SpdmHeartbeatRequest(
                    SpdmHeartbeatRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseHeartbeatAck => {
                Some(SpdmMessagePayload::SpdmHeartbeatResponse(
                    SpdmHeartbeatResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestKeyUpdate => {
                Some(SpdmMessagePayload::SpdmKeyUpdateRequest(
                    SpdmKeyUpdateRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseKeyUpdateAck => {
                Some(SpdmMessagePayload::SpdmKeyUpdateResponse(
                    SpdmKeyUpdateResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestGetEncapsulatedRequest => {
                Some(SpdmMessagePayload::SpdmGetEncapsulatedRequest(
                    SpdmGetEncapsulatedRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseEncapsulatedRequest => {
                Some(SpdmMessagePayload::SpdmEncapsulatedRequest(
                    SpdmEncapsulatedRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestDeliverEncapsulatedResponse => {
                Some(SpdmMessagePayload::SpdmDeliverEncapsulatedResponse(
                    SpdmDeliverEncapsulatedResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseEncapsulatedResponseAck => {
                Some(SpdmMessagePayload::SpdmEncapsulatedResponseAck(
                    SpdmEncapsulatedResponseAckPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmRequestEndSession => {
                Some(SpdmMessagePayload::SpdmEndSessionRequest(
                    SpdmEndSessionRequestPayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseEndSessionAck => {
                Some(SpdmMessagePayload::SpdmEndSessionResponse(
                    SpdmEndSessionResponsePayload::spdm_read(context, r)?,
                ))
            }
            SpdmRequestResponseCode::SpdmResponseError => {
                Some(SpdmMessagePayload::SpdmErrorResponse(
                    SpdmErrorResponsePayload::spdm_read(context, r)?,
                ))
            }
            _ => None,
        }?;
        Some(SpdmMessage { header, payload })
    }
}
