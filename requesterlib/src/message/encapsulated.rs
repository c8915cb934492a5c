// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

enum_builder! {
    @U8
    EnumName: SpdmEncapsulatedPayloadType;
    EnumVal{
        SpdmEncapsulatedPayloadTypeAbsent => 0x0,
        SpdmEncapsulatedPayloadTypePresent => 0x1,
        SpdmEncapsulatedPayloadTypeReqSlotNumber => 0x2
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmGetEncapsulatedRequestPayload {}

impl SpdmCodec for SpdmGetEncapsulatedRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        0u8.encode(bytes); // param1
        0u8.encode(bytes); // param2
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmGetEncapsulatedRequestPayload> {
        u8::read(r)?; // param1
        u8::read(r)?; // param2

        Some(SpdmGetEncapsulatedRequestPayload {})
    }
}

/// The encapsulated request message itself follows the header as raw
/// bytes; the requester dispatches on its own header.
#[derive(Debug, Clone, Default)]
pub struct SpdmEncapsulatedRequestPayload {
    pub request_id: u8,
}

impl SpdmCodec for SpdmEncapsulatedRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.request_id.encode(bytes); // param1
        0u8.encode(bytes); // param2
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmEncapsulatedRequestPayload> {
        let request_id = u8::read(r)?; // param1
        u8::read(r)?; // param2

        Some(SpdmEncapsulatedRequestPayload { request_id })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmDeliverEncapsulatedResponsePayload {
    pub request_id: u8,
}

impl SpdmCodec for SpdmDeliverEncapsulatedResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.request_id.encode(bytes); // param1
        0u8.encode(bytes); // param2
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmDeliverEncapsulatedResponsePayload> {
        let request_id = u8::read(r)?; // param1
        u8::read(r)?; // param2

        Some(SpdmDeliverEncapsulatedResponsePayload { request_id })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmEncapsulatedResponseAckPayload {
    pub request_id: u8,
    pub payload_type: SpdmEncapsulatedPayloadType,
}

impl SpdmCodec for SpdmEncapsulatedResponseAckPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.request_id.encode(bytes); // param1
        self.payload_type.encode(bytes); // param2
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmEncapsulatedResponseAckPayload> {
        let request_id = u8::read(r)?; // param1
        let payload_type = SpdmEncapsulatedPayloadType::read(r)?; // param2

        Some(SpdmEncapsulatedResponseAckPayload {
            request_id,
            payload_type,
        })
    }
}
