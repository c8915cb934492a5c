// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::opaque::SpdmOpaqueStruct;
use crate::common::spdm_codec::SpdmCodec;
use crate::config;
use crate::protocol::{
    SpdmDigestStruct, SpdmMeasurementSummaryHashType, SpdmPskContextStruct, SpdmPskHintStruct,
};
use codec::{Codec, Reader, Writer};

#[derive(Debug, Clone, Default)]
pub struct SpdmPskExchangeRequestPayload {
    pub measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    pub req_session_id: u16,
    pub psk_hint: SpdmPskHintStruct,
    pub psk_context: SpdmPskContextStruct,
    pub opaque: SpdmOpaqueStruct,
}

impl SpdmCodec for SpdmPskExchangeRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.measurement_summary_hash_type.encode(bytes); // param1
        0u8.encode(bytes); // param2
        self.req_session_id.encode(bytes);
        self.psk_hint.data_size.encode(bytes);
        self.psk_context.data_size.encode(bytes);
        self.opaque.data_size.encode(bytes);
        let _ = bytes.extend_from_slice(self.psk_hint.as_ref());
        let _ = bytes.extend_from_slice(self.psk_context.as_ref());
        let _ = bytes.extend_from_slice(self.opaque.as_ref());
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmPskExchangeRequestPayload> {
        let measurement_summary_hash_type = SpdmMeasurementSummaryHashType::read(r)?; // param1
        u8::read(r)?; // param2
        let req_session_id = u16::read(r)?;
        let psk_hint_size = u16::read(r)?;
        let psk_context_size = u16::read(r)?;
        let opaque_size = u16::read(r)?;
        if psk_hint_size as usize > config::MAX_SPDM_PSK_HINT_SIZE
            || psk_context_size as usize > config::MAX_SPDM_PSK_CONTEXT_SIZE
            || opaque_size as usize > config::MAX_SPDM_OPAQUE_SIZE
        {
            return None;
        }

        let mut psk_hint = SpdmPskHintStruct {
            data_size: psk_hint_size,
            ..Default::default()
        };
        psk_hint.data[..psk_hint_size as usize].copy_from_slice(r.take(psk_hint_size as usize)?);

        let mut psk_context = SpdmPskContextStruct {
            data_size: psk_context_size,
            ..Default::default()
        };
        psk_context.data[..psk_context_size as usize]
            .copy_from_slice(r.take(psk_context_size as usize)?);

        let mut opaque = SpdmOpaqueStruct {
            data_size: opaque_size,
            ..Default::default()
        };
        opaque.data[..opaque_size as usize].copy_from_slice(r.take(opaque_size as usize)?);

        Some(SpdmPskExchangeRequestPayload {
            measurement_summary_hash_type,
            req_session_id,
            psk_hint,
            psk_context,
            opaque,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmPskExchangeResponsePayload {
    pub heartbeat_period: u8,
    pub rsp_session_id: u16,
    pub psk_context: SpdmPskContextStruct,
    pub measurement_summary_hash: SpdmDigestStruct,
    pub opaque: SpdmOpaqueStruct,
    pub verify_data: SpdmDigestStruct,
}

impl SpdmCodec for SpdmPskExchangeResponsePayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.heartbeat_period.encode(bytes); // param1
        0u8.encode(bytes); // param2
        self.rsp_session_id.encode(bytes);
        0u16.encode(bytes); // reserved
        self.psk_context.data_size.encode(bytes);
        self.opaque.data_size.encode(bytes);
        if context.runtime_info.need_measurement_summary_hash {
            self.measurement_summary_hash.spdm_encode(context, bytes);
        }
        let _ = bytes.extend_from_slice(self.psk_context.as_ref());
        let _ = bytes.extend_from_slice(self.opaque.as_ref());
        self.verify_data.spdm_encode(context, bytes);
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmPskExchangeResponsePayload> {
        let heartbeat_period = u8::read(r)?; // param1
        u8::read(r)?; // param2
        let rsp_session_id = u16::read(r)?;
        u16::read(r)?; // reserved
        let psk_context_size = u16::read(r)?;
        let opaque_size = u16::read(r)?;
        if psk_context_size as usize > config::MAX_SPDM_PSK_CONTEXT_SIZE
            || opaque_size as usize > config::MAX_SPDM_OPAQUE_SIZE
        {
            return None;
        }
        let measurement_summary_hash = if context.runtime_info.need_measurement_summary_hash {
            SpdmDigestStruct::spdm_read(context, r)?
        } else {
            SpdmDigestStruct::default()
        };

        let mut psk_context = SpdmPskContextStruct {
            data_size: psk_context_size,
            ..Default::default()
        };
        psk_context.data[..psk_context_size as usize]
            .copy_from_slice(r.take(psk_context_size as usize)?);

        let mut opaque = SpdmOpaqueStruct {
            data_size: opaque_size,
            ..Default::default()
        };
        opaque.data[..opaque_size as usize].copy_from_slice(r.take(opaque_size as usize)?);

        let verify_data = SpdmDigestStruct::spdm_read(context, r)?;

        Some(SpdmPskExchangeResponsePayload {
            heartbeat_period,
            rsp_session_id,
            psk_context,
            measurement_summary_hash,
            opaque,
            verify_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SpdmBaseHashAlgo, SPDM_MAX_HASH_SIZE};
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_psk_exchange_response_payload() {
        let u8_slice = &mut [0u8; 128];
        let mut writer = Writer::init(u8_slice);
        let mut value = SpdmPskExchangeResponsePayload {
            heartbeat_period: 0,
            rsp_session_id: 0x11aa,
            psk_context: SpdmPskContextStruct {
                data_size: 32,
                ..Default::default()
            },
            measurement_summary_hash: SpdmDigestStruct::default(),
            opaque: SpdmOpaqueStruct::default(),
            verify_data: SpdmDigestStruct {
                data_size: 48,
                data: [0x99u8; SPDM_MAX_HASH_SIZE],
            },
        };
        value.psk_context.data[..32].copy_from_slice(&[0x77u8; 32]);

        create_spdm_context!(context);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(2 + 2 + 2 + 2 + 2 + 32 + 48, writer.used());

        let mut reader = Reader::init(u8_slice);
        let response =
            SpdmPskExchangeResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(response.rsp_session_id, 0x11aa);
        assert_eq!(response.psk_context.data_size, 32);
        assert_eq!(response.verify_data.data[0], 0x99);
    }
}
