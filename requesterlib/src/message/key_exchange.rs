// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::opaque::SpdmOpaqueStruct;
use crate::common::spdm_codec::SpdmCodec;
use crate::protocol::{
    SpdmDheExchangeStruct, SpdmDigestStruct, SpdmMeasurementSummaryHashType, SpdmRandomStruct,
    SpdmRequestCapabilityFlags, SpdmResponseCapabilityFlags, SpdmSignatureStruct,
};
use codec::{Codec, Reader, Writer};

#[derive(Debug, Clone, Default)]
pub struct SpdmKeyExchangeRequestPayload {
    pub measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    pub slot_id: u8,
    pub req_session_id: u16,
    pub random: SpdmRandomStruct,
    pub exchange: SpdmDheExchangeStruct,
    pub opaque: SpdmOpaqueStruct,
}

impl SpdmCodec for SpdmKeyExchangeRequestPayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.measurement_summary_hash_type.encode(bytes); // param1
        self.slot_id.encode(bytes); // param2
        self.req_session_id.encode(bytes);
        0u16.encode(bytes); // reserved
        self.random.encode(bytes);
        self.exchange.spdm_encode(context, bytes);
        self.opaque.spdm_encode(context, bytes);
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmKeyExchangeRequestPayload> {
        let measurement_summary_hash_type = SpdmMeasurementSummaryHashType::read(r)?; // param1
        let slot_id = u8::read(r)?; // param2
        let req_session_id = u16::read(r)?;
        u16::read(r)?; // reserved
        let random = SpdmRandomStruct::read(r)?;
        let exchange = SpdmDheExchangeStruct::spdm_read(context, r)?;
        let opaque = SpdmOpaqueStruct::spdm_read(context, r)?;

        Some(SpdmKeyExchangeRequestPayload {
            measurement_summary_hash_type,
            slot_id,
            req_session_id,
            random,
            exchange,
            opaque,
        })
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmKeyExchangeMutAuthAttributes: u8 {
        const MUT_AUTH_REQ = 0b0000_0001;
        const MUT_AUTH_REQ_WITH_ENCAP_REQUEST = 0b0000_0010;
        const MUT_AUTH_REQ_WITH_GET_DIGESTS = 0b0000_0100;
    }
}

impl Codec for SpdmKeyExchangeMutAuthAttributes {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmKeyExchangeMutAuthAttributes> {
        let bits = u8::read(r)?;
        SpdmKeyExchangeMutAuthAttributes::from_bits(bits)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmKeyExchangeResponsePayload {
    pub heartbeat_period: u8,
    pub rsp_session_id: u16,
    pub mut_auth_req: SpdmKeyExchangeMutAuthAttributes,
    pub req_slot_id_param: u8,
    pub random: SpdmRandomStruct,
    pub exchange: SpdmDheExchangeStruct,
    pub measurement_summary_hash: SpdmDigestStruct,
    pub opaque: SpdmOpaqueStruct,
    pub signature: SpdmSignatureStruct,
    pub verify_data: SpdmDigestStruct,
}

impl SpdmKeyExchangeResponsePayload {
    pub fn in_clear_text(context: &common::SpdmContext) -> bool {
        context
            .negotiate_info
            .req_capabilities_sel
            .contains(SpdmRequestCapabilityFlags::HANDSHAKE_IN_THE_CLEAR_CAP)
            && context
                .negotiate_info
                .rsp_capabilities_sel
                .contains(SpdmResponseCapabilityFlags::HANDSHAKE_IN_THE_CLEAR_CAP)
    }
}

impl SpdmCodec for SpdmKeyExchangeResponsePayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.heartbeat_period.encode(bytes); // param1
        0u8.encode(bytes); // param2
        self.rsp_session_id.encode(bytes);
        self.mut_auth_req.encode(bytes);
        self.req_slot_id_param.encode(bytes);
        self.random.encode(bytes);
        self.exchange.spdm_encode(context, bytes);
        if context.runtime_info.need_measurement_summary_hash {
            self.measurement_summary_hash.spdm_encode(context, bytes);
        }
        self.opaque.spdm_encode(context, bytes);
        self.signature.spdm_encode(context, bytes);
        if !Self::in_clear_text(context) {
            self.verify_data.spdm_encode(context, bytes);
        }
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmKeyExchangeResponsePayload> {
        let heartbeat_period = u8::read(r)?; // param1
        u8::read(r)?; // param2
        let rsp_session_id = u16::read(r)?;
        let mut_auth_req = SpdmKeyExchangeMutAuthAttributes::read(r)?;
        let req_slot_id_param = u8::read(r)?;
        let random = SpdmRandomStruct::read(r)?;
        let exchange = SpdmDheExchangeStruct::spdm_read(context, r)?;
        let measurement_summary_hash = if context.runtime_info.need_measurement_summary_hash {
            SpdmDigestStruct::spdm_read(context, r)?
        } else {
            SpdmDigestStruct::default()
        };
        let opaque = SpdmOpaqueStruct::spdm_read(context, r)?;
        let signature = SpdmSignatureStruct::spdm_read(context, r)?;
        let verify_data = if !Self::in_clear_text(context) {
            SpdmDigestStruct::spdm_read(context, r)?
        } else {
            SpdmDigestStruct::default()
        };

        Some(SpdmKeyExchangeResponsePayload {
            heartbeat_period,
            rsp_session_id,
            mut_auth_req,
            req_slot_id_param,
            random,
            exchange,
            measurement_summary_hash,
            opaque,
            signature,
            verify_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_key_exchange_response_payload() {
        let u8_slice = &mut [0u8; 512];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmKeyExchangeResponsePayload {
            heartbeat_period: 5,
            rsp_session_id: 0xbeef,
            mut_auth_req: SpdmKeyExchangeMutAuthAttributes::empty(),
            req_slot_id_param: 0,
            random: SpdmRandomStruct { data: [0x12u8; 32] },
            exchange: SpdmDheExchangeStruct {
                data_size: 96,
                data: [0x44u8; SPDM_MAX_DHE_KEY_SIZE],
            },
            measurement_summary_hash: SpdmDigestStruct::default(),
            opaque: SpdmOpaqueStruct::default(),
            signature: SpdmSignatureStruct {
                data_size: 96,
                data: [0x5cu8; SPDM_MAX_ASYM_KEY_SIZE],
            },
            verify_data: SpdmDigestStruct {
                data_size: 48,
                data: [0x66u8; SPDM_MAX_HASH_SIZE],
            },
        };

        create_spdm_context!(context);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;
        context.negotiate_info.base_asym_sel = SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384;
        context.negotiate_info.dhe_sel = SpdmDheAlgo::SECP_384_R1;

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(2 + 2 + 1 + 1 + 32 + 96 + 2 + 96 + 48, writer.used());

        let mut reader = Reader::init(u8_slice);
        let response =
            SpdmKeyExchangeResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(response.heartbeat_period, 5);
        assert_eq!(response.rsp_session_id, 0xbeef);
        assert_eq!(response.exchange.data_size, 96);
        assert_eq!(response.verify_data.data_size, 48);
    }
}
