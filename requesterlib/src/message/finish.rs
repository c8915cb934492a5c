// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::protocol::{
    SpdmDigestStruct, SpdmRequestCapabilityFlags, SpdmResponseCapabilityFlags,
    SpdmSignatureStruct,
};
use codec::{Codec, Reader, Writer};

bitflags! {
    #[derive(Default)]
    pub struct SpdmFinishRequestAttributes: u8 {
        const SIGNATURE_INCLUDED = 0b0000_0001;
    }
}

impl Codec for SpdmFinishRequestAttributes {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmFinishRequestAttributes> {
        let bits = u8::read(r)?;
        SpdmFinishRequestAttributes::from_bits(bits)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmFinishRequestPayload {
    pub finish_request_attributes: SpdmFinishRequestAttributes,
    pub req_slot_id: u8,
    pub signature: SpdmSignatureStruct,
    pub verify_data: SpdmDigestStruct,
}

impl SpdmCodec for SpdmFinishRequestPayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.finish_request_attributes.encode(bytes); // param1
        self.req_slot_id.encode(bytes); // param2
        if self
            .finish_request_attributes
            .contains(SpdmFinishRequestAttributes::SIGNATURE_INCLUDED)
        {
            self.signature.spdm_encode(context, bytes);
        }
        self.verify_data.spdm_encode(context, bytes);
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmFinishRequestPayload> {
        let finish_request_attributes = SpdmFinishRequestAttributes::read(r)?; // param1
        let req_slot_id = u8::read(r)?; // param2
        let signature = if finish_request_attributes
            .contains(SpdmFinishRequestAttributes::SIGNATURE_INCLUDED)
        {
            SpdmSignatureStruct::spdm_read(context, r)?
        } else {
            SpdmSignatureStruct::default()
        };
        let verify_data = SpdmDigestStruct::spdm_read(context, r)?;

        Some(SpdmFinishRequestPayload {
            finish_request_attributes,
            req_slot_id,
            signature,
            verify_data,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmFinishResponsePayload {
    pub verify_data: SpdmDigestStruct,
}

impl SpdmFinishResponsePayload {
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

impl SpdmCodec for SpdmFinishResponsePayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        0u8.encode(bytes); // param1
        0u8.encode(bytes); // param2
        // ResponderVerifyData rides along only when the handshake runs in
        // the clear
        if Self::in_clear_text(context) {
            self.verify_data.spdm_encode(context, bytes);
        }
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmFinishResponsePayload> {
        u8::read(r)?; // param1
        u8::read(r)?; // param2
        let verify_data = if Self::in_clear_text(context) {
            SpdmDigestStruct::spdm_read(context, r)?
        } else {
            SpdmDigestStruct::default()
        };

        Some(SpdmFinishResponsePayload { verify_data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SpdmBaseHashAlgo, SPDM_MAX_HASH_SIZE};
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_finish_request_payload() {
        let u8_slice = &mut [0u8; 2 + 48];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmFinishRequestPayload {
            finish_request_attributes: SpdmFinishRequestAttributes::empty(),
            req_slot_id: 0,
            signature: SpdmSignatureStruct::default(),
            verify_data: SpdmDigestStruct {
                data_size: 48,
                data: [0xccu8; SPDM_MAX_HASH_SIZE],
            },
        };

        create_spdm_context!(context);
        context.negotiate_info.base_hash_sel = SpdmBaseHashAlgo::TPM_ALG_SHA_384;

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(2 + 48, writer.used());

        let mut reader = Reader::init(u8_slice);
        let request = SpdmFinishRequestPayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(request.verify_data.data_size, 48);
        assert_eq!(request.verify_data.data[0], 0xcc);
    }

    #[test]
    fn test_case0_spdm_finish_response_payload() {
        let u8_slice = &mut [0u8; 8];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmFinishResponsePayload {
            verify_data: SpdmDigestStruct::default(),
        };

        create_spdm_context!(context);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(2, writer.used());

        let mut reader = Reader::init(u8_slice);
        assert!(SpdmFinishResponsePayload::spdm_read(&mut context, &mut reader).is_some());
    }
}
