// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

enum_builder! {
    @U8
    EnumName: SpdmErrorCode;
    EnumVal{
        SpdmErrorInvalidRequest => 0x1,
        SpdmErrorBusy => 0x3,
        SpdmErrorUnexpectedRequest => 0x4,
        SpdmErrorUnspecified => 0x5,
        SpdmErrorDecryptError => 0x6,
        SpdmErrorUnsupportedRequest => 0x7,
        SpdmErrorRequestInFlight => 0x8,
        SpdmErrorInvalidResponseCode => 0x9,
        SpdmErrorSessionLimitExceeded => 0xA,
        SpdmErrorVersionMismatch => 0x41,
        SpdmErrorResponseNotReady => 0x42,
        SpdmErrorRequestResynch => 0x43,
        SpdmErrorVendorDefined => 0xFF
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SpdmErrorResponseNotReadyExtData {
    pub rdt_exponent: u8,
    pub request_code: u8,
    pub token: u8,
    pub rdtm: u8,
}

impl Codec for SpdmErrorResponseNotReadyExtData {
    fn encode(&self, bytes: &mut Writer) {
        self.rdt_exponent.encode(bytes);
        self.request_code.encode(bytes);
        self.token.encode(bytes);
        self.rdtm.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmErrorResponseNotReadyExtData> {
        let rdt_exponent = u8::read(r)?;
        let request_code = u8::read(r)?;
        let token = u8::read(r)?;
        let rdtm = u8::read(r)?;

        Some(SpdmErrorResponseNotReadyExtData {
            rdt_exponent,
            request_code,
            token,
            rdtm,
        })
    }
}

#[derive(Debug, Copy, Clone)]
pub enum SpdmErrorResponseExtData {
    SpdmErrorExtDataNone,
    SpdmErrorExtDataNotReady(SpdmErrorResponseNotReadyExtData),
}

impl Default for SpdmErrorResponseExtData {
    fn default() -> SpdmErrorResponseExtData {
        SpdmErrorResponseExtData::SpdmErrorExtDataNone
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmErrorResponsePayload {
    pub error_code: SpdmErrorCode,
    pub error_data: u8,
    pub extended_data: SpdmErrorResponseExtData,
}

impl SpdmCodec for SpdmErrorResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.error_code.encode(bytes); // param1
        self.error_data.encode(bytes); // param2
        match &self.extended_data {
            SpdmErrorResponseExtData::SpdmErrorExtDataNotReady(ext_data) => {
                ext_data.encode(bytes);
            }
            SpdmErrorResponseExtData::SpdmErrorExtDataNone => {}
        }
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmErrorResponsePayload> {
        let error_code = SpdmErrorCode::read(r)?; // param1
        let error_data = u8::read(r)?; // param2
        let extended_data = if error_code == SpdmErrorCode::SpdmErrorResponseNotReady {
            SpdmErrorResponseExtData::SpdmErrorExtDataNotReady(
                SpdmErrorResponseNotReadyExtData::read(r)?,
            )
        } else {
            SpdmErrorResponseExtData::SpdmErrorExtDataNone
        };

        Some(SpdmErrorResponsePayload {
            error_code,
            error_data,
            extended_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_error_response_payload_not_ready() {
        let u8_slice = &mut [0u8; 6];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmErrorResponsePayload {
            error_code: SpdmErrorCode::SpdmErrorResponseNotReady,
            error_data: 0,
            extended_data: SpdmErrorResponseExtData::SpdmErrorExtDataNotReady(
                SpdmErrorResponseNotReadyExtData {
                    rdt_exponent: 1,
                    request_code: 0x84,
                    token: 7,
                    rdtm: 1,
                },
            ),
        };

        create_spdm_context!(context);

        value.spdm_encode(&mut context, &mut writer);
        assert_eq!(6, writer.used());

        let mut reader = Reader::init(u8_slice);
        let payload = SpdmErrorResponsePayload::spdm_read(&mut context, &mut reader).unwrap();
        assert_eq!(payload.error_code, SpdmErrorCode::SpdmErrorResponseNotReady);
        if let SpdmErrorResponseExtData::SpdmErrorExtDataNotReady(ext) = payload.extended_data {
            assert_eq!(ext.request_code, 0x84);
            assert_eq!(ext.token, 7);
        } else {
            panic!("expected not-ready extended data");
        }
    }

    #[test]
    fn test_case1_spdm_error_code_reserved() {
        let mut reader = Reader::init(&[0x3f]);
        let code = SpdmErrorCode::read(&mut reader).unwrap();
        assert_eq!(code, SpdmErrorCode::Unknown(0x3f));
        assert_eq!(code.get_u8(), 0x3f);
    }
}
