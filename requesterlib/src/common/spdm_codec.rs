// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::SpdmContext;
use crate::protocol::{
    SpdmDheExchangeStruct, SpdmDigestStruct, SpdmSignatureStruct, SPDM_MAX_ASYM_KEY_SIZE,
    SPDM_MAX_DHE_KEY_SIZE, SPDM_MAX_HASH_SIZE,
};
use codec::{Reader, Writer};

/// Encoding that depends on the negotiated algorithms: digest, signature
/// and exchange-data fields carry no length of their own, their size is a
/// property of the connection.
pub trait SpdmCodec: Sized {
    fn spdm_encode(&self, context: &mut SpdmContext, bytes: &mut Writer);
    fn spdm_read(context: &mut SpdmContext, reader: &mut Reader) -> Option<Self>;
}

impl SpdmCodec for SpdmDigestStruct {
    fn spdm_encode(&self, _context: &mut SpdmContext, bytes: &mut Writer) {
        let _ = bytes.extend_from_slice(self.as_ref());
    }

    fn spdm_read(context: &mut SpdmContext, r: &mut Reader) -> Option<SpdmDigestStruct> {
        let data_size = context.negotiate_info.base_hash_sel.get_size();
        if data_size == 0 || data_size as usize > SPDM_MAX_HASH_SIZE {
            return None;
        }
        let mut digest = SpdmDigestStruct {
            data_size,
            ..Default::default()
        };
        digest.data[..data_size as usize].copy_from_slice(r.take(data_size as usize)?);
        Some(digest)
    }
}

impl SpdmCodec for SpdmSignatureStruct {
    fn spdm_encode(&self, _context: &mut SpdmContext, bytes: &mut Writer) {
        let _ = bytes.extend_from_slice(self.as_ref());
    }

    fn spdm_read(context: &mut SpdmContext, r: &mut Reader) -> Option<SpdmSignatureStruct> {
        let data_size = context.negotiate_info.base_asym_sel.get_size();
        if data_size == 0 || data_size as usize > SPDM_MAX_ASYM_KEY_SIZE {
            return None;
        }
        let mut signature = SpdmSignatureStruct {
            data_size,
            ..Default::default()
        };
        signature.data[..data_size as usize].copy_from_slice(r.take(data_size as usize)?);
        Some(signature)
    }
}

impl SpdmCodec for SpdmDheExchangeStruct {
    fn spdm_encode(&self, _context: &mut SpdmContext, bytes: &mut Writer) {
        let _ = bytes.extend_from_slice(self.as_ref());
    }

    fn spdm_read(context: &mut SpdmContext, r: &mut Reader) -> Option<SpdmDheExchangeStruct> {
        let data_size = context.negotiate_info.dhe_sel.get_size();
        if data_size == 0 || data_size as usize > SPDM_MAX_DHE_KEY_SIZE {
            return None;
        }
        let mut exchange = SpdmDheExchangeStruct {
            data_size,
            ..Default::default()
        };
        exchange.data[..data_size as usize].copy_from_slice(r.take(data_size as usize)?);
        Some(exchange)
    }
}
