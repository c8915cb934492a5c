// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::spdm_codec::SpdmCodec;
use crate::common::SpdmContext;
use crate::config;
use codec::{Codec, Reader, Writer};

#[derive(Debug, Copy, Clone)]
pub struct SpdmOpaqueStruct {
    pub data_size: u16,
    pub data: [u8; config::MAX_SPDM_OPAQUE_SIZE],
}

impl Default for SpdmOpaqueStruct {
    fn default() -> SpdmOpaqueStruct {
        SpdmOpaqueStruct {
            data_size: 0,
            data: [0u8; config::MAX_SPDM_OPAQUE_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmOpaqueStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

impl SpdmCodec for SpdmOpaqueStruct {
    fn spdm_encode(&self, _context: &mut SpdmContext, bytes: &mut Writer) {
        self.data_size.encode(bytes);
        let _ = bytes.extend_from_slice(self.as_ref());
    }

    fn spdm_read(_context: &mut SpdmContext, r: &mut Reader) -> Option<SpdmOpaqueStruct> {
        let data_size = u16::read(r)?;
        if data_size as usize > config::MAX_SPDM_OPAQUE_SIZE {
            return None;
        }
        let mut opaque = SpdmOpaqueStruct {
            data_size,
            ..Default::default()
        };
        opaque.data[..data_size as usize].copy_from_slice(r.take(data_size as usize)?);
        Some(opaque)
    }
}
