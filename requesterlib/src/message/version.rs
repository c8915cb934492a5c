// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::config;
use crate::protocol::SpdmVersionStruct;
use codec::{Codec, Reader, Writer};

#[derive(Debug, Clone, Default)]
pub struct SpdmGetVersionRequestPayload {}

impl SpdmCodec for SpdmGetVersionRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        0u8.encode(bytes); // param1
        0u8.encode(bytes); // param2
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmGetVersionRequestPayload> {
        u8::read(r)?; // param1
        u8::read(r)?; // param2

        Some(SpdmGetVersionRequestPayload {})
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmVersionResponsePayload {
    pub version_number_entry_count: u8,
    pub versions: [SpdmVersionStruct; config::MAX_SPDM_VERSION_COUNT],
}

impl SpdmCodec for SpdmVersionResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        0u8.encode(bytes); // param1
        0u8.encode(bytes); // param2
        0u8.encode(bytes); // reserved
        self.version_number_entry_count.encode(bytes);
        for version in self
            .versions
            .iter()
            .take(self.version_number_entry_count as usize)
        {
            version.encode(bytes);
        }
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmVersionResponsePayload> {
        u8::read(r)?; // param1
        u8::read(r)?; // param2
        u8::read(r)?; // reserved
        let version_number_entry_count = u8::read(r)?;
        if version_number_entry_count == 0
            || version_number_entry_count as usize > config::MAX_SPDM_VERSION_COUNT
        {
            return None;
        }

        // a longer trailing list than the declared count is tolerated; only
        // the declared entries are considered
        let mut versions = [SpdmVersionStruct::default(); config::MAX_SPDM_VERSION_COUNT];
        for version in versions
            .iter_mut()
            .take(version_number_entry_count as usize)
        {
            *version = SpdmVersionStruct::read(r)?;
        }

        Some(SpdmVersionResponsePayload {
            version_number_entry_count,
            versions,
        })
    }
}
