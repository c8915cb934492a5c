// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use codec::enum_builder;
use codec::{Codec, Reader, Writer};

enum_builder! {
    @U8
    EnumName: SpdmVersion;
    EnumVal{
        SpdmVersion10 => 0x10,
        SpdmVersion11 => 0x11,
        SpdmVersion12 => 0x12
    }
}

/// One VERSION response table entry. On the wire this is a two byte little
/// endian value: update/alpha nibbles first, then major/minor nibbles.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SpdmVersionStruct {
    pub update: u8,
    pub version: SpdmVersion,
}

impl Codec for SpdmVersionStruct {
    fn encode(&self, bytes: &mut Writer) {
        self.update.encode(bytes);
        self.version.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmVersionStruct> {
        let update = u8::read(r)?;
        let version = SpdmVersion::read(r)?;
        Some(SpdmVersionStruct { update, version })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bit_field::BitField;

    #[test]
    fn test_case0_spdm_version_struct() {
        let u8_slice = &mut [0u8; 2];
        let mut writer = Writer::init(u8_slice);
        let value = SpdmVersionStruct {
            update: 0x34,
            version: SpdmVersion::SpdmVersion11,
        };
        value.encode(&mut writer);

        let entry = u16::from_le_bytes([u8_slice[0], u8_slice[1]]);
        assert_eq!(entry.get_bits(12..16), 1); // major
        assert_eq!(entry.get_bits(8..12), 1); // minor
        assert_eq!(entry.get_bits(4..8), 3); // update
        assert_eq!(entry.get_bits(0..4), 4); // alpha

        let mut reader = Reader::init(u8_slice);
        let read = SpdmVersionStruct::read(&mut reader).unwrap();
        assert_eq!(read.version, SpdmVersion::SpdmVersion11);
        assert_eq!(read.update, 0x34);
    }

    #[test]
    fn test_case1_spdm_version_struct_unknown() {
        let mut reader = Reader::init(&[0x00, 0xa0]);
        let value = SpdmVersionStruct::read(&mut reader).unwrap();
        assert_eq!(value.version, SpdmVersion::Unknown(0xa0));
    }
}
