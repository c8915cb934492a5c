// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use codec::enum_builder;
use codec::{Codec, Reader, Writer};

enum_builder! {
    @U8
    EnumName: MctpMessageType;
    EnumVal{
        MctpMessageTypeMctpControl => 0x00,
        MctpMessageTypePldm => 0x01,
        MctpMessageTypeNcsi => 0x02,
        MctpMessageTypeEthernet => 0x03,
        MctpMessageTypeNvme => 0x04,
        MctpMessageTypeSpdm => 0x05,
        MctpMessageTypeSecuredMctp => 0x06,
        MctpMessageTypeVendorDefinedPci => 0x7E,
        MctpMessageTypeVendorDefinedIana => 0x7F
    }
}

/// The single message-type byte in front of every MCTP payload. SPDM
/// rides as type 0x05 in the clear and 0x06 once session-protected.
#[derive(Debug, Copy, Clone, Default)]
pub struct MctpMessageHeader {
    pub r#type: MctpMessageType,
}

impl Codec for MctpMessageHeader {
    fn encode(&self, bytes: &mut Writer) {
        self.r#type.encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<MctpMessageHeader> {
        let r#type = MctpMessageType::read(r)?;
        Some(MctpMessageHeader { r#type })
    }
}
