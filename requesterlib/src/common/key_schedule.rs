// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! SPDM 1.1 key schedule bin-concat labels.

use crate::protocol::SPDM_MAX_HASH_SIZE;
use codec::{Codec, Writer};

pub const SPDM_VERSION_1_1_BIN_CONCAT_LABEL: &[u8] = b"spdm1.1 ";

pub const SPDM_BIN_STR_0_LABEL: &[u8] = b"derived";
pub const SPDM_BIN_STR_1_LABEL: &[u8] = b"req hs data";
pub const SPDM_BIN_STR_2_LABEL: &[u8] = b"rsp hs data";
pub const SPDM_BIN_STR_3_LABEL: &[u8] = b"req app data";
pub const SPDM_BIN_STR_4_LABEL: &[u8] = b"rsp app data";
pub const SPDM_BIN_STR_5_LABEL: &[u8] = b"key";
pub const SPDM_BIN_STR_6_LABEL: &[u8] = b"iv";
pub const SPDM_BIN_STR_7_LABEL: &[u8] = b"finished";
pub const SPDM_BIN_STR_8_LABEL: &[u8] = b"exp master";
pub const SPDM_BIN_STR_9_LABEL: &[u8] = b"traffic upd";

pub const MAX_BIN_CONCAT_BUF_SIZE: usize = 2 + 8 + 12 + SPDM_MAX_HASH_SIZE;

/// BinConcat(length, "spdm1.1 " || label [ || context ]), the HKDF-Expand
/// info of every schedule step.
pub fn binconcat<'a>(
    length: u16,
    label: &[u8],
    context: Option<&[u8]>,
    buffer: &'a mut [u8],
) -> Option<&'a [u8]> {
    let mut writer = Writer::init(buffer);
    length.encode(&mut writer);
    writer.extend_from_slice(SPDM_VERSION_1_1_BIN_CONCAT_LABEL)?;
    writer.extend_from_slice(label)?;
    if let Some(context) = context {
        writer.extend_from_slice(context)?;
    }
    let used = writer.used();
    Some(&buffer[..used])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_binconcat() {
        let mut buffer = [0u8; MAX_BIN_CONCAT_BUF_SIZE];
        let info = binconcat(48, SPDM_BIN_STR_5_LABEL, None, &mut buffer).unwrap();
        assert_eq!(&info[..2], &48u16.to_le_bytes());
        assert_eq!(&info[2..10], b"spdm1.1 ");
        assert_eq!(&info[10..], b"key");
    }

    #[test]
    fn test_case1_binconcat_with_context() {
        let mut buffer = [0u8; MAX_BIN_CONCAT_BUF_SIZE];
        let th = [0xaau8; 4];
        let info = binconcat(32, SPDM_BIN_STR_1_LABEL, Some(&th), &mut buffer).unwrap();
        assert_eq!(&info[info.len() - 4..], &th);
    }
}
