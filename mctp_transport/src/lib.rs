// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! MCTP transport codec for the SPDM requester: frames SPDM messages as
//! MCTP payloads and discriminates normal from secured messages via the
//! MCTP message-type byte.

#![no_std]
#![forbid(unsafe_code)]

mod header;
pub use header::*;

use codec::{Codec, Reader, Writer};
use requesterlib::common::SpdmTransportEncap;
use requesterlib::error::SpdmResult;
use requesterlib::{spdm_err, spdm_result_err};

#[derive(Debug, Copy, Clone, Default)]
pub struct MctpTransportEncap {}

impl MctpTransportEncap {
    fn wrap(
        header: MctpMessageHeader,
        payload: &[u8],
        out_buffer: &mut [u8],
    ) -> SpdmResult<usize> {
        let mut writer = Writer::init(&mut *out_buffer);
        header.encode(&mut writer);
        let header_size = writer.used();
        if out_buffer.len() < header_size + payload.len() {
            return spdm_result_err!(EINVAL);
        }
        out_buffer[header_size..(header_size + payload.len())].copy_from_slice(payload);
        Ok(header_size + payload.len())
    }

    fn unwrap<'a>(in_buffer: &'a [u8]) -> SpdmResult<(MctpMessageHeader, &'a [u8])> {
        let mut reader = Reader::init(in_buffer);
        let header = MctpMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
        Ok((header, &in_buffer[reader.used()..]))
    }
}

impl SpdmTransportEncap for MctpTransportEncap {
    fn encap(
        &mut self,
        spdm_buffer: &[u8],
        transport_buffer: &mut [u8],
        secured_message: bool,
    ) -> SpdmResult<usize> {
        let header = MctpMessageHeader {
            r#type: if secured_message {
                MctpMessageType::MctpMessageTypeSecuredMctp
            } else {
                MctpMessageType::MctpMessageTypeSpdm
            },
        };
        Self::wrap(header, spdm_buffer, transport_buffer)
    }

    fn decap(
        &mut self,
        transport_buffer: &[u8],
        spdm_buffer: &mut [u8],
    ) -> SpdmResult<(usize, bool)> {
        let (header, payload) = Self::unwrap(transport_buffer)?;
        let secured_message = match header.r#type {
            MctpMessageType::MctpMessageTypeSpdm => false,
            MctpMessageType::MctpMessageTypeSecuredMctp => true,
            _ => return spdm_result_err!(EINVAL),
        };
        if spdm_buffer.len() < payload.len() {
            return spdm_result_err!(EINVAL);
        }
        spdm_buffer[..payload.len()].copy_from_slice(payload);
        Ok((payload.len(), secured_message))
    }

    fn encap_app(
        &mut self,
        spdm_buffer: &[u8],
        app_buffer: &mut [u8],
        is_app_message: bool,
    ) -> SpdmResult<usize> {
        let header = MctpMessageHeader {
            r#type: if is_app_message {
                MctpMessageType::MctpMessageTypePldm
            } else {
                MctpMessageType::MctpMessageTypeSpdm
            },
        };
        Self::wrap(header, spdm_buffer, app_buffer)
    }

    fn decap_app(
        &mut self,
        app_buffer: &[u8],
        spdm_buffer: &mut [u8],
    ) -> SpdmResult<(usize, bool)> {
        let (header, payload) = Self::unwrap(app_buffer)?;
        let is_app_message = match header.r#type {
            MctpMessageType::MctpMessageTypeSpdm => false,
            MctpMessageType::MctpMessageTypePldm => true,
            _ => return spdm_result_err!(EINVAL),
        };
        if spdm_buffer.len() < payload.len() {
            return spdm_result_err!(EINVAL);
        }
        spdm_buffer[..payload.len()].copy_from_slice(payload);
        Ok((payload.len(), is_app_message))
    }

    fn get_sequence_number_count(&mut self) -> u8 {
        2
    }

    fn get_max_random_count(&mut self) -> u16 {
        32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case0_encap_decap_round_trip() {
        let mut mctp_transport_encap = MctpTransportEncap {};
        let spdm_message = [0x10u8, 0x84, 0x00, 0x00];
        let mut transport_buffer = [0u8; 16];

        let used = mctp_transport_encap
            .encap(&spdm_message, &mut transport_buffer, false)
            .unwrap();
        assert_eq!(used, spdm_message.len() + 1);
        assert_eq!(transport_buffer[0], 0x05);

        let mut spdm_buffer = [0u8; 16];
        let (size, secured) = mctp_transport_encap
            .decap(&transport_buffer[..used], &mut spdm_buffer)
            .unwrap();
        assert!(!secured);
        assert_eq!(&spdm_buffer[..size], &spdm_message);
    }

    #[test]
    fn test_case1_encap_secured_marker() {
        let mut mctp_transport_encap = MctpTransportEncap {};
        let mut transport_buffer = [0u8; 16];
        let used = mctp_transport_encap
            .encap(&[0xaa; 4], &mut transport_buffer, true)
            .unwrap();
        assert_eq!(transport_buffer[0], 0x06);

        let mut spdm_buffer = [0u8; 16];
        let (_, secured) = mctp_transport_encap
            .decap(&transport_buffer[..used], &mut spdm_buffer)
            .unwrap();
        assert!(secured);
    }

    #[test]
    fn test_case2_encap_overflow() {
        let mut mctp_transport_encap = MctpTransportEncap {};
        let mut transport_buffer = [0u8; 4];
        let status = mctp_transport_encap.encap(&[0u8; 8], &mut transport_buffer, false);
        assert!(status.is_err());
    }

    #[test]
    fn test_case3_decap_foreign_type() {
        let mut mctp_transport_encap = MctpTransportEncap {};
        let mut spdm_buffer = [0u8; 16];
        // NVMe management traffic is not ours
        let status = mctp_transport_encap.decap(&[0x04, 0x00], &mut spdm_buffer);
        assert!(status.is_err());
    }

    #[test]
    fn test_case4_decap_app_round_trip() {
        let mut mctp_transport_encap = MctpTransportEncap {};
        let mut app_buffer = [0u8; 16];
        let used = mctp_transport_encap
            .encap_app(&[0x11, 0xe8, 0x00, 0x00], &mut app_buffer, false)
            .unwrap();

        let mut spdm_buffer = [0u8; 16];
        let (size, is_app) = mctp_transport_encap
            .decap_app(&app_buffer[..used], &mut spdm_buffer)
            .unwrap();
        assert!(!is_app);
        assert_eq!(size, 4);
    }

    #[test]
    fn test_case5_sequence_number_and_random_count() {
        let mut mctp_transport_encap = MctpTransportEncap {};
        assert_eq!(mctp_transport_encap.get_sequence_number_count(), 2);
        assert_eq!(mctp_transport_encap.get_max_random_count(), 32);
    }
}
