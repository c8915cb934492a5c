// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto;
use crate::error::SpdmResult;
use crate::protocol::SpdmCertChainBuffer;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    /// Retrieves the certificate chain of `slot_id` with the
    /// offset/length chunk loop, then verifies it against the provisioned
    /// root and the registered chain policy.
    pub fn send_receive_spdm_certificate(&mut self, slot_id: u8) -> SpdmResult {
        info!("send spdm certificate\n");
        if self.common.runtime_info.connection_state
            < SpdmConnectionState::SpdmConnectionAfterNegotiateAlgorithms
        {
            return spdm_result_err!(EUNSUP);
        }
        if !self
            .common
            .negotiate_info
            .rsp_capabilities_sel
            .contains(SpdmResponseCapabilityFlags::CERT_CAP)
        {
            return spdm_result_err!(EUNSUP);
        }
        if slot_id as usize >= config::SPDM_MAX_SLOT_NUMBER {
            return spdm_result_err!(EINVAL);
        }

        let mut cert_chain = SpdmCertChainBuffer::default();
        let mut offset = 0u16;
        loop {
            let (portion_length, remainder_length) = self.send_receive_spdm_certificate_partial(
                slot_id,
                offset,
                config::MAX_SPDM_CERT_PORTION_LEN as u16,
                &mut cert_chain,
            )?;
            if portion_length == 0 && remainder_length != 0 {
                return spdm_result_err!(EDEV);
            }
            offset += portion_length;
            if remainder_length == 0 {
                break;
            }
        }

        self.verify_spdm_certificate_chain(slot_id, &cert_chain)?;
        self.common.peer_info.peer_cert_chain[slot_id as usize] = Some(cert_chain);

        if self.common.runtime_info.connection_state
            < SpdmConnectionState::SpdmConnectionAfterCertificate
        {
            self.common.runtime_info.connection_state =
                SpdmConnectionState::SpdmConnectionAfterCertificate;
        }
        Ok(())
    }

    fn send_receive_spdm_certificate_partial(
        &mut self,
        slot_id: u8,
        offset: u16,
        length: u16,
        cert_chain: &mut SpdmCertChainBuffer,
    ) -> SpdmResult<(u16, u16)> {
        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestGetCertificate,
                },
                payload: SpdmMessagePayload::SpdmGetCertificateRequest(
                    SpdmGetCertificateRequestPayload {
                        slot_id,
                        offset,
                        length,
                    },
                ),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        let reservation =
            self.common
                .append_transcript(SpdmTranscript::MessageB, &send_buffer[..send_used])?;
        match self.send_receive_spdm_certificate_partial_response(
            slot_id,
            &send_buffer[..send_used],
            cert_chain,
        ) {
            Ok(lengths) => {
                reservation.commit();
                Ok(lengths)
            }
            Err(e) => {
                self.common.rollback_transcript(reservation);
                Err(e)
            }
        }
    }

    fn send_receive_spdm_certificate_partial_response(
        &mut self,
        slot_id: u8,
        send_buffer: &[u8],
        cert_chain: &mut SpdmCertChainBuffer,
    ) -> SpdmResult<(u16, u16)> {
        self.send_spdm_request(None, send_buffer)?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut receive_used = self.receive_spdm_response(None, &mut receive_buffer)?;

        {
            let mut reader = Reader::init(&receive_buffer[..receive_used]);
            let header = SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
            if header.request_response_code == SpdmRequestResponseCode::SpdmResponseError {
                let rm = self.spdm_handle_error_response_main(
                    None,
                    &receive_buffer[..receive_used],
                    SpdmRequestResponseCode::SpdmRequestGetCertificate,
                    SpdmRequestResponseCode::SpdmResponseCertificate,
                )?;
                receive_buffer[..rm.used].copy_from_slice(rm.as_ref());
                receive_used = rm.used;
            }
        }

        let mut reader = Reader::init(&receive_buffer[..receive_used]);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => {
                if message_header.version != self.common.negotiate_info.spdm_version_sel {
                    return spdm_result_err!(EDEV);
                }
                match message_header.request_response_code {
                    SpdmRequestResponseCode::SpdmResponseCertificate => {
                        let certificate = SpdmCertificateResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        )
                        .ok_or(spdm_err!(EDEV))?;
                        if certificate.slot_id != slot_id {
                            return spdm_result_err!(EDEV);
                        }

                        let portion = certificate.portion_length as usize;
                        let used = cert_chain.data_size as usize;
                        if used + portion > cert_chain.data.len() {
                            return spdm_result_err!(ENOMEM);
                        }
                        cert_chain.data[used..used + portion]
                            .copy_from_slice(&certificate.cert_chain[..portion]);
                        cert_chain.data_size = (used + portion) as u16;

                        let response_used = reader.used();
                        self.common
                            .append_transcript(
                                SpdmTranscript::MessageB,
                                &receive_buffer[..response_used],
                            )?
                            .commit();

                        Ok((certificate.portion_length, certificate.remainder_length))
                    }
                    _ => spdm_result_err!(EDEV),
                }
            }
            None => spdm_result_err!(EIO),
        }
    }

    fn verify_spdm_certificate_chain(
        &mut self,
        slot_id: u8,
        cert_chain: &SpdmCertChainBuffer,
    ) -> SpdmResult {
        let hash_size = self.common.negotiate_info.base_hash_sel.get_size() as usize;
        let der_offset = 4 + hash_size;
        if (cert_chain.data_size as usize) <= der_offset {
            return spdm_result_err!(EDEV);
        }

        // the leading length field covers the whole framed chain
        let declared =
            u16::from_le_bytes([cert_chain.data[0], cert_chain.data[1]]) as usize;
        if declared != cert_chain.data_size as usize {
            return spdm_result_err!(EDEV);
        }

        if let Some(peer_root_cert) = &self.common.provision_info.peer_root_cert_data {
            let root_hash = crypto::hash::hash_all(
                self.common.negotiate_info.base_hash_sel,
                peer_root_cert.as_ref(),
            )
            .ok_or(spdm_err!(EUNSUP))?;
            if root_hash.as_ref() != &cert_chain.data[4..4 + hash_size] {
                error!("root cert hash mismatch\n");
                return spdm_result_err!(ESEC);
            }
        }

        if let Some(expected_digest) = &self.common.peer_info.peer_digests[slot_id as usize] {
            let chain_digest = crypto::hash::hash_all(
                self.common.negotiate_info.base_hash_sel,
                cert_chain.as_ref(),
            )
            .ok_or(spdm_err!(EUNSUP))?;
            if chain_digest.as_ref() != expected_digest.as_ref() {
                error!("cert chain digest mismatch\n");
                return spdm_result_err!(ESEC);
            }
        }

        let cert_chain_der = &cert_chain.as_ref()[der_offset..];
        if crypto::cert_operation::verify_cert_chain(cert_chain_der).is_err() {
            error!("cert chain verification fail\n");
            return spdm_result_err!(ESEC);
        }
        info!("cert chain verification pass\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::error::SpdmErrorNum;
    use crate::testlib::*;

    #[test]
    fn test_case0_send_receive_spdm_certificate_chunked() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());
        device_io.queue_message(&good_capabilities_response());
        device_io.queue_message(&good_algorithms_response());

        let chain = test_cert_chain_buffer();
        let split = chain.len() / 2;
        device_io.queue_message(&certificate_response(
            0,
            &chain[..split],
            (chain.len() - split) as u16,
        ));
        device_io.queue_message(&certificate_response(0, &chain[split..], 0));

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        requester.init_connection().unwrap();
        requester.send_receive_spdm_certificate(0).unwrap();
        let stored = requester.common.peer_info.peer_cert_chain[0].as_ref().unwrap();
        assert_eq!(stored.as_ref(), &chain[..]);
        assert_eq!(
            requester.common.runtime_info.connection_state,
            SpdmConnectionState::SpdmConnectionAfterCertificate
        );
    }

    #[test]
    fn test_case1_send_receive_spdm_certificate_root_mismatch() {
        let (config_info, mut provision_info) = create_info();
        // provision a different trust anchor
        let mut wrong_root = crate::protocol::SpdmCertChainData::default();
        wrong_root.data[..4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        wrong_root.data_size = 4;
        provision_info.peer_root_cert_data = Some(wrong_root);

        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());
        device_io.queue_message(&good_capabilities_response());
        device_io.queue_message(&good_algorithms_response());
        let chain = test_cert_chain_buffer();
        device_io.queue_message(&certificate_response(0, &chain, 0));

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        requester.init_connection().unwrap();
        let status = requester.send_receive_spdm_certificate(0);
        assert_eq!(status.unwrap_err().num, SpdmErrorNum::ESEC);
        assert!(requester.common.peer_info.peer_cert_chain[0].is_none());
    }

    #[test]
    fn test_case2_send_receive_spdm_certificate_no_progress() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());
        device_io.queue_message(&good_capabilities_response());
        device_io.queue_message(&good_algorithms_response());
        // an empty portion with bytes still remaining cannot terminate
        device_io.queue_message(&certificate_response(0, &[], 100));

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        requester.init_connection().unwrap();
        let status = requester.send_receive_spdm_certificate(0);
        assert_eq!(status.unwrap_err().num, SpdmErrorNum::EDEV);
    }
}
