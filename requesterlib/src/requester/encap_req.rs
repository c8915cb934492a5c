// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! The encapsulated-request loop: during mutual authentication the
//! responder turns the table and issues GET_DIGESTS, GET_CERTIFICATE,
//! CHALLENGE or KEY_UPDATE through ENCAPSULATED_REQUEST payloads, which
//! the requester serves from its provisioned identity.

use crate::common::ManagedBuffer;
use crate::crypto;
use crate::error::SpdmResult;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    pub fn spdm_encapsulated_request(
        &mut self,
        session_id: Option<u32>,
        req_slot_id_param: &mut u8,
    ) -> SpdmResult {
        info!("send spdm get_encapsulated_request\n");
        if !self
            .common
            .negotiate_info
            .req_capabilities_sel
            .contains(SpdmRequestCapabilityFlags::ENCAP_CAP)
            || !self
                .common
                .negotiate_info
                .rsp_capabilities_sel
                .contains(SpdmResponseCapabilityFlags::ENCAP_CAP)
        {
            return spdm_result_err!(EUNSUP);
        }

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code:
                        SpdmRequestResponseCode::SpdmRequestGetEncapsulatedRequest,
                },
                payload: SpdmMessagePayload::SpdmGetEncapsulatedRequest(
                    SpdmGetEncapsulatedRequestPayload {},
                ),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        self.send_spdm_request(session_id, &send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut receive_used = self.receive_spdm_response(session_id, &mut receive_buffer)?;

        {
            let mut reader = Reader::init(&receive_buffer[..receive_used]);
            let header = SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
            if header.request_response_code == SpdmRequestResponseCode::SpdmResponseError {
                let rm = self.spdm_handle_error_response_main(
                    session_id,
                    &receive_buffer[..receive_used],
                    SpdmRequestResponseCode::SpdmRequestGetEncapsulatedRequest,
                    SpdmRequestResponseCode::SpdmResponseEncapsulatedRequest,
                )?;
                receive_buffer[..rm.used].copy_from_slice(rm.as_ref());
                receive_used = rm.used;
            }
        }

        let (mut request_id, mut encap_request, mut encap_request_size) = {
            let mut reader = Reader::init(&receive_buffer[..receive_used]);
            let header = SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
            if header.version != self.common.negotiate_info.spdm_version_sel {
                return spdm_result_err!(EDEV);
            }
            if header.request_response_code
                != SpdmRequestResponseCode::SpdmResponseEncapsulatedRequest
            {
                return spdm_result_err!(EDEV);
            }
            let payload =
                SpdmEncapsulatedRequestPayload::spdm_read(&mut self.common, &mut reader)
                    .ok_or(spdm_err!(EDEV))?;
            let mut encap_request = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
            let nested = reader.rest();
            encap_request[..nested.len()].copy_from_slice(nested);
            (payload.request_id, encap_request, nested.len())
        };

        loop {
            if encap_request_size == 0 {
                return spdm_result_err!(EDEV);
            }

            let mut encap_response = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
            let encap_response_used = self.process_encapsulated_request(
                session_id,
                &encap_request[..encap_request_size],
                &mut encap_response,
            )?;

            let mut deliver_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
            let deliver_used = {
                let mut writer = Writer::init(&mut deliver_buffer);
                let header = SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code:
                        SpdmRequestResponseCode::SpdmRequestDeliverEncapsulatedResponse,
                };
                header.encode(&mut writer);
                request_id.encode(&mut writer); // param1
                0u8.encode(&mut writer); // param2
                writer
                    .extend_from_slice(&encap_response[..encap_response_used])
                    .ok_or(spdm_err!(ENOMEM))?;
                writer.used()
            };

            self.send_spdm_request(session_id, &deliver_buffer[..deliver_used])?;

            let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
            let mut receive_used = self.receive_spdm_response(session_id, &mut receive_buffer)?;

            {
                let mut reader = Reader::init(&receive_buffer[..receive_used]);
                let header = SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
                if header.request_response_code == SpdmRequestResponseCode::SpdmResponseError {
                    let rm = self.spdm_handle_error_response_main(
                        session_id,
                        &receive_buffer[..receive_used],
                        SpdmRequestResponseCode::SpdmRequestDeliverEncapsulatedResponse,
                        SpdmRequestResponseCode::SpdmResponseEncapsulatedResponseAck,
                    )?;
                    receive_buffer[..rm.used].copy_from_slice(rm.as_ref());
                    receive_used = rm.used;
                }
            }

            let mut reader = Reader::init(&receive_buffer[..receive_used]);
            let header = SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
            if header.request_response_code
                != SpdmRequestResponseCode::SpdmResponseEncapsulatedResponseAck
            {
                return spdm_result_err!(EDEV);
            }
            let ack = SpdmEncapsulatedResponseAckPayload::spdm_read(&mut self.common, &mut reader)
                .ok_or(spdm_err!(EDEV))?;
            match ack.payload_type {
                SpdmEncapsulatedPayloadType::SpdmEncapsulatedPayloadTypeAbsent => {
                    return Ok(());
                }
                SpdmEncapsulatedPayloadType::SpdmEncapsulatedPayloadTypePresent => {
                    request_id = ack.request_id;
                    let nested = reader.rest();
                    encap_request[..nested.len()].copy_from_slice(nested);
                    encap_request_size = nested.len();
                }
                SpdmEncapsulatedPayloadType::SpdmEncapsulatedPayloadTypeReqSlotNumber => {
                    *req_slot_id_param = u8::read(&mut reader).ok_or(spdm_err!(EDEV))?;
                    return Ok(());
                }
                SpdmEncapsulatedPayloadType::Unknown(_) => {
                    return spdm_result_err!(EDEV);
                }
            }
        }
    }

    fn process_encapsulated_request(
        &mut self,
        session_id: Option<u32>,
        encap_request: &[u8],
        encap_response: &mut [u8],
    ) -> SpdmResult<usize> {
        let mut reader = Reader::init(encap_request);
        let header = SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
        match header.request_response_code {
            SpdmRequestResponseCode::SpdmRequestGetDigests => {
                self.encap_handle_get_digests(encap_request, encap_response)
            }
            SpdmRequestResponseCode::SpdmRequestGetCertificate => {
                self.encap_handle_get_certificate(encap_request, encap_response)
            }
            SpdmRequestResponseCode::SpdmRequestChallenge => {
                self.encap_handle_challenge(encap_request, encap_response)
            }
            SpdmRequestResponseCode::SpdmRequestKeyUpdate => {
                self.encap_handle_key_update(session_id, encap_request, encap_response)
            }
            _ => self.encap_build_error_response(
                SpdmErrorCode::SpdmErrorUnsupportedRequest,
                header.request_response_code.get_u8(),
                encap_response,
            ),
        }
    }

    fn encap_build_error_response(
        &mut self,
        error_code: SpdmErrorCode,
        error_data: u8,
        encap_response: &mut [u8],
    ) -> SpdmResult<usize> {
        let mut writer = Writer::init(encap_response);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseError,
            },
            payload: SpdmMessagePayload::SpdmErrorResponse(SpdmErrorResponsePayload {
                error_code,
                error_data,
                extended_data: SpdmErrorResponseExtData::SpdmErrorExtDataNone,
            }),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        Ok(writer.used())
    }

    fn encap_handle_get_digests(
        &mut self,
        encap_request: &[u8],
        encap_response: &mut [u8],
    ) -> SpdmResult<usize> {
        let my_cert_chain = self
            .common
            .provision_info
            .my_cert_chain
            .ok_or(spdm_err!(EUNSUP))?;
        let digest = crypto::hash::hash_all(
            self.common.negotiate_info.base_hash_sel,
            my_cert_chain.as_ref(),
        )
        .ok_or(spdm_err!(EUNSUP))?;

        let used = {
            let mut digests = SpdmDigestsResponsePayload {
                slot_mask: 0x01,
                slot_count: 1,
                ..Default::default()
            };
            digests.digests[0] = digest;
            let mut writer = Writer::init(encap_response);
            let response = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmResponseDigests,
                },
                payload: SpdmMessagePayload::SpdmDigestsResponse(digests),
            };
            response.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        let mut_b = &mut self.common.runtime_info.message_mut_b;
        mut_b.append_message(encap_request).ok_or(spdm_err!(ENOMEM))?;
        mut_b
            .append_message(&encap_response[..used])
            .ok_or(spdm_err!(ENOMEM))?;
        Ok(used)
    }

    fn encap_handle_get_certificate(
        &mut self,
        encap_request: &[u8],
        encap_response: &mut [u8],
    ) -> SpdmResult<usize> {
        let request = {
            let mut reader = Reader::init(encap_request);
            SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
            SpdmGetCertificateRequestPayload::spdm_read(&mut self.common, &mut reader)
                .ok_or(spdm_err!(EDEV))?
        };
        let my_cert_chain = self
            .common
            .provision_info
            .my_cert_chain
            .ok_or(spdm_err!(EUNSUP))?;

        let total = my_cert_chain.data_size as usize;
        let offset = request.offset as usize;
        if offset > total {
            return spdm_result_err!(EINVAL);
        }
        let portion = (request.length as usize)
            .min(total - offset)
            .min(config::MAX_SPDM_CERT_PORTION_LEN);
        let remainder = total - offset - portion;

        let used = {
            let mut certificate = SpdmCertificateResponsePayload {
                slot_id: request.slot_id,
                portion_length: portion as u16,
                remainder_length: remainder as u16,
                ..Default::default()
            };
            certificate.cert_chain[..portion]
                .copy_from_slice(&my_cert_chain.as_ref()[offset..offset + portion]);
            let mut writer = Writer::init(encap_response);
            let response = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmResponseCertificate,
                },
                payload: SpdmMessagePayload::SpdmCertificateResponse(certificate),
            };
            response.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        let mut_b = &mut self.common.runtime_info.message_mut_b;
        mut_b.append_message(encap_request).ok_or(spdm_err!(ENOMEM))?;
        mut_b
            .append_message(&encap_response[..used])
            .ok_or(spdm_err!(ENOMEM))?;
        Ok(used)
    }

    fn encap_handle_challenge(
        &mut self,
        encap_request: &[u8],
        encap_response: &mut [u8],
    ) -> SpdmResult<usize> {
        self.common.runtime_info.need_measurement_summary_hash = false;
        {
            let mut reader = Reader::init(encap_request);
            SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
            SpdmChallengeRequestPayload::spdm_read(&mut self.common, &mut reader)
                .ok_or(spdm_err!(EDEV))?;
        }
        let my_cert_chain = self
            .common
            .provision_info
            .my_cert_chain
            .ok_or(spdm_err!(EUNSUP))?;
        let cert_chain_hash = crypto::hash::hash_all(
            self.common.negotiate_info.base_hash_sel,
            my_cert_chain.as_ref(),
        )
        .ok_or(spdm_err!(EUNSUP))?;

        let signature_size = self.common.negotiate_info.req_asym_sel.get_size();
        if signature_size == 0 {
            return spdm_result_err!(EUNSUP);
        }
        let mut nonce = SpdmNonceStruct::default();
        crypto::rand::get_random(&mut nonce.data)?;

        let used = {
            let challenge_auth = SpdmChallengeAuthResponsePayload {
                slot_id: 0,
                slot_mask: 0x01,
                challenge_auth_attribute: SpdmChallengeAuthAttribute::empty(),
                cert_chain_hash,
                nonce,
                measurement_summary_hash: SpdmDigestStruct::default(),
                opaque: SpdmOpaqueStruct::default(),
                signature: SpdmSignatureStruct {
                    data_size: signature_size,
                    ..Default::default()
                },
            };
            let mut writer = Writer::init(encap_response);
            let response = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmResponseChallengeAuth,
                },
                payload: SpdmMessagePayload::SpdmChallengeAuthResponse(challenge_auth),
            };
            response.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };
        let temp_used = used - signature_size as usize;

        {
            let mut_c = &mut self.common.runtime_info.message_mut_c;
            mut_c.append_message(encap_request).ok_or(spdm_err!(ENOMEM))?;
            mut_c
                .append_message(&encap_response[..temp_used])
                .ok_or(spdm_err!(ENOMEM))?;
        }

        let mut mut_m1m2 = ManagedBuffer::default();
        mut_m1m2
            .append_message(self.common.runtime_info.message_mut_b.as_ref())
            .ok_or(spdm_err!(ENOMEM))?;
        mut_m1m2
            .append_message(self.common.runtime_info.message_mut_c.as_ref())
            .ok_or(spdm_err!(ENOMEM))?;

        let signature = crypto::asym_sign::sign(
            self.common.negotiate_info.base_hash_sel,
            self.common.negotiate_info.req_asym_sel,
            mut_m1m2.as_ref(),
        )
        .ok_or(spdm_err!(EUNSUP))?;
        if signature.data_size != signature_size {
            return spdm_result_err!(EFAULT);
        }

        // patch the placeholder before delivery
        encap_response[temp_used..used].copy_from_slice(signature.as_ref());
        self.common
            .runtime_info
            .message_mut_c
            .append_message(signature.as_ref())
            .ok_or(spdm_err!(ENOMEM))?;
        Ok(used)
    }

    fn encap_handle_key_update(
        &mut self,
        session_id: Option<u32>,
        encap_request: &[u8],
        encap_response: &mut [u8],
    ) -> SpdmResult<usize> {
        let request = {
            let mut reader = Reader::init(encap_request);
            SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
            SpdmKeyUpdateRequestPayload::spdm_read(&mut self.common, &mut reader)
                .ok_or(spdm_err!(EDEV))?
        };
        let session_id = session_id.ok_or(spdm_err!(EINVAL))?;
        let session = self
            .common
            .get_session_via_id(session_id)
            .ok_or(spdm_err!(EINVAL))?;

        match request.key_update_operation {
            SpdmKeyUpdateOperation::SpdmUpdateSingleKey => {
                session.create_data_secret_update(false, true)?;
            }
            SpdmKeyUpdateOperation::SpdmUpdateAllKeys => {
                session.create_data_secret_update(true, true)?;
            }
            SpdmKeyUpdateOperation::SpdmVerifyNewKey => {
                session.activate_data_secret_update(true, true, true)?;
            }
            _ => {
                return self.encap_build_error_response(
                    SpdmErrorCode::SpdmErrorInvalidRequest,
                    0,
                    encap_response,
                );
            }
        }

        let mut writer = Writer::init(encap_response);
        let response = SpdmMessage {
            header: SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmResponseKeyUpdateAck,
            },
            payload: SpdmMessagePayload::SpdmKeyUpdateResponse(SpdmKeyUpdateResponsePayload {
                key_update_operation: request.key_update_operation,
                tag: request.tag,
            }),
        };
        response.spdm_encode(&mut self.common, &mut writer);
        Ok(writer.used())
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::testlib::*;

    #[test]
    fn test_case0_spdm_encapsulated_request_get_digests() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();

        // ENCAPSULATED_REQUEST carrying a nested GET_DIGESTS
        let mut encap_request = vec![0x11u8, 0x6a, 0x01, 0x00];
        encap_request.extend_from_slice(&[0x11, 0x81, 0x00, 0x00]);
        device_io.queue_message(&encap_request);
        // ...then nothing further
        device_io.queue_message(&[0x11, 0x6b, 0x01, 0x00]);

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);
        seed_negotiated_connection(&mut requester.common);

        let mut req_slot_id_param = 0u8;
        requester
            .spdm_encapsulated_request(None, &mut req_slot_id_param)
            .unwrap();

        // both nested messages landed in the mutual-auth transcript
        assert!(requester.common.runtime_info.message_mut_b.size() > 0);

        let sent = device_io.sent_messages();
        assert_eq!(sent.len(), 2);
        // GET_ENCAPSULATED_REQUEST, then the delivered DIGESTS
        assert_eq!(&sent[0][..2], &[0x11, 0xea]);
        assert_eq!(&sent[1][..4], &[0x11, 0xeb, 0x01, 0x00]);
        assert_eq!(&sent[1][4..6], &[0x11, 0x01]);
    }

    #[test]
    fn test_case1_spdm_encapsulated_request_slot_number_terminal() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();

        let mut encap_request = vec![0x11u8, 0x6a, 0x01, 0x00];
        encap_request.extend_from_slice(&[0x11, 0x81, 0x00, 0x00]);
        device_io.queue_message(&encap_request);
        // SLOT_NUMBER terminal carrying req_slot_id_param = 1
        device_io.queue_message(&[0x11, 0x6b, 0x01, 0x02, 0x01]);

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);
        seed_negotiated_connection(&mut requester.common);

        let mut req_slot_id_param = 0u8;
        requester
            .spdm_encapsulated_request(None, &mut req_slot_id_param)
            .unwrap();
        assert_eq!(req_slot_id_param, 1);
    }
}
