// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto;
use crate::error::SpdmResult;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    /// KEY_UPDATE: rotate the session data keys, then confirm the new
    /// generation with VERIFY_NEW_KEY.
    pub fn send_receive_spdm_key_update(
        &mut self,
        session_id: u32,
        key_update_operation: SpdmKeyUpdateOperation,
    ) -> SpdmResult {
        info!("send spdm key update\n");
        if !self
            .common
            .negotiate_info
            .req_capabilities_sel
            .contains(SpdmRequestCapabilityFlags::KEY_UPD_CAP)
            || !self
                .common
                .negotiate_info
                .rsp_capabilities_sel
                .contains(SpdmResponseCapabilityFlags::KEY_UPD_CAP)
        {
            return spdm_result_err!(EUNSUP);
        }
        if key_update_operation != SpdmKeyUpdateOperation::SpdmUpdateSingleKey
            && key_update_operation != SpdmKeyUpdateOperation::SpdmUpdateAllKeys
        {
            return spdm_result_err!(EINVAL);
        }
        {
            let session = self
                .common
                .get_session_via_id(session_id)
                .ok_or(spdm_err!(EINVAL))?;
            if session.get_session_state() != SpdmSessionState::SpdmSessionEstablished {
                return spdm_result_err!(EINVAL);
            }
        }

        let update_requester = true;
        let update_responder =
            key_update_operation == SpdmKeyUpdateOperation::SpdmUpdateAllKeys;

        self.send_receive_spdm_key_update_op(
            session_id,
            key_update_operation,
            update_requester,
            update_responder,
        )?;

        // confirm under the new keys
        let mut tag = [0u8; 1];
        crypto::rand::get_random(&mut tag)?;
        self.send_receive_spdm_key_update_ack(
            session_id,
            SpdmKeyUpdateOperation::SpdmVerifyNewKey,
            tag[0],
        )
    }

    fn send_receive_spdm_key_update_op(
        &mut self,
        session_id: u32,
        key_update_operation: SpdmKeyUpdateOperation,
        update_requester: bool,
        update_responder: bool,
    ) -> SpdmResult {
        let mut tag = [0u8; 1];
        crypto::rand::get_random(&mut tag)?;
        let tag = tag[0];

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestKeyUpdate,
                },
                payload: SpdmMessagePayload::SpdmKeyUpdateRequest(SpdmKeyUpdateRequestPayload {
                    key_update_operation,
                    tag,
                }),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        // the request leaves under the old keys; both directions switch
        // before the ACK arrives
        self.send_secured_message(session_id, &send_buffer[..send_used], false)?;
        {
            let session = self
                .common
                .get_session_via_id(session_id)
                .ok_or(spdm_err!(EINVAL))?;
            session.create_data_secret_update(update_requester, update_responder)?;
        }

        match self.receive_spdm_key_update_ack(session_id, key_update_operation, tag) {
            Ok(()) => {
                let session = self
                    .common
                    .get_session_via_id(session_id)
                    .ok_or(spdm_err!(EINVAL))?;
                session.activate_data_secret_update(update_requester, update_responder, true)?;
                Ok(())
            }
            Err(e) => {
                if let Some(session) = self.common.get_session_via_id(session_id) {
                    let _ = session.activate_data_secret_update(
                        update_requester,
                        update_responder,
                        false,
                    );
                }
                Err(e)
            }
        }
    }

    fn send_receive_spdm_key_update_ack(
        &mut self,
        session_id: u32,
        key_update_operation: SpdmKeyUpdateOperation,
        tag: u8,
    ) -> SpdmResult {
        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestKeyUpdate,
                },
                payload: SpdmMessagePayload::SpdmKeyUpdateRequest(SpdmKeyUpdateRequestPayload {
                    key_update_operation,
                    tag,
                }),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        self.send_secured_message(session_id, &send_buffer[..send_used], false)?;
        self.receive_spdm_key_update_ack(session_id, key_update_operation, tag)
    }

    fn receive_spdm_key_update_ack(
        &mut self,
        session_id: u32,
        key_update_operation: SpdmKeyUpdateOperation,
        tag: u8,
    ) -> SpdmResult {
        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut receive_used = self.receive_secured_message(session_id, &mut receive_buffer)?;

        {
            let mut reader = Reader::init(&receive_buffer[..receive_used]);
            let header = SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
            if header.request_response_code == SpdmRequestResponseCode::SpdmResponseError {
                let rm = self.spdm_handle_error_response_main(
                    Some(session_id),
                    &receive_buffer[..receive_used],
                    SpdmRequestResponseCode::SpdmRequestKeyUpdate,
                    SpdmRequestResponseCode::SpdmResponseKeyUpdateAck,
                )?;
                receive_buffer[..rm.used].copy_from_slice(rm.as_ref());
                receive_used = rm.used;
            }
        }

        let mut reader = Reader::init(&receive_buffer[..receive_used]);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => match message_header.request_response_code {
                SpdmRequestResponseCode::SpdmResponseKeyUpdateAck => {
                    let ack =
                        SpdmKeyUpdateResponsePayload::spdm_read(&mut self.common, &mut reader)
                            .ok_or(spdm_err!(EDEV))?;
                    // the ACK must echo both the operation and the tag
                    if ack.key_update_operation != key_update_operation || ack.tag != tag {
                        return spdm_result_err!(EDEV);
                    }
                    Ok(())
                }
                _ => spdm_result_err!(EDEV),
            },
            None => spdm_result_err!(EIO),
        }
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::error::SpdmErrorNum;
    use crate::testlib::*;

    #[test]
    fn test_case0_send_receive_spdm_key_update_single() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();

        // the fake rand yields a fixed tag byte
        let tag = 0x5a;
        let mut responder_side = seeded_established_session(0x2222_0001);
        // single-key update leaves the response direction untouched
        device_io.queue_secured_response(
            &mut responder_side,
            &[0x11u8, 0x69, SpdmKeyUpdateOperation::SpdmUpdateSingleKey.get_u8(), tag],
        );
        device_io.queue_secured_response(
            &mut responder_side,
            &[0x11u8, 0x69, SpdmKeyUpdateOperation::SpdmVerifyNewKey.get_u8(), tag],
        );

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);
        seed_negotiated_connection(&mut requester.common);

        let session = requester.common.get_free_session().unwrap();
        *session = seeded_established_session(0x2222_0001);

        requester
            .send_receive_spdm_key_update(
                0x2222_0001,
                SpdmKeyUpdateOperation::SpdmUpdateSingleKey,
            )
            .unwrap();
        // rekey reset the request-direction counter, then two requests left
        let session = requester.common.get_session_via_id(0x2222_0001).unwrap();
        assert_eq!(session.get_request_sequence_number(), 1);
    }

    #[test]
    fn test_case1_send_receive_spdm_key_update_bad_echo_restores_keys() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();

        let mut responder_side = seeded_established_session(0x2222_0001);
        // wrong tag in the ACK
        device_io.queue_secured_response(
            &mut responder_side,
            &[0x11u8, 0x69, SpdmKeyUpdateOperation::SpdmUpdateSingleKey.get_u8(), 0x00],
        );

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);
        seed_negotiated_connection(&mut requester.common);

        let session = requester.common.get_free_session().unwrap();
        *session = seeded_established_session(0x2222_0001);

        let status = requester
            .send_receive_spdm_key_update(0x2222_0001, SpdmKeyUpdateOperation::SpdmUpdateSingleKey);
        assert_eq!(status.unwrap_err().num, SpdmErrorNum::EDEV);

        // the update was rolled back, the session stays usable
        let session = requester.common.get_session_via_id(0x2222_0001).unwrap();
        assert_eq!(session.get_session_state(), SpdmSessionState::SpdmSessionEstablished);
    }

    #[test]
    fn test_case2_send_receive_spdm_key_update_invalid_operation() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);
        seed_negotiated_connection(&mut requester.common);

        let session = requester.common.get_free_session().unwrap();
        *session = seeded_established_session(0x2222_0001);

        let status = requester
            .send_receive_spdm_key_update(0x2222_0001, SpdmKeyUpdateOperation::SpdmVerifyNewKey);
        assert_eq!(status.unwrap_err().num, SpdmErrorNum::EINVAL);
    }
}
