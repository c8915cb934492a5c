// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::ManagedBuffer;
use crate::error::SpdmResult;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_psk_finish(&mut self, session_id: u32) -> SpdmResult {
        info!("send spdm psk finish\n");
        {
            let session = self
                .common
                .get_session_via_id(session_id)
                .ok_or(spdm_err!(EINVAL))?;
            if session.get_session_state() != SpdmSessionState::SpdmSessionHandshaking {
                return spdm_result_err!(EINVAL);
            }
        }

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let base_hash_size = self.common.negotiate_info.base_hash_sel.get_size();
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestPskFinish,
                },
                payload: SpdmMessagePayload::SpdmPskFinishRequest(SpdmPskFinishRequestPayload {
                    verify_data: SpdmDigestStruct {
                        data_size: base_hash_size,
                        data: [0xcc; SPDM_MAX_HASH_SIZE],
                    },
                }),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        let base_hash_size = self.common.negotiate_info.base_hash_sel.get_size() as usize;
        let temp_used = send_used - base_hash_size;

        let mut message_f = ManagedBuffer::default();
        message_f
            .append_message(&send_buffer[..temp_used])
            .ok_or(spdm_err!(ENOMEM))?;

        let session = self
            .common
            .get_session_via_id(session_id)
            .ok_or(spdm_err!(EINVAL))?;
        let message_k = session.runtime_info.message_k;

        let transcript_data =
            self.common
                .calc_req_transcript_data(true, Some(&message_k), Some(&message_f))?;
        let session = self.common.get_session_via_id(session_id).unwrap();
        let hmac = session.generate_hmac_with_request_finished_key(transcript_data.as_ref())?;
        message_f
            .append_message(hmac.as_ref())
            .ok_or(spdm_err!(ENOMEM))?;

        // patch the message before send
        send_buffer[(send_used - base_hash_size)..send_used].copy_from_slice(hmac.as_ref());

        self.send_secured_message(session_id, &send_buffer[..send_used], false)?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut receive_used = self.receive_secured_message(session_id, &mut receive_buffer)?;

        {
            let mut reader = Reader::init(&receive_buffer[..receive_used]);
            let header = SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
            if header.request_response_code == SpdmRequestResponseCode::SpdmResponseError {
                let rm = self.spdm_handle_error_response_main(
                    Some(session_id),
                    &receive_buffer[..receive_used],
                    SpdmRequestResponseCode::SpdmRequestPskFinish,
                    SpdmRequestResponseCode::SpdmResponsePskFinishRsp,
                )?;
                receive_buffer[..rm.used].copy_from_slice(rm.as_ref());
                receive_used = rm.used;
            }
        }

        let mut reader = Reader::init(&receive_buffer[..receive_used]);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => match message_header.request_response_code {
                SpdmRequestResponseCode::SpdmResponsePskFinishRsp => {
                    let psk_finish_rsp =
                        SpdmPskFinishResponsePayload::spdm_read(&mut self.common, &mut reader)
                            .ok_or(spdm_err!(EFAULT))?;
                    let receive_used = reader.used();
                    debug!("!!! psk_finish rsp : {:02x?}\n", psk_finish_rsp);

                    message_f
                        .append_message(&receive_buffer[..receive_used])
                        .ok_or(spdm_err!(ENOMEM))?;
                    let session = self.common.get_session_via_id(session_id).unwrap();
                    session.runtime_info.message_f = message_f;

                    let th2 = self.common.calc_req_transcript_hash(
                        true,
                        Some(&message_k),
                        Some(&message_f),
                    )?;
                    debug!("!!! th2 : {:02x?}\n", th2.as_ref());
                    let session = self.common.get_session_via_id(session_id).unwrap();
                    session.generate_data_secret(&th2)?;
                    session.set_session_state(SpdmSessionState::SpdmSessionEstablished);
                    self.common.runtime_info.connection_state =
                        SpdmConnectionState::SpdmConnectionNegotiated;

                    Ok(())
                }
                _ => spdm_result_err!(EINVAL),
            },
            None => spdm_result_err!(EIO),
        }
    }
}
