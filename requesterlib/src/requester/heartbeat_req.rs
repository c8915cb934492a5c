// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::error::SpdmResult;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_heartbeat(&mut self, session_id: u32) -> SpdmResult {
        info!("send spdm heartbeat\n");
        if !self
            .common
            .negotiate_info
            .req_capabilities_sel
            .contains(SpdmRequestCapabilityFlags::HBEAT_CAP)
            || !self
                .common
                .negotiate_info
                .rsp_capabilities_sel
                .contains(SpdmResponseCapabilityFlags::HBEAT_CAP)
        {
            return spdm_result_err!(EUNSUP);
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

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestHeartbeat,
                },
                payload: SpdmMessagePayload::SpdmHeartbeatRequest(SpdmHeartbeatRequestPayload {}),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

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
                    SpdmRequestResponseCode::SpdmRequestHeartbeat,
                    SpdmRequestResponseCode::SpdmResponseHeartbeatAck,
                )?;
                receive_buffer[..rm.used].copy_from_slice(rm.as_ref());
                receive_used = rm.used;
            }
        }

        let mut reader = Reader::init(&receive_buffer[..receive_used]);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => match message_header.request_response_code {
                SpdmRequestResponseCode::SpdmResponseHeartbeatAck => {
                    SpdmHeartbeatResponsePayload::spdm_read(&mut self.common, &mut reader)
                        .ok_or(spdm_err!(EDEV))?;
                    Ok(())
                }
                _ => spdm_result_err!(EDEV),
            },
            None => spdm_result_err!(EIO),
        }
    }
}
