// Copyright (c) 2022 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use codec::{Codec, Reader, Writer};

use crate::common::error::{spdm_err, spdm_result_err, SpdmResult};
use crate::config;
use crate::message::*;
use crate::requester::RequesterContext;
use crate::time::sleep;

impl<'a> RequesterContext<'a> {
    fn spdm_handle_response_not_ready(
        &mut self,
        session_id: Option<u32>,
        response: &[u8],
        original_request_code: SpdmRequestResponseCode,
        expected_response_code: SpdmRequestResponseCode,
    ) -> SpdmResult<ReceivedMessage> {
        // header (2) + error code and data (2) + not-ready extended data (4)
        const NOT_READY_EXT_DATA_OFFSET: usize = 4;
        const NOT_READY_RESPONSE_SIZE: usize = 8;
        if response.len() != NOT_READY_RESPONSE_SIZE {
            return spdm_result_err!(EDEV);
        }
        let extoff = NOT_READY_EXT_DATA_OFFSET;
        let mut extend_error_data_reader = Reader::init(&response[extoff..]);
        let extend_error_data = SpdmErrorResponseNotReadyExtData::read(&mut extend_error_data_reader)
            .ok_or(spdm_err!(EIO))?;

        if extend_error_data.request_code != original_request_code.get_u8() {
            return spdm_result_err!(EDEV);
        }

        sleep(2usize << extend_error_data.rdt_exponent.min(config::MAX_SPDM_CT_EXPONENT));

        self.spdm_requester_respond_if_ready(session_id, expected_response_code, extend_error_data)
    }

    fn spdm_handle_simple_error_response(
        &mut self,
        _session_id: Option<u32>,
        error_code: u8,
    ) -> SpdmResult<ReceivedMessage> {
        /* NOT_READY is treated as error here.
         * Use spdm_handle_error_response_main to handle NOT_READY message in long latency command.*/
        if error_code == SpdmErrorCode::SpdmErrorResponseNotReady.get_u8() {
            spdm_result_err!(EDEV)
        } else if error_code == SpdmErrorCode::SpdmErrorBusy.get_u8() {
            spdm_result_err!(EBUSY)
        } else if error_code == SpdmErrorCode::SpdmErrorRequestResynch.get_u8() {
            // the responder lost its state: everything negotiated so far is
            // void, sessions included, and only GET_VERSION revives the link
            self.common.reset_context();
            spdm_result_err!(EDEV)
        } else {
            spdm_result_err!(EDEV)
        }
    }

    /// Uniform ERROR dispatch for every transaction; callers never branch
    /// on error codes themselves.
    pub fn spdm_handle_error_response_main(
        &mut self,
        session_id: Option<u32>,
        response: &[u8],
        original_request_code: SpdmRequestResponseCode,
        expected_response_code: SpdmRequestResponseCode,
    ) -> SpdmResult<ReceivedMessage> {
        let mut spdm_message_header_reader = Reader::init(response);
        let spdm_message_header =
            SpdmMessageHeader::read(&mut spdm_message_header_reader).ok_or(spdm_err!(EIO))?;
        let header_size = spdm_message_header_reader.used();
        if spdm_message_header.version != self.common.negotiate_info.spdm_version_sel {
            return spdm_result_err!(EDEV);
        }
        if spdm_message_header.request_response_code != SpdmRequestResponseCode::SpdmResponseError {
            return spdm_result_err!(EDEV);
        }

        let mut spdm_message_payload_reader = Reader::init(&response[header_size..]);
        let spdm_message_general_payload =
            SpdmMessageGeneralPayload::read(&mut spdm_message_payload_reader)
                .ok_or(spdm_err!(EIO))?;

        // a decrypt failure reported inside a session is a security
        // violation and kills the session; outside one it is just another
        // fatal code
        if spdm_message_general_payload.param1 == SpdmErrorCode::SpdmErrorDecryptError.get_u8()
            && session_id.is_some()
        {
            if let Some(session_id) = session_id {
                if let Some(session) = self.common.get_session_via_id(session_id) {
                    let _ = session.teardown(session_id);
                }
            }
            spdm_result_err!(ESEC)
        } else if spdm_message_general_payload.param1
            == SpdmErrorCode::SpdmErrorResponseNotReady.get_u8()
        {
            self.spdm_handle_response_not_ready(
                session_id,
                response,
                original_request_code,
                expected_response_code,
            )
        } else {
            self.spdm_handle_simple_error_response(session_id, spdm_message_general_payload.param1)
        }
    }

    fn spdm_requester_respond_if_ready(
        &mut self,
        session_id: Option<u32>,
        expected_response_code: SpdmRequestResponseCode,
        extend_error_data: SpdmErrorResponseNotReadyExtData,
    ) -> SpdmResult<ReceivedMessage> {
        info!("send spdm respond_if_ready\n");
        let mut send_buffer = [0u8; 4];
        let send_used = {
            let mut writer = Writer::init(&mut send_buffer);
            let header = SpdmMessageHeader {
                version: self.common.negotiate_info.spdm_version_sel,
                request_response_code: SpdmRequestResponseCode::SpdmRequestRespondIfReady,
            };
            header.encode(&mut writer);
            extend_error_data.request_code.encode(&mut writer); // param1
            extend_error_data.token.encode(&mut writer); // param2
            writer.used()
        };
        self.send_spdm_request(session_id, &send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let receive_used = self.receive_spdm_response(session_id, &mut receive_buffer)?;

        let mut reader = Reader::init(&receive_buffer[..receive_used]);
        let header = SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
        if header.request_response_code != expected_response_code {
            // a second ERROR terminates the transaction; the retry itself is
            // never retried
            return spdm_result_err!(EDEV);
        }
        ReceivedMessage::new(&receive_buffer[..receive_used]).ok_or(spdm_err!(ENOMEM))
    }
}
