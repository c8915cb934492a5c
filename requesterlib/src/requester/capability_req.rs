// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::error::SpdmResult;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_capability(&mut self) -> SpdmResult {
        info!("send spdm capability\n");
        if self.common.runtime_info.connection_state
            < SpdmConnectionState::SpdmConnectionAfterVersion
        {
            return spdm_result_err!(EUNSUP);
        }

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let ct_exponent = self.common.config_info.req_ct_exponent;
            let flags = self.common.config_info.req_capabilities;
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestGetCapabilities,
                },
                payload: SpdmMessagePayload::SpdmGetCapabilitiesRequest(
                    SpdmGetCapabilitiesRequestPayload { ct_exponent, flags },
                ),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        let reservation =
            self.common
                .append_transcript(SpdmTranscript::MessageA, &send_buffer[..send_used])?;
        match self.send_receive_spdm_capability_response(&send_buffer[..send_used]) {
            Ok(()) => {
                reservation.commit();
                Ok(())
            }
            Err(e) => {
                self.common.rollback_transcript(reservation);
                Err(e)
            }
        }
    }

    fn send_receive_spdm_capability_response(&mut self, send_buffer: &[u8]) -> SpdmResult {
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
                    SpdmRequestResponseCode::SpdmRequestGetCapabilities,
                    SpdmRequestResponseCode::SpdmResponseCapabilities,
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
                    SpdmRequestResponseCode::SpdmResponseCapabilities => {
                        let capabilities = SpdmCapabilitiesResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        )
                        .ok_or(spdm_err!(EDEV))?;
                        debug!("!!! capabilities : {:02x?}\n", capabilities);

                        self.common.negotiate_info.req_ct_exponent_sel =
                            self.common.config_info.req_ct_exponent;
                        self.common.negotiate_info.req_capabilities_sel =
                            self.common.config_info.req_capabilities;
                        self.common.negotiate_info.rsp_ct_exponent_sel = capabilities.ct_exponent;
                        self.common.negotiate_info.rsp_capabilities_sel = capabilities.flags;

                        let response_used = reader.used();
                        self.common
                            .append_transcript(
                                SpdmTranscript::MessageA,
                                &receive_buffer[..response_used],
                            )?
                            .commit();

                        self.common.runtime_info.connection_state =
                            SpdmConnectionState::SpdmConnectionAfterCapabilities;
                        Ok(())
                    }
                    _ => spdm_result_err!(EDEV),
                }
            }
            None => spdm_result_err!(EIO),
        }
    }
}
