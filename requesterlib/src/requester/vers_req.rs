// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::error::SpdmResult;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_version(&mut self) -> SpdmResult {
        info!("send spdm version\n");
        // a new GET_VERSION restarts the whole negotiation
        self.common.reset_context();

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: SpdmVersion::SpdmVersion10,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestGetVersion,
                },
                payload: SpdmMessagePayload::SpdmGetVersionRequest(
                    SpdmGetVersionRequestPayload {},
                ),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        let reservation =
            self.common
                .append_transcript(SpdmTranscript::MessageA, &send_buffer[..send_used])?;
        match self.send_receive_spdm_version_response(&send_buffer[..send_used]) {
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

    fn send_receive_spdm_version_response(&mut self, send_buffer: &[u8]) -> SpdmResult {
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
                    SpdmRequestResponseCode::SpdmRequestGetVersion,
                    SpdmRequestResponseCode::SpdmResponseVersion,
                )?;
                receive_buffer[..rm.used].copy_from_slice(rm.as_ref());
                receive_used = rm.used;
            }
        }

        let mut reader = Reader::init(&receive_buffer[..receive_used]);
        match SpdmMessageHeader::read(&mut reader) {
            Some(message_header) => {
                // a VERSION response is always a 1.0 message
                if message_header.version != SpdmVersion::SpdmVersion10 {
                    return spdm_result_err!(EDEV);
                }
                match message_header.request_response_code {
                    SpdmRequestResponseCode::SpdmResponseVersion => {
                        let version = SpdmVersionResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        )
                        .ok_or(spdm_err!(EDEV))?;
                        debug!("!!! version : {:02x?}\n", version);

                        self.common.negotiate_info.spdm_version_count =
                            version.version_number_entry_count;
                        self.common.negotiate_info.spdm_version_peer = version.versions;

                        let mut version_sel = SpdmVersion::Unknown(0);
                        for entry in version
                            .versions
                            .iter()
                            .take(version.version_number_entry_count as usize)
                        {
                            if let SpdmVersion::Unknown(_) = entry.version {
                                continue;
                            }
                            if !self.common.config_info.spdm_version.contains(&entry.version) {
                                continue;
                            }
                            if entry.version.get_u8() > version_sel.get_u8() {
                                version_sel = entry.version;
                            }
                        }
                        if let SpdmVersion::Unknown(_) = version_sel {
                            error!("no common spdm version\n");
                            return spdm_result_err!(EDEV);
                        }
                        self.common.negotiate_info.spdm_version_sel = version_sel;

                        // only the declared entries belong to the transcript
                        let response_used = reader.used();
                        self.common
                            .append_transcript(
                                SpdmTranscript::MessageA,
                                &receive_buffer[..response_used],
                            )?
                            .commit();

                        self.common.runtime_info.connection_state =
                            SpdmConnectionState::SpdmConnectionAfterVersion;
                        Ok(())
                    }
                    _ => spdm_result_err!(EDEV),
                }
            }
            None => spdm_result_err!(EIO),
        }
    }
}
