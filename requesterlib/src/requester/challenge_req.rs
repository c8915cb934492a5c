// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto;
use crate::error::SpdmResult;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_challenge(
        &mut self,
        slot_id: u8,
        measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    ) -> SpdmResult {
        info!("send spdm challenge\n");
        if self.common.runtime_info.connection_state
            < SpdmConnectionState::SpdmConnectionAfterNegotiateAlgorithms
        {
            return spdm_result_err!(EUNSUP);
        }
        if !self
            .common
            .negotiate_info
            .rsp_capabilities_sel
            .contains(SpdmResponseCapabilityFlags::CHAL_CAP)
        {
            return spdm_result_err!(EUNSUP);
        }
        self.setup_measurement_summary_hash(measurement_summary_hash_type)?;

        let mut nonce = [0u8; SPDM_NONCE_SIZE];
        crypto::rand::get_random(&mut nonce)?;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestChallenge,
                },
                payload: SpdmMessagePayload::SpdmChallengeRequest(SpdmChallengeRequestPayload {
                    slot_id,
                    measurement_summary_hash_type,
                    nonce: SpdmNonceStruct { data: nonce },
                }),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        let reservation =
            self.common
                .append_transcript(SpdmTranscript::MessageC, &send_buffer[..send_used])?;
        match self.send_receive_spdm_challenge_response(slot_id, &send_buffer[..send_used]) {
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

    pub(crate) fn setup_measurement_summary_hash(
        &mut self,
        measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    ) -> SpdmResult {
        if measurement_summary_hash_type
            == SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone
        {
            self.common.runtime_info.need_measurement_summary_hash = false;
            return Ok(());
        }
        let meas_cap = self.common.negotiate_info.rsp_capabilities_sel.intersects(
            SpdmResponseCapabilityFlags::MEAS_CAP_NO_SIG
                | SpdmResponseCapabilityFlags::MEAS_CAP_SIG,
        );
        if !meas_cap {
            return spdm_result_err!(EUNSUP);
        }
        self.common.runtime_info.need_measurement_summary_hash = true;
        Ok(())
    }

    fn send_receive_spdm_challenge_response(
        &mut self,
        slot_id: u8,
        send_buffer: &[u8],
    ) -> SpdmResult {
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
                    SpdmRequestResponseCode::SpdmRequestChallenge,
                    SpdmRequestResponseCode::SpdmResponseChallengeAuth,
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
                    SpdmRequestResponseCode::SpdmResponseChallengeAuth => {
                        let challenge_auth = SpdmChallengeAuthResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        )
                        .ok_or(spdm_err!(EDEV))?;
                        debug!("!!! challenge_auth : {:02x?}\n", challenge_auth);

                        // the responder must attest the very chain we hold
                        let expected_hash = self.expected_cert_chain_hash(slot_id)?;
                        if expected_hash.as_ref() != challenge_auth.cert_chain_hash.as_ref() {
                            error!("cert chain hash mismatch\n");
                            return spdm_result_err!(ESEC);
                        }

                        let signature_size =
                            self.common.negotiate_info.base_asym_sel.get_size() as usize;
                        let receive_used = reader.used();
                        if receive_used < signature_size {
                            return spdm_result_err!(EDEV);
                        }
                        let temp_used = receive_used - signature_size;
                        self.common
                            .append_transcript(
                                SpdmTranscript::MessageC,
                                &receive_buffer[..temp_used],
                            )?
                            .commit();

                        let mut m1m2 = self.common.calc_req_transcript_data(false, None, None)?;
                        m1m2.append_message(self.common.runtime_info.message_c.as_ref())
                            .ok_or(spdm_err!(ENOMEM))?;

                        let (leaf_cert_data, leaf_begin, leaf_end) =
                            self.common.peer_leaf_cert_data(slot_id)?;
                        if crypto::asym_verify::verify(
                            self.common.negotiate_info.base_hash_sel,
                            self.common.negotiate_info.base_asym_sel,
                            &leaf_cert_data.as_ref()[leaf_begin..leaf_end],
                            m1m2.as_ref(),
                            &challenge_auth.signature,
                        )
                        .is_err()
                        {
                            error!("challenge signature verification fail\n");
                            return spdm_result_err!(ESEC);
                        }
                        info!("challenge signature verification pass\n");

                        self.common
                            .append_transcript(
                                SpdmTranscript::MessageC,
                                &receive_buffer[temp_used..receive_used],
                            )?
                            .commit();

                        if self.common.runtime_info.connection_state
                            < SpdmConnectionState::SpdmConnectionAfterAuthenticate
                        {
                            self.common.runtime_info.connection_state =
                                SpdmConnectionState::SpdmConnectionAfterAuthenticate;
                        }

                        if challenge_auth
                            .challenge_auth_attribute
                            .contains(SpdmChallengeAuthAttribute::BASIC_MUT_AUTH_REQ)
                        {
                            let mut req_slot_id_param = 0u8;
                            self.spdm_encapsulated_request(None, &mut req_slot_id_param)?;
                        }
                        Ok(())
                    }
                    _ => spdm_result_err!(EDEV),
                }
            }
            None => spdm_result_err!(EIO),
        }
    }

    fn expected_cert_chain_hash(&self, slot_id: u8) -> SpdmResult<SpdmDigestStruct> {
        let base_hash_sel = self.common.negotiate_info.base_hash_sel;
        if slot_id == 0xFF {
            let key = self
                .common
                .provision_info
                .peer_pub_key
                .as_ref()
                .ok_or(spdm_err!(EUNSUP))?;
            return crypto::hash::hash_all(base_hash_sel, key.as_ref())
                .ok_or(spdm_err!(EUNSUP));
        }
        let cert_chain = self.common.peer_info.peer_cert_chain[slot_id as usize]
            .as_ref()
            .ok_or(spdm_err!(EUNSUP))?;
        crypto::hash::hash_all(base_hash_sel, cert_chain.as_ref()).ok_or(spdm_err!(EUNSUP))
    }
}
