// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::{ManagedBuffer, SpdmSessionType};
use crate::crypto;
use crate::error::SpdmResult;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    /// KEY_EXCHANGE / KEY_EXCHANGE_RSP: derives the handshake secrets and
    /// leaves the new session in the handshaking phase.
    pub fn send_receive_spdm_key_exchange(
        &mut self,
        slot_id: u8,
        measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    ) -> SpdmResult<u32> {
        info!("send spdm key exchange\n");
        if self.common.runtime_info.connection_state
            < SpdmConnectionState::SpdmConnectionAfterNegotiateAlgorithms
        {
            return spdm_result_err!(EUNSUP);
        }
        if !self
            .common
            .negotiate_info
            .req_capabilities_sel
            .contains(SpdmRequestCapabilityFlags::KEY_EX_CAP)
            || !self
                .common
                .negotiate_info
                .rsp_capabilities_sel
                .contains(SpdmResponseCapabilityFlags::KEY_EX_CAP)
        {
            return spdm_result_err!(EUNSUP);
        }
        self.setup_measurement_summary_hash(measurement_summary_hash_type)?;

        let req_session_id = self.common.get_next_half_session_id()?;
        let (exchange, my_key) =
            crypto::dhe::generate_key_pair(self.common.negotiate_info.dhe_sel)
                .ok_or(spdm_err!(EUNSUP))?;
        let mut random = SpdmRandomStruct::default();
        crypto::rand::get_random(&mut random.data)?;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestKeyExchange,
                },
                payload: SpdmMessagePayload::SpdmKeyExchangeRequest(
                    SpdmKeyExchangeRequestPayload {
                        measurement_summary_hash_type,
                        slot_id,
                        req_session_id,
                        random,
                        exchange,
                        opaque: SpdmOpaqueStruct::default(),
                    },
                ),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        let mut message_k = ManagedBuffer::default();
        message_k
            .append_message(&send_buffer[..send_used])
            .ok_or(spdm_err!(ENOMEM))?;

        self.send_spdm_request(None, &send_buffer[..send_used])?;

        let mut receive_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let mut receive_used = self.receive_spdm_response(None, &mut receive_buffer)?;

        {
            let mut reader = Reader::init(&receive_buffer[..receive_used]);
            let header = SpdmMessageHeader::read(&mut reader).ok_or(spdm_err!(EIO))?;
            if header.request_response_code == SpdmRequestResponseCode::SpdmResponseError {
                let rm = self.spdm_handle_error_response_main(
                    None,
                    &receive_buffer[..receive_used],
                    SpdmRequestResponseCode::SpdmRequestKeyExchange,
                    SpdmRequestResponseCode::SpdmResponseKeyExchangeRsp,
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
                    SpdmRequestResponseCode::SpdmResponseKeyExchangeRsp => {
                        let key_exchange_rsp = SpdmKeyExchangeResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        )
                        .ok_or(spdm_err!(EDEV))?;
                        debug!("!!! key_exchange rsp : {:02x?}\n", key_exchange_rsp);

                        // low half chosen here, high half by the responder
                        let session_id = ((key_exchange_rsp.rsp_session_id as u32) << 16)
                            + req_session_id as u32;

                        let in_clear_text =
                            SpdmKeyExchangeResponsePayload::in_clear_text(&self.common);
                        let base_hash_size =
                            self.common.negotiate_info.base_hash_sel.get_size() as usize;
                        let signature_size =
                            self.common.negotiate_info.base_asym_sel.get_size() as usize;
                        let receive_used = reader.used();
                        let mut temp_used = receive_used - signature_size;
                        if !in_clear_text {
                            temp_used -= base_hash_size;
                        }
                        message_k
                            .append_message(&receive_buffer[..temp_used])
                            .ok_or(spdm_err!(ENOMEM))?;

                        // responder signature covers TH up to its signature
                        let transcript_data =
                            self.common
                                .calc_req_transcript_data(false, Some(&message_k), None)?;
                        let (leaf_cert_data, leaf_begin, leaf_end) =
                            self.common.peer_leaf_cert_data(slot_id)?;
                        if crypto::asym_verify::verify(
                            self.common.negotiate_info.base_hash_sel,
                            self.common.negotiate_info.base_asym_sel,
                            &leaf_cert_data.as_ref()[leaf_begin..leaf_end],
                            transcript_data.as_ref(),
                            &key_exchange_rsp.signature,
                        )
                        .is_err()
                        {
                            error!("key exchange signature verification fail\n");
                            return spdm_result_err!(ESEC);
                        }
                        info!("key exchange signature verification pass\n");
                        message_k
                            .append_message(key_exchange_rsp.signature.as_ref())
                            .ok_or(spdm_err!(ENOMEM))?;

                        let th1 =
                            self.common
                                .calc_req_transcript_hash(false, Some(&message_k), None)?;
                        debug!("!!! th1 : {:02x?}\n", th1.as_ref());
                        let hmac_transcript_data =
                            self.common
                                .calc_req_transcript_data(false, Some(&message_k), None)?;

                        let final_key = crypto::dhe::compute_final_key(
                            self.common.negotiate_info.dhe_sel,
                            &my_key,
                            &key_exchange_rsp.exchange,
                        )
                        .ok_or(spdm_err!(ESEC))?;

                        let base_hash_sel = self.common.negotiate_info.base_hash_sel;
                        let dhe_sel = self.common.negotiate_info.dhe_sel;
                        let aead_sel = self.common.negotiate_info.aead_sel;
                        let key_schedule_sel = self.common.negotiate_info.key_schedule_sel;
                        let sequence_number_count =
                            self.common.transport_encap.get_sequence_number_count();
                        let max_random_count = self.common.transport_encap.get_max_random_count();
                        let heartbeat_period = if self
                            .common
                            .negotiate_info
                            .rsp_capabilities_sel
                            .contains(SpdmResponseCapabilityFlags::HBEAT_CAP)
                        {
                            key_exchange_rsp.heartbeat_period
                        } else {
                            0
                        };

                        let session = self.common.get_free_session().ok_or(spdm_err!(ENOMEM))?;
                        session.setup(session_id)?;
                        session.set_session_type(SpdmSessionType::SpdmSessionTypeMutAuth);
                        session.set_crypto_param(
                            base_hash_sel,
                            dhe_sel,
                            aead_sel,
                            key_schedule_sel,
                        );
                        session.set_transport_param(sequence_number_count, max_random_count);
                        session.heartbeat_period = heartbeat_period;
                        session.generate_handshake_secret(&th1, final_key.as_ref())?;

                        if !in_clear_text {
                            let session =
                                self.common.get_session_via_id(session_id).unwrap();
                            if session
                                .verify_hmac_with_response_finished_key(
                                    hmac_transcript_data.as_ref(),
                                    &key_exchange_rsp.verify_data,
                                )
                                .is_err()
                            {
                                error!("verify_hmac_with_response_finished_key fail");
                                let _ = session.teardown(session_id);
                                return spdm_result_err!(EFAULT);
                            }
                            info!("verify_hmac_with_response_finished_key pass");
                            message_k
                                .append_message(key_exchange_rsp.verify_data.as_ref())
                                .ok_or(spdm_err!(ENOMEM))?;
                        }

                        let session = self.common.get_session_via_id(session_id).unwrap();
                        session.runtime_info.message_k = message_k;
                        session.set_session_state(SpdmSessionState::SpdmSessionHandshaking);

                        if !key_exchange_rsp.mut_auth_req.is_empty() {
                            if !self
                                .common
                                .negotiate_info
                                .req_capabilities_sel
                                .contains(SpdmRequestCapabilityFlags::MUT_AUTH_CAP)
                            {
                                let session =
                                    self.common.get_session_via_id(session_id).unwrap();
                                let _ = session.teardown(session_id);
                                return spdm_result_err!(EUNSUP);
                            }
                            let mut req_slot_id_param = 0u8;
                            if let Err(e) = self
                                .spdm_encapsulated_request(Some(session_id), &mut req_slot_id_param)
                            {
                                if let Some(session) =
                                    self.common.get_session_via_id(session_id)
                                {
                                    let _ = session.teardown(session_id);
                                }
                                return Err(e);
                            }
                        }

                        Ok(session_id)
                    }
                    _ => spdm_result_err!(EINVAL),
                }
            }
            None => spdm_result_err!(EIO),
        }
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::common::SpdmSessionState;
    use crate::error::SpdmErrorNum;
    use crate::testlib::*;

    #[test]
    fn test_case0_send_receive_spdm_key_exchange() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());
        device_io.queue_message(&good_capabilities_response());
        device_io.queue_message(&good_algorithms_response());
        let chain = test_cert_chain_buffer();
        device_io.queue_message(&certificate_response(0, &chain, 0));
        device_io.queue_message(&key_exchange_response(0x2222));

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        requester.init_connection().unwrap();
        requester.send_receive_spdm_certificate(0).unwrap();
        let session_id = requester
            .send_receive_spdm_key_exchange(
                0,
                SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone,
            )
            .unwrap();
        assert_eq!(session_id >> 16, 0x2222);
        let session = requester.common.get_session_via_id(session_id).unwrap();
        assert_eq!(
            session.get_session_state(),
            SpdmSessionState::SpdmSessionHandshaking
        );
    }

    #[test]
    fn test_case1_send_receive_spdm_key_exchange_bad_signature() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());
        device_io.queue_message(&good_capabilities_response());
        device_io.queue_message(&good_algorithms_response());
        let chain = test_cert_chain_buffer();
        device_io.queue_message(&certificate_response(0, &chain, 0));
        let mut rsp = key_exchange_response(0x2222);
        let len = rsp.len();
        // corrupt the signature region (it precedes the trailing hmac)
        rsp[len - 48 - 96] ^= 0xff;
        device_io.queue_message(&rsp);

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        requester.init_connection().unwrap();
        requester.send_receive_spdm_certificate(0).unwrap();
        let status = requester.send_receive_spdm_key_exchange(
            0,
            SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone,
        );
        assert_eq!(status.unwrap_err().num, SpdmErrorNum::ESEC);
        // no half-open session is left behind
        assert!(requester.common.get_free_session().is_some());
    }

    #[test]
    fn test_case2_send_receive_spdm_key_exchange_without_key_ex_cap() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());
        let mut caps = good_capabilities_response();
        // mask KEY_EX_CAP out of the responder flags
        caps[9] &= !0x02;
        device_io.queue_message(&caps);
        device_io.queue_message(&good_algorithms_response());

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        requester.init_connection().unwrap();
        let status = requester.send_receive_spdm_key_exchange(
            0,
            SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone,
        );
        assert_eq!(status.unwrap_err().num, SpdmErrorNum::EUNSUP);
    }
}
