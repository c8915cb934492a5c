// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::{ManagedBuffer, SpdmSessionType};
use crate::crypto;
use crate::error::SpdmResult;
use crate::protocol::SpdmPskContextStruct;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    /// PSK_EXCHANGE / PSK_EXCHANGE_RSP: the key-exchange shape without
    /// asymmetric signatures, seeded from the provisioned pre-shared key.
    pub fn send_receive_spdm_psk_exchange(
        &mut self,
        measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    ) -> SpdmResult<u32> {
        info!("send spdm psk exchange\n");
        if self.common.runtime_info.connection_state
            < SpdmConnectionState::SpdmConnectionAfterNegotiateAlgorithms
        {
            return spdm_result_err!(EUNSUP);
        }
        if !self
            .common
            .negotiate_info
            .req_capabilities_sel
            .contains(SpdmRequestCapabilityFlags::PSK_CAP)
            || !self.common.negotiate_info.rsp_capabilities_sel.intersects(
                SpdmResponseCapabilityFlags::PSK_CAP_WITHOUT_CONTEXT
                    | SpdmResponseCapabilityFlags::PSK_CAP_WITH_CONTEXT,
            )
        {
            return spdm_result_err!(EUNSUP);
        }
        if self.common.provision_info.psk.is_none() {
            return spdm_result_err!(EUNSUP);
        }
        self.setup_measurement_summary_hash(measurement_summary_hash_type)?;

        let req_session_id = self.common.get_next_half_session_id()?;
        let mut psk_context = SpdmPskContextStruct {
            data_size: config::MAX_SPDM_PSK_CONTEXT_SIZE as u16 / 2,
            ..Default::default()
        };
        crypto::rand::get_random(&mut psk_context.data[..psk_context.data_size as usize])?;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let psk_hint = self.common.provision_info.psk_hint;
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestPskExchange,
                },
                payload: SpdmMessagePayload::SpdmPskExchangeRequest(
                    SpdmPskExchangeRequestPayload {
                        measurement_summary_hash_type,
                        req_session_id,
                        psk_hint,
                        psk_context,
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
                    SpdmRequestResponseCode::SpdmRequestPskExchange,
                    SpdmRequestResponseCode::SpdmResponsePskExchangeRsp,
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
                    SpdmRequestResponseCode::SpdmResponsePskExchangeRsp => {
                        let psk_exchange_rsp = SpdmPskExchangeResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        )
                        .ok_or(spdm_err!(EDEV))?;
                        debug!("!!! psk_exchange rsp : {:02x?}\n", psk_exchange_rsp);

                        let session_id = ((psk_exchange_rsp.rsp_session_id as u32) << 16)
                            + req_session_id as u32;

                        let base_hash_size =
                            self.common.negotiate_info.base_hash_sel.get_size() as usize;
                        let receive_used = reader.used();
                        let temp_used = receive_used - base_hash_size;
                        message_k
                            .append_message(&receive_buffer[..temp_used])
                            .ok_or(spdm_err!(ENOMEM))?;

                        let th1 =
                            self.common
                                .calc_req_transcript_hash(true, Some(&message_k), None)?;
                        debug!("!!! th1 : {:02x?}\n", th1.as_ref());
                        let hmac_transcript_data =
                            self.common
                                .calc_req_transcript_data(true, Some(&message_k), None)?;

                        let base_hash_sel = self.common.negotiate_info.base_hash_sel;
                        let dhe_sel = self.common.negotiate_info.dhe_sel;
                        let aead_sel = self.common.negotiate_info.aead_sel;
                        let key_schedule_sel = self.common.negotiate_info.key_schedule_sel;
                        let sequence_number_count =
                            self.common.transport_encap.get_sequence_number_count();
                        let max_random_count = self.common.transport_encap.get_max_random_count();
                        let psk = self.common.provision_info.psk.ok_or(spdm_err!(EUNSUP))?;
                        let heartbeat_period = if self
                            .common
                            .negotiate_info
                            .rsp_capabilities_sel
                            .contains(SpdmResponseCapabilityFlags::HBEAT_CAP)
                        {
                            psk_exchange_rsp.heartbeat_period
                        } else {
                            0
                        };

                        let session = self.common.get_free_session().ok_or(spdm_err!(ENOMEM))?;
                        session.setup(session_id)?;
                        session.set_session_type(SpdmSessionType::SpdmSessionTypePsk);
                        session.set_crypto_param(
                            base_hash_sel,
                            dhe_sel,
                            aead_sel,
                            key_schedule_sel,
                        );
                        session.set_transport_param(sequence_number_count, max_random_count);
                        session.heartbeat_period = heartbeat_period;
                        session.generate_handshake_secret(&th1, psk.as_ref())?;

                        let session = self.common.get_session_via_id(session_id).unwrap();
                        if session
                            .verify_hmac_with_response_finished_key(
                                hmac_transcript_data.as_ref(),
                                &psk_exchange_rsp.verify_data,
                            )
                            .is_err()
                        {
                            error!("verify_hmac_with_response_finished_key fail");
                            let _ = session.teardown(session_id);
                            return spdm_result_err!(EFAULT);
                        }
                        info!("verify_hmac_with_response_finished_key pass");
                        message_k
                            .append_message(psk_exchange_rsp.verify_data.as_ref())
                            .ok_or(spdm_err!(ENOMEM))?;

                        let session = self.common.get_session_via_id(session_id).unwrap();
                        session.runtime_info.message_k = message_k;
                        session.set_session_state(SpdmSessionState::SpdmSessionHandshaking);

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
    fn test_case0_send_receive_spdm_psk_exchange() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());
        device_io.queue_message(&good_capabilities_response());
        device_io.queue_message(&good_algorithms_response());
        device_io.queue_message(&psk_exchange_response(0x4444));

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        requester.init_connection().unwrap();
        let session_id = requester
            .send_receive_spdm_psk_exchange(
                SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone,
            )
            .unwrap();
        assert_eq!(session_id >> 16, 0x4444);
        let session = requester.common.get_session_via_id(session_id).unwrap();
        assert_eq!(
            session.get_session_state(),
            SpdmSessionState::SpdmSessionHandshaking
        );
    }

    #[test]
    fn test_case1_send_receive_spdm_psk_exchange_without_psk() {
        let (config_info, mut provision_info) = create_info();
        provision_info.psk = None;
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());
        device_io.queue_message(&good_capabilities_response());
        device_io.queue_message(&good_algorithms_response());

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        requester.init_connection().unwrap();
        let status = requester.send_receive_spdm_psk_exchange(
            SpdmMeasurementSummaryHashType::SpdmMeasurementSummaryHashTypeNone,
        );
        assert_eq!(status.unwrap_err().num, SpdmErrorNum::EUNSUP);
    }
}
