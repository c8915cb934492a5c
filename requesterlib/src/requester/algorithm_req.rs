// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::error::SpdmResult;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    pub fn send_receive_spdm_algorithm(&mut self) -> SpdmResult {
        info!("send spdm algorithm\n");
        if self.common.runtime_info.connection_state
            < SpdmConnectionState::SpdmConnectionAfterCapabilities
        {
            return spdm_result_err!(EUNSUP);
        }

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let request_payload = self.build_negotiate_algorithms_payload();
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestNegotiateAlgorithms,
                },
                payload: SpdmMessagePayload::SpdmNegotiateAlgorithmsRequest(request_payload),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        let reservation =
            self.common
                .append_transcript(SpdmTranscript::MessageA, &send_buffer[..send_used])?;
        match self.send_receive_spdm_algorithm_response(&send_buffer[..send_used]) {
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

    fn build_negotiate_algorithms_payload(&self) -> SpdmNegotiateAlgorithmsRequestPayload {
        let config_info = &self.common.config_info;
        let alg_struct = [
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeDHE,
                alg_fixed_count: 0x20,
                alg_supported: SpdmAlg::SpdmAlgoDhe(config_info.dhe_algo),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeAEAD,
                alg_fixed_count: 0x20,
                alg_supported: SpdmAlg::SpdmAlgoAead(config_info.aead_algo),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeReqAsym,
                alg_fixed_count: 0x20,
                alg_supported: SpdmAlg::SpdmAlgoReqAsym(config_info.req_asym_algo),
            },
            SpdmAlgStruct {
                alg_type: SpdmAlgType::SpdmAlgTypeKeySchedule,
                alg_fixed_count: 0x20,
                alg_supported: SpdmAlg::SpdmAlgoKeySchedule(config_info.key_schedule_algo),
            },
        ];
        // the algorithm structure tables exist from SPDM 1.1 on
        let alg_struct_count =
            if self.common.negotiate_info.spdm_version_sel == SpdmVersion::SpdmVersion10 {
                0
            } else {
                alg_struct.len() as u8
            };
        SpdmNegotiateAlgorithmsRequestPayload {
            measurement_specification: config_info.measurement_specification,
            base_asym_algo: config_info.base_asym_algo,
            base_hash_algo: config_info.base_hash_algo,
            alg_struct_count,
            alg_struct,
        }
    }

    fn send_receive_spdm_algorithm_response(&mut self, send_buffer: &[u8]) -> SpdmResult {
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
                    SpdmRequestResponseCode::SpdmRequestNegotiateAlgorithms,
                    SpdmRequestResponseCode::SpdmResponseAlgorithms,
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
                    SpdmRequestResponseCode::SpdmResponseAlgorithms => {
                        let algorithms = SpdmAlgorithmsResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        )
                        .ok_or(spdm_err!(EDEV))?;
                        debug!("!!! algorithms : {:02x?}\n", algorithms);

                        self.verify_and_select_algorithms(&algorithms)?;

                        let response_used = reader.used();
                        self.common
                            .append_transcript(
                                SpdmTranscript::MessageA,
                                &receive_buffer[..response_used],
                            )?
                            .commit();

                        self.common.runtime_info.connection_state =
                            SpdmConnectionState::SpdmConnectionAfterNegotiateAlgorithms;
                        Ok(())
                    }
                    _ => spdm_result_err!(EDEV),
                }
            }
            None => spdm_result_err!(EIO),
        }
    }

    /// A selection must name at most one algorithm per concern and stay
    /// within what the requester offered.
    fn verify_and_select_algorithms(
        &mut self,
        algorithms: &SpdmAlgorithmsResponsePayload,
    ) -> SpdmResult {
        let config_info = &self.common.config_info;

        if algorithms.measurement_specification_sel.bits().count_ones() > 1
            || !config_info
                .measurement_specification
                .contains(algorithms.measurement_specification_sel)
        {
            return spdm_result_err!(EDEV);
        }
        if algorithms.base_hash_sel.bits().count_ones() != 1
            || !config_info.base_hash_algo.contains(algorithms.base_hash_sel)
        {
            return spdm_result_err!(EDEV);
        }
        if algorithms.base_asym_sel.bits().count_ones() != 1
            || !config_info.base_asym_algo.contains(algorithms.base_asym_sel)
        {
            return spdm_result_err!(EDEV);
        }
        if algorithms.measurement_hash_algo.bits().count_ones() > 1 {
            return spdm_result_err!(EDEV);
        }

        self.common.negotiate_info.measurement_specification_sel =
            algorithms.measurement_specification_sel;
        self.common.negotiate_info.measurement_hash_sel = algorithms.measurement_hash_algo;
        self.common.negotiate_info.base_hash_sel = algorithms.base_hash_sel;
        self.common.negotiate_info.base_asym_sel = algorithms.base_asym_sel;

        for alg in algorithms
            .alg_struct
            .iter()
            .take(algorithms.alg_struct_count as usize)
        {
            match alg.alg_supported {
                SpdmAlg::SpdmAlgoDhe(selected) => {
                    if selected.bits().count_ones() > 1
                        || !self.common.config_info.dhe_algo.contains(selected)
                    {
                        return spdm_result_err!(EDEV);
                    }
                    self.common.negotiate_info.dhe_sel = selected;
                }
                SpdmAlg::SpdmAlgoAead(selected) => {
                    if selected.bits().count_ones() > 1
                        || !self.common.config_info.aead_algo.contains(selected)
                    {
                        return spdm_result_err!(EDEV);
                    }
                    self.common.negotiate_info.aead_sel = selected;
                }
                SpdmAlg::SpdmAlgoReqAsym(selected) => {
                    if selected.bits().count_ones() > 1
                        || !self.common.config_info.req_asym_algo.contains(selected)
                    {
                        return spdm_result_err!(EDEV);
                    }
                    self.common.negotiate_info.req_asym_sel = selected;
                }
                SpdmAlg::SpdmAlgoKeySchedule(selected) => {
                    if selected.bits().count_ones() > 1
                        || !self.common.config_info.key_schedule_algo.contains(selected)
                    {
                        return spdm_result_err!(EDEV);
                    }
                    self.common.negotiate_info.key_schedule_sel = selected;
                }
                SpdmAlg::SpdmAlgoUnknown(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests_requester {
    use super::*;
    use crate::error::SpdmErrorNum;
    use crate::testlib::*;

    #[test]
    fn test_case0_send_receive_spdm_algorithm() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());
        device_io.queue_message(&good_capabilities_response());
        device_io.queue_message(&good_algorithms_response());

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        requester.init_connection().unwrap();
        assert_eq!(
            requester.common.negotiate_info.base_hash_sel,
            SpdmBaseHashAlgo::TPM_ALG_SHA_384
        );
        assert_eq!(
            requester.common.negotiate_info.dhe_sel,
            SpdmDheAlgo::SECP_384_R1
        );
        assert_eq!(
            requester.common.runtime_info.connection_state,
            SpdmConnectionState::SpdmConnectionAfterNegotiateAlgorithms
        );
    }

    #[test]
    fn test_case1_send_receive_spdm_algorithm_unoffered_selection() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());
        device_io.queue_message(&good_capabilities_response());
        // SHA-512 was never offered
        let mut rsp = good_algorithms_response();
        rsp[16] = SpdmBaseHashAlgo::TPM_ALG_SHA_512.bits() as u8;
        device_io.queue_message(&rsp);

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        let status = requester.init_connection();
        assert_eq!(status.unwrap_err().num, SpdmErrorNum::EDEV);
    }

    #[test]
    fn test_case2_send_receive_spdm_algorithm_before_capabilities() {
        let (config_info, provision_info) = create_info();
        let transport_encap = &mut TestTransportEncap {};
        let device_io = &mut FakeSpdmDeviceIo::new();
        device_io.queue_message(&good_version_response());

        let mut requester =
            RequesterContext::new(device_io, transport_encap, config_info, provision_info);

        requester.send_receive_spdm_version().unwrap();
        let status = requester.send_receive_spdm_algorithm();
        assert_eq!(status.unwrap_err().num, SpdmErrorNum::EUNSUP);
    }
}
