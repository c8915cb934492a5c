// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::crypto;
use crate::error::SpdmResult;
use crate::protocol::SpdmMeasurementRecordStructure;
use crate::requester::*;

impl<'a> RequesterContext<'a> {
    /// One GET_MEASUREMENTS exchange. The L1/L2 transcript accumulates
    /// every exchange and is reset once a signed response verifies.
    pub fn send_receive_spdm_measurement(
        &mut self,
        slot_id: u8,
        measurement_attributes: SpdmMeasurementAttributes,
        measurement_operation: SpdmMeasurementOperation,
        total_number: &mut u8,
        measurement_record: &mut SpdmMeasurementRecordStructure,
    ) -> SpdmResult {
        info!("send spdm measurement\n");
        if self.common.runtime_info.connection_state
            < SpdmConnectionState::SpdmConnectionAfterNegotiateAlgorithms
        {
            return spdm_result_err!(EUNSUP);
        }
        let signature_requested =
            measurement_attributes.contains(SpdmMeasurementAttributes::SIGNATURE_REQUESTED);
        let rsp_capabilities = self.common.negotiate_info.rsp_capabilities_sel;
        if signature_requested {
            if !rsp_capabilities.contains(SpdmResponseCapabilityFlags::MEAS_CAP_SIG) {
                return spdm_result_err!(EUNSUP);
            }
        } else if !rsp_capabilities.intersects(
            SpdmResponseCapabilityFlags::MEAS_CAP_NO_SIG
                | SpdmResponseCapabilityFlags::MEAS_CAP_SIG,
        ) {
            return spdm_result_err!(EUNSUP);
        }
        self.common.runtime_info.need_measurement_signature = signature_requested;

        let mut nonce = [0u8; SPDM_NONCE_SIZE];
        crypto::rand::get_random(&mut nonce)?;

        let mut send_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let send_used = {
            let mut writer = Writer::init(&mut send_buffer);
            let request = SpdmMessage {
                header: SpdmMessageHeader {
                    version: self.common.negotiate_info.spdm_version_sel,
                    request_response_code: SpdmRequestResponseCode::SpdmRequestGetMeasurements,
                },
                payload: SpdmMessagePayload::SpdmGetMeasurementsRequest(
                    SpdmGetMeasurementsRequestPayload {
                        measurement_attributes,
                        measurement_operation,
                        nonce: SpdmNonceStruct { data: nonce },
                        slot_id,
                    },
                ),
            };
            request.spdm_encode(&mut self.common, &mut writer);
            writer.used()
        };

        let reservation =
            self.common
                .append_transcript(SpdmTranscript::MessageM, &send_buffer[..send_used])?;
        match self.send_receive_spdm_measurement_response(
            slot_id,
            signature_requested,
            &send_buffer[..send_used],
            total_number,
            measurement_record,
        ) {
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

    fn send_receive_spdm_measurement_response(
        &mut self,
        slot_id: u8,
        signature_requested: bool,
        send_buffer: &[u8],
        total_number: &mut u8,
        measurement_record: &mut SpdmMeasurementRecordStructure,
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
                    SpdmRequestResponseCode::SpdmRequestGetMeasurements,
                    SpdmRequestResponseCode::SpdmResponseMeasurements,
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
                    SpdmRequestResponseCode::SpdmResponseMeasurements => {
                        let measurements = SpdmMeasurementsResponsePayload::spdm_read(
                            &mut self.common,
                            &mut reader,
                        )
                        .ok_or(spdm_err!(EDEV))?;
                        debug!("!!! measurements : {:02x?}\n", measurements);

                        let response_used = reader.used();
                        if signature_requested {
                            let signature_size =
                                self.common.negotiate_info.base_asym_sel.get_size() as usize;
                            if response_used < signature_size {
                                return spdm_result_err!(EDEV);
                            }
                            let temp_used = response_used - signature_size;
                            self.common
                                .append_transcript(
                                    SpdmTranscript::MessageM,
                                    &receive_buffer[..temp_used],
                                )?
                                .commit();

                            let (leaf_cert_data, leaf_begin, leaf_end) =
                                self.common.peer_leaf_cert_data(slot_id)?;
                            if crypto::asym_verify::verify(
                                self.common.negotiate_info.base_hash_sel,
                                self.common.negotiate_info.base_asym_sel,
                                &leaf_cert_data.as_ref()[leaf_begin..leaf_end],
                                self.common.runtime_info.message_m.as_ref(),
                                &measurements.signature,
                            )
                            .is_err()
                            {
                                error!("measurement signature verification fail\n");
                                return spdm_result_err!(ESEC);
                            }
                            info!("measurement signature verification pass\n");
                            // a signed response concludes the L1/L2 span
                            self.common.runtime_info.message_m.reset_message();
                        } else {
                            self.common
                                .append_transcript(
                                    SpdmTranscript::MessageM,
                                    &receive_buffer[..response_used],
                                )?
                                .commit();
                        }

                        *total_number = measurements.number_of_measurement;
                        *measurement_record = measurements.measurement_record;
                        Ok(())
                    }
                    _ => spdm_result_err!(EDEV),
                }
            }
            None => spdm_result_err!(EIO),
        }
    }
}
