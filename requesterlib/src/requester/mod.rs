// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! The Requester role: one transaction per SPDM request/response pair,
//! driven over a caller-supplied transport.

mod algorithm_req;
mod capability_req;
mod certificate_req;
mod challenge_req;
mod digest_req;
mod encap_req;
mod end_session_req;
mod finish_req;
mod handle_error_response_req;
mod heartbeat_req;
mod key_exchange_req;
mod key_update_req;
mod measurement_req;
mod psk_exchange_req;
mod psk_finish_req;
mod vers_req;

pub use crate::common;
pub use crate::common::spdm_codec::SpdmCodec;
pub use crate::common::{
    SpdmConfigInfo, SpdmConnectionState, SpdmDeviceIo, SpdmOpaqueStruct, SpdmProvisionInfo,
    SpdmSessionState, SpdmTranscript, SpdmTransportEncap,
};
pub use crate::config;
pub use crate::error::SpdmResult;
pub use crate::message::*;
pub use crate::protocol::*;
pub use crate::{spdm_err, spdm_result_err};
pub use codec::{Codec, Reader, Writer};

use crate::common::SpdmContext;
use crate::error::SpdmErrorNum;

pub struct RequesterContext<'a> {
    pub common: SpdmContext<'a>,
}

impl<'a> RequesterContext<'a> {
    pub fn new(
        device_io: &'a mut dyn SpdmDeviceIo,
        transport_encap: &'a mut dyn SpdmTransportEncap,
        config_info: SpdmConfigInfo,
        provision_info: SpdmProvisionInfo,
    ) -> Self {
        RequesterContext {
            common: SpdmContext::new(device_io, transport_encap, config_info, provision_info),
        }
    }

    /// GET_VERSION, GET_CAPABILITIES and NEGOTIATE_ALGORITHMS in order.
    pub fn init_connection(&mut self) -> SpdmResult {
        self.send_receive_spdm_version()?;
        self.send_receive_spdm_capability()?;
        self.send_receive_spdm_algorithm()
    }

    /// Establishes a session and drives it to the application phase.
    pub fn start_session(
        &mut self,
        use_psk: bool,
        slot_id: u8,
        measurement_summary_hash_type: SpdmMeasurementSummaryHashType,
    ) -> SpdmResult<u32> {
        if !use_psk {
            let session_id =
                self.send_receive_spdm_key_exchange(slot_id, measurement_summary_hash_type)?;
            self.send_receive_spdm_finish(session_id)?;
            Ok(session_id)
        } else {
            let session_id = self.send_receive_spdm_psk_exchange(measurement_summary_hash_type)?;
            self.send_receive_spdm_psk_finish(session_id)?;
            Ok(session_id)
        }
    }

    pub fn end_session(&mut self, session_id: u32) -> SpdmResult {
        self.send_receive_spdm_end_session(session_id)
    }

    pub fn send_spdm_request(
        &mut self,
        session_id: Option<u32>,
        send_buffer: &[u8],
    ) -> SpdmResult {
        match session_id {
            Some(session_id) => self.send_secured_message(session_id, send_buffer, false),
            None => self.send_message(send_buffer, false),
        }
    }

    pub fn receive_spdm_response(
        &mut self,
        session_id: Option<u32>,
        receive_buffer: &mut [u8],
    ) -> SpdmResult<usize> {
        match session_id {
            Some(session_id) => self.receive_secured_message(session_id, receive_buffer),
            None => self.receive_message(receive_buffer),
        }
    }

    pub fn send_secured_message(
        &mut self,
        session_id: u32,
        send_buffer: &[u8],
        is_app_message: bool,
    ) -> SpdmResult {
        let mut app_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let app_used =
            self.common
                .transport_encap
                .encap_app(send_buffer, &mut app_buffer, is_app_message)?;

        let session = self
            .common
            .get_session_via_id(session_id)
            .ok_or(spdm_err!(EINVAL))?;
        let mut secured_buffer = [0u8; config::DATA_TRANSFER_SIZE];
        let secured_used =
            session.encode_spdm_secured_message(&app_buffer[..app_used], &mut secured_buffer, true)?;

        self.send_message(&secured_buffer[..secured_used], true)
    }

    pub fn receive_secured_message(
        &mut self,
        session_id: u32,
        receive_buffer: &mut [u8],
    ) -> SpdmResult<usize> {
        let timeout = self.common.rsp_timeout_us();
        let mut transport_buffer = [0u8; config::DATA_TRANSFER_SIZE];
        let used = self
            .common
            .device_io
            .receive(&mut transport_buffer, timeout)
            .map_err(|_| spdm_err!(ETIME))?;

        let mut secured_buffer = [0u8; config::DATA_TRANSFER_SIZE];
        let (secured_used, secured_message) = self
            .common
            .transport_encap
            .decap(&transport_buffer[..used], &mut secured_buffer)?;
        if !secured_message {
            return spdm_result_err!(EDEV);
        }

        let session = self
            .common
            .get_session_via_id(session_id)
            .ok_or(spdm_err!(EINVAL))?;
        let mut app_buffer = [0u8; config::MAX_SPDM_MESSAGE_BUFFER_SIZE];
        let app_used = match session.decode_spdm_secured_message(
            &secured_buffer[..secured_used],
            &mut app_buffer,
            true,
        ) {
            Ok(app_used) => app_used,
            Err(e) => {
                // an unauthentic record is unrecoverable for this session
                if e.num == SpdmErrorNum::ESEC {
                    error!("secured message decode fail - teardown session\n");
                    let _ = session.teardown(session_id);
                }
                return Err(e);
            }
        };

        let (size, _is_app_message) = self
            .common
            .transport_encap
            .decap_app(&app_buffer[..app_used], receive_buffer)?;
        Ok(size)
    }

    fn send_message(&mut self, send_buffer: &[u8], is_secured: bool) -> SpdmResult {
        let mut transport_buffer = [0u8; config::DATA_TRANSFER_SIZE];
        let used =
            self.common
                .transport_encap
                .encap(send_buffer, &mut transport_buffer, is_secured)?;
        let timeout = self.common.rsp_timeout_us();
        self.common.device_io.send(&transport_buffer[..used], timeout)
    }

    fn receive_message(&mut self, receive_buffer: &mut [u8]) -> SpdmResult<usize> {
        let timeout = self.common.rsp_timeout_us();
        let mut transport_buffer = [0u8; config::DATA_TRANSFER_SIZE];
        let used = self
            .common
            .device_io
            .receive(&mut transport_buffer, timeout)
            .map_err(|_| spdm_err!(ETIME))?;

        let (payload_size, secured_message) = self
            .common
            .transport_encap
            .decap(&transport_buffer[..used], receive_buffer)?;
        if secured_message {
            return spdm_result_err!(EDEV);
        }
        Ok(payload_size)
    }
}
