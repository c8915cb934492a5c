// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common::key_schedule::{
    binconcat, MAX_BIN_CONCAT_BUF_SIZE, SPDM_BIN_STR_0_LABEL, SPDM_BIN_STR_1_LABEL,
    SPDM_BIN_STR_2_LABEL, SPDM_BIN_STR_3_LABEL, SPDM_BIN_STR_4_LABEL, SPDM_BIN_STR_5_LABEL,
    SPDM_BIN_STR_6_LABEL, SPDM_BIN_STR_7_LABEL, SPDM_BIN_STR_9_LABEL,
};
use crate::common::ManagedBuffer;
use crate::config;
use crate::crypto;
use crate::error::SpdmResult;
use crate::protocol::*;
use crate::{spdm_err, spdm_result_err};
use zeroize::Zeroize;

pub const INVALID_SESSION_ID: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmSessionState {
    SpdmSessionNotStarted,
    SpdmSessionHandshaking,
    SpdmSessionEstablished,
    SpdmSessionTerminating,
}

impl Default for SpdmSessionState {
    fn default() -> SpdmSessionState {
        SpdmSessionState::SpdmSessionNotStarted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmSessionType {
    SpdmSessionTypeMutAuth,
    SpdmSessionTypePsk,
}

impl Default for SpdmSessionType {
    fn default() -> SpdmSessionType {
        SpdmSessionType::SpdmSessionTypeMutAuth
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpdmSessionCryptoParam {
    pub base_hash_algo: SpdmBaseHashAlgo,
    pub dhe_algo: SpdmDheAlgo,
    pub aead_algo: SpdmAeadAlgo,
    pub key_schedule_algo: SpdmKeyScheduleAlgo,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpdmSessionTransportParam {
    pub sequence_number_count: u8,
    pub max_random_count: u16,
}

/// Keys of one traffic direction: AEAD key, salt, and the monotonically
/// increasing sequence number feeding the nonce.
#[derive(Debug, Clone, Copy, Default, Zeroize)]
pub struct SpdmSessionSecretParam {
    pub encryption_key: [u8; SPDM_MAX_AEAD_KEY_SIZE],
    pub salt: [u8; SPDM_MAX_AEAD_IV_SIZE],
    pub sequence_number: u64,
}

#[derive(Debug, Clone, Copy, Default, Zeroize)]
pub struct SpdmSessionSecrets {
    pub request_direction: SpdmSessionSecretParam,
    pub response_direction: SpdmSessionSecretParam,
}

#[derive(Clone, Copy, Zeroize)]
struct SpdmSessionMasterSecret {
    handshake_secret: [u8; SPDM_MAX_HASH_SIZE],
    master_secret: [u8; SPDM_MAX_HASH_SIZE],
    request_finished_key: [u8; SPDM_MAX_HASH_SIZE],
    response_finished_key: [u8; SPDM_MAX_HASH_SIZE],
    request_data_secret: [u8; SPDM_MAX_HASH_SIZE],
    response_data_secret: [u8; SPDM_MAX_HASH_SIZE],
}

impl Default for SpdmSessionMasterSecret {
    fn default() -> SpdmSessionMasterSecret {
        SpdmSessionMasterSecret {
            handshake_secret: [0u8; SPDM_MAX_HASH_SIZE],
            master_secret: [0u8; SPDM_MAX_HASH_SIZE],
            request_finished_key: [0u8; SPDM_MAX_HASH_SIZE],
            response_finished_key: [0u8; SPDM_MAX_HASH_SIZE],
            request_data_secret: [0u8; SPDM_MAX_HASH_SIZE],
            response_data_secret: [0u8; SPDM_MAX_HASH_SIZE],
        }
    }
}

#[derive(Clone, Copy, Zeroize)]
struct SpdmSessionDataSecretBackup {
    request_data_secret: [u8; SPDM_MAX_HASH_SIZE],
    response_data_secret: [u8; SPDM_MAX_HASH_SIZE],
}

impl Default for SpdmSessionDataSecretBackup {
    fn default() -> SpdmSessionDataSecretBackup {
        SpdmSessionDataSecretBackup {
            request_data_secret: [0u8; SPDM_MAX_HASH_SIZE],
            response_data_secret: [0u8; SPDM_MAX_HASH_SIZE],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpdmSessionRuntimeInfo {
    pub message_k: ManagedBuffer,
    pub message_f: ManagedBuffer,
}

#[derive(Clone, Copy, Default)]
pub struct SpdmSession {
    session_id: u32,
    session_state: SpdmSessionState,
    session_type: SpdmSessionType,
    crypto_param: SpdmSessionCryptoParam,
    transport_param: SpdmSessionTransportParam,
    master_secret: SpdmSessionMasterSecret,
    handshake_secret: SpdmSessionSecrets,
    application_secret: SpdmSessionSecrets,
    application_secret_backup: SpdmSessionSecrets,
    data_secret_backup: SpdmSessionDataSecretBackup,
    backup_valid: bool,
    pub heartbeat_period: u8,
    pub runtime_info: SpdmSessionRuntimeInfo,
}

impl SpdmSession {
    pub fn new() -> SpdmSession {
        SpdmSession::default()
    }

    pub fn setup(&mut self, session_id: u32) -> SpdmResult {
        if self.session_id != INVALID_SESSION_ID {
            return spdm_result_err!(EINVAL);
        }
        self.session_id = session_id;
        Ok(())
    }

    /// Destroys the session. All key material is zeroized before the slot
    /// is recycled.
    pub fn teardown(&mut self, session_id: u32) -> SpdmResult {
        if self.session_id != session_id {
            return spdm_result_err!(EINVAL);
        }
        self.master_secret.zeroize();
        self.handshake_secret.zeroize();
        self.application_secret.zeroize();
        self.application_secret_backup.zeroize();
        self.data_secret_backup.zeroize();
        *self = SpdmSession::default();
        Ok(())
    }

    pub fn get_session_id(&self) -> u32 {
        self.session_id
    }

    pub fn set_crypto_param(
        &mut self,
        base_hash_algo: SpdmBaseHashAlgo,
        dhe_algo: SpdmDheAlgo,
        aead_algo: SpdmAeadAlgo,
        key_schedule_algo: SpdmKeyScheduleAlgo,
    ) {
        self.crypto_param.base_hash_algo = base_hash_algo;
        self.crypto_param.dhe_algo = dhe_algo;
        self.crypto_param.aead_algo = aead_algo;
        self.crypto_param.key_schedule_algo = key_schedule_algo;
    }

    pub fn set_transport_param(&mut self, sequence_number_count: u8, max_random_count: u16) {
        self.transport_param.sequence_number_count = sequence_number_count;
        self.transport_param.max_random_count = max_random_count;
    }

    pub fn set_session_state(&mut self, session_state: SpdmSessionState) {
        self.session_state = session_state;
    }

    pub fn get_session_state(&self) -> SpdmSessionState {
        self.session_state
    }

    pub fn set_session_type(&mut self, session_type: SpdmSessionType) {
        self.session_type = session_type;
    }

    pub fn get_session_type(&self) -> SpdmSessionType {
        self.session_type
    }

    pub fn get_request_sequence_number(&self) -> u64 {
        match self.session_state {
            SpdmSessionState::SpdmSessionHandshaking => {
                self.handshake_secret.request_direction.sequence_number
            }
            _ => self.application_secret.request_direction.sequence_number,
        }
    }

    fn hkdf_expand_label(
        &self,
        prk: &[u8],
        label: &[u8],
        context: Option<&[u8]>,
        out: &mut [u8],
    ) -> SpdmResult {
        let mut info_buffer = [0u8; MAX_BIN_CONCAT_BUF_SIZE];
        let info = binconcat(out.len() as u16, label, context, &mut info_buffer)
            .ok_or(spdm_err!(ENOMEM))?;
        crypto::hkdf::hkdf_expand(self.crypto_param.base_hash_algo, prk, info, out)
    }

    fn generate_aead_param(&self, secret: &[u8]) -> SpdmResult<SpdmSessionSecretParam> {
        let key_size = self.crypto_param.aead_algo.get_key_size() as usize;
        let iv_size = self.crypto_param.aead_algo.get_iv_size() as usize;
        if key_size == 0 || iv_size == 0 {
            return spdm_result_err!(EUNSUP);
        }
        let mut param = SpdmSessionSecretParam::default();
        self.hkdf_expand_label(
            secret,
            SPDM_BIN_STR_5_LABEL,
            None,
            &mut param.encryption_key[..key_size],
        )?;
        self.hkdf_expand_label(secret, SPDM_BIN_STR_6_LABEL, None, &mut param.salt[..iv_size])?;
        param.sequence_number = 0;
        Ok(param)
    }

    /// Derives the handshake-phase secrets from TH1 and the session seed
    /// (DHE shared secret or PSK).
    pub fn generate_handshake_secret(
        &mut self,
        th1: &SpdmDigestStruct,
        session_seed: &[u8],
    ) -> SpdmResult {
        let hash_algo = self.crypto_param.base_hash_algo;
        let hash_size = hash_algo.get_size() as usize;
        if hash_size == 0 {
            return spdm_result_err!(EUNSUP);
        }

        let zero_salt = [0u8; SPDM_MAX_HASH_SIZE];
        let handshake_secret = crypto::hmac::hmac(hash_algo, &zero_salt[..hash_size], session_seed)
            .ok_or(spdm_err!(EUNSUP))?;
        self.master_secret.handshake_secret[..hash_size]
            .copy_from_slice(handshake_secret.as_ref());

        let mut request_handshake_secret = [0u8; SPDM_MAX_HASH_SIZE];
        let mut response_handshake_secret = [0u8; SPDM_MAX_HASH_SIZE];
        self.hkdf_expand_label(
            handshake_secret.as_ref(),
            SPDM_BIN_STR_1_LABEL,
            Some(th1.as_ref()),
            &mut request_handshake_secret[..hash_size],
        )?;
        self.hkdf_expand_label(
            handshake_secret.as_ref(),
            SPDM_BIN_STR_2_LABEL,
            Some(th1.as_ref()),
            &mut response_handshake_secret[..hash_size],
        )?;

        let mut request_finished_key = [0u8; SPDM_MAX_HASH_SIZE];
        let mut response_finished_key = [0u8; SPDM_MAX_HASH_SIZE];
        self.hkdf_expand_label(
            &request_handshake_secret[..hash_size],
            SPDM_BIN_STR_7_LABEL,
            None,
            &mut request_finished_key[..hash_size],
        )?;
        self.hkdf_expand_label(
            &response_handshake_secret[..hash_size],
            SPDM_BIN_STR_7_LABEL,
            None,
            &mut response_finished_key[..hash_size],
        )?;
        self.master_secret.request_finished_key = request_finished_key;
        self.master_secret.response_finished_key = response_finished_key;

        self.handshake_secret.request_direction =
            self.generate_aead_param(&request_handshake_secret[..hash_size])?;
        self.handshake_secret.response_direction =
            self.generate_aead_param(&response_handshake_secret[..hash_size])?;

        request_handshake_secret.zeroize();
        response_handshake_secret.zeroize();
        Ok(())
    }

    /// Derives the application-phase secrets from TH2.
    pub fn generate_data_secret(&mut self, th2: &SpdmDigestStruct) -> SpdmResult {
        let hash_algo = self.crypto_param.base_hash_algo;
        let hash_size = hash_algo.get_size() as usize;
        if hash_size == 0 {
            return spdm_result_err!(EUNSUP);
        }

        let mut salt = [0u8; SPDM_MAX_HASH_SIZE];
        self.hkdf_expand_label(
            &self.master_secret.handshake_secret[..hash_size],
            SPDM_BIN_STR_0_LABEL,
            None,
            &mut salt[..hash_size],
        )?;
        let zero_ikm = [0u8; SPDM_MAX_HASH_SIZE];
        let master_secret = crypto::hmac::hmac(hash_algo, &salt[..hash_size], &zero_ikm[..hash_size])
            .ok_or(spdm_err!(EUNSUP))?;
        self.master_secret.master_secret[..hash_size].copy_from_slice(master_secret.as_ref());

        let mut request_data_secret = [0u8; SPDM_MAX_HASH_SIZE];
        let mut response_data_secret = [0u8; SPDM_MAX_HASH_SIZE];
        self.hkdf_expand_label(
            master_secret.as_ref(),
            SPDM_BIN_STR_3_LABEL,
            Some(th2.as_ref()),
            &mut request_data_secret[..hash_size],
        )?;
        self.hkdf_expand_label(
            master_secret.as_ref(),
            SPDM_BIN_STR_4_LABEL,
            Some(th2.as_ref()),
            &mut response_data_secret[..hash_size],
        )?;
        self.master_secret.request_data_secret = request_data_secret;
        self.master_secret.response_data_secret = response_data_secret;

        self.application_secret.request_direction =
            self.generate_aead_param(&request_data_secret[..hash_size])?;
        self.application_secret.response_direction =
            self.generate_aead_param(&response_data_secret[..hash_size])?;

        salt.zeroize();
        request_data_secret.zeroize();
        response_data_secret.zeroize();
        Ok(())
    }

    pub fn generate_hmac_with_request_finished_key(
        &self,
        message: &[u8],
    ) -> SpdmResult<SpdmDigestStruct> {
        let hash_algo = self.crypto_param.base_hash_algo;
        let hash_size = hash_algo.get_size() as usize;
        crypto::hmac::hmac(
            hash_algo,
            &self.master_secret.request_finished_key[..hash_size],
            message,
        )
        .ok_or(spdm_err!(EUNSUP))
    }

    pub fn verify_hmac_with_response_finished_key(
        &self,
        message: &[u8],
        hmac: &SpdmDigestStruct,
    ) -> SpdmResult {
        let hash_algo = self.crypto_param.base_hash_algo;
        let hash_size = hash_algo.get_size() as usize;
        crypto::hmac::hmac_verify(
            hash_algo,
            &self.master_secret.response_finished_key[..hash_size],
            message,
            hmac,
        )
    }

    /// Derives fresh application secrets for the flagged directions,
    /// keeping the previous generation for rollback until
    /// [`SpdmSession::activate_data_secret_update`] decides.
    pub fn create_data_secret_update(
        &mut self,
        update_requester: bool,
        update_responder: bool,
    ) -> SpdmResult {
        let hash_size = self.crypto_param.base_hash_algo.get_size() as usize;
        if hash_size == 0 {
            return spdm_result_err!(EUNSUP);
        }
        self.application_secret_backup = self.application_secret;
        self.data_secret_backup = SpdmSessionDataSecretBackup {
            request_data_secret: self.master_secret.request_data_secret,
            response_data_secret: self.master_secret.response_data_secret,
        };
        self.backup_valid = true;

        if update_requester {
            let mut new_secret = [0u8; SPDM_MAX_HASH_SIZE];
            self.hkdf_expand_label(
                &self.master_secret.request_data_secret[..hash_size],
                SPDM_BIN_STR_9_LABEL,
                None,
                &mut new_secret[..hash_size],
            )?;
            self.master_secret.request_data_secret = new_secret;
            self.application_secret.request_direction =
                self.generate_aead_param(&new_secret[..hash_size])?;
            new_secret.zeroize();
        }
        if update_responder {
            let mut new_secret = [0u8; SPDM_MAX_HASH_SIZE];
            self.hkdf_expand_label(
                &self.master_secret.response_data_secret[..hash_size],
                SPDM_BIN_STR_9_LABEL,
                None,
                &mut new_secret[..hash_size],
            )?;
            self.master_secret.response_data_secret = new_secret;
            self.application_secret.response_direction =
                self.generate_aead_param(&new_secret[..hash_size])?;
            new_secret.zeroize();
        }
        Ok(())
    }

    /// Commits the pending key update, or restores the previous secrets
    /// when `use_new_key` is false.
    pub fn activate_data_secret_update(
        &mut self,
        update_requester: bool,
        update_responder: bool,
        use_new_key: bool,
    ) -> SpdmResult {
        if !self.backup_valid {
            return spdm_result_err!(EINVAL);
        }
        if !use_new_key {
            if update_requester {
                self.application_secret.request_direction =
                    self.application_secret_backup.request_direction;
                self.master_secret.request_data_secret =
                    self.data_secret_backup.request_data_secret;
            }
            if update_responder {
                self.application_secret.response_direction =
                    self.application_secret_backup.response_direction;
                self.master_secret.response_data_secret =
                    self.data_secret_backup.response_data_secret;
            }
        }
        self.application_secret_backup.zeroize();
        self.data_secret_backup.zeroize();
        self.backup_valid = false;
        Ok(())
    }

    fn secret_param(&mut self, is_requester_direction: bool) -> SpdmResult<&mut SpdmSessionSecretParam> {
        let secrets = match self.session_state {
            SpdmSessionState::SpdmSessionHandshaking => &mut self.handshake_secret,
            SpdmSessionState::SpdmSessionEstablished
            | SpdmSessionState::SpdmSessionTerminating => &mut self.application_secret,
            SpdmSessionState::SpdmSessionNotStarted => return spdm_result_err!(EINVAL),
        };
        if is_requester_direction {
            Ok(&mut secrets.request_direction)
        } else {
            Ok(&mut secrets.response_direction)
        }
    }

    fn aead_nonce(salt: &[u8; SPDM_MAX_AEAD_IV_SIZE], iv_size: usize, sequence_number: u64) -> [u8; SPDM_MAX_AEAD_IV_SIZE] {
        let mut iv = *salt;
        for (i, b) in sequence_number.to_le_bytes().iter().enumerate() {
            iv[iv_size - 8 + i] ^= b;
        }
        iv
    }

    /// Wraps `app_buffer` as a secured message and advances the sending
    /// direction's sequence number.
    pub fn encode_spdm_secured_message(
        &mut self,
        app_buffer: &[u8],
        secured_buffer: &mut [u8],
        is_requester: bool,
    ) -> SpdmResult<usize> {
        let aead_algo = self.crypto_param.aead_algo;
        let key_size = aead_algo.get_key_size() as usize;
        let iv_size = aead_algo.get_iv_size() as usize;
        let tag_size = aead_algo.get_tag_size() as usize;
        if key_size == 0 || iv_size < 8 {
            return spdm_result_err!(EUNSUP);
        }
        let seq_count = self.transport_param.sequence_number_count as usize;
        let rand_count = self.transport_param.max_random_count as usize;
        let session_id = self.session_id;

        let param = self.secret_param(is_requester)?;
        let sequence_number = param.sequence_number;
        let key = param.encryption_key;
        let iv = Self::aead_nonce(&param.salt, iv_size, sequence_number);

        let header_size = 4 + seq_count + 2;
        let plain_size = 2 + app_buffer.len() + rand_count;
        let total_size = header_size + plain_size + tag_size;
        if secured_buffer.len() < total_size || plain_size > config::DATA_TRANSFER_SIZE {
            return spdm_result_err!(ENOMEM);
        }

        secured_buffer[0..4].copy_from_slice(&session_id.to_le_bytes());
        secured_buffer[4..4 + seq_count]
            .copy_from_slice(&sequence_number.to_le_bytes()[..seq_count]);
        secured_buffer[4 + seq_count..header_size]
            .copy_from_slice(&((plain_size + tag_size) as u16).to_le_bytes());

        let mut plain_text = [0u8; config::DATA_TRANSFER_SIZE];
        plain_text[0..2].copy_from_slice(&(app_buffer.len() as u16).to_le_bytes());
        plain_text[2..2 + app_buffer.len()].copy_from_slice(app_buffer);
        if rand_count != 0 {
            crypto::rand::get_random(&mut plain_text[2 + app_buffer.len()..plain_size])?;
        }

        let (aad, rest) = secured_buffer.split_at_mut(header_size);
        let mut tag = [0u8; SPDM_MAX_AEAD_TAG_SIZE];
        let (cipher_used, tag_used) = crypto::aead::encrypt(
            aead_algo,
            &key[..key_size],
            &iv[..iv_size],
            aad,
            &plain_text[..plain_size],
            &mut tag[..tag_size],
            &mut rest[..plain_size],
        )?;
        if cipher_used != plain_size || tag_used != tag_size {
            return spdm_result_err!(EFAULT);
        }
        rest[plain_size..plain_size + tag_size].copy_from_slice(&tag[..tag_size]);

        let param = self.secret_param(is_requester)?;
        param.sequence_number += 1;
        Ok(total_size)
    }

    /// Unwraps a secured message. An authentication failure is a security
    /// violation; the caller destroys the session.
    pub fn decode_spdm_secured_message(
        &mut self,
        secured_buffer: &[u8],
        app_buffer: &mut [u8],
        is_requester: bool,
    ) -> SpdmResult<usize> {
        let aead_algo = self.crypto_param.aead_algo;
        let key_size = aead_algo.get_key_size() as usize;
        let iv_size = aead_algo.get_iv_size() as usize;
        let tag_size = aead_algo.get_tag_size() as usize;
        if key_size == 0 || iv_size < 8 {
            return spdm_result_err!(EUNSUP);
        }
        let seq_count = self.transport_param.sequence_number_count as usize;

        let header_size = 4 + seq_count + 2;
        if secured_buffer.len() < header_size + 2 + tag_size {
            return spdm_result_err!(EINVAL);
        }
        let session_id = u32::from_le_bytes([
            secured_buffer[0],
            secured_buffer[1],
            secured_buffer[2],
            secured_buffer[3],
        ]);
        if session_id != self.session_id {
            return spdm_result_err!(EINVAL);
        }
        let length = u16::from_le_bytes([
            secured_buffer[4 + seq_count],
            secured_buffer[4 + seq_count + 1],
        ]) as usize;
        if length < 2 + tag_size || secured_buffer.len() < header_size + length {
            return spdm_result_err!(EINVAL);
        }
        let cipher_size = length - tag_size;

        // the receiving side's own counter is authoritative for the nonce
        let param = self.secret_param(!is_requester)?;
        let sequence_number = param.sequence_number;
        let key = param.encryption_key;
        let iv = Self::aead_nonce(&param.salt, iv_size, sequence_number);

        let aad = &secured_buffer[..header_size];
        let cipher_text = &secured_buffer[header_size..header_size + cipher_size];
        let tag = &secured_buffer[header_size + cipher_size..header_size + length];

        let mut plain_text = [0u8; config::DATA_TRANSFER_SIZE];
        let plain_used = crypto::aead::decrypt(
            aead_algo,
            &key[..key_size],
            &iv[..iv_size],
            aad,
            cipher_text,
            tag,
            &mut plain_text[..cipher_size],
        )?;
        if plain_used != cipher_size {
            return spdm_result_err!(ESEC);
        }

        let param = self.secret_param(!is_requester)?;
        param.sequence_number += 1;

        let app_size = u16::from_le_bytes([plain_text[0], plain_text[1]]) as usize;
        if app_size + 2 > cipher_size || app_buffer.len() < app_size {
            return spdm_result_err!(EINVAL);
        }
        app_buffer[..app_size].copy_from_slice(&plain_text[2..2 + app_size]);
        Ok(app_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testlib::*;

    fn established_session_pair() -> (SpdmSession, SpdmSession) {
        register_test_crypto();
        let mut session = SpdmSession::new();
        session.setup(0x0001_0001).unwrap();
        session.set_crypto_param(
            SpdmBaseHashAlgo::TPM_ALG_SHA_384,
            SpdmDheAlgo::SECP_384_R1,
            SpdmAeadAlgo::AES_256_GCM,
            SpdmKeyScheduleAlgo::SPDM_KEY_SCHEDULE,
        );
        session.set_transport_param(2, 16);
        let th1 = SpdmDigestStruct {
            data_size: 48,
            data: [0x11u8; SPDM_MAX_HASH_SIZE],
        };
        let th2 = SpdmDigestStruct {
            data_size: 48,
            data: [0x22u8; SPDM_MAX_HASH_SIZE],
        };
        session.generate_handshake_secret(&th1, &[0x5au8; 48]).unwrap();
        session.generate_data_secret(&th2).unwrap();
        session.set_session_state(SpdmSessionState::SpdmSessionEstablished);
        let mirror = session;
        (session, mirror)
    }

    #[test]
    fn test_case0_setup_teardown() {
        let mut session = SpdmSession::new();
        session.setup(0x0001_0001).unwrap();
        assert!(session.setup(0x0002_0002).is_err());
        assert!(session.teardown(0x0002_0002).is_err());
        session.teardown(0x0001_0001).unwrap();
        assert_eq!(session.get_session_id(), INVALID_SESSION_ID);
    }

    #[test]
    fn test_case0_secured_message_round_trip() {
        let (mut requester_side, mut responder_side) = established_session_pair();

        let app_message = [0x05u8, 0x11, 0xe8, 0x00, 0x00];
        let mut secured = [0u8; 256];
        let used = requester_side
            .encode_spdm_secured_message(&app_message, &mut secured, true)
            .unwrap();
        assert_eq!(
            requester_side.get_request_sequence_number(),
            1
        );

        let mut decoded = [0u8; 64];
        let size = responder_side
            .decode_spdm_secured_message(&secured[..used], &mut decoded, false)
            .unwrap();
        assert_eq!(&decoded[..size], &app_message);
    }

    #[test]
    fn test_case1_secured_message_tamper_detected() {
        let (mut requester_side, mut responder_side) = established_session_pair();

        let app_message = [0x05u8, 0x11, 0xe8, 0x00, 0x00];
        let mut secured = [0u8; 256];
        let used = requester_side
            .encode_spdm_secured_message(&app_message, &mut secured, true)
            .unwrap();
        // flip one ciphertext bit
        secured[12] ^= 0x80;

        let mut decoded = [0u8; 64];
        let status = responder_side.decode_spdm_secured_message(&secured[..used], &mut decoded, false);
        assert_eq!(status.unwrap_err().num, crate::error::SpdmErrorNum::ESEC);
    }

    #[test]
    fn test_case2_key_update_rollback_restores_traffic() {
        let (mut requester_side, mut responder_side) = established_session_pair();

        requester_side.create_data_secret_update(true, false).unwrap();
        requester_side
            .activate_data_secret_update(true, false, false)
            .unwrap();

        let app_message = [0xe8u8, 0x00];
        let mut secured = [0u8; 256];
        let used = requester_side
            .encode_spdm_secured_message(&app_message, &mut secured, true)
            .unwrap();
        let mut decoded = [0u8; 64];
        let size = responder_side
            .decode_spdm_secured_message(&secured[..used], &mut decoded, false)
            .unwrap();
        assert_eq!(&decoded[..size], &app_message);
    }
}
