// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::config;
use codec::enum_builder;
use codec::{Codec, Reader, Writer};
use zeroize::Zeroize;

pub const SPDM_NONCE_SIZE: usize = 32;
pub const SPDM_RANDOM_SIZE: usize = 32;
pub const SPDM_MAX_HASH_SIZE: usize = 64;
pub const SPDM_MAX_ASYM_KEY_SIZE: usize = 512;
pub const SPDM_MAX_DHE_KEY_SIZE: usize = 96;
pub const SPDM_MAX_AEAD_KEY_SIZE: usize = 32;
pub const SPDM_MAX_AEAD_IV_SIZE: usize = 12;
pub const SPDM_MAX_AEAD_TAG_SIZE: usize = 16;

bitflags! {
    #[derive(Default)]
    pub struct SpdmMeasurementSpecification: u8 {
        const DMTF = 0b0000_0001;
    }
}

impl Codec for SpdmMeasurementSpecification {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmMeasurementSpecification> {
        let bits = u8::read(r)?;
        SpdmMeasurementSpecification::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmBaseHashAlgo: u32 {
        const TPM_ALG_SHA_256 = 0b0000_0001;
        const TPM_ALG_SHA_384 = 0b0000_0010;
        const TPM_ALG_SHA_512 = 0b0000_0100;
    }
}

impl SpdmBaseHashAlgo {
    pub fn get_size(&self) -> u16 {
        match *self {
            SpdmBaseHashAlgo::TPM_ALG_SHA_256 => 32,
            SpdmBaseHashAlgo::TPM_ALG_SHA_384 => 48,
            SpdmBaseHashAlgo::TPM_ALG_SHA_512 => 64,
            _ => 0,
        }
    }
}

impl Codec for SpdmBaseHashAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmBaseHashAlgo> {
        let bits = u32::read(r)?;
        SpdmBaseHashAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmMeasurementHashAlgo: u32 {
        const RAW_BIT_STREAM = 0b0000_0001;
        const TPM_ALG_SHA_256 = 0b0000_0010;
        const TPM_ALG_SHA_384 = 0b0000_0100;
        const TPM_ALG_SHA_512 = 0b0000_1000;
    }
}

impl SpdmMeasurementHashAlgo {
    pub fn get_size(&self) -> u16 {
        match *self {
            SpdmMeasurementHashAlgo::RAW_BIT_STREAM => 0,
            SpdmMeasurementHashAlgo::TPM_ALG_SHA_256 => 32,
            SpdmMeasurementHashAlgo::TPM_ALG_SHA_384 => 48,
            SpdmMeasurementHashAlgo::TPM_ALG_SHA_512 => 64,
            _ => 0,
        }
    }
}

impl Codec for SpdmMeasurementHashAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmMeasurementHashAlgo> {
        let bits = u32::read(r)?;
        SpdmMeasurementHashAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmBaseAsymAlgo: u32 {
        const TPM_ALG_RSASSA_2048 = 0b0000_0001;
        const TPM_ALG_RSAPSS_2048 = 0b0000_0010;
        const TPM_ALG_RSASSA_3072 = 0b0000_0100;
        const TPM_ALG_RSAPSS_3072 = 0b0000_1000;
        const TPM_ALG_ECDSA_ECC_NIST_P256 = 0b0001_0000;
        const TPM_ALG_RSASSA_4096 = 0b0010_0000;
        const TPM_ALG_RSAPSS_4096 = 0b0100_0000;
        const TPM_ALG_ECDSA_ECC_NIST_P384 = 0b1000_0000;
    }
}

impl SpdmBaseAsymAlgo {
    pub fn get_size(&self) -> u16 {
        match *self {
            SpdmBaseAsymAlgo::TPM_ALG_RSASSA_2048 | SpdmBaseAsymAlgo::TPM_ALG_RSAPSS_2048 => 256,
            SpdmBaseAsymAlgo::TPM_ALG_RSASSA_3072 | SpdmBaseAsymAlgo::TPM_ALG_RSAPSS_3072 => 384,
            SpdmBaseAsymAlgo::TPM_ALG_RSASSA_4096 | SpdmBaseAsymAlgo::TPM_ALG_RSAPSS_4096 => 512,
            SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P256 => 64,
            SpdmBaseAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384 => 96,
            _ => 0,
        }
    }
}

impl Codec for SpdmBaseAsymAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmBaseAsymAlgo> {
        let bits = u32::read(r)?;
        SpdmBaseAsymAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmReqAsymAlgo: u16 {
        const TPM_ALG_RSASSA_2048 = 0b0000_0001;
        const TPM_ALG_RSAPSS_2048 = 0b0000_0010;
        const TPM_ALG_RSASSA_3072 = 0b0000_0100;
        const TPM_ALG_RSAPSS_3072 = 0b0000_1000;
        const TPM_ALG_ECDSA_ECC_NIST_P256 = 0b0001_0000;
        const TPM_ALG_RSASSA_4096 = 0b0010_0000;
        const TPM_ALG_RSAPSS_4096 = 0b0100_0000;
        const TPM_ALG_ECDSA_ECC_NIST_P384 = 0b1000_0000;
    }
}

impl SpdmReqAsymAlgo {
    pub fn get_size(&self) -> u16 {
        match *self {
            SpdmReqAsymAlgo::TPM_ALG_RSASSA_2048 | SpdmReqAsymAlgo::TPM_ALG_RSAPSS_2048 => 256,
            SpdmReqAsymAlgo::TPM_ALG_RSASSA_3072 | SpdmReqAsymAlgo::TPM_ALG_RSAPSS_3072 => 384,
            SpdmReqAsymAlgo::TPM_ALG_RSASSA_4096 | SpdmReqAsymAlgo::TPM_ALG_RSAPSS_4096 => 512,
            SpdmReqAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P256 => 64,
            SpdmReqAsymAlgo::TPM_ALG_ECDSA_ECC_NIST_P384 => 96,
            _ => 0,
        }
    }
}

impl Codec for SpdmReqAsymAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmReqAsymAlgo> {
        let bits = u16::read(r)?;
        SpdmReqAsymAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmDheAlgo: u16 {
        const FFDHE_2048 = 0b0000_0001;
        const FFDHE_3072 = 0b0000_0010;
        const FFDHE_4096 = 0b0000_0100;
        const SECP_256_R1 = 0b0000_1000;
        const SECP_384_R1 = 0b0001_0000;
    }
}

impl SpdmDheAlgo {
    pub fn get_size(&self) -> u16 {
        match *self {
            SpdmDheAlgo::FFDHE_2048 => 256,
            SpdmDheAlgo::FFDHE_3072 => 384,
            SpdmDheAlgo::FFDHE_4096 => 512,
            SpdmDheAlgo::SECP_256_R1 => 64,
            SpdmDheAlgo::SECP_384_R1 => 96,
            _ => 0,
        }
    }
}

impl Codec for SpdmDheAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmDheAlgo> {
        let bits = u16::read(r)?;
        SpdmDheAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmAeadAlgo: u16 {
        const AES_128_GCM = 0b0000_0001;
        const AES_256_GCM = 0b0000_0010;
        const CHACHA20_POLY1305 = 0b0000_0100;
    }
}

impl SpdmAeadAlgo {
    pub fn get_key_size(&self) -> u16 {
        match *self {
            SpdmAeadAlgo::AES_128_GCM => 16,
            SpdmAeadAlgo::AES_256_GCM => 32,
            SpdmAeadAlgo::CHACHA20_POLY1305 => 32,
            _ => 0,
        }
    }

    pub fn get_iv_size(&self) -> u16 {
        match *self {
            SpdmAeadAlgo::AES_128_GCM | SpdmAeadAlgo::AES_256_GCM => 12,
            SpdmAeadAlgo::CHACHA20_POLY1305 => 12,
            _ => 0,
        }
    }

    pub fn get_tag_size(&self) -> u16 {
        match *self {
            SpdmAeadAlgo::AES_128_GCM | SpdmAeadAlgo::AES_256_GCM => 16,
            SpdmAeadAlgo::CHACHA20_POLY1305 => 16,
            _ => 0,
        }
    }
}

impl Codec for SpdmAeadAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmAeadAlgo> {
        let bits = u16::read(r)?;
        SpdmAeadAlgo::from_bits(bits)
    }
}

bitflags! {
    #[derive(Default)]
    pub struct SpdmKeyScheduleAlgo: u16 {
        const SPDM_KEY_SCHEDULE = 0b0000_0001;
    }
}

impl Codec for SpdmKeyScheduleAlgo {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmKeyScheduleAlgo> {
        let bits = u16::read(r)?;
        SpdmKeyScheduleAlgo::from_bits(bits)
    }
}

enum_builder! {
    @U8
    EnumName: SpdmMeasurementSummaryHashType;
    EnumVal{
        SpdmMeasurementSummaryHashTypeNone => 0x0,
        SpdmMeasurementSummaryHashTypeTcb => 0x1,
        SpdmMeasurementSummaryHashTypeAll => 0xFF
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct SpdmNonceStruct {
    pub data: [u8; SPDM_NONCE_SIZE],
}

impl Codec for SpdmNonceStruct {
    fn encode(&self, bytes: &mut Writer) {
        let _ = bytes.extend_from_slice(&self.data);
    }

    fn read(r: &mut Reader) -> Option<SpdmNonceStruct> {
        let mut data = [0u8; SPDM_NONCE_SIZE];
        data.copy_from_slice(r.take(SPDM_NONCE_SIZE)?);
        Some(SpdmNonceStruct { data })
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct SpdmRandomStruct {
    pub data: [u8; SPDM_RANDOM_SIZE],
}

impl Codec for SpdmRandomStruct {
    fn encode(&self, bytes: &mut Writer) {
        let _ = bytes.extend_from_slice(&self.data);
    }

    fn read(r: &mut Reader) -> Option<SpdmRandomStruct> {
        let mut data = [0u8; SPDM_RANDOM_SIZE];
        data.copy_from_slice(r.take(SPDM_RANDOM_SIZE)?);
        Some(SpdmRandomStruct { data })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SpdmDigestStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_HASH_SIZE],
}

impl Default for SpdmDigestStruct {
    fn default() -> SpdmDigestStruct {
        SpdmDigestStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_HASH_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmDigestStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

#[derive(Debug, Copy, Clone)]
pub struct SpdmSignatureStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_ASYM_KEY_SIZE],
}

impl Default for SpdmSignatureStruct {
    fn default() -> SpdmSignatureStruct {
        SpdmSignatureStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_ASYM_KEY_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmSignatureStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

#[derive(Debug, Copy, Clone)]
pub struct SpdmDheExchangeStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_DHE_KEY_SIZE],
}

impl Default for SpdmDheExchangeStruct {
    fn default() -> SpdmDheExchangeStruct {
        SpdmDheExchangeStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_DHE_KEY_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmDheExchangeStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

/// Opaque private half of a DHE key pair, owned by the crypto provider.
#[derive(Copy, Clone, Zeroize)]
pub struct SpdmDheKeyStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_DHE_KEY_SIZE],
}

impl Default for SpdmDheKeyStruct {
    fn default() -> SpdmDheKeyStruct {
        SpdmDheKeyStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_DHE_KEY_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmDheKeyStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

#[derive(Copy, Clone, Zeroize)]
pub struct SpdmDheFinalKeyStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_DHE_KEY_SIZE],
}

impl Default for SpdmDheFinalKeyStruct {
    fn default() -> SpdmDheFinalKeyStruct {
        SpdmDheFinalKeyStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_DHE_KEY_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmDheFinalKeyStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

/// Raw DER certificate chain (no SPDM framing).
#[derive(Debug, Copy, Clone)]
pub struct SpdmCertChainData {
    pub data_size: u16,
    pub data: [u8; config::MAX_SPDM_CERT_CHAIN_DATA_SIZE],
}

impl Default for SpdmCertChainData {
    fn default() -> SpdmCertChainData {
        SpdmCertChainData {
            data_size: 0,
            data: [0u8; config::MAX_SPDM_CERT_CHAIN_DATA_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmCertChainData {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

pub const SPDM_MAX_CERT_CHAIN_BUFFER_SIZE: usize =
    4 + SPDM_MAX_HASH_SIZE + config::MAX_SPDM_CERT_CHAIN_DATA_SIZE;

/// Certificate chain as carried by CERTIFICATE responses: a four byte
/// header (total length, reserved), the root certificate hash, then the
/// DER chain.
#[derive(Debug, Copy, Clone)]
pub struct SpdmCertChainBuffer {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_CERT_CHAIN_BUFFER_SIZE],
}

impl Default for SpdmCertChainBuffer {
    fn default() -> SpdmCertChainBuffer {
        SpdmCertChainBuffer {
            data_size: 0,
            data: [0u8; SPDM_MAX_CERT_CHAIN_BUFFER_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmCertChainBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

#[derive(Debug, Copy, Clone)]
pub struct SpdmMeasurementRecordStructure {
    pub number_of_blocks: u8,
    pub record_size: u32,
    pub record_data: [u8; config::MAX_SPDM_MEASUREMENT_RECORD_SIZE],
}

impl Default for SpdmMeasurementRecordStructure {
    fn default() -> SpdmMeasurementRecordStructure {
        SpdmMeasurementRecordStructure {
            number_of_blocks: 0,
            record_size: 0,
            record_data: [0u8; config::MAX_SPDM_MEASUREMENT_RECORD_SIZE],
        }
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct SpdmPskHintStruct {
    pub data_size: u16,
    pub data: [u8; config::MAX_SPDM_PSK_HINT_SIZE],
}

impl AsRef<[u8]> for SpdmPskHintStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

#[derive(Debug, Copy, Clone)]
pub struct SpdmPskContextStruct {
    pub data_size: u16,
    pub data: [u8; config::MAX_SPDM_PSK_CONTEXT_SIZE],
}

impl Default for SpdmPskContextStruct {
    fn default() -> SpdmPskContextStruct {
        SpdmPskContextStruct {
            data_size: 0,
            data: [0u8; config::MAX_SPDM_PSK_CONTEXT_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmPskContextStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}

/// Provisioned pre-shared key material.
#[derive(Copy, Clone, Zeroize)]
pub struct SpdmPskStruct {
    pub data_size: u16,
    pub data: [u8; SPDM_MAX_HASH_SIZE],
}

impl Default for SpdmPskStruct {
    fn default() -> SpdmPskStruct {
        SpdmPskStruct {
            data_size: 0,
            data: [0u8; SPDM_MAX_HASH_SIZE],
        }
    }
}

impl AsRef<[u8]> for SpdmPskStruct {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.data_size as usize]
    }
}
