// Copyright (c) 2021 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

//! Pluggable cryptographic provider.
//!
//! The library never implements a primitive itself; the embedding
//! application registers a callback table per concern, once per process.
//! An operation that reaches an unregistered table fails with `EUNSUP`.

use crate::error::SpdmResult;
use crate::protocol::{
    SpdmAeadAlgo, SpdmBaseAsymAlgo, SpdmBaseHashAlgo, SpdmDheAlgo, SpdmDheExchangeStruct,
    SpdmDheFinalKeyStruct, SpdmDheKeyStruct, SpdmDigestStruct, SpdmReqAsymAlgo,
    SpdmSignatureStruct,
};

#[derive(Clone)]
pub struct SpdmHash {
    pub hash_all_cb: fn(base_hash_algo: SpdmBaseHashAlgo, data: &[u8]) -> Option<SpdmDigestStruct>,
}

#[derive(Clone)]
pub struct SpdmHmac {
    pub hmac_cb:
        fn(base_hash_algo: SpdmBaseHashAlgo, key: &[u8], data: &[u8]) -> Option<SpdmDigestStruct>,
    pub hmac_verify_cb: fn(
        base_hash_algo: SpdmBaseHashAlgo,
        key: &[u8],
        data: &[u8],
        hmac: &SpdmDigestStruct,
    ) -> SpdmResult,
}

#[derive(Clone)]
pub struct SpdmHkdf {
    pub hkdf_expand_cb: fn(
        base_hash_algo: SpdmBaseHashAlgo,
        prk: &[u8],
        info: &[u8],
        out: &mut [u8],
    ) -> SpdmResult,
}

#[derive(Clone)]
pub struct SpdmAead {
    #[allow(clippy::type_complexity)]
    pub encrypt_cb: fn(
        aead_algo: SpdmAeadAlgo,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        plain_text: &[u8],
        tag: &mut [u8],
        cipher_text: &mut [u8],
    ) -> SpdmResult<(usize, usize)>,
    #[allow(clippy::type_complexity)]
    pub decrypt_cb: fn(
        aead_algo: SpdmAeadAlgo,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        cipher_text: &[u8],
        tag: &[u8],
        plain_text: &mut [u8],
    ) -> SpdmResult<usize>,
}

#[derive(Clone)]
pub struct SpdmAsymVerify {
    pub verify_cb: fn(
        base_hash_algo: SpdmBaseHashAlgo,
        base_asym_algo: SpdmBaseAsymAlgo,
        public_cert_der: &[u8],
        data: &[u8],
        signature: &SpdmSignatureStruct,
    ) -> SpdmResult,
}

#[derive(Clone)]
pub struct SpdmAsymSign {
    pub sign_cb: fn(
        base_hash_algo: SpdmBaseHashAlgo,
        req_asym_algo: SpdmReqAsymAlgo,
        data: &[u8],
    ) -> Option<SpdmSignatureStruct>,
}

#[derive(Clone)]
pub struct SpdmDhe {
    pub generate_key_pair_cb:
        fn(dhe_algo: SpdmDheAlgo) -> Option<(SpdmDheExchangeStruct, SpdmDheKeyStruct)>,
    pub compute_final_key_cb: fn(
        dhe_algo: SpdmDheAlgo,
        my_key: &SpdmDheKeyStruct,
        peer_pub_key: &SpdmDheExchangeStruct,
    ) -> Option<SpdmDheFinalKeyStruct>,
}

#[derive(Clone)]
pub struct SpdmCertOperation {
    pub get_cert_from_cert_chain_cb:
        fn(cert_chain: &[u8], index: isize) -> SpdmResult<(usize, usize)>,
    pub verify_cert_chain_cb: fn(cert_chain: &[u8]) -> SpdmResult,
}

#[derive(Clone)]
pub struct SpdmCryptoRandom {
    pub get_random_data_cb: fn(data: &mut [u8]) -> SpdmResult<usize>,
}

pub mod hash {
    use super::SpdmHash;
    use crate::protocol::{SpdmBaseHashAlgo, SpdmDigestStruct};
    use conquer_once::spin::OnceCell;

    static CRYPTO_HASH: OnceCell<SpdmHash> = OnceCell::uninit();

    pub fn register(context: SpdmHash) -> bool {
        CRYPTO_HASH.try_init_once(|| context).is_ok()
    }

    pub fn hash_all(base_hash_algo: SpdmBaseHashAlgo, data: &[u8]) -> Option<SpdmDigestStruct> {
        let hash = CRYPTO_HASH.try_get().ok()?;
        (hash.hash_all_cb)(base_hash_algo, data)
    }
}

pub mod hmac {
    use super::SpdmHmac;
    use crate::error::SpdmResult;
    use crate::protocol::{SpdmBaseHashAlgo, SpdmDigestStruct};
    use crate::spdm_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_HMAC: OnceCell<SpdmHmac> = OnceCell::uninit();

    pub fn register(context: SpdmHmac) -> bool {
        CRYPTO_HMAC.try_init_once(|| context).is_ok()
    }

    pub fn hmac(base_hash_algo: SpdmBaseHashAlgo, key: &[u8], data: &[u8]) -> Option<SpdmDigestStruct> {
        let hmac = CRYPTO_HMAC.try_get().ok()?;
        (hmac.hmac_cb)(base_hash_algo, key, data)
    }

    pub fn hmac_verify(
        base_hash_algo: SpdmBaseHashAlgo,
        key: &[u8],
        data: &[u8],
        hmac: &SpdmDigestStruct,
    ) -> SpdmResult {
        let hmac_impl = CRYPTO_HMAC.try_get().map_err(|_| spdm_err!(EUNSUP))?;
        (hmac_impl.hmac_verify_cb)(base_hash_algo, key, data, hmac)
    }
}

pub mod hkdf {
    use super::SpdmHkdf;
    use crate::error::SpdmResult;
    use crate::protocol::SpdmBaseHashAlgo;
    use crate::spdm_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_HKDF: OnceCell<SpdmHkdf> = OnceCell::uninit();

    pub fn register(context: SpdmHkdf) -> bool {
        CRYPTO_HKDF.try_init_once(|| context).is_ok()
    }

    pub fn hkdf_expand(
        base_hash_algo: SpdmBaseHashAlgo,
        prk: &[u8],
        info: &[u8],
        out: &mut [u8],
    ) -> SpdmResult {
        let hkdf = CRYPTO_HKDF.try_get().map_err(|_| spdm_err!(EUNSUP))?;
        (hkdf.hkdf_expand_cb)(base_hash_algo, prk, info, out)
    }
}

pub mod aead {
    use super::SpdmAead;
    use crate::error::SpdmResult;
    use crate::protocol::SpdmAeadAlgo;
    use crate::spdm_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_AEAD: OnceCell<SpdmAead> = OnceCell::uninit();

    pub fn register(context: SpdmAead) -> bool {
        CRYPTO_AEAD.try_init_once(|| context).is_ok()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn encrypt(
        aead_algo: SpdmAeadAlgo,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        plain_text: &[u8],
        tag: &mut [u8],
        cipher_text: &mut [u8],
    ) -> SpdmResult<(usize, usize)> {
        let aead = CRYPTO_AEAD.try_get().map_err(|_| spdm_err!(EUNSUP))?;
        (aead.encrypt_cb)(aead_algo, key, iv, aad, plain_text, tag, cipher_text)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn decrypt(
        aead_algo: SpdmAeadAlgo,
        key: &[u8],
        iv: &[u8],
        aad: &[u8],
        cipher_text: &[u8],
        tag: &[u8],
        plain_text: &mut [u8],
    ) -> SpdmResult<usize> {
        let aead = CRYPTO_AEAD.try_get().map_err(|_| spdm_err!(EUNSUP))?;
        (aead.decrypt_cb)(aead_algo, key, iv, aad, cipher_text, tag, plain_text)
    }
}

pub mod asym_verify {
    use super::SpdmAsymVerify;
    use crate::error::SpdmResult;
    use crate::protocol::{SpdmBaseAsymAlgo, SpdmBaseHashAlgo, SpdmSignatureStruct};
    use crate::spdm_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_ASYM_VERIFY: OnceCell<SpdmAsymVerify> = OnceCell::uninit();

    pub fn register(context: SpdmAsymVerify) -> bool {
        CRYPTO_ASYM_VERIFY.try_init_once(|| context).is_ok()
    }

    pub fn verify(
        base_hash_algo: SpdmBaseHashAlgo,
        base_asym_algo: SpdmBaseAsymAlgo,
        public_cert_der: &[u8],
        data: &[u8],
        signature: &SpdmSignatureStruct,
    ) -> SpdmResult {
        let asym = CRYPTO_ASYM_VERIFY
            .try_get()
            .map_err(|_| spdm_err!(EUNSUP))?;
        (asym.verify_cb)(base_hash_algo, base_asym_algo, public_cert_der, data, signature)
    }
}

pub mod asym_sign {
    use super::SpdmAsymSign;
    use crate::protocol::{SpdmBaseHashAlgo, SpdmReqAsymAlgo, SpdmSignatureStruct};
    use conquer_once::spin::OnceCell;

    static CRYPTO_ASYM_SIGN: OnceCell<SpdmAsymSign> = OnceCell::uninit();

    pub fn register(context: SpdmAsymSign) -> bool {
        CRYPTO_ASYM_SIGN.try_init_once(|| context).is_ok()
    }

    pub fn sign(
        base_hash_algo: SpdmBaseHashAlgo,
        req_asym_algo: SpdmReqAsymAlgo,
        data: &[u8],
    ) -> Option<SpdmSignatureStruct> {
        let asym = CRYPTO_ASYM_SIGN.try_get().ok()?;
        (asym.sign_cb)(base_hash_algo, req_asym_algo, data)
    }
}

pub mod dhe {
    use super::SpdmDhe;
    use crate::protocol::{
        SpdmDheAlgo, SpdmDheExchangeStruct, SpdmDheFinalKeyStruct, SpdmDheKeyStruct,
    };
    use conquer_once::spin::OnceCell;

    static CRYPTO_DHE: OnceCell<SpdmDhe> = OnceCell::uninit();

    pub fn register(context: SpdmDhe) -> bool {
        CRYPTO_DHE.try_init_once(|| context).is_ok()
    }

    pub fn generate_key_pair(
        dhe_algo: SpdmDheAlgo,
    ) -> Option<(SpdmDheExchangeStruct, SpdmDheKeyStruct)> {
        let dhe = CRYPTO_DHE.try_get().ok()?;
        (dhe.generate_key_pair_cb)(dhe_algo)
    }

    pub fn compute_final_key(
        dhe_algo: SpdmDheAlgo,
        my_key: &SpdmDheKeyStruct,
        peer_pub_key: &SpdmDheExchangeStruct,
    ) -> Option<SpdmDheFinalKeyStruct> {
        let dhe = CRYPTO_DHE.try_get().ok()?;
        (dhe.compute_final_key_cb)(dhe_algo, my_key, peer_pub_key)
    }
}

pub mod cert_operation {
    use super::SpdmCertOperation;
    use crate::error::SpdmResult;
    use crate::spdm_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_CERT_OPERATION: OnceCell<SpdmCertOperation> = OnceCell::uninit();

    pub fn register(context: SpdmCertOperation) -> bool {
        CRYPTO_CERT_OPERATION.try_init_once(|| context).is_ok()
    }

    pub fn get_cert_from_cert_chain(cert_chain: &[u8], index: isize) -> SpdmResult<(usize, usize)> {
        let cert = CRYPTO_CERT_OPERATION
            .try_get()
            .map_err(|_| spdm_err!(EUNSUP))?;
        (cert.get_cert_from_cert_chain_cb)(cert_chain, index)
    }

    pub fn verify_cert_chain(cert_chain: &[u8]) -> SpdmResult {
        let cert = CRYPTO_CERT_OPERATION
            .try_get()
            .map_err(|_| spdm_err!(EUNSUP))?;
        (cert.verify_cert_chain_cb)(cert_chain)
    }
}

pub mod rand {
    use super::SpdmCryptoRandom;
    use crate::error::SpdmResult;
    use crate::spdm_err;
    use conquer_once::spin::OnceCell;

    static CRYPTO_RAND: OnceCell<SpdmCryptoRandom> = OnceCell::uninit();

    pub fn register(context: SpdmCryptoRandom) -> bool {
        CRYPTO_RAND.try_init_once(|| context).is_ok()
    }

    pub fn get_random(data: &mut [u8]) -> SpdmResult<usize> {
        let rand = CRYPTO_RAND.try_get().map_err(|_| spdm_err!(EUNSUP))?;
        (rand.get_random_data_cb)(data)
    }
}
