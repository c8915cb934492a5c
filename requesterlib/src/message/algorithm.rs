// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::spdm_codec::SpdmCodec;
use crate::protocol::{
    SpdmAeadAlgo, SpdmBaseAsymAlgo, SpdmBaseHashAlgo, SpdmDheAlgo, SpdmKeyScheduleAlgo,
    SpdmMeasurementHashAlgo, SpdmMeasurementSpecification, SpdmReqAsymAlgo,
};
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

pub const MAX_SPDM_ALG_STRUCT_COUNT: usize = 4;

const ALG_FIXED_COUNT_TWO_BYTES: u8 = 0x20;

enum_builder! {
    @U8
    EnumName: SpdmAlgType;
    EnumVal{
        SpdmAlgTypeDHE => 0x2,
        SpdmAlgTypeAEAD => 0x3,
        SpdmAlgTypeReqAsym => 0x4,
        SpdmAlgTypeKeySchedule => 0x5
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpdmAlg {
    SpdmAlgoDhe(SpdmDheAlgo),
    SpdmAlgoAead(SpdmAeadAlgo),
    SpdmAlgoReqAsym(SpdmReqAsymAlgo),
    SpdmAlgoKeySchedule(SpdmKeyScheduleAlgo),
    SpdmAlgoUnknown(u16),
}

impl Default for SpdmAlg {
    fn default() -> SpdmAlg {
        SpdmAlg::SpdmAlgoUnknown(0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SpdmAlgStruct {
    pub alg_type: SpdmAlgType,
    pub alg_fixed_count: u8,
    pub alg_supported: SpdmAlg,
}

impl Codec for SpdmAlgStruct {
    fn encode(&self, bytes: &mut Writer) {
        self.alg_type.encode(bytes);
        self.alg_fixed_count.encode(bytes);
        match &self.alg_supported {
            SpdmAlg::SpdmAlgoDhe(algo) => algo.encode(bytes),
            SpdmAlg::SpdmAlgoAead(algo) => algo.encode(bytes),
            SpdmAlg::SpdmAlgoReqAsym(algo) => algo.encode(bytes),
            SpdmAlg::SpdmAlgoKeySchedule(algo) => algo.encode(bytes),
            SpdmAlg::SpdmAlgoUnknown(value) => value.encode(bytes),
        }
    }

    fn read(r: &mut Reader) -> Option<SpdmAlgStruct> {
        let alg_type = SpdmAlgType::read(r)?;
        let alg_fixed_count = u8::read(r)?;
        if alg_fixed_count != ALG_FIXED_COUNT_TWO_BYTES {
            return None;
        }
        let alg_supported = match alg_type {
            SpdmAlgType::SpdmAlgTypeDHE => SpdmAlg::SpdmAlgoDhe(SpdmDheAlgo::read(r)?),
            SpdmAlgType::SpdmAlgTypeAEAD => SpdmAlg::SpdmAlgoAead(SpdmAeadAlgo::read(r)?),
            SpdmAlgType::SpdmAlgTypeReqAsym => SpdmAlg::SpdmAlgoReqAsym(SpdmReqAsymAlgo::read(r)?),
            SpdmAlgType::SpdmAlgTypeKeySchedule => {
                SpdmAlg::SpdmAlgoKeySchedule(SpdmKeyScheduleAlgo::read(r)?)
            }
            SpdmAlgType::Unknown(_) => SpdmAlg::SpdmAlgoUnknown(u16::read(r)?),
        };
        Some(SpdmAlgStruct {
            alg_type,
            alg_fixed_count,
            alg_supported,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmNegotiateAlgorithmsRequestPayload {
    pub measurement_specification: SpdmMeasurementSpecification,
    pub base_asym_algo: SpdmBaseAsymAlgo,
    pub base_hash_algo: SpdmBaseHashAlgo,
    pub alg_struct_count: u8,
    pub alg_struct: [SpdmAlgStruct; MAX_SPDM_ALG_STRUCT_COUNT],
}

impl SpdmCodec for SpdmNegotiateAlgorithmsRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.alg_struct_count.encode(bytes); // param1
        0u8.encode(bytes); // param2
        let length = 32 + 4 * self.alg_struct_count as u16;
        length.encode(bytes);
        self.measurement_specification.encode(bytes);
        0u8.encode(bytes); // reserved
        self.base_asym_algo.encode(bytes);
        self.base_hash_algo.encode(bytes);
        let _ = bytes.extend_from_slice(&[0u8; 12]); // reserved2
        0u8.encode(bytes); // ext_asym_count
        0u8.encode(bytes); // ext_hash_count
        0u16.encode(bytes); // reserved3
        for alg in self.alg_struct.iter().take(self.alg_struct_count as usize) {
            alg.encode(bytes);
        }
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmNegotiateAlgorithmsRequestPayload> {
        let alg_struct_count = u8::read(r)?; // param1
        if alg_struct_count as usize > MAX_SPDM_ALG_STRUCT_COUNT {
            return None;
        }
        u8::read(r)?; // param2
        u16::read(r)?; // length
        let measurement_specification = SpdmMeasurementSpecification::read(r)?;
        u8::read(r)?; // reserved
        let base_asym_algo = SpdmBaseAsymAlgo::read(r)?;
        let base_hash_algo = SpdmBaseHashAlgo::read(r)?;
        r.take(12)?; // reserved2
        let ext_asym_count = u8::read(r)?;
        if ext_asym_count != 0 {
            return None;
        }
        let ext_hash_count = u8::read(r)?;
        if ext_hash_count != 0 {
            return None;
        }
        u16::read(r)?; // reserved3
        let mut alg_struct = [SpdmAlgStruct::default(); MAX_SPDM_ALG_STRUCT_COUNT];
        for alg in alg_struct.iter_mut().take(alg_struct_count as usize) {
            *alg = SpdmAlgStruct::read(r)?;
        }

        Some(SpdmNegotiateAlgorithmsRequestPayload {
            measurement_specification,
            base_asym_algo,
            base_hash_algo,
            alg_struct_count,
            alg_struct,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmAlgorithmsResponsePayload {
    pub measurement_specification_sel: SpdmMeasurementSpecification,
    pub measurement_hash_algo: SpdmMeasurementHashAlgo,
    pub base_asym_sel: SpdmBaseAsymAlgo,
    pub base_hash_sel: SpdmBaseHashAlgo,
    pub alg_struct_count: u8,
    pub alg_struct: [SpdmAlgStruct; MAX_SPDM_ALG_STRUCT_COUNT],
}

impl SpdmCodec for SpdmAlgorithmsResponsePayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.alg_struct_count.encode(bytes); // param1
        0u8.encode(bytes); // param2
        let length = 36 + 4 * self.alg_struct_count as u16;
        length.encode(bytes);
        self.measurement_specification_sel.encode(bytes);
        0u8.encode(bytes); // reserved
        self.measurement_hash_algo.encode(bytes);
        self.base_asym_sel.encode(bytes);
        self.base_hash_sel.encode(bytes);
        let _ = bytes.extend_from_slice(&[0u8; 12]); // reserved2
        0u8.encode(bytes); // ext_asym_sel_count
        0u8.encode(bytes); // ext_hash_sel_count
        0u16.encode(bytes); // reserved3
        for alg in self.alg_struct.iter().take(self.alg_struct_count as usize) {
            alg.encode(bytes);
        }
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmAlgorithmsResponsePayload> {
        let alg_struct_count = u8::read(r)?; // param1
        if alg_struct_count as usize > MAX_SPDM_ALG_STRUCT_COUNT {
            return None;
        }
        u8::read(r)?; // param2
        u16::read(r)?; // length
        let measurement_specification_sel = SpdmMeasurementSpecification::read(r)?;
        u8::read(r)?; // reserved
        let measurement_hash_algo = SpdmMeasurementHashAlgo::read(r)?;
        let base_asym_sel = SpdmBaseAsymAlgo::read(r)?;
        let base_hash_sel = SpdmBaseHashAlgo::read(r)?;
        r.take(12)?; // reserved2
        let ext_asym_sel_count = u8::read(r)?;
        if ext_asym_sel_count != 0 {
            return None;
        }
        let ext_hash_sel_count = u8::read(r)?;
        if ext_hash_sel_count != 0 {
            return None;
        }
        u16::read(r)?; // reserved3
        let mut alg_struct = [SpdmAlgStruct::default(); MAX_SPDM_ALG_STRUCT_COUNT];
        for alg in alg_struct.iter_mut().take(alg_struct_count as usize) {
            *alg = SpdmAlgStruct::read(r)?;
        }

        Some(SpdmAlgorithmsResponsePayload {
            measurement_specification_sel,
            measurement_hash_algo,
            base_asym_sel,
            base_hash_sel,
            alg_struct_count,
            alg_struct,
        })
    }
}
