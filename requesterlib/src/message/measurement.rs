// Copyright (c) 2020 Intel Corporation
//
// SPDX-License-Identifier: BSD-2-Clause-Patent

use crate::common;
use crate::common::opaque::SpdmOpaqueStruct;
use crate::common::spdm_codec::SpdmCodec;
use crate::config;
use crate::protocol::{
    SpdmMeasurementRecordStructure, SpdmNonceStruct, SpdmSignatureStruct,
};
use codec::enum_builder;
use codec::{Codec, Reader, Writer};

bitflags! {
    #[derive(Default)]
    pub struct SpdmMeasurementAttributes: u8 {
        const SIGNATURE_REQUESTED = 0b0000_0001;
        const RAW_BIT_STREAM_REQUESTED = 0b0000_0010;
    }
}

impl Codec for SpdmMeasurementAttributes {
    fn encode(&self, bytes: &mut Writer) {
        self.bits().encode(bytes);
    }

    fn read(r: &mut Reader) -> Option<SpdmMeasurementAttributes> {
        let bits = u8::read(r)?;

        SpdmMeasurementAttributes::from_bits(bits)
    }
}

enum_builder! {
    @U8
    EnumName: SpdmMeasurementOperation;
    EnumVal{
        SpdmMeasurementQueryTotalNumber => 0x0,
        SpdmMeasurementRequestAll => 0xFF
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmGetMeasurementsRequestPayload {
    pub measurement_attributes: SpdmMeasurementAttributes,
    pub measurement_operation: SpdmMeasurementOperation,
    pub nonce: SpdmNonceStruct,
    pub slot_id: u8,
}

impl SpdmCodec for SpdmGetMeasurementsRequestPayload {
    fn spdm_encode(&self, _context: &mut common::SpdmContext, bytes: &mut Writer) {
        self.measurement_attributes.encode(bytes); // param1
        self.measurement_operation.encode(bytes); // param2
        if self
            .measurement_attributes
            .contains(SpdmMeasurementAttributes::SIGNATURE_REQUESTED)
        {
            self.nonce.encode(bytes);
            self.slot_id.encode(bytes);
        }
    }

    fn spdm_read(
        _context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmGetMeasurementsRequestPayload> {
        let measurement_attributes = SpdmMeasurementAttributes::read(r)?; // param1
        let measurement_operation = SpdmMeasurementOperation::read(r)?; // param2
        let nonce =
            if measurement_attributes.contains(SpdmMeasurementAttributes::SIGNATURE_REQUESTED) {
                SpdmNonceStruct::read(r)?
            } else {
                SpdmNonceStruct::default()
            };
        let slot_id =
            if measurement_attributes.contains(SpdmMeasurementAttributes::SIGNATURE_REQUESTED) {
                u8::read(r)?
            } else {
                0
            };

        Some(SpdmGetMeasurementsRequestPayload {
            measurement_attributes,
            measurement_operation,
            nonce,
            slot_id,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpdmMeasurementsResponsePayload {
    pub number_of_measurement: u8,
    pub slot_id: u8,
    pub measurement_record: SpdmMeasurementRecordStructure,
    pub nonce: SpdmNonceStruct,
    pub opaque: SpdmOpaqueStruct,
    pub signature: SpdmSignatureStruct,
}

impl SpdmCodec for SpdmMeasurementsResponsePayload {
    fn spdm_encode(&self, context: &mut common::SpdmContext, bytes: &mut Writer) {
        // param1 carries the total measurement index count only for the
        // query-total-number operation
        self.number_of_measurement.encode(bytes); // param1
        self.slot_id.encode(bytes); // param2
        self.measurement_record.number_of_blocks.encode(bytes);
        let record_size = self.measurement_record.record_size;
        let _ = bytes.extend_from_slice(&record_size.to_le_bytes()[..3]);
        let _ = bytes.extend_from_slice(
            &self.measurement_record.record_data[..record_size as usize],
        );
        self.nonce.encode(bytes);
        self.opaque.spdm_encode(context, bytes);
        if context.runtime_info.need_measurement_signature {
            self.signature.spdm_encode(context, bytes);
        }
    }

    fn spdm_read(
        context: &mut common::SpdmContext,
        r: &mut Reader,
    ) -> Option<SpdmMeasurementsResponsePayload> {
        let number_of_measurement = u8::read(r)?; // param1
        let slot_id = u8::read(r)?; // param2
        let number_of_blocks = u8::read(r)?;
        let record_bytes = r.take(3)?;
        let record_size =
            u32::from_le_bytes([record_bytes[0], record_bytes[1], record_bytes[2], 0]);
        if record_size as usize > config::MAX_SPDM_MEASUREMENT_RECORD_SIZE {
            return None;
        }
        let mut measurement_record = SpdmMeasurementRecordStructure {
            number_of_blocks,
            record_size,
            ..Default::default()
        };
        measurement_record.record_data[..record_size as usize]
            .copy_from_slice(r.take(record_size as usize)?);
        let nonce = SpdmNonceStruct::read(r)?;
        let opaque = SpdmOpaqueStruct::spdm_read(context, r)?;
        let signature = if context.runtime_info.need_measurement_signature {
            SpdmSignatureStruct::spdm_read(context, r)?
        } else {
            SpdmSignatureStruct::default()
        };

        Some(SpdmMeasurementsResponsePayload {
            number_of_measurement,
            slot_id,
            measurement_record,
            nonce,
            opaque,
            signature,
        })
    }
}
