// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Typed record layouts for telemetry streams.
//!
//! A [`Schema`] is parsed from a compact format string over the alphabet
//! `b B h H i I l L q Q f d` (one code per field, `l`/`L` aliasing the
//! 32-bit integer codes). Records pack little-endian with no padding, so
//! the record width is exactly the sum of the field widths.

use std::fmt;

use crate::Error;

/// The primitive type of one record field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    I64,
    U64,
    F64,
}

/// A named field slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

/// An ordered, immutable record layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
    format: String,
    record_size: usize,
}

/// One field value of a record.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    I64(i64),
    U64(u64),
    F64(f64),
}

/// An ordered tuple of field values, matching some [`Schema`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record(pub Vec<Value>);

// === impl FieldKind ===

impl FieldKind {
    /// Maps a format code to its field kind. Any character outside the
    /// alphabet is a schema error.
    pub fn from_code(code: char) -> crate::Result<FieldKind> {
        match code {
            'b' => Ok(FieldKind::I8),
            'B' => Ok(FieldKind::U8),
            'h' => Ok(FieldKind::I16),
            'H' => Ok(FieldKind::U16),
            'i' | 'l' => Ok(FieldKind::I32),
            'I' | 'L' => Ok(FieldKind::U32),
            'f' => Ok(FieldKind::F32),
            'q' => Ok(FieldKind::I64),
            'Q' => Ok(FieldKind::U64),
            'd' => Ok(FieldKind::F64),
            other => Err(Error::UnknownFormatCode(other)),
        }
    }

    /// Field width in bytes.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            FieldKind::I8 | FieldKind::U8 => 1,
            FieldKind::I16 | FieldKind::U16 => 2,
            FieldKind::I32 | FieldKind::U32 | FieldKind::F32 => 4,
            FieldKind::I64 | FieldKind::U64 | FieldKind::F64 => 8,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::I8 => "i8",
            FieldKind::U8 => "u8",
            FieldKind::I16 => "i16",
            FieldKind::U16 => "u16",
            FieldKind::I32 => "i32",
            FieldKind::U32 => "u32",
            FieldKind::F32 => "f32",
            FieldKind::I64 => "i64",
            FieldKind::U64 => "u64",
            FieldKind::F64 => "f64",
        };
        f.write_str(name)
    }
}

// === impl Schema ===

impl Schema {
    /// Builds a schema from field names and a format string; both must
    /// describe the same number of fields.
    pub fn new<S: AsRef<str>>(field_names: &[S], format: &str) -> crate::Result<Schema> {
        let kinds = parse_format(format)?;
        if kinds.len() != field_names.len() {
            return Err(Error::FieldCount {
                fields: kinds.len(),
                names: field_names.len(),
            });
        }
        let fields = field_names
            .iter()
            .zip(kinds)
            .map(|(name, kind)| Field {
                name: name.as_ref().to_owned(),
                kind,
            })
            .collect();
        Ok(Self::from_fields(fields, format))
    }

    /// Builds a schema from a bare format string, synthesizing field names
    /// `f0..fN`. Used when recovering a process from its persisted
    /// configuration, which does not record names.
    pub fn from_format(format: &str) -> crate::Result<Schema> {
        let fields = parse_format(format)?
            .into_iter()
            .enumerate()
            .map(|(index, kind)| Field {
                name: format!("f{index}"),
                kind,
            })
            .collect();
        Ok(Self::from_fields(fields, format))
    }

    fn from_fields(fields: Vec<Field>, format: &str) -> Schema {
        let record_size = fields.iter().map(|field| field.kind.width()).sum();
        Self {
            fields,
            format: format.to_owned(),
            record_size,
        }
    }

    /// The format string this schema was built from.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Packed width of one record in bytes.
    #[must_use]
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Packs `record` little-endian with no padding.
    pub fn pack(&self, record: &Record) -> crate::Result<Vec<u8>> {
        if record.0.len() != self.fields.len() {
            return Err(Error::RecordArity {
                got: record.0.len(),
                expected: self.fields.len(),
            });
        }
        let mut out = Vec::with_capacity(self.record_size);
        for (field, value) in self.fields.iter().zip(&record.0) {
            if value.kind() != field.kind {
                return Err(Error::FieldKindMismatch {
                    field: field.name.clone(),
                    expected: field.kind,
                    got: value.kind(),
                });
            }
            value.write_le(&mut out);
        }
        Ok(out)
    }

    /// Unpacks exactly one record from `bytes`.
    pub fn unpack(&self, bytes: &[u8]) -> crate::Result<Record> {
        if bytes.len() != self.record_size {
            return Err(Error::RecordSize {
                got: bytes.len(),
                expected: self.record_size,
            });
        }
        let mut values = Vec::with_capacity(self.fields.len());
        let mut offset = 0;
        for field in &self.fields {
            let width = field.kind.width();
            values.push(Value::read_le(field.kind, &bytes[offset..offset + width]));
            offset += width;
        }
        Ok(Record(values))
    }
}

fn parse_format(format: &str) -> crate::Result<Vec<FieldKind>> {
    format.chars().map(FieldKind::from_code).collect()
}

// === impl Value ===

impl Value {
    #[must_use]
    pub fn kind(self) -> FieldKind {
        match self {
            Value::I8(_) => FieldKind::I8,
            Value::U8(_) => FieldKind::U8,
            Value::I16(_) => FieldKind::I16,
            Value::U16(_) => FieldKind::U16,
            Value::I32(_) => FieldKind::I32,
            Value::U32(_) => FieldKind::U32,
            Value::F32(_) => FieldKind::F32,
            Value::I64(_) => FieldKind::I64,
            Value::U64(_) => FieldKind::U64,
            Value::F64(_) => FieldKind::F64,
        }
    }

    fn write_le(self, out: &mut Vec<u8>) {
        match self {
            Value::I8(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::U8(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Value::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn read_le(kind: FieldKind, bytes: &[u8]) -> Value {
        // `bytes` is exactly `kind.width()` long, sliced by the caller.
        match kind {
            FieldKind::I8 => Value::I8(i8::from_le_bytes([bytes[0]])),
            FieldKind::U8 => Value::U8(bytes[0]),
            FieldKind::I16 => Value::I16(i16::from_le_bytes([bytes[0], bytes[1]])),
            FieldKind::U16 => Value::U16(u16::from_le_bytes([bytes[0], bytes[1]])),
            FieldKind::I32 => Value::I32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            FieldKind::U32 => Value::U32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            FieldKind::F32 => Value::F32(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            FieldKind::I64 => Value::I64(i64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
            FieldKind::U64 => Value::U64(u64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
            FieldKind::F64 => Value::F64(f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn record_size_is_the_sum_of_field_widths() {
        let schema = Schema::new(&["t", "a", "b", "c", "d"], "IBBBB").unwrap();
        assert_eq!(schema.record_size(), 8);
        let schema = Schema::from_format("bBhHiIlLqQfd").unwrap();
        assert_eq!(schema.record_size(), 1 + 1 + 2 + 2 + 4 + 4 + 4 + 4 + 8 + 8 + 4 + 8);
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert!(matches!(
            Schema::from_format("Ix"),
            Err(Error::UnknownFormatCode('x'))
        ));
    }

    #[test]
    fn name_count_must_match_format() {
        assert!(matches!(
            Schema::new(&["a", "b"], "IBB"),
            Err(Error::FieldCount { fields: 3, names: 2 })
        ));
    }

    #[test]
    fn packing_is_little_endian_without_padding() {
        let schema = Schema::new(&["seq", "flag"], "IB").unwrap();
        let bytes = schema
            .pack(&Record(vec![Value::U32(0x0403_0201), Value::U8(0xFF)]))
            .unwrap();
        assert_eq!(bytes, [0x01, 0x02, 0x03, 0x04, 0xFF]);
    }

    #[test]
    fn pack_rejects_wrong_arity_and_kind() {
        let schema = Schema::new(&["seq", "flag"], "IB").unwrap();
        assert!(matches!(
            schema.pack(&Record(vec![Value::U32(1)])),
            Err(Error::RecordArity { got: 1, expected: 2 })
        ));
        assert!(matches!(
            schema.pack(&Record(vec![Value::U32(1), Value::I8(-1)])),
            Err(Error::FieldKindMismatch { .. })
        ));
    }

    #[test]
    fn unpack_rejects_wrong_buffer_size() {
        let schema = Schema::from_format("IB").unwrap();
        assert!(matches!(
            schema.unpack(&[0; 4]),
            Err(Error::RecordSize { got: 4, expected: 5 })
        ));
    }

    fn sample_value(kind: FieldKind, seed: u64) -> Value {
        match kind {
            FieldKind::I8 => Value::I8(seed as i8),
            FieldKind::U8 => Value::U8(seed as u8),
            FieldKind::I16 => Value::I16(seed as i16),
            FieldKind::U16 => Value::U16(seed as u16),
            FieldKind::I32 => Value::I32(seed as i32),
            FieldKind::U32 => Value::U32(seed as u32),
            FieldKind::F32 => Value::F32(f32::from_bits(seed as u32)),
            FieldKind::I64 => Value::I64(seed as i64),
            FieldKind::U64 => Value::U64(seed),
            FieldKind::F64 => Value::F64(f64::from_bits(seed)),
        }
    }

    proptest! {
        #[test]
        fn pack_unpack_round_trips_over_the_whole_alphabet(
            codes in proptest::collection::vec(
                proptest::sample::select(vec!['b', 'B', 'h', 'H', 'i', 'I', 'l', 'L', 'q', 'Q', 'f', 'd']),
                1..12,
            ),
            seeds in proptest::collection::vec(any::<u64>(), 12),
        ) {
            let format: String = codes.iter().collect();
            let schema = Schema::from_format(&format).unwrap();

            let values: Vec<Value> = schema
                .fields()
                .iter()
                .zip(&seeds)
                .map(|(field, &seed)| sample_value(field.kind, seed))
                .collect();
            let record = Record(values);

            let packed = schema.pack(&record).unwrap();
            prop_assert_eq!(packed.len(), schema.record_size());

            // Compare bit patterns rather than values so NaN floats still
            // round-trip.
            let unpacked = schema.unpack(&packed).unwrap();
            let repacked = schema.pack(&unpacked).unwrap();
            prop_assert_eq!(repacked, packed);
        }
    }
}
