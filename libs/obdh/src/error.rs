// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::schema::FieldKind;

#[derive(Debug, onlyerror::Error)]
pub enum Error {
    #[error("line limit must be a positive integer")]
    InvalidLineLimit,
    #[error("unrecognized format code '{0}'")]
    UnknownFormatCode(char),
    #[error("format describes {fields} fields but {names} names were given")]
    FieldCount { fields: usize, names: usize },
    #[error("process '{0}' is already registered")]
    AlreadyRegistered(String),

    /// Operation referenced a tag that is not in the registry.
    #[error("unknown process tag '{0}'")]
    UnknownTag(String),
    #[error("process '{0}' does not support this operation")]
    WrongProcessKind(String),

    /// The record does not match the process schema.
    #[error("record has {got} values, schema expects {expected}")]
    RecordArity { got: usize, expected: usize },
    #[error("field '{field}' expects {expected}, got {got}")]
    FieldKindMismatch {
        field: String,
        expected: FieldKind,
        got: FieldKind,
    },
    #[error("buffer is {got} bytes, schema expects {expected}")]
    RecordSize { got: usize, expected: usize },

    #[error("storage I/O failed")]
    Io(#[from] std::io::Error),
    #[error("invalid process configuration")]
    Config(#[from] serde_json::Error),
}
