// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! On-board data handling: the single point of access to the mass storage
//! mounted at the data root (`/sd` on the flight computer).
//!
//! Storage is organised as one directory per logical stream. A
//! [`DataProcess`] appends fixed-width binary records described by a
//! [`Schema`] to the stream's active file and rotates to a fresh file once
//! `line_limit` records accumulated; an [`ImageProcess`] does the same for
//! opaque byte payloads with a fixed 10 MB ceiling. Each directory carries a
//! hidden JSON configuration file so the whole registry can be rebuilt from
//! disk after a reboot, see [`DataStore::scan`].
//!
//! Downlink works on whole files: [`DataStore::request_tm_path`] leases the
//! oldest (or newest) closed file of a stream to the radio,
//! [`DataStore::notify_tm_path`] acknowledges the transmission, and
//! [`DataStore::clean_up`] finally removes acknowledged files from disk.

mod error;
mod process;
pub mod schema;
mod store;

pub use error::Error;
pub use process::{DataProcess, IMG_SIZE_LIMIT, ImageProcess};
pub use schema::{FieldKind, Record, Schema, Value};
pub use store::{DataStore, PROCESS_CONFIG_FILENAME};

pub type Result<T> = core::result::Result<T, Error>;
