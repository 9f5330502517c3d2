// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sched::time::Clock;
use serde::{Deserialize, Serialize};

use crate::process::{DataProcess, ImageProcess};
use crate::schema::{Record, Schema};
use crate::Error;

/// Per-directory configuration file, allowing [`DataStore::scan`] to
/// rebuild the registry after a reboot.
pub const PROCESS_CONFIG_FILENAME: &str = ".process_configuration.json";

/// The reserved tag of the image stream.
const IMG_TAG: &str = "img";

#[derive(Debug, Serialize, Deserialize, Default)]
struct ProcessConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    img: bool,
}

enum Process {
    Data(DataProcess),
    Image(ImageProcess),
}

/// Registry of every logging stream on the mass storage mount.
///
/// All mutation happens from scheduler-dispatched code; the runtime is
/// single-threaded so the registry needs no locking.
pub struct DataStore {
    root: PathBuf,
    clock: Clock,
    registry: BTreeMap<String, Process>,
}

// === impl DataStore ===

impl DataStore {
    /// Creates a store rooted at `root` (`/sd` in flight). The directory is
    /// created if missing; timestamps for new files come from `clock`.
    pub fn new(root: impl Into<PathBuf>, clock: Clock) -> crate::Result<DataStore> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            clock,
            registry: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scans the root for directories with a configuration file and
    /// registers the processes they describe. Directories with unreadable
    /// or incomplete configurations are skipped with a warning.
    pub fn scan(&mut self) -> crate::Result<()> {
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let tag = entry.file_name().to_string_lossy().into_owned();
            let config_path = entry.path().join(PROCESS_CONFIG_FILENAME);
            if !config_path.exists() {
                continue;
            }
            let config: ProcessConfig = match fs::read_to_string(&config_path)
                .map_err(Error::from)
                .and_then(|raw| serde_json::from_str(&raw).map_err(Error::from))
            {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(%tag, %err, "skipping unreadable process configuration");
                    continue;
                }
            };

            let recovered = if config.img {
                self.register_image()
            } else if let (Some(format), Some(line_limit)) = (&config.data_format, config.line_limit)
            {
                // Field names are not persisted; recover with placeholders.
                Schema::from_format(format)
                    .and_then(|schema| self.insert_data(&tag, schema, true, line_limit, false))
            } else {
                tracing::warn!(%tag, "skipping incomplete process configuration");
                continue;
            };

            match recovered {
                Ok(()) => tracing::info!(%tag, "recovered process from disk"),
                Err(err) => tracing::warn!(%tag, %err, "failed to recover process"),
            }
        }
        Ok(())
    }

    /// Registers a new record stream.
    ///
    /// Creates the stream directory and writes its configuration file when
    /// absent. Fails when the tag is taken, the format string contains an
    /// unknown code, the name count does not match, or `line_limit` is
    /// zero.
    pub fn register(
        &mut self,
        tag: &str,
        field_names: &[&str],
        data_format: &str,
        persistent: bool,
        line_limit: u64,
    ) -> crate::Result<()> {
        let schema = Schema::new(field_names, data_format)?;
        self.insert_data(tag, schema, persistent, line_limit, false)
    }

    /// Registers the image stream under the reserved `img` tag.
    pub fn register_image(&mut self) -> crate::Result<()> {
        if self.registry.contains_key(IMG_TAG) {
            return Err(Error::AlreadyRegistered(IMG_TAG.to_owned()));
        }
        let process = ImageProcess::new(IMG_TAG, &self.root)?;
        let config_path = process.stream().dir_path().join(PROCESS_CONFIG_FILENAME);
        if !config_path.exists() {
            let config = ProcessConfig {
                img: true,
                ..ProcessConfig::default()
            };
            fs::write(&config_path, serde_json::to_vec(&config)?)?;
        }
        self.registry.insert(IMG_TAG.to_owned(), Process::Image(process));
        tracing::info!(tag = IMG_TAG, "registered image process");
        Ok(())
    }

    /// Rewrites a process' configuration file from its live state.
    pub fn rewrite_config(&mut self, tag: &str) -> crate::Result<()> {
        let process = self
            .registry
            .get(tag)
            .ok_or_else(|| Error::UnknownTag(tag.to_owned()))?;
        let (dir_path, config) = match process {
            Process::Data(data) => {
                let Some(stream) = data.stream() else {
                    return Err(Error::WrongProcessKind(tag.to_owned()));
                };
                (
                    stream.dir_path().to_owned(),
                    ProcessConfig {
                        data_format: Some(data.schema().format().to_owned()),
                        line_limit: Some(data.line_limit()),
                        img: false,
                    },
                )
            }
            Process::Image(image) => (
                image.stream().dir_path().to_owned(),
                ProcessConfig {
                    img: true,
                    ..ProcessConfig::default()
                },
            ),
        };
        fs::write(
            dir_path.join(PROCESS_CONFIG_FILENAME),
            serde_json::to_vec(&config)?,
        )?;
        Ok(())
    }

    fn insert_data(
        &mut self,
        tag: &str,
        schema: Schema,
        persistent: bool,
        line_limit: u64,
        rewrite_config: bool,
    ) -> crate::Result<()> {
        if self.registry.contains_key(tag) {
            return Err(Error::AlreadyRegistered(tag.to_owned()));
        }
        let process = DataProcess::new(tag, schema, persistent, line_limit, &self.root)?;
        if let Some(stream) = process.stream() {
            let config_path = stream.dir_path().join(PROCESS_CONFIG_FILENAME);
            if rewrite_config || !config_path.exists() {
                let config = ProcessConfig {
                    data_format: Some(process.schema().format().to_owned()),
                    line_limit: Some(process.line_limit()),
                    img: false,
                };
                fs::write(&config_path, serde_json::to_vec(&config)?)?;
            }
        }
        self.registry.insert(tag.to_owned(), Process::Data(process));
        tracing::info!(%tag, persistent, line_limit, "registered data process");
        Ok(())
    }

    /// Appends one record to the stream `tag` and caches it as the
    /// stream's latest value.
    pub fn log(&mut self, tag: &str, record: &Record) -> crate::Result<()> {
        let now_secs = self.clock.now_secs();
        match self.registry.get_mut(tag) {
            Some(Process::Data(process)) => process.log(record, now_secs),
            Some(Process::Image(_)) => Err(Error::WrongProcessKind(tag.to_owned())),
            None => Err(Error::UnknownTag(tag.to_owned())),
        }
    }

    /// Appends raw bytes to the image stream.
    pub fn log_image(&mut self, data: &[u8]) -> crate::Result<()> {
        let now_secs = self.clock.now_secs();
        match self.registry.get_mut(IMG_TAG) {
            Some(Process::Image(process)) => process.log(data, now_secs),
            Some(Process::Data(_)) => Err(Error::WrongProcessKind(IMG_TAG.to_owned())),
            None => Err(Error::UnknownTag(IMG_TAG.to_owned())),
        }
    }

    /// Closes the in-flight image so it becomes transmittable.
    pub fn image_completed(&mut self) -> crate::Result<()> {
        let now_secs = self.clock.now_secs();
        match self.registry.get_mut(IMG_TAG) {
            Some(Process::Image(process)) => process.image_completed(now_secs),
            Some(Process::Data(_)) => Err(Error::WrongProcessKind(IMG_TAG.to_owned())),
            None => Err(Error::UnknownTag(IMG_TAG.to_owned())),
        }
    }

    /// The most recent record logged to `tag`, without touching the disk.
    pub fn get_latest(&self, tag: &str) -> crate::Result<Option<Record>> {
        match self.registry.get(tag) {
            Some(Process::Data(process)) => Ok(process.latest().cloned()),
            Some(Process::Image(_)) => Err(Error::WrongProcessKind(tag.to_owned())),
            None => Err(Error::UnknownTag(tag.to_owned())),
        }
    }

    /// The record layout of the stream `tag`.
    pub fn schema(&self, tag: &str) -> crate::Result<&Schema> {
        match self.registry.get(tag) {
            Some(Process::Data(process)) => Ok(process.schema()),
            Some(Process::Image(_)) => Err(Error::WrongProcessKind(tag.to_owned())),
            None => Err(Error::UnknownTag(tag.to_owned())),
        }
    }

    /// Leases a file of `tag` for transmission; `None` when the stream has
    /// no transmittable file. When the pick is the active write file the
    /// stream rotates first, so the leased file is always quiescent.
    pub fn request_tm_path(&mut self, tag: &str, latest: bool) -> crate::Result<Option<PathBuf>> {
        let now_secs = self.clock.now_secs();
        let process = self
            .registry
            .get_mut(tag)
            .ok_or_else(|| Error::UnknownTag(tag.to_owned()))?;
        match process {
            Process::Data(data) => match data.stream_mut() {
                Some(stream) => stream.request_tm_path(latest, now_secs),
                None => Ok(None),
            },
            Process::Image(image) => image.stream_mut().request_tm_path(latest, now_secs),
        }
    }

    /// Acknowledges that a leased file was fully transmitted; it is queued
    /// for deletion on the next [`DataStore::clean_up`].
    pub fn notify_tm_path(&mut self, tag: &str, path: &Path) -> crate::Result<()> {
        let process = self
            .registry
            .get_mut(tag)
            .ok_or_else(|| Error::UnknownTag(tag.to_owned()))?;
        match process {
            Process::Data(data) => {
                if let Some(stream) = data.stream_mut() {
                    stream.notify_tm_path(path);
                }
            }
            Process::Image(image) => image.stream_mut().notify_tm_path(path),
        }
        Ok(())
    }

    /// Deletes acknowledged files across every process.
    pub fn clean_up(&mut self) {
        for process in self.registry.values_mut() {
            match process {
                Process::Data(data) => {
                    if let Some(stream) = data.stream_mut() {
                        stream.clean_up();
                    }
                }
                Process::Image(image) => image.stream_mut().clean_up(),
            }
        }
    }

    /// Wipes the registry and every file under the root. The root
    /// directory itself survives.
    pub fn delete_all_files(&mut self) -> crate::Result<()> {
        // Drop processes first so their write handles are closed.
        self.registry.clear();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        tracing::info!(root = %self.root.display(), "deleted all files");
        Ok(())
    }

    /// Recursive size of everything under the root, in bytes.
    pub fn total_size(&self) -> crate::Result<u64> {
        fn dir_size(path: &Path) -> std::io::Result<u64> {
            let mut total = 0;
            for entry in fs::read_dir(path)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    total += dir_size(&entry.path())?;
                } else {
                    total += entry.metadata()?.len();
                }
            }
            Ok(total)
        }
        Ok(dir_size(&self.root)?)
    }

    /// Size of the active write file of `tag`, `None` while closed.
    pub fn current_file_size(&self, tag: &str) -> crate::Result<Option<u64>> {
        let process = self
            .registry
            .get(tag)
            .ok_or_else(|| Error::UnknownTag(tag.to_owned()))?;
        Ok(match process {
            Process::Data(data) => data.stream().and_then(|stream| stream.current_file_size()),
            Process::Image(image) => image.stream().current_file_size(),
        })
    }

    /// File count and directory footprint of `tag`.
    pub fn storage_info(&self, tag: &str) -> crate::Result<(usize, u64)> {
        let process = self
            .registry
            .get(tag)
            .ok_or_else(|| Error::UnknownTag(tag.to_owned()))?;
        match process {
            Process::Data(data) => match data.stream() {
                Some(stream) => stream.storage_info(),
                None => Ok((0, 0)),
            },
            Process::Image(image) => image.stream().storage_info(),
        }
    }

    #[must_use]
    pub fn process_exists(&self, tag: &str) -> bool {
        self.registry.contains_key(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    #[cfg(test)]
    fn stream_of(&self, tag: &str) -> &crate::process::Stream {
        match self.registry.get(tag).unwrap() {
            Process::Data(data) => data.stream().unwrap(),
            Process::Image(image) => image.stream(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Value;
    use sched::time::Ticks;
    use std::time::Duration;

    fn test_store() -> (DataStore, std::rc::Rc<sched::time::ManualSource>, tempfile::TempDir) {
        let (clock, source) = Clock::manual(Duration::from_secs(1));
        let dir = tempfile::tempdir().unwrap();
        let store = DataStore::new(dir.path().join("sd"), clock).unwrap();
        (store, source, dir)
    }

    fn sample_record(t: u32, rest: [u8; 4]) -> Record {
        Record(vec![
            Value::U32(t),
            Value::U8(rest[0]),
            Value::U8(rest[1]),
            Value::U8(rest[2]),
            Value::U8(rest[3]),
        ])
    }

    #[test]
    fn log_appends_fixed_records_and_rotates_at_line_limit() {
        let (mut store, source, _dir) = test_store();
        store
            .register("log", &["t", "a", "b", "c", "d"], "IBBBB", true, 3)
            .unwrap();

        for i in 0..4u32 {
            store.log("log", &sample_record(i, [1, 2, 3, 4])).unwrap();
            source.advance(Ticks(1));
        }

        let dir = store.root().join("log");
        let mut files: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "bin"))
            .collect();
        files.sort();
        assert_eq!(files.len(), 2);
        // record_size = 8, so the first file is exactly at the 24-byte
        // limit and the second holds the one overflow record.
        assert_eq!(fs::metadata(&files[0]).unwrap().len(), 24);
        assert_eq!(fs::metadata(&files[1]).unwrap().len(), 8);
        assert_eq!(
            store.stream_of("log").current_path().unwrap(),
            files[1].as_path()
        );

        // The tail of the active file unpacks back to the last record.
        let bytes = fs::read(&files[1]).unwrap();
        let schema = store.schema("log").unwrap();
        assert_eq!(schema.unpack(&bytes).unwrap(), sample_record(3, [1, 2, 3, 4]));
    }

    #[test]
    fn line_limit_of_one_rotates_after_every_append() {
        let (mut store, source, _dir) = test_store();
        store.register("one", &["v"], "H", true, 1).unwrap();

        for i in 0..3u16 {
            store.log("one", &Record(vec![Value::U16(i)])).unwrap();
            source.advance(Ticks(1));
        }

        let count = fs::read_dir(store.root().join("one"))
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .unwrap()
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "bin")
            })
            .count();
        assert_eq!(count, 3);
    }

    #[test]
    fn same_second_rotations_keep_chronological_names() {
        let (mut store, _source, _dir) = test_store();
        store.register("burst", &["v"], "B", true, 1).unwrap();

        // Three rotations without the clock moving at all.
        for i in 0..3u8 {
            store.log("burst", &Record(vec![Value::U8(i)])).unwrap();
        }

        let mut files: Vec<_> = fs::read_dir(store.root().join("burst"))
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "bin"))
            .collect();
        files.sort();
        assert_eq!(files.len(), 3);
        // Lexicographic order must equal write order.
        let schema = Schema::from_format("B").unwrap();
        for (i, path) in files.iter().enumerate() {
            let record = schema.unpack(&fs::read(path).unwrap()).unwrap();
            assert_eq!(record, Record(vec![Value::U8(u8::try_from(i).unwrap())]));
        }
    }

    #[test]
    fn transmit_lease_lifecycle() {
        let (mut store, source, _dir) = test_store();
        store
            .register("log", &["t", "a", "b", "c", "d"], "IBBBB", true, 3)
            .unwrap();
        for i in 0..4u32 {
            store.log("log", &sample_record(i, [0; 4])).unwrap();
            source.advance(Ticks(1));
        }

        let leased = store.request_tm_path("log", false).unwrap().unwrap();
        // Oldest file first, and never the active writer.
        assert!(leased.exists());
        assert_ne!(Some(leased.as_path()), store.stream_of("log").current_path());
        assert_eq!(store.stream_of("log").excluded_paths(), [leased.clone()]);

        store.notify_tm_path("log", &leased).unwrap();
        assert!(store.stream_of("log").excluded_paths().is_empty());
        assert_eq!(store.stream_of("log").delete_paths(), [leased.clone()]);

        store.clean_up();
        assert!(!leased.exists());
        assert!(store.stream_of("log").delete_paths().is_empty());

        let remaining = fs::read_dir(store.root().join("log"))
            .unwrap()
            .filter(|entry| {
                entry
                    .as_ref()
                    .unwrap()
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "bin")
            })
            .count();
        assert_eq!(remaining, 1);
    }

    #[test]
    fn leasing_the_active_file_rotates_first() {
        let (mut store, _source, _dir) = test_store();
        store.register("log", &["v"], "I", true, 100).unwrap();
        store.log("log", &Record(vec![Value::U32(1)])).unwrap();

        let active_before = store.stream_of("log").current_path().unwrap().to_owned();
        let leased = store.request_tm_path("log", false).unwrap().unwrap();
        assert_eq!(leased, active_before);
        assert_ne!(Some(leased.as_path()), store.stream_of("log").current_path());
    }

    #[test]
    fn notify_for_unleased_path_is_a_noop() {
        let (mut store, _source, _dir) = test_store();
        store.register("log", &["v"], "I", true, 2).unwrap();
        store
            .notify_tm_path("log", Path::new("/sd/log/log_0000000000.bin"))
            .unwrap();
        assert!(store.stream_of("log").delete_paths().is_empty());
    }

    #[test]
    fn clean_up_skips_missing_files() {
        let (mut store, _source, _dir) = test_store();
        store.register("log", &["v"], "I", true, 1).unwrap();
        store.log("log", &Record(vec![Value::U32(1)])).unwrap();

        let leased = store.request_tm_path("log", false).unwrap().unwrap();
        store.notify_tm_path("log", &leased).unwrap();
        fs::remove_file(&leased).unwrap();

        store.clean_up();
        assert!(store.stream_of("log").delete_paths().is_empty());
    }

    #[test]
    fn latest_lease_picks_the_newest_file() {
        let (mut store, source, _dir) = test_store();
        store.register("log", &["v"], "B", true, 1).unwrap();
        for i in 0..3u8 {
            store.log("log", &Record(vec![Value::U8(i)])).unwrap();
            source.advance(Ticks(1));
        }

        let oldest = store.request_tm_path("log", false).unwrap().unwrap();
        let newest = store.request_tm_path("log", true).unwrap().unwrap();
        assert!(oldest < newest);
    }

    #[test]
    fn non_persistent_processes_never_touch_the_disk() {
        let (mut store, _source, _dir) = test_store();
        store.register("volatile", &["v"], "I", false, 10).unwrap();
        store.log("volatile", &Record(vec![Value::U32(7)])).unwrap();

        assert_eq!(
            store.get_latest("volatile").unwrap(),
            Some(Record(vec![Value::U32(7)]))
        );
        assert!(!store.root().join("volatile").exists());
        assert_eq!(store.request_tm_path("volatile", false).unwrap(), None);
    }

    #[test]
    fn get_latest_reflects_the_last_logged_record() {
        let (mut store, _source, _dir) = test_store();
        store.register("log", &["v"], "I", true, 10).unwrap();
        assert_eq!(store.get_latest("log").unwrap(), None);
        store.log("log", &Record(vec![Value::U32(1)])).unwrap();
        store.log("log", &Record(vec![Value::U32(2)])).unwrap();
        assert_eq!(store.get_latest("log").unwrap(), Some(Record(vec![Value::U32(2)])));
    }

    #[test]
    fn unknown_tags_are_reported() {
        let (mut store, _source, _dir) = test_store();
        assert!(matches!(
            store.log("ghost", &Record(vec![Value::U32(1)])),
            Err(Error::UnknownTag(_))
        ));
        assert!(matches!(store.get_latest("ghost"), Err(Error::UnknownTag(_))));
        assert!(matches!(
            store.request_tm_path("ghost", false),
            Err(Error::UnknownTag(_))
        ));
    }

    #[test]
    fn registration_validates_inputs() {
        let (mut store, _source, _dir) = test_store();
        assert!(matches!(
            store.register("bad", &["v"], "I", true, 0),
            Err(Error::InvalidLineLimit)
        ));
        assert!(matches!(
            store.register("bad", &["v"], "Z", true, 1),
            Err(Error::UnknownFormatCode('Z'))
        ));
        store.register("taken", &["v"], "I", true, 1).unwrap();
        assert!(matches!(
            store.register("taken", &["v"], "I", true, 1),
            Err(Error::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn scan_recovers_data_and_image_processes() {
        let (mut store, _source, dir) = test_store();
        store
            .register("imu", &["t", "x", "y"], "Iff", true, 5)
            .unwrap();
        store
            .log("imu", &Record(vec![Value::U32(1), Value::F32(0.5), Value::F32(-0.5)]))
            .unwrap();
        store.register_image().unwrap();
        store.log_image(&[1, 2, 3]).unwrap();

        // A directory without a configuration file must be ignored.
        fs::create_dir_all(store.root().join("junk")).unwrap();
        // A directory with a broken configuration is skipped with a warning.
        fs::create_dir_all(store.root().join("broken")).unwrap();
        fs::write(
            store.root().join("broken").join(PROCESS_CONFIG_FILENAME),
            b"not json",
        )
        .unwrap();

        // Fresh store over the same root, as after a reboot.
        let (clock, _source2) = Clock::manual(Duration::from_secs(1));
        let root = store.root().to_owned();
        drop(store);
        let mut recovered = DataStore::new(root, clock).unwrap();
        recovered.scan().unwrap();

        assert!(recovered.process_exists("imu"));
        assert!(recovered.process_exists("img"));
        assert!(!recovered.process_exists("junk"));
        assert!(!recovered.process_exists("broken"));

        // The recovered schema matches the persisted format string.
        assert_eq!(recovered.schema("imu").unwrap().format(), "Iff");
        assert_eq!(recovered.schema("imu").unwrap().record_size(), 12);

        // And the recovered process appends into the same directory.
        recovered
            .log("imu", &Record(vec![Value::U32(2), Value::F32(1.0), Value::F32(2.0)]))
            .unwrap();
        drop(dir);
    }

    #[test]
    fn image_stream_rotates_on_completion() {
        let (mut store, _source, _dir) = test_store();
        store.register_image().unwrap();

        store.log_image(&[0xAB; 100]).unwrap();
        let first = store.stream_of("img").current_path().unwrap().to_owned();
        store.image_completed().unwrap();
        let second = store.stream_of("img").current_path().unwrap().to_owned();
        assert_ne!(first, second);

        // The finished image is transmittable, the fresh file is not.
        let leased = store.request_tm_path("img", false).unwrap().unwrap();
        assert_eq!(leased, first);
    }

    #[test]
    fn total_size_sums_every_file_under_the_root() {
        let (mut store, _source, _dir) = test_store();
        store.register("a", &["v"], "Q", true, 10).unwrap();
        store.register("b", &["v"], "B", true, 10).unwrap();
        store.log("a", &Record(vec![Value::U64(1)])).unwrap();
        store.log("b", &Record(vec![Value::U8(1)])).unwrap();

        let configs: u64 = ["a", "b"]
            .iter()
            .map(|tag| {
                fs::metadata(store.root().join(tag).join(PROCESS_CONFIG_FILENAME))
                    .unwrap()
                    .len()
            })
            .sum();
        assert_eq!(store.total_size().unwrap(), configs + 8 + 1);
    }

    #[test]
    fn delete_all_files_empties_the_root_and_registry() {
        let (mut store, _source, _dir) = test_store();
        store.register("a", &["v"], "I", true, 10).unwrap();
        store.log("a", &Record(vec![Value::U32(1)])).unwrap();

        store.delete_all_files().unwrap();
        assert!(!store.process_exists("a"));
        assert_eq!(fs::read_dir(store.root()).unwrap().count(), 0);
        assert_eq!(store.total_size().unwrap(), 0);
    }
}
