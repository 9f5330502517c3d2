// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::schema::{Record, Schema};
use crate::store::PROCESS_CONFIG_FILENAME;
use crate::Error;

/// Image streams rotate on a fixed ceiling instead of a record count.
pub const IMG_SIZE_LIMIT: u64 = 10_000_000; // 10MB

/// The rotating-file machinery shared by record and image streams.
///
/// A stream is CLOSED when `file` is `None` and OPEN otherwise. Paths move
/// through at most one of three roles: the active write file
/// (`current_path`), a transmit lease (`excluded_paths`), or the deletion
/// queue (`delete_paths`).
#[derive(Debug)]
pub(crate) struct Stream {
    tag: String,
    dir_path: PathBuf,
    size_limit: u64,
    file: Option<File>,
    current_path: Option<PathBuf>,
    excluded_paths: Vec<PathBuf>,
    delete_paths: Vec<PathBuf>,
}

// === impl Stream ===

impl Stream {
    pub(crate) fn new(tag: &str, home_path: &Path, size_limit: u64) -> crate::Result<Stream> {
        let dir_path = home_path.join(tag);
        fs::create_dir_all(&dir_path)?;
        Ok(Self {
            tag: tag.to_owned(),
            dir_path,
            size_limit,
            file: None,
            current_path: None,
            excluded_paths: Vec::new(),
            delete_paths: Vec::new(),
        })
    }

    pub(crate) fn dir_path(&self) -> &Path {
        &self.dir_path
    }

    pub(crate) fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Appends `bytes` to the active file, rotating first if the previous
    /// write brought it to the size limit. Flushes before returning.
    pub(crate) fn append(&mut self, bytes: &[u8], now_secs: u64) -> crate::Result<()> {
        let file = self.resolve_current_file(now_secs)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    /// Runs at the head of every append: opens a fresh file when CLOSED,
    /// rotates when the active file has reached the size limit, and
    /// otherwise keeps writing where it left off.
    pub(crate) fn resolve_current_file(&mut self, now_secs: u64) -> crate::Result<&mut File> {
        if self.file.is_some() {
            let size = self.current_file_size().unwrap_or(0);
            if size >= self.size_limit {
                tracing::debug!(
                    tag = %self.tag,
                    path = ?self.current_path,
                    size,
                    "size limit reached, rotating"
                );
                self.close();
            }
        }
        if self.file.is_none() {
            let path = self.create_new_path(now_secs);
            self.file = Some(OpenOptions::new().append(true).create(true).open(&path)?);
            self.current_path = Some(path);
        }
        // Open by construction on both branches above.
        self.file.as_mut().ok_or_else(|| {
            Error::Io(std::io::Error::other("stream failed to open its active file"))
        })
    }

    pub(crate) fn close(&mut self) {
        self.file = None;
    }

    /// Picks a fresh file name `<tag>_<seconds-since-boot>.bin`. Timestamps
    /// are zero-padded so lexicographic order equals chronological order;
    /// when two rotations land in the same second the timestamp is bumped
    /// until the name is unused.
    fn create_new_path(&self, now_secs: u64) -> PathBuf {
        let mut timestamp = now_secs;
        loop {
            let path = self.dir_path.join(format!("{}_{timestamp:010}.bin", self.tag));
            if !path.exists() {
                return path;
            }
            timestamp += 1;
        }
    }

    /// Size of the active file, `None` while CLOSED or when it vanished.
    pub(crate) fn current_file_size(&self) -> Option<u64> {
        let path = self.current_path.as_ref()?;
        fs::metadata(path).ok().map(|meta| meta.len())
    }

    /// Leases a file for transmission, oldest first (newest when `latest`).
    ///
    /// The process configuration file, already-leased files and files
    /// pending deletion are never candidates. When the pick is the active
    /// write file the stream rotates first so the leased file is
    /// quiescent.
    pub(crate) fn request_tm_path(
        &mut self,
        latest: bool,
        now_secs: u64,
    ) -> crate::Result<Option<PathBuf>> {
        let mut candidates = self.data_files()?;
        if candidates.is_empty() {
            return Ok(None);
        }
        // Directory listing order is filesystem-dependent; order by the
        // timestamp embedded in the name instead.
        candidates.sort();
        let tm_path = if latest {
            candidates.pop()
        } else {
            Some(candidates.remove(0))
        };
        let Some(tm_path) = tm_path else {
            return Ok(None);
        };

        if self.current_path.as_deref() == Some(tm_path.as_path()) {
            self.close();
            self.resolve_current_file(now_secs)?;
        }

        tracing::debug!(tag = %self.tag, path = %tm_path.display(), "leased for transmission");
        self.excluded_paths.push(tm_path.clone());
        Ok(Some(tm_path))
    }

    /// Acknowledges a transmitted file: the lease is released and the file
    /// queued for deletion. Unknown paths are a logged no-op.
    pub(crate) fn notify_tm_path(&mut self, path: &Path) {
        if let Some(index) = self.excluded_paths.iter().position(|p| p == path) {
            let path = self.excluded_paths.remove(index);
            self.delete_paths.push(path);
        } else {
            tracing::warn!(
                tag = %self.tag,
                path = %path.display(),
                "transmission acknowledged for a path that was never leased"
            );
        }
    }

    /// Deletes every acknowledged file that still exists. Missing files are
    /// logged and dropped from the queue; files that fail to delete stay
    /// queued for the next pass.
    pub(crate) fn clean_up(&mut self) {
        for path in std::mem::take(&mut self.delete_paths) {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(tag = %self.tag, path = %path.display(), "deleted"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(tag = %self.tag, path = %path.display(), "file already gone");
                }
                Err(err) => {
                    tracing::warn!(tag = %self.tag, path = %path.display(), %err, "delete failed");
                    self.delete_paths.push(path);
                }
            }
        }
    }

    /// Number of data files and total directory footprint in bytes.
    pub(crate) fn storage_info(&self) -> crate::Result<(usize, u64)> {
        let files = self.data_files()?;
        let mut total = 0;
        for path in &files {
            total += fs::metadata(path)?.len();
        }
        Ok((files.len(), total))
    }

    pub(crate) fn excluded_paths(&self) -> &[PathBuf] {
        &self.excluded_paths
    }

    pub(crate) fn delete_paths(&self) -> &[PathBuf] {
        &self.delete_paths
    }

    /// All leasable data files in the stream directory.
    fn data_files(&self) -> crate::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir_path)? {
            let path = entry?.path();
            if path.file_name().is_some_and(|name| name == PROCESS_CONFIG_FILENAME) {
                continue;
            }
            if self.excluded_paths.contains(&path) || self.delete_paths.contains(&path) {
                continue;
            }
            files.push(path);
        }
        Ok(files)
    }
}

/// A typed, rotating binary-log stream.
#[derive(Debug)]
pub struct DataProcess {
    schema: Schema,
    line_limit: u64,
    persistent: bool,
    last_record: Option<Record>,
    /// `None` for non-persistent processes, which only track the latest
    /// record in memory.
    stream: Option<Stream>,
}

// === impl DataProcess ===

impl DataProcess {
    pub(crate) fn new(
        tag: &str,
        schema: Schema,
        persistent: bool,
        line_limit: u64,
        home_path: &Path,
    ) -> crate::Result<DataProcess> {
        if line_limit == 0 {
            return Err(Error::InvalidLineLimit);
        }
        let stream = if persistent {
            let record_size = u64::try_from(schema.record_size()).unwrap_or(u64::MAX);
            Some(Stream::new(tag, home_path, line_limit.saturating_mul(record_size))?)
        } else {
            None
        };
        Ok(Self {
            schema,
            line_limit,
            persistent,
            last_record: None,
            stream,
        })
    }

    /// Packs `record` against the schema and appends it to the active
    /// file. Non-persistent processes only update the latest record.
    pub(crate) fn log(&mut self, record: &Record, now_secs: u64) -> crate::Result<()> {
        let bytes = self.schema.pack(record)?;
        self.last_record = Some(record.clone());
        if let Some(stream) = &mut self.stream {
            stream.append(&bytes, now_secs)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Record> {
        self.last_record.as_ref()
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn line_limit(&self) -> u64 {
        self.line_limit
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub(crate) fn stream(&self) -> Option<&Stream> {
        self.stream.as_ref()
    }

    pub(crate) fn stream_mut(&mut self) -> Option<&mut Stream> {
        self.stream.as_mut()
    }
}

/// A rotating stream of opaque image bytes.
///
/// Same lifecycle as [`DataProcess`] but records are arbitrary byte
/// slices, the size limit is the fixed [`IMG_SIZE_LIMIT`], and
/// [`ImageProcess::image_completed`] forces a rotation so a finished image
/// becomes transmittable immediately.
#[derive(Debug)]
pub struct ImageProcess {
    stream: Stream,
}

// === impl ImageProcess ===

impl ImageProcess {
    pub(crate) fn new(tag: &str, home_path: &Path) -> crate::Result<ImageProcess> {
        Ok(Self {
            stream: Stream::new(tag, home_path, IMG_SIZE_LIMIT)?,
        })
    }

    pub(crate) fn log(&mut self, data: &[u8], now_secs: u64) -> crate::Result<()> {
        self.stream.append(data, now_secs)
    }

    /// Marks the in-flight image as finished: the active file is closed
    /// and a fresh one opened for the next image.
    pub(crate) fn image_completed(&mut self, now_secs: u64) -> crate::Result<()> {
        self.stream.close();
        self.stream.resolve_current_file(now_secs)?;
        Ok(())
    }

    pub(crate) fn stream(&self) -> &Stream {
        &self.stream
    }

    pub(crate) fn stream_mut(&mut self) -> &mut Stream {
        &mut self.stream
    }
}
