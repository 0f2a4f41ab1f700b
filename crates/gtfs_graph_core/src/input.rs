use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::GraphError;

/// Named byte streams a package is read from. Each entry is read whole and
/// released before the next one is requested.
pub trait FeedSource {
    fn entry_names(&mut self) -> Result<Vec<String>, GraphError>;

    /// `Ok(None)` when the package has no entry called `name`.
    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, GraphError>;
}

/// Destination of a saved package.
pub trait FeedSink {
    fn write_entry(&mut self, name: &str, contents: &[u8]) -> Result<(), GraphError>;

    fn finish(&mut self) -> Result<(), GraphError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

impl Compression {
    fn method(self) -> CompressionMethod {
        match self {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        }
    }
}

fn io_error(path: impl Into<PathBuf>, source: io::Error) -> GraphError {
    GraphError::Io {
        path: path.into(),
        source,
    }
}

pub struct ZipFeedReader<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl ZipFeedReader<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| io_error(path, source))?;
        Self::new(file)
    }
}

impl<R: Read + Seek> ZipFeedReader<R> {
    pub fn new(reader: R) -> Result<Self, GraphError> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }
}

impl<R: Read + Seek> FeedSource for ZipFeedReader<R> {
    fn entry_names(&mut self) -> Result<Vec<String>, GraphError> {
        Ok(self
            .archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(str::to_string)
            .collect())
    }

    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, GraphError> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let mut contents = Vec::with_capacity(entry_capacity(file.size()));
        file.read_to_end(&mut contents)
            .map_err(|source| io_error(name, source))?;
        Ok(Some(contents))
    }
}

/// Upper bound on the buffer reserved up front for one archive entry.
const MAX_ENTRY_PREALLOCATION: u64 = 16 * 1024 * 1024;

// The size recorded in the archive is not trusted beyond the bound; larger
// entries grow the buffer as they are read.
fn entry_capacity(declared_size: u64) -> usize {
    usize::try_from(declared_size.min(MAX_ENTRY_PREALLOCATION)).unwrap_or(0)
}

pub struct ZipFeedWriter<W: Write + Seek> {
    writer: ZipWriter<W>,
    compression: Compression,
    finished: Option<W>,
}

impl ZipFeedWriter<File> {
    pub fn create(path: impl AsRef<Path>, compression: Compression) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| io_error(path, source))?;
        Ok(Self::new(file, compression))
    }
}

impl<W: Write + Seek> ZipFeedWriter<W> {
    pub fn new(writer: W, compression: Compression) -> Self {
        Self {
            writer: ZipWriter::new(writer),
            compression,
            finished: None,
        }
    }

    /// The underlying writer, once [`FeedSink::finish`] has run.
    pub fn into_inner(self) -> Option<W> {
        self.finished
    }
}

impl<W: Write + Seek> FeedSink for ZipFeedWriter<W> {
    fn write_entry(&mut self, name: &str, contents: &[u8]) -> Result<(), GraphError> {
        let options = FileOptions::default().compression_method(self.compression.method());
        self.writer.start_file(name, options)?;
        self.writer
            .write_all(contents)
            .map_err(|source| io_error(name, source))
    }

    fn finish(&mut self) -> Result<(), GraphError> {
        if self.finished.is_none() {
            self.finished = Some(self.writer.finish()?);
        }
        Ok(())
    }
}

/// A package unpacked into a plain directory, one file per entry.
#[derive(Debug, Clone)]
pub struct DirectoryFeed {
    root: PathBuf,
}

impl DirectoryFeed {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FeedSource for DirectoryFeed {
    fn entry_names(&mut self) -> Result<Vec<String>, GraphError> {
        let entries = fs::read_dir(&self.root).map_err(|source| io_error(&self.root, source))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_error(&self.root, source))?;
            let is_file = entry
                .file_type()
                .map_err(|source| io_error(entry.path(), source))?
                .is_file();
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, GraphError> {
        let path = self.root.join(name);
        match fs::read(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(io_error(path, source)),
        }
    }
}

impl FeedSink for DirectoryFeed {
    fn write_entry(&mut self, name: &str, contents: &[u8]) -> Result<(), GraphError> {
        fs::create_dir_all(&self.root).map_err(|source| io_error(&self.root, source))?;
        let path = self.root.join(name);
        fs::write(&path, contents).map_err(|source| io_error(path, source))
    }
}

/// An in-memory package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFeed {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), contents.into());
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.entries.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FeedSource for MemoryFeed {
    fn entry_names(&mut self) -> Result<Vec<String>, GraphError> {
        Ok(self.entries.keys().cloned().collect())
    }

    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, GraphError> {
        Ok(self.entries.get(name).cloned())
    }
}

impl FeedSink for MemoryFeed {
    fn write_entry(&mut self, name: &str, contents: &[u8]) -> Result<(), GraphError> {
        self.entries.insert(name.to_string(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}_{}", prefix, std::process::id(), nanos))
    }

    #[test]
    fn zip_entries_survive_a_round_trip() {
        for compression in [Compression::Deflated, Compression::Stored] {
            let mut writer = ZipFeedWriter::new(Cursor::new(Vec::new()), compression);
            writer.write_entry("agency.txt", b"agency_id\n1\n").unwrap();
            writer.write_entry("notes.bin", &[0, 159, 146, 150]).unwrap();
            writer.finish().unwrap();
            writer.finish().unwrap();
            let bytes = writer.into_inner().unwrap().into_inner();

            let mut reader = ZipFeedReader::new(Cursor::new(bytes)).unwrap();
            let mut names = reader.entry_names().unwrap();
            names.sort();
            assert_eq!(names, vec!["agency.txt", "notes.bin"]);
            assert_eq!(
                reader.read_entry("notes.bin").unwrap().unwrap(),
                vec![0, 159, 146, 150]
            );
            assert!(reader.read_entry("stops.txt").unwrap().is_none());
        }
    }

    #[test]
    fn directory_feed_lists_files_only() {
        let dir = temp_dir("gtfs_graph_directory");
        let mut feed = DirectoryFeed::new(&dir);
        feed.write_entry("stops.txt", b"stop_id\n").unwrap();
        feed.write_entry("agency.txt", b"agency_id\n").unwrap();
        fs::create_dir_all(dir.join("nested")).unwrap();

        assert_eq!(feed.entry_names().unwrap(), vec!["agency.txt", "stops.txt"]);
        assert_eq!(feed.read_entry("stops.txt").unwrap().unwrap(), b"stop_id\n");
        assert!(feed.read_entry("trips.txt").unwrap().is_none());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_zip_path_is_an_io_error() {
        let path = temp_dir("gtfs_graph_missing").join("feed.zip");
        assert!(matches!(
            ZipFeedReader::open(&path),
            Err(GraphError::Io { .. })
        ));
    }

    #[test]
    fn declared_entry_size_is_bounded() {
        assert_eq!(entry_capacity(512), 512);
        assert_eq!(
            entry_capacity(u64::MAX),
            MAX_ENTRY_PREALLOCATION as usize
        );
    }
}
