// Measurement container file: read, stage changes, rewrite on flush

use crate::core::compression::{compress, decompress};
use crate::core::constants::*;
use crate::core::error::{Result, RoarError};
use crate::core::format::*;
use crate::utils::conf_helper::cached_config;
use std::cell::RefCell;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

// Smallest index entry: empty name (u16 length) + block offset (u64)
const MIN_INDEX_ENTRY_SIZE: u64 = 2 + 8;

/// How a container is opened. Mirrors the usual `r`, `r+`, `a`, `w` modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Read only, file must exist.
    #[default]
    Read,
    /// Read and write, file must exist.
    ReadWrite,
    /// Read and write, created if missing.
    Append,
    /// Create empty, replacing any existing file on flush.
    Create,
}

impl OpenMode {
    pub fn is_writable(self) -> bool {
        !matches!(self, OpenMode::Read)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::ReadWrite => "r+",
            OpenMode::Append => "a",
            OpenMode::Create => "w",
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpenMode {
    type Err = RoarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(OpenMode::Read),
            "r+" => Ok(OpenMode::ReadWrite),
            "a" => Ok(OpenMode::Append),
            "w" => Ok(OpenMode::Create),
            other => Err(RoarError::Config(format!("unknown open mode '{other}'"))),
        }
    }
}

/// An open measurement container.
///
/// Channel descriptors are loaded on open, payloads are read on demand.
/// Mutations are staged and written by [`MeasurementFile::flush`] or
/// [`MeasurementFile::close`]; a writable handle dropped without closing is
/// flushed best-effort.
pub struct MeasurementFile {
    path: PathBuf,
    mode: OpenMode,
    file: RefCell<Option<BufReader<File>>>,
    header: FileHeader,
    channels: Vec<ChannelInfo>,
    dirty: bool,
    closed: bool,
}

impl fmt::Debug for MeasurementFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasurementFile")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("channels", &self.channel_paths())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl MeasurementFile {
    /// Open `path` in `mode`. New containers (`Create`, or `Append` on a
    /// missing file) compress with the configured compression.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        match mode {
            OpenMode::Read => Self::load(path, mode, File::open(path)?),
            OpenMode::ReadWrite => {
                let file = OpenOptions::new().read(true).write(true).open(path)?;
                Self::load(path, mode, file)
            }
            OpenMode::Append if path.exists() => {
                let file = OpenOptions::new().read(true).write(true).open(path)?;
                Self::load(path, mode, file)
            }
            OpenMode::Append | OpenMode::Create => {
                Ok(Self::empty(path, mode, cached_config().compression))
            }
        }
    }

    /// Start a new, empty container whose payloads use `compression`.
    pub fn create<P: AsRef<Path>>(path: P, compression: CompressionType) -> Self {
        Self::empty(path.as_ref(), OpenMode::Create, compression)
    }

    fn empty(path: &Path, mode: OpenMode, compression: CompressionType) -> Self {
        debug!("New container {} ({})", path.display(), mode);
        Self {
            path: path.to_path_buf(),
            mode,
            file: RefCell::new(None),
            header: FileHeader {
                version: FORMAT_VERSION,
                compression: compression as u8,
                created: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
            },
            channels: Vec::new(),
            dirty: true,
            closed: false,
        }
    }

    fn load(path: &Path, mode: OpenMode, file: File) -> Result<Self> {
        let file_len = file.metadata()?.len();
        let mut file = BufReader::new(file);
        let header = Self::read_header(&mut file)?;
        let channels = Self::read_footer_and_index(&mut file, file_len)?;
        debug!(
            "Opened {} ({}) with {} channels",
            path.display(),
            mode,
            channels.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            mode,
            file: RefCell::new(Some(file)),
            header,
            channels,
            dirty: false,
            closed: false,
        })
    }

    fn read_header<R: Read>(file: &mut R) -> Result<FileHeader> {
        let mut prefix = [0u8; HEADER_SIZE];
        file.read_exact(&mut prefix)?;

        let magic = &prefix[0..4];
        if magic != MAGIC {
            return Err(RoarError::InvalidMagic {
                expected: MAGIC.to_vec(),
                got: magic.to_vec(),
            });
        }

        let version = prefix[4];
        if version != FORMAT_VERSION {
            return Err(RoarError::UnsupportedVersion(version));
        }
        let compression = prefix[5];
        if CompressionType::from_u8(compression).is_none() {
            return Err(RoarError::UnsupportedCompression(compression));
        }
        let mut created = [0u8; 8];
        created.copy_from_slice(&prefix[6..14]);

        Ok(FileHeader {
            version,
            compression,
            created: f64::from_le_bytes(created),
        })
    }

    fn read_footer_and_index<R: Read + Seek>(
        file: &mut R,
        file_len: u64,
    ) -> Result<Vec<ChannelInfo>> {
        if file_len < (HEADER_SIZE + FOOTER_SIZE) as u64 {
            return Err(RoarError::CorruptedData(format!(
                "file of {} bytes cannot hold header and footer",
                file_len
            )));
        }
        let footer_start = file_len - FOOTER_SIZE as u64;
        file.seek(SeekFrom::Start(footer_start))?;

        let mut footer_magic = [0u8; 4];
        file.read_exact(&mut footer_magic)?;
        if &footer_magic != FOOTER_MAGIC {
            return Err(RoarError::InvalidMagic {
                expected: FOOTER_MAGIC.to_vec(),
                got: footer_magic.to_vec(),
            });
        }
        let index_offset = read_u64(file)?;
        // index magic + entry count
        if index_offset < HEADER_SIZE as u64 || index_offset.saturating_add(8) > footer_start {
            return Err(RoarError::CorruptedData(format!(
                "index offset {} outside the file",
                index_offset
            )));
        }

        file.seek(SeekFrom::Start(index_offset))?;
        let mut index_magic = [0u8; 4];
        file.read_exact(&mut index_magic)?;
        if &index_magic != INDEX_MAGIC {
            return Err(RoarError::InvalidMagic {
                expected: INDEX_MAGIC.to_vec(),
                got: index_magic.to_vec(),
            });
        }

        let entry_count = read_u32(file)?;
        if u64::from(entry_count) * MIN_INDEX_ENTRY_SIZE > footer_start - (index_offset + 8) {
            return Err(RoarError::CorruptedData(format!(
                "index declares {} entries, more than fit before the footer",
                entry_count
            )));
        }
        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let path = read_string(file)?;
            let offset = read_u64(file)?;
            entries.push((path, offset));
        }

        let mut channels = Vec::with_capacity(entries.len());
        for (path, offset) in entries {
            let info = Self::read_block_descriptor(file, offset, index_offset)?;
            if info.path != path {
                return Err(RoarError::CorruptedData(format!(
                    "index names '{}' but block at {} is '{}'",
                    path, offset, info.path
                )));
            }
            channels.push(info);
        }
        Ok(channels)
    }

    /// Block at `offset`; its payload must end before `data_end`.
    fn read_block_descriptor<R: Read + Seek>(
        file: &mut R,
        offset: u64,
        data_end: u64,
    ) -> Result<ChannelInfo> {
        file.seek(SeekFrom::Start(offset))?;

        let mut chunk_magic = [0u8; 4];
        file.read_exact(&mut chunk_magic)?;
        if &chunk_magic != CHUNK_MAGIC {
            return Err(RoarError::CorruptedData(format!(
                "Invalid chunk magic at offset {}",
                offset
            )));
        }

        let path = read_string(file)?;
        let dtype_code = read_u8(file)?;
        let dtype = DataType::from_u8(dtype_code).ok_or(RoarError::UnsupportedDataType(dtype_code))?;

        let ndim = read_u8(file)?;
        let mut shape = Vec::with_capacity(ndim as usize);
        for _ in 0..ndim {
            let dim = read_u64(file)?;
            let dim = usize::try_from(dim).map_err(|_| {
                RoarError::CorruptedData(format!("channel '{}' dimension {} too large", path, dim))
            })?;
            shape.push(dim);
        }

        let attr_count = read_u16(file)?;
        let mut attrs = Attributes::new();
        for _ in 0..attr_count {
            let name = read_string(file)?;
            let value = read_attr(file)?;
            attrs.insert(name, value);
        }

        let raw_len = read_u64(file)?;
        let comp_len = read_u64(file)?;
        let expected = element_count(&shape)
            .and_then(|n| n.checked_mul(dtype.size()))
            .ok_or_else(|| {
                RoarError::CorruptedData(format!("channel '{}' shape {:?} overflows", path, shape))
            })?;
        if raw_len != expected as u64 {
            return Err(RoarError::CorruptedData(format!(
                "channel '{}' declares {} raw bytes, shape {:?} needs {}",
                path, raw_len, shape, expected
            )));
        }
        let payload_offset = file.stream_position()?;
        if !payload_offset
            .checked_add(comp_len)
            .is_some_and(|end| end <= data_end)
        {
            return Err(RoarError::CorruptedData(format!(
                "channel '{}' payload of {} bytes runs past its block",
                path, comp_len
            )));
        }

        Ok(ChannelInfo {
            path,
            dtype,
            shape,
            attrs,
            payload: PayloadSource::OnDisk {
                offset: payload_offset,
                raw_len,
                comp_len,
            },
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_writable(&self) -> bool {
        self.mode.is_writable()
    }

    pub fn compression(&self) -> CompressionType {
        CompressionType::from_u8(self.header.compression).unwrap_or_default()
    }

    /// Names of top-level channels, in file order.
    pub fn keys(&self) -> Vec<&str> {
        self.channels
            .iter()
            .map(|c| c.path.as_str())
            .filter(|p| !p.contains(PATH_SEPARATOR))
            .collect()
    }

    /// Every channel path, nested ones included, in file order.
    pub fn channel_paths(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.path.as_str()).collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.position(path).is_some()
    }

    pub fn info(&self, path: &str) -> Option<&ChannelInfo> {
        self.position(path).map(|i| &self.channels[i])
    }

    pub fn attrs(&self, path: &str) -> Option<&Attributes> {
        self.info(path).map(|c| &c.attrs)
    }

    fn position(&self, path: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.path == path)
    }

    /// Read the full payload of a channel.
    pub fn read(&self, path: &str) -> Result<Dataset> {
        let info = self
            .info(path)
            .ok_or_else(|| RoarError::ChannelNotFound(path.to_string()))?;

        let data = match &info.payload {
            PayloadSource::Staged(data) => data.clone(),
            PayloadSource::OnDisk { offset, raw_len, comp_len } => {
                let compressed = self.read_block_bytes(*offset, *comp_len)?;
                let raw = decompress(&compressed, self.compression())?;
                if raw.len() as u64 != *raw_len {
                    return Err(RoarError::CorruptedData(format!(
                        "Expected {} bytes, got {}",
                        raw_len,
                        raw.len()
                    )));
                }
                ChannelData::from_le_bytes(info.dtype, &raw)?
            }
        };
        Dataset::new(info.shape.clone(), data)
    }

    fn read_block_bytes(&self, offset: u64, len: u64) -> Result<Vec<u8>> {
        let mut guard = self.file.borrow_mut();
        let file = guard
            .as_mut()
            .ok_or_else(|| RoarError::CorruptedData("payload offset without backing file".into()))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(RoarError::ReadOnly(self.path.clone()))
        }
    }

    /// Add a new channel.
    pub fn insert(&mut self, path: &str, dataset: Dataset, attrs: Attributes) -> Result<()> {
        self.ensure_writable()?;
        validate_channel_path(path)?;
        if self.contains(path) {
            return Err(RoarError::ChannelExists(path.to_string()));
        }

        let shape = dataset.shape().to_vec();
        let dtype = dataset.dtype();
        self.channels.push(ChannelInfo {
            path: path.to_string(),
            dtype,
            shape,
            attrs,
            payload: PayloadSource::Staged(dataset.into_data()),
        });
        self.dirty = true;
        Ok(())
    }

    /// Copy a channel, payload and attributes, under a new name.
    pub fn copy(&mut self, src: &str, dst: &str) -> Result<()> {
        self.ensure_writable()?;
        validate_channel_path(dst)?;
        let idx = self
            .position(src)
            .ok_or_else(|| RoarError::ChannelNotFound(src.to_string()))?;
        if self.contains(dst) {
            return Err(RoarError::ChannelExists(dst.to_string()));
        }

        let mut copied = self.channels[idx].clone();
        copied.path = dst.to_string();
        self.channels.push(copied);
        self.dirty = true;
        Ok(())
    }

    /// Remove a channel and return its descriptor.
    pub fn remove(&mut self, path: &str) -> Result<ChannelInfo> {
        self.ensure_writable()?;
        let idx = self
            .position(path)
            .ok_or_else(|| RoarError::ChannelNotFound(path.to_string()))?;
        self.dirty = true;
        Ok(self.channels.remove(idx))
    }

    /// Move a channel to a new name: copy, then remove the original.
    pub fn rename(&mut self, src: &str, dst: &str) -> Result<()> {
        self.copy(src, dst)?;
        self.remove(src)?;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write staged changes. A no-op for read-only or unchanged handles.
    pub fn flush(&mut self) -> Result<()> {
        if !self.is_writable() || !self.dirty {
            return Ok(());
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        // removed on drop unless persisted
        let mut tmp = NamedTempFile::new_in(dir)?;
        if let Some(meta) = fs::metadata(&self.path).ok().filter(|m| m.is_file()) {
            tmp.as_file().set_permissions(meta.permissions())?;
        }
        self.write_to(tmp.as_file_mut())?;
        tmp.persist(&self.path).map_err(|e| RoarError::Io(e.error))?;

        // the old reader still serves the replaced file until the reload succeeds
        let reopened = Self::load(&self.path, self.mode, File::open(&self.path)?)?;
        self.header = reopened.header.clone();
        self.channels = reopened.channels.clone();
        self.file.replace(reopened.file.replace(None));
        self.dirty = false;
        debug!("Flushed {} ({} channels)", self.path.display(), self.channels.len());
        Ok(())
    }

    fn write_to(&self, target: &mut File) -> Result<()> {
        let compression = self.compression();
        let mut out = BufWriter::new(target);

        out.write_all(MAGIC)?;
        out.write_all(&[self.header.version, self.header.compression])?;
        out.write_all(&self.header.created.to_le_bytes())?;

        let mut index = Vec::with_capacity(self.channels.len());
        for info in &self.channels {
            index.push((info.path.as_str(), out.stream_position()?));

            let (raw_len, block) = match &info.payload {
                PayloadSource::OnDisk { offset, raw_len, comp_len } => {
                    (*raw_len, self.read_block_bytes(*offset, *comp_len)?)
                }
                PayloadSource::Staged(data) => {
                    let raw = data.to_le_bytes();
                    (raw.len() as u64, compress(&raw, compression)?)
                }
            };

            out.write_all(CHUNK_MAGIC)?;
            write_string(&mut out, &info.path)?;
            out.write_all(&[info.dtype as u8])?;
            let ndim = u8::try_from(info.shape.len()).map_err(|_| {
                RoarError::CorruptedData(format!("channel '{}' has too many dimensions", info.path))
            })?;
            out.write_all(&[ndim])?;
            for dim in &info.shape {
                out.write_all(&(*dim as u64).to_le_bytes())?;
            }

            let attr_count = u16::try_from(info.attrs.len()).map_err(|_| {
                RoarError::CorruptedData(format!("channel '{}' has too many attributes", info.path))
            })?;
            out.write_all(&attr_count.to_le_bytes())?;
            for (name, value) in &info.attrs {
                write_string(&mut out, name)?;
                write_attr(&mut out, value)?;
            }

            out.write_all(&raw_len.to_le_bytes())?;
            out.write_all(&(block.len() as u64).to_le_bytes())?;
            out.write_all(&block)?;
        }

        let index_offset = out.stream_position()?;
        out.write_all(INDEX_MAGIC)?;
        out.write_all(&(index.len() as u32).to_le_bytes())?;
        for (path, offset) in index {
            write_string(&mut out, path)?;
            out.write_all(&offset.to_le_bytes())?;
        }

        out.write_all(FOOTER_MAGIC)?;
        out.write_all(&index_offset.to_le_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// Flush and release the handle.
    pub fn close(mut self) -> Result<()> {
        let result = self.flush();
        self.closed = true;
        result
    }
}

impl Drop for MeasurementFile {
    fn drop(&mut self) {
        if self.closed || !self.is_writable() || !self.dirty {
            return;
        }
        if let Err(e) = self.flush() {
            warn!("Failed to flush {} on drop: {}", self.path.display(), e);
        }
    }
}

fn validate_channel_path(path: &str) -> Result<()> {
    if path.is_empty() || path.split(PATH_SEPARATOR).any(str::is_empty) {
        return Err(RoarError::CorruptedData(format!(
            "invalid channel path '{}'",
            path
        )));
    }
    Ok(())
}

fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_i64<R: Read>(r: &mut R) -> Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = read_u16(r)? as usize;
    let mut str_buf = vec![0u8; len];
    r.read_exact(&mut str_buf)?;
    String::from_utf8(str_buf).map_err(|e| e.into())
}

fn write_string<W: Write>(w: &mut W, s: &str) -> Result<()> {
    let len = u16::try_from(s.len())
        .map_err(|_| RoarError::CorruptedData(format!("string of {} bytes too long", s.len())))?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_attr<R: Read>(r: &mut R) -> Result<AttrValue> {
    let tag = read_u8(r)?;
    let value = match tag {
        ATTR_INT => AttrValue::Int(read_i64(r)?),
        ATTR_FLOAT => AttrValue::Float(read_f64(r)?),
        ATTR_TEXT => AttrValue::Text(read_string(r)?),
        ATTR_INT_ARRAY => {
            let n = read_u32(r)?;
            // grows as values arrive, a bogus count stops at EOF
            let mut values = Vec::new();
            for _ in 0..n {
                values.push(read_i64(r)?);
            }
            AttrValue::IntArray(values)
        }
        ATTR_FLOAT_ARRAY => {
            let n = read_u32(r)?;
            let mut values = Vec::new();
            for _ in 0..n {
                values.push(read_f64(r)?);
            }
            AttrValue::FloatArray(values)
        }
        other => {
            return Err(RoarError::CorruptedData(format!(
                "unknown attribute tag {}",
                other
            )))
        }
    };
    Ok(value)
}

fn write_attr<W: Write>(w: &mut W, value: &AttrValue) -> Result<()> {
    match value {
        AttrValue::Int(v) => {
            w.write_all(&[ATTR_INT])?;
            w.write_all(&v.to_le_bytes())?;
        }
        AttrValue::Float(v) => {
            w.write_all(&[ATTR_FLOAT])?;
            w.write_all(&v.to_le_bytes())?;
        }
        AttrValue::Text(v) => {
            w.write_all(&[ATTR_TEXT])?;
            write_string(w, v)?;
        }
        AttrValue::IntArray(values) => {
            w.write_all(&[ATTR_INT_ARRAY])?;
            w.write_all(&(values.len() as u32).to_le_bytes())?;
            for v in values {
                w.write_all(&v.to_le_bytes())?;
            }
        }
        AttrValue::FloatArray(values) => {
            w.write_all(&[ATTR_FLOAT_ARRAY])?;
            w.write_all(&(values.len() as u32).to_le_bytes())?;
            for v in values {
                w.write_all(&v.to_le_bytes())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample_attrs(rate: f64) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert(SAMPLE_RATE_ATTR.to_string(), AttrValue::Float(rate));
        attrs.insert("unit".to_string(), AttrValue::from("Pa"));
        attrs
    }

    fn write_fixture(path: &Path) {
        let mut file = MeasurementFile::open(path, OpenMode::Create).unwrap();
        file.insert(
            "Mic1",
            Dataset::vector(ChannelData::F32(vec![0.5, -0.25, 1.0])),
            sample_attrs(48_000.0),
        )
        .unwrap();
        file.insert(
            "raw/Accel",
            Dataset::new(vec![2, 2], ChannelData::I16(vec![1, 2, 3, 4])).unwrap(),
            Attributes::new(),
        )
        .unwrap();
        file.close().unwrap();
    }

    #[test]
    fn test_write_then_open_read_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mcf");
        write_fixture(&path);

        let file = MeasurementFile::open(&path, OpenMode::Read).unwrap();
        assert_eq!(file.keys(), vec!["Mic1"]);
        assert_eq!(file.channel_paths(), vec!["Mic1", "raw/Accel"]);
        assert_eq!(file.attrs("Mic1").unwrap(), &sample_attrs(48_000.0));

        let mic = file.read("Mic1").unwrap();
        assert_eq!(mic.data(), &ChannelData::F32(vec![0.5, -0.25, 1.0]));

        let accel = file.read("raw/Accel").unwrap();
        assert_eq!(accel.shape(), &[2, 2]);
        assert_eq!(accel.data(), &ChannelData::I16(vec![1, 2, 3, 4]));
    }

    #[test]
    fn test_read_only_handle_rejects_mutation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mcf");
        write_fixture(&path);

        let mut file = MeasurementFile::open(&path, OpenMode::Read).unwrap();
        assert!(matches!(file.rename("Mic1", "Mic2"), Err(RoarError::ReadOnly(_))));
        assert!(matches!(file.remove("Mic1"), Err(RoarError::ReadOnly(_))));
        assert!(file.contains("Mic1"));
    }

    #[test]
    fn test_rename_preserves_payload_and_attrs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mcf");
        write_fixture(&path);

        let mut file = MeasurementFile::open(&path, OpenMode::ReadWrite).unwrap();
        file.rename("Mic1", "Microphone").unwrap();
        file.close().unwrap();

        let file = MeasurementFile::open(&path, OpenMode::Read).unwrap();
        assert!(!file.contains("Mic1"));
        assert_eq!(file.attrs("Microphone").unwrap(), &sample_attrs(48_000.0));
        assert_eq!(
            file.read("Microphone").unwrap().data(),
            &ChannelData::F32(vec![0.5, -0.25, 1.0])
        );
    }

    #[test]
    fn test_copy_onto_existing_channel_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mcf");
        write_fixture(&path);

        let mut file = MeasurementFile::open(&path, OpenMode::ReadWrite).unwrap();
        file.copy("Mic1", "Mic2").unwrap();
        assert!(matches!(file.copy("Mic1", "Mic2"), Err(RoarError::ChannelExists(_))));
        assert!(matches!(file.copy("Nope", "Mic3"), Err(RoarError::ChannelNotFound(_))));
    }

    #[test]
    fn test_drop_flushes_writable_handle() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mcf");
        write_fixture(&path);

        {
            let mut file = MeasurementFile::open(&path, OpenMode::ReadWrite).unwrap();
            file.remove("raw/Accel").unwrap();
        }

        let file = MeasurementFile::open(&path, OpenMode::Read).unwrap();
        assert_eq!(file.channel_paths(), vec!["Mic1"]);
    }

    #[test]
    fn test_append_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.mcf");

        let file = MeasurementFile::open(&path, OpenMode::Append).unwrap();
        file.close().unwrap();

        let file = MeasurementFile::open(&path, OpenMode::Read).unwrap();
        assert!(file.keys().is_empty());
    }

    #[test]
    fn test_read_write_requires_existing_file() {
        let dir = tempdir().unwrap();
        let err = MeasurementFile::open(dir.path().join("missing.mcf"), OpenMode::ReadWrite)
            .unwrap_err();
        assert!(matches!(err, RoarError::Io(_)));
    }

    #[test]
    fn test_invalid_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bogus.mcf");
        fs::write(&path, b"PLTX\x01\x00garbage-garbage-garbage").unwrap();

        let err = MeasurementFile::open(&path, OpenMode::Read).unwrap_err();
        assert!(matches!(err, RoarError::InvalidMagic { .. }));
    }

    #[test]
    fn test_unchanged_payload_bytes_survive_rewrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mcf");
        write_fixture(&path);
        let before = fs::read(&path).unwrap();

        let mut file = MeasurementFile::open(&path, OpenMode::ReadWrite).unwrap();
        file.rename("raw/Accel", "raw/Acc").unwrap();
        file.rename("raw/Acc", "raw/Accel").unwrap();
        file.close().unwrap();

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_failed_flush_keeps_handle_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.mcf");
        write_fixture(&path);

        let mut file = MeasurementFile::open(&path, OpenMode::ReadWrite).unwrap();
        file.rename("Mic1", "Microphone").unwrap();

        // a directory in the way makes the final replace fail
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        assert!(matches!(file.flush(), Err(RoarError::Io(_))));

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("run.mcf")]);

        assert!(file.is_dirty());
        assert_eq!(
            file.read("Microphone").unwrap().data(),
            &ChannelData::F32(vec![0.5, -0.25, 1.0])
        );
        assert_eq!(file.read("raw/Accel").unwrap().shape(), &[2, 2]);

        fs::remove_dir(&path).unwrap();
        file.close().unwrap();
        let file = MeasurementFile::open(&path, OpenMode::Read).unwrap();
        assert_eq!(file.channel_paths(), vec!["raw/Accel", "Microphone"]);
    }

    #[test]
    fn test_create_uses_requested_compression() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.mcf");

        let mut file = MeasurementFile::create(&path, CompressionType::None);
        file.insert(
            "Mic1",
            Dataset::vector(ChannelData::F64(vec![1.0, 2.0])),
            Attributes::new(),
        )
        .unwrap();
        file.close().unwrap();

        let file = MeasurementFile::open(&path, OpenMode::Read).unwrap();
        assert_eq!(file.compression(), CompressionType::None);
        assert_eq!(file.read("Mic1").unwrap().data(), &ChannelData::F64(vec![1.0, 2.0]));
    }

    /// Hand-assembled container holding one uncompressed F64 channel `Mic`.
    /// Returns the bytes and the index offset.
    fn raw_container(dims: &[u64], raw_len: u64, comp_len: u64) -> (Vec<u8>, usize) {
        let mut buf = Vec::new();
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&[FORMAT_VERSION, CompressionType::None as u8]);
        buf.extend_from_slice(&0f64.to_le_bytes());

        let block_offset = buf.len() as u64;
        buf.extend_from_slice(CHUNK_MAGIC);
        write_string(&mut buf, "Mic").unwrap();
        buf.push(DataType::F64 as u8);
        buf.push(dims.len() as u8);
        for dim in dims {
            buf.extend_from_slice(&dim.to_le_bytes());
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&raw_len.to_le_bytes());
        buf.extend_from_slice(&comp_len.to_le_bytes());

        let index_offset = buf.len();
        buf.extend_from_slice(INDEX_MAGIC);
        buf.extend_from_slice(&1u32.to_le_bytes());
        write_string(&mut buf, "Mic").unwrap();
        buf.extend_from_slice(&block_offset.to_le_bytes());

        buf.extend_from_slice(FOOTER_MAGIC);
        buf.extend_from_slice(&(index_offset as u64).to_le_bytes());
        (buf, index_offset)
    }

    fn open_bytes(bytes: &[u8]) -> Result<MeasurementFile> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.mcf");
        fs::write(&path, bytes).unwrap();
        MeasurementFile::open(&path, OpenMode::Read)
    }

    #[test]
    fn test_hand_built_empty_channel_opens() {
        let (bytes, _) = raw_container(&[0], 0, 0);
        let file = open_bytes(&bytes).unwrap();
        assert_eq!(file.read("Mic").unwrap().data(), &ChannelData::F64(vec![]));
    }

    #[test]
    fn test_overflowing_shape_is_corrupt() {
        let (bytes, _) = raw_container(&[1 << 40, 1 << 40], 0, 0);
        assert!(matches!(open_bytes(&bytes), Err(RoarError::CorruptedData(_))));
    }

    #[test]
    fn test_payload_past_end_is_corrupt() {
        let (bytes, _) = raw_container(&[1 << 40], 8 << 40, 8 << 40);
        assert!(matches!(open_bytes(&bytes), Err(RoarError::CorruptedData(_))));
    }

    #[test]
    fn test_bogus_index_is_corrupt() {
        let (mut bytes, index_offset) = raw_container(&[0], 0, 0);
        let count_at = index_offset + 4;
        bytes[count_at..count_at + 4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(open_bytes(&bytes), Err(RoarError::CorruptedData(_))));

        let (mut bytes, _) = raw_container(&[0], 0, 0);
        let len = bytes.len();
        bytes[len - 8..].copy_from_slice(&u64::MAX.to_le_bytes());
        assert!(matches!(open_bytes(&bytes), Err(RoarError::CorruptedData(_))));

        assert!(matches!(open_bytes(b"MCF1\x01\x00"), Err(RoarError::Io(_))));
    }

    #[test]
    fn test_open_mode_strings() {
        assert_eq!("r+".parse::<OpenMode>().unwrap(), OpenMode::ReadWrite);
        assert_eq!(OpenMode::Append.to_string(), "a");
        assert!(!OpenMode::Read.is_writable());
        assert!("x".parse::<OpenMode>().is_err());
    }
}
