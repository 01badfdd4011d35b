use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::teds_common_rs::record::core::exceptions::TransportError;

/// Page-oriented memory of a sensor identification chip.
#[cfg_attr(test, mockall::automock)]
pub trait MemoryBank {
    fn description(&self) -> String;

    /// Bank size in bytes.
    fn size(&self) -> usize;

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), TransportError>;

    fn read(&mut self, offset: usize, len: usize) -> Result<Vec<u8>, TransportError>;
}

fn check_range(offset: usize, len: usize, bank_size: usize) -> Result<(), TransportError> {
    match offset.checked_add(len) {
        Some(end) if end <= bank_size => Ok(()),
        _ => Err(TransportError::OutOfBounds { offset, len, bank_size }),
    }
}

/// Bank held in memory. Used for dry runs and in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryBank {
    data: Vec<u8>,
}

impl InMemoryBank {
    pub fn new(size: usize) -> Self {
        Self { data: vec![0u8; size] }
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl MemoryBank for InMemoryBank {
    fn description(&self) -> String {
        format!("main memory (in-memory, {} bytes)", self.data.len())
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), TransportError> {
        check_range(offset, data.len(), self.data.len())?;
        self.data[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&mut self, offset: usize, len: usize) -> Result<Vec<u8>, TransportError> {
        check_range(offset, len, self.data.len())?;
        Ok(self.data[offset..offset + len].to_vec())
    }
}

/// Bank image stored in a file of fixed size.
pub struct FileBank {
    path: PathBuf,
    file: File,
    size: usize,
}

impl FileBank {
    /// Opens the image, creating a zero-filled one of `size` bytes if missing.
    pub fn open<P: AsRef<Path>>(path: P, size: usize) -> Result<Self, TransportError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().read(true).write(true).create(true).open(&path)?;
        let current = file.metadata()?.len();
        if current < size as u64 {
            file.set_len(size as u64)?;
        }
        Ok(Self { path, file, size })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MemoryBank for FileBank {
    fn description(&self) -> String {
        format!("main memory (image {}, {} bytes)", self.path.display(), self.size)
    }

    fn size(&self) -> usize {
        self.size
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), TransportError> {
        check_range(offset, data.len(), self.size)?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(data)?;
        self.file.flush()?;
        Ok(())
    }

    fn read(&mut self, offset: usize, len: usize) -> Result<Vec<u8>, TransportError> {
        check_range(offset, len, self.size)?;
        let mut buf = vec![0u8; len];
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.read_exact(&mut buf)?;
        Ok(buf)
    }
}
