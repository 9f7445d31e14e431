use content_inspector::{ContentType, inspect};
use log::debug;
use memmap2::MmapOptions;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str;
use thiserror::Error;

/// Why a file's text could not be read.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot map {}: {source}", .path.display())]
    Map {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} looks like a binary file, not UTF-8 text", .path.display())]
    Binary { path: PathBuf },
    #[error("{} is not valid UTF-8 (detected {detected}): {source}", .path.display())]
    InvalidUtf8 {
        path: PathBuf,
        detected: String,
        #[source]
        source: str::Utf8Error,
    },
}

/// Reads the whole file at `path` as UTF-8 text.
pub fn read_text(path: &Path) -> Result<String, ReadError> {
    let mut file = File::open(path).map_err(|source| ReadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let len = file
        .metadata()
        .map_err(|source| ReadError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .len();

    if len == 0 {
        // Pseudo files (procfs, sysfs) report a zero length but still have
        // content, and cannot be mapped.
        debug!("{} reports zero length, reading it directly", path.display());
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|source| ReadError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        return decode(path, &bytes);
    }

    // SAFETY: the mapping is read-only and dropped before this function returns.
    let mmap = unsafe {
        MmapOptions::new().map(&file).map_err(|source| ReadError::Map {
            path: path.to_path_buf(),
            source,
        })?
    };

    decode(path, &mmap)
}

fn decode(path: &Path, bytes: &[u8]) -> Result<String, ReadError> {
    match str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(source) => {
            let sample_size = std::cmp::min(8192, bytes.len());
            let content_type = inspect(&bytes[..sample_size]);

            if content_type == ContentType::BINARY {
                Err(ReadError::Binary {
                    path: path.to_path_buf(),
                })
            } else {
                Err(ReadError::InvalidUtf8 {
                    path: path.to_path_buf(),
                    detected: format!("{content_type:?}"),
                    source,
                })
            }
        }
    }
}
