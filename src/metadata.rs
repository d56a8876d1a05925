use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

use jiff::civil;
use jiff::tz::TimeZone;

/// EXIF encodes timestamps as naive local time in exactly this shape.
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Seconds between the QuickTime epoch (1904-01-01) and the Unix epoch.
const MAC_EPOCH_OFFSET: i64 = 2_082_844_800;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse metadata: {0}")]
    Exif(#[from] nom_exif::Error),
}

/// Terminal states of a successful extraction. Absence of a usable
/// timestamp is a normal outcome, not an error.
#[derive(Debug)]
pub enum Extracted {
    Found {
        timestamp: civil::DateTime,
        digest: [u8; 32],
    },
    NoTimestamp,
}

/// Folds every byte pulled through it into a running SHA-256, so metadata
/// scanning and content hashing share a single read of the file.
pub struct DigestReader<R> {
    inner: R,
    hasher: Sha256,
}

impl<R: Read> DigestReader<R> {
    pub fn new(inner: R) -> Self {
        DigestReader {
            inner,
            hasher: Sha256::new(),
        }
    }

    /// Pulls the unread remainder of the stream through the hasher.
    pub fn drain(&mut self) -> std::io::Result<()> {
        let mut buffer = [0u8; 8192];
        loop {
            let bytes_read = self.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
        }
        Ok(())
    }

    pub fn finalize(self) -> [u8; 32] {
        self.hasher.finalize().into()
    }
}

impl<R: Read> Read for DigestReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let bytes_read = self.inner.read(buf)?;
        self.hasher.update(&buf[..bytes_read]);
        Ok(bytes_read)
    }
}

/// Scans a still image for an EXIF timestamp while hashing the bytes read,
/// then drains the rest of the file so the digest covers all of it.
pub fn extract_image(path: &Path) -> Result<Extracted, MetadataError> {
    let file = File::open(path)?;
    let mut reader = DigestReader::new(BufReader::new(file));

    #[allow(deprecated)]
    let exif: nom_exif::Exif = match nom_exif::parse_exif(&mut reader, None)? {
        Some(iter) => iter.into(),
        None => return Ok(Extracted::NoTimestamp),
    };

    let Some(timestamp) = exif_datetime(&exif) else {
        return Ok(Extracted::NoTimestamp);
    };

    reader.drain()?;
    Ok(Extracted::Found {
        timestamp,
        digest: reader.finalize(),
    })
}

/// Walks the MP4 box tree for the movie-header creation time, then rewinds
/// and hashes the whole file. The box walk needs random access, so the two
/// phases cannot share one sequential read.
pub fn extract_video(path: &Path) -> Result<Extracted, MetadataError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let timestamp = match mp4::Mp4Reader::read_header(&mut reader, size) {
        Ok(header) => {
            mvhd_creation_time(header.moov.mvhd.version, header.moov.mvhd.creation_time)
        }
        Err(mp4::Error::IoError(source)) => return Err(source.into()),
        // Malformed or unsupported box structure means no timestamp,
        // not a failed file.
        Err(_) => None,
    };
    let Some(timestamp) = timestamp else {
        return Ok(Extracted::NoTimestamp);
    };

    reader.seek(SeekFrom::Start(0))?;
    let mut reader = DigestReader::new(reader);
    reader.drain()?;
    Ok(Extracted::Found {
        timestamp,
        digest: reader.finalize(),
    })
}

fn exif_datetime(exif: &nom_exif::Exif) -> Option<civil::DateTime> {
    // ModifyDate is nom-exif's name for the plain DateTime tag (0x0132).
    // The first tag present wins; a malformed value does not fall through
    // to the next tag.
    let entry = exif
        .get(nom_exif::ExifTag::DateTimeOriginal)
        .or_else(|| exif.get(nom_exif::ExifTag::ModifyDate))?;
    entry_datetime(entry)
}

fn entry_datetime(entry: &nom_exif::EntryValue) -> Option<civil::DateTime> {
    if let Some(time) = entry.as_time() {
        let formatted = format!("{}", time.format(EXIF_DATETIME_FORMAT));
        if let Some(parsed) = parse_exif_datetime(&formatted) {
            return Some(parsed);
        }
    }
    if let Some(text) = entry.as_str() {
        return parse_exif_datetime(text);
    }
    None
}

fn parse_exif_datetime(value: &str) -> Option<civil::DateTime> {
    jiff::fmt::strtime::parse(EXIF_DATETIME_FORMAT, value.trim())
        .ok()?
        .to_datetime()
        .ok()
}

fn mvhd_creation_time(version: u8, creation_time: u64) -> Option<civil::DateTime> {
    // Version 1 boxes carry 64-bit times; only the version-0 32-bit
    // layout is supported.
    if version != 0 {
        return None;
    }
    mac_epoch_datetime(creation_time)
}

fn mac_epoch_datetime(seconds: u64) -> Option<civil::DateTime> {
    let unix = (seconds as i64).checked_sub(MAC_EPOCH_OFFSET)?;
    let timestamp = jiff::Timestamp::from_second(unix).ok()?;
    Some(timestamp.to_zoned(TimeZone::UTC).datetime())
}
