use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use jiff::civil;
use thiserror::Error;

use crate::metadata::{self, Extracted, MetadataError};
use crate::scan::{Category, MediaFile};

/// Failures that abort the whole run. Per-file trouble is an `Outcome`,
/// not an error.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("cannot create directory {}: {}", path.display(), source)]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("cannot stat {}: {}", path.display(), source)]
    Stat { path: PathBuf, source: io::Error },
    #[error("cannot move {} to {}: {}", from.display(), to.display(), source)]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Per-file result of the classify-and-move pass.
#[derive(Debug)]
pub enum Outcome {
    Moved { dest: PathBuf },
    NoTimestamp,
    Duplicate { existing: PathBuf },
    Failed { error: MetadataError },
}

/// Extract, derive the canonical destination, and move one file into the
/// archive. Returns the outcome without printing anything.
pub fn process_file(media: &MediaFile, dest_root: &Path) -> Result<Outcome, ArchiveError> {
    let (timestamp, digest) = match extract(media) {
        Ok(Extracted::Found { timestamp, digest }) => (timestamp, digest),
        Ok(Extracted::NoTimestamp) => return Ok(Outcome::NoTimestamp),
        Err(error) => return Ok(Outcome::Failed { error }),
    };

    let dest = dest_root.join(canonical_path(
        media.category,
        timestamp,
        &digest,
        &media.extension,
    ));
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| ArchiveError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // A file already at the destination is the same content under the same
    // timestamp; the source is left where it is.
    match dest.try_exists() {
        Ok(true) => Ok(Outcome::Duplicate { existing: dest }),
        Ok(false) => {
            fs::rename(&media.path, &dest).map_err(|source| ArchiveError::Rename {
                from: media.path.clone(),
                to: dest.clone(),
                source,
            })?;
            Ok(Outcome::Moved { dest })
        }
        Err(source) => Err(ArchiveError::Stat { path: dest, source }),
    }
}

fn extract(media: &MediaFile) -> Result<Extracted, MetadataError> {
    match media.category {
        Category::Image => metadata::extract_image(&media.path),
        Category::Video => metadata::extract_video(&media.path),
    }
}

/// Canonical location of a file within the archive, relative to its root.
/// A pure function of the inputs: same content and timestamp, same path.
pub fn canonical_path(
    category: Category,
    timestamp: civil::DateTime,
    digest: &[u8; 32],
    extension: &str,
) -> PathBuf {
    let mut path = PathBuf::from(category.dir_name());
    path.push(timestamp.strftime("%Y-%m").to_string());
    path.push(format!(
        "{}-{}{}",
        timestamp.strftime("%Y%m%d-%H%M%S"),
        format_digest(digest),
        extension
    ));
    path
}

pub fn format_digest(digest: &[u8; 32]) -> String {
    let mut formatted = String::with_capacity(64);
    for byte in digest {
        formatted.push_str(&format!("{:02x}", byte));
    }
    formatted
}

pub fn is_dir_empty(path: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(path)?.next().is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_starting_with(prefix: &[u8]) -> [u8; 32] {
        let mut digest = [0u8; 32];
        digest[..prefix.len()].copy_from_slice(prefix);
        digest
    }

    #[test]
    fn canonical_path_shards_by_category_and_month() {
        let timestamp = civil::date(2023, 6, 15).at(10, 30, 0, 0);
        let digest = digest_starting_with(&[0xab, 0x12]);

        let path = canonical_path(Category::Image, timestamp, &digest, ".jpeg");

        let mut expected = String::from("Pictures/2023-06/20230615-103000-ab12");
        expected.push_str(&"00".repeat(30));
        expected.push_str(".jpeg");
        assert_eq!(path, PathBuf::from(expected));
    }

    #[test]
    fn canonical_path_is_deterministic() {
        let timestamp = civil::date(2024, 1, 2).at(3, 4, 5, 0);
        let digest = digest_starting_with(&[0xff]);
        assert_eq!(
            canonical_path(Category::Video, timestamp, &digest, ".mp4"),
            canonical_path(Category::Video, timestamp, &digest, ".mp4"),
        );
    }

    #[test]
    fn different_content_maps_to_different_paths() {
        let timestamp = civil::date(2024, 1, 2).at(3, 4, 5, 0);
        let a = canonical_path(Category::Image, timestamp, &digest_starting_with(&[1]), ".dng");
        let b = canonical_path(Category::Image, timestamp, &digest_starting_with(&[2]), ".dng");
        assert_ne!(a, b);
    }

    #[test]
    fn videos_go_under_their_own_shard() {
        let timestamp = civil::date(2027, 6, 19).at(0, 0, 0, 0);
        let path = canonical_path(Category::Video, timestamp, &[0u8; 32], ".mp4");
        assert!(path.starts_with("Videos/2027-06"));
    }

    #[test]
    fn format_digest_is_lowercase_hex() {
        let digest = digest_starting_with(&[0x00, 0xde, 0xad, 0xbe, 0xef]);
        let formatted = format_digest(&digest);
        assert_eq!(formatted.len(), 64);
        assert!(formatted.starts_with("00deadbeef"));
    }

    #[test]
    fn empty_probe_distinguishes_contents() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_dir_empty(dir.path()).unwrap());

        std::fs::write(dir.path().join("a"), b"x").unwrap();
        assert!(!is_dir_empty(dir.path()).unwrap());
    }
}
