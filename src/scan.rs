use std::path::{Path, PathBuf};

/// Top-level shard of the archive a file is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Image,
    Video,
}

impl Category {
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Image => "Pictures",
            Category::Video => "Videos",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub category: Category,
    /// Canonical lowercase extension including the leading dot.
    pub extension: String,
}

/// Dispatch by extension. Anything outside the table is not a media file
/// for our purposes and is never opened.
pub fn classify(path: &Path) -> Option<MediaFile> {
    let extension = path.extension()?.to_str()?.to_lowercase();

    let category = match extension.as_str() {
        "jpg" | "jpeg" | "dng" => Category::Image,
        "mp4" => Category::Video,
        _ => return None,
    };

    Some(MediaFile {
        path: path.to_path_buf(),
        category,
        extension: canonical_extension(&extension),
    })
}

fn canonical_extension(extension: &str) -> String {
    match extension {
        "jpg" | "jpeg" => ".jpeg".to_string(),
        other => format!(".{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_and_videos_are_dispatched() {
        let jpg = classify(Path::new("a/b/photo.jpg")).unwrap();
        assert_eq!(jpg.category, Category::Image);
        assert_eq!(jpg.extension, ".jpeg");

        let dng = classify(Path::new("raw.dng")).unwrap();
        assert_eq!(dng.category, Category::Image);
        assert_eq!(dng.extension, ".dng");

        let mp4 = classify(Path::new("clip.mp4")).unwrap();
        assert_eq!(mp4.category, Category::Video);
        assert_eq!(mp4.extension, ".mp4");
    }

    #[test]
    fn jpg_and_jpeg_share_one_canonical_extension() {
        let a = classify(Path::new("a.jpg")).unwrap();
        let b = classify(Path::new("b.jpeg")).unwrap();
        assert_eq!(a.extension, ".jpeg");
        assert_eq!(b.extension, ".jpeg");
    }

    #[test]
    fn extensions_match_case_insensitively() {
        assert!(classify(Path::new("UPPER.JPG")).is_some());
        assert!(classify(Path::new("Mixed.Mp4")).is_some());
    }

    #[test]
    fn everything_else_is_ignored() {
        assert!(classify(Path::new("notes.txt")).is_none());
        assert!(classify(Path::new("clip.mov")).is_none());
        assert!(classify(Path::new("no_extension")).is_none());
    }
}
