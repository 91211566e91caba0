use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use bytes::Bytes;
use mime_guess::mime;

use crate::error::UploadError;

/// Broad media category of the source item. Decides which `AssetById`
/// selection is used while polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    pub fn from_file_name(file_name: &str) -> Self {
        let guess = mime_guess::from_path(file_name).first_or_octet_stream();
        if guess.type_() == mime::IMAGE {
            MediaKind::Image
        } else if guess.type_() == mime::VIDEO {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }
}

/// Metadata of a media library item.
///
/// `file_path` uses the library layout `/<library>/<folder>/.../<file name>`;
/// the folders between library and file name become the remote directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub file_path: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub total_size: u64,
    pub kind: MediaKind,
}

impl MediaItem {
    pub fn file_name(&self) -> &str {
        self.file_path.rsplit('/').next().unwrap_or_default()
    }

    pub fn mime_type(&self) -> String {
        mime_type_for(self.file_name())
    }

    /// Folder segments of `file_path`, without the leading library root and
    /// the file name, prefixed with `root_folders`.
    pub fn remote_directory(&self, root_folders: &[String]) -> Vec<String> {
        let segments: Vec<&str> = self.file_path.split('/').collect();
        let folders = segments
            .iter()
            .skip(2)
            .take(segments.len().saturating_sub(3))
            .map(|s| s.to_string());

        root_folders.iter().cloned().chain(folders).collect()
    }
}

pub fn mime_type_for(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Host media library the uploader reads items from.
pub trait MediaLibrary {
    fn media_item(&self, media_id: &str, provider: &str) -> io::Result<MediaItem>;

    fn download(&self, item: &MediaItem) -> io::Result<Box<dyn Read + Send>>;
}

/// Looks up an item and reads its whole content into memory. The reported
/// `total_size` is not trusted for preallocation.
pub fn read_media<L>(
    library: &L,
    media_id: &str,
    provider: &str,
) -> Result<(MediaItem, Bytes), UploadError>
where
    L: MediaLibrary + ?Sized,
{
    let item = library.media_item(media_id, provider)?;
    let mut content = Vec::new();
    library.download(&item)?.read_to_end(&mut content)?;
    Ok((item, Bytes::from(content)))
}

#[derive(Debug, Clone, Default)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
}

/// Media library backed by a local directory. A provider names a library
/// directory below `root`, a media id is a file path relative to it.
#[derive(Debug, Clone)]
pub struct FsMediaLibrary {
    root: PathBuf,
    metadata: MediaMetadata,
}

impl FsMediaLibrary {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            metadata: MediaMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    fn resolve(&self, file_path: &str) -> PathBuf {
        self.root.join(file_path.trim_start_matches('/'))
    }
}

impl MediaLibrary for FsMediaLibrary {
    fn media_item(&self, media_id: &str, provider: &str) -> io::Result<MediaItem> {
        let media_id = media_id.trim_start_matches('/');
        let file_path = format!("/{}/{}", provider, media_id);
        let metadata = std::fs::metadata(self.resolve(&file_path))?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", file_path),
            ));
        }

        let file_name = media_id.rsplit('/').next().unwrap_or(media_id);
        let title = self.metadata.title.clone().unwrap_or_else(|| {
            Path::new(file_name)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.to_string())
        });

        Ok(MediaItem {
            kind: MediaKind::from_file_name(file_name),
            title,
            description: self.metadata.description.clone().unwrap_or_default(),
            author: self.metadata.author.clone().unwrap_or_default(),
            total_size: metadata.len(),
            file_path,
        })
    }

    fn download(&self, item: &MediaItem) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.resolve(&item.file_path))?;
        Ok(Box::new(file))
    }
}
