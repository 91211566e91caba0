//! Client for uploading media into Frontify through its chunked-upload GraphQL
//! API.
//!
//! An upload runs in four phases: `uploadFile` opens an upload session with one
//! pre-signed URL per chunk, every chunk is PUT to its URL, `createAsset` turns
//! the uploaded file into an asset, and `AssetById` is polled until Frontify
//! has finished processing it.

pub mod asset;
pub mod chunk;
pub mod client;
pub mod error;
pub mod graphql;
pub mod media;
pub mod params;
pub mod timing;
pub mod upload;

pub use asset::{AssetType, RemoteAssetState, UploadOutcome, map_asset};
pub use chunk::{Chunk, ChunkSize, split};
pub use client::{ChunkTransport, GraphQlClient};
pub use error::UploadError;
pub use media::{FsMediaLibrary, MediaItem, MediaKind, MediaLibrary, MediaMetadata, read_media};
pub use params::{ChunkFailurePolicy, DEFAULT_FRONTIFY_URL, UploaderConfig};
pub use timing::Timing;
pub use upload::{AssetHandle, UploadEvent, UploadPhase, UploadSession, Uploader};
