use std::fmt::Display;

use bytes::Bytes;
use futures::{StreamExt, stream::BoxStream};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::asset::{AssetType, RemoteAssetState, UploadOutcome, map_asset};
use crate::chunk;
use crate::client::{ChunkTransport, GraphQlClient};
use crate::error::UploadError;
use crate::graphql::{
    AssetById, CreateAsset, DeleteAsset, UploadFile, asset_by_id, create_asset, delete_asset,
    upload_file,
};
use crate::media::{MediaItem, MediaKind, MediaLibrary, read_media};
use crate::params::{ChunkFailurePolicy, UploaderConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Init,
    AwaitingSessionCreated,
    UploadingChunks,
    AwaitingAssetCreated,
    PollingForReady,
    Done,
    Failed,
}

impl Display for UploadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadPhase::Init => write!(f, "Preparing"),
            UploadPhase::AwaitingSessionCreated => write!(f, "Initializing upload"),
            UploadPhase::UploadingChunks => write!(f, "Uploading chunks"),
            UploadPhase::AwaitingAssetCreated => write!(f, "Creating asset"),
            UploadPhase::PollingForReady => write!(f, "Waiting for processing"),
            UploadPhase::Done => write!(f, "Done"),
            UploadPhase::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    Phase(UploadPhase),
    ChunkUploaded {
        index: usize,
        total: usize,
        success: bool,
    },
    Polled {
        attempt: u32,
        asset_type: Option<AssetType>,
    },
    Finished(UploadOutcome),
}

/// File registered by `uploadFile`, with one pre-signed URL per chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub file_id: String,
    pub chunk_upload_urls: Vec<String>,
}

/// Asset created from an uploaded file; processing continues remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHandle {
    pub asset_id: String,
}

/// Drives the Frontify upload protocol: `uploadFile`, chunk PUTs,
/// `createAsset`, then `AssetById` polls until the asset is processed.
///
/// Every phase runs at most once per upload; the first failure ends it and is
/// reported through [`UploadOutcome::error_message`] together with the asset id
/// if one was already assigned.
pub struct Uploader {
    graphql: GraphQlClient,
    transport: ChunkTransport,
    config: UploaderConfig,
}

impl Uploader {
    pub fn new(config: UploaderConfig) -> Self {
        Self {
            graphql: GraphQlClient::new(
                config.frontify_url.clone(),
                config.token.clone(),
                config.timing.request_timeout,
            ),
            transport: ChunkTransport::new(config.timing.request_timeout),
            config,
        }
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Reads the item fully from `library`, then uploads it. See [`read_media`].
    pub async fn upload<L>(&self, library: &L, media_id: &str, provider: &str) -> UploadOutcome
    where
        L: MediaLibrary + ?Sized,
    {
        match read_media(library, media_id, provider) {
            Ok((item, payload)) => self.upload_item(&item, payload).await,
            Err(e) => {
                warn!(media_id, provider, error = %e, "Unable to read media item");
                UploadOutcome::failed(None, e.to_string())
            }
        }
    }

    pub async fn upload_item(&self, item: &MediaItem, payload: Bytes) -> UploadOutcome {
        let mut events = self.upload_stream(item, payload);
        let mut outcome = None;
        while let Some(event) = events.next().await {
            if let UploadEvent::Finished(finished) = event {
                outcome = Some(finished);
            }
        }

        outcome.unwrap_or_else(|| UploadOutcome::failed(None, "Upload ended without an outcome"))
    }

    /// Same as [`Uploader::upload_item`], reporting progress as it goes. The
    /// stream always ends with a single [`UploadEvent::Finished`].
    pub fn upload_stream<'a>(
        &'a self,
        item: &'a MediaItem,
        payload: Bytes,
    ) -> BoxStream<'a, UploadEvent> {
        let stream = async_stream::stream! {
            yield UploadEvent::Phase(UploadPhase::Init);

            let timing = self.config.timing;
            let chunks = chunk::split(&payload, self.config.chunk_size.bytes());
            let total_chunks = chunks.len();

            // 1. Initialize the upload
            yield UploadEvent::Phase(UploadPhase::AwaitingSessionCreated);
            let session = match self.init_file(item, payload.len() as u64, total_chunks).await {
                Ok(session) => session,
                Err(e) => {
                    warn!(file = item.file_name(), error = %e, "UploadFile failed");
                    yield UploadEvent::Phase(UploadPhase::Failed);
                    yield UploadEvent::Finished(UploadOutcome::failed(None, operation_error("UploadFile", &e)));
                    return;
                }
            };
            info!(file_id = %session.file_id, chunks = total_chunks, "Upload session created");
            timing.settle().await;

            // 2. Upload the binary content
            yield UploadEvent::Phase(UploadPhase::UploadingChunks);
            let mime_type = item.mime_type();
            let mut failed_chunks = Vec::new();
            for (chunk, url) in chunks.into_iter().zip(&session.chunk_upload_urls) {
                let index = chunk.index;
                let success = self.transport.put_chunk(url, &mime_type, chunk.bytes).await;
                if success {
                    debug!(chunk = index, total = total_chunks, "Chunk uploaded");
                } else {
                    warn!(chunk = index, total = total_chunks, "Chunk upload failed");
                    failed_chunks.push(index);
                }
                yield UploadEvent::ChunkUploaded { index, total: total_chunks, success };
            }
            if !failed_chunks.is_empty() && self.config.chunk_failures == ChunkFailurePolicy::Fail {
                let e = UploadError::TransportFailure { indices: failed_chunks };
                yield UploadEvent::Phase(UploadPhase::Failed);
                yield UploadEvent::Finished(UploadOutcome::failed(None, e.to_string()));
                return;
            }
            timing.settle().await;

            // 3. Turn the file into an asset
            yield UploadEvent::Phase(UploadPhase::AwaitingAssetCreated);
            let handle = match self.create_asset(&session.file_id, item).await {
                Ok(handle) => handle,
                Err(e) => {
                    warn!(file_id = %session.file_id, error = %e, "CreateAsset failed");
                    yield UploadEvent::Phase(UploadPhase::Failed);
                    yield UploadEvent::Finished(UploadOutcome::failed(None, operation_error("CreateAsset", &e)));
                    return;
                }
            };
            info!(asset_id = %handle.asset_id, "Asset created");
            timing.settle().await;

            // 4. Wait for Frontify to finish processing
            yield UploadEvent::Phase(UploadPhase::PollingForReady);
            let deadline = Instant::now() + timing.ready_deadline(total_chunks);
            let mut state = RemoteAssetState::default();
            let mut poll_error = None;
            let mut attempt = 0;
            while Instant::now() < deadline {
                attempt += 1;
                let polled = tokio::time::timeout_at(
                    deadline,
                    self.fetch_asset_state(item.kind, &handle.asset_id),
                )
                .await;
                match polled {
                    Ok(Ok(polled)) => {
                        state = polled;
                        debug!(asset_id = %handle.asset_id, attempt, ready = state.is_ready(), "Polled asset");
                        yield UploadEvent::Polled { attempt, asset_type: state.asset_type.clone() };
                        if state.is_ready() {
                            break;
                        }
                        timing.before_next_poll(deadline).await;
                    }
                    Ok(Err(e)) => {
                        poll_error = Some(e);
                        break;
                    }
                    Err(_) => {
                        warn!(asset_id = %handle.asset_id, attempt, "AssetById request outlived the ready deadline");
                        break;
                    }
                }
            }

            match finish_polling(&handle, state, poll_error) {
                Ok((asset_type, preview_url, download_url)) => {
                    let outcome = map_asset(&handle.asset_id, &asset_type, Some(&preview_url), Some(&download_url));
                    info!(asset_id = %handle.asset_id, %asset_type, "Asset ready");
                    yield UploadEvent::Phase(UploadPhase::Done);
                    yield UploadEvent::Finished(outcome);
                }
                Err(e) => {
                    warn!(asset_id = %handle.asset_id, attempts = attempt, error = %e, "Asset did not become ready");
                    yield UploadEvent::Phase(UploadPhase::Failed);
                    yield UploadEvent::Finished(UploadOutcome::failed(
                        Some(handle.asset_id.clone()),
                        operation_error("AssetById", &e),
                    ));
                }
            }
        };

        Box::pin(stream)
    }

    /// Deletes a previously created asset. Errors reported by Frontify are
    /// returned as [`UploadError::Remote`] with the server's messages; a
    /// response without the deleted asset is [`UploadError::AssetNotDeleted`].
    pub async fn delete_asset(&self, asset_id: &str) -> Result<(), UploadError> {
        let variables = delete_asset::Variables {
            asset: delete_asset::DeleteAssetInput {
                id: asset_id.to_string(),
            },
        };

        self.graphql
            .execute_query::<DeleteAsset>(variables)
            .await?
            .and_then(|data| data.delete_asset)
            .and_then(|deleted| deleted.asset)
            .ok_or_else(|| UploadError::AssetNotDeleted {
                asset_id: asset_id.to_string(),
            })?;

        info!(asset_id, "Asset deleted");
        Ok(())
    }

    async fn init_file(
        &self,
        item: &MediaItem,
        size: u64,
        total_chunks: usize,
    ) -> Result<UploadSession, UploadError> {
        let variables = upload_file::Variables {
            file: upload_file::UploadFileInput {
                filename: item.file_name().to_string(),
                size,
                chunk_size: self.config.chunk_size.bytes(),
            },
        };

        let upload_file = self
            .graphql
            .execute_query::<UploadFile>(variables)
            .await?
            .and_then(|data| data.upload_file)
            .ok_or(UploadError::MissingUploadSession)?;

        let session = match (upload_file.id, upload_file.urls) {
            (Some(file_id), Some(urls)) if !file_id.trim().is_empty() && !urls.is_empty() => {
                UploadSession {
                    file_id,
                    chunk_upload_urls: urls,
                }
            }
            _ => return Err(UploadError::MissingUploadSession),
        };

        if session.chunk_upload_urls.len() != total_chunks {
            return Err(UploadError::ChunkCountMismatch {
                chunks: total_chunks,
                urls: session.chunk_upload_urls.len(),
            });
        }

        Ok(session)
    }

    async fn create_asset(&self, file_id: &str, item: &MediaItem) -> Result<AssetHandle, UploadError> {
        let variables = create_asset::Variables {
            asset: create_asset::CreateAssetInput {
                project_id: self.config.project_id.clone(),
                file_id: file_id.to_string(),
                title: item.title.clone(),
                description: item.description.clone(),
                directory: item.remote_directory(&self.config.folders_path),
                author: item.author.clone(),
            },
        };

        let asset_id = self
            .graphql
            .execute_query::<CreateAsset>(variables)
            .await?
            .and_then(|data| data.asset_id())
            .ok_or(UploadError::MissingAssetId)?;

        Ok(AssetHandle { asset_id })
    }

    async fn fetch_asset_state(
        &self,
        kind: MediaKind,
        asset_id: &str,
    ) -> Result<RemoteAssetState, UploadError> {
        let request_body = AssetById::build_query(
            kind,
            asset_by_id::Variables {
                id: asset_id.to_string(),
            },
        );

        let asset = self
            .graphql
            .execute::<_, asset_by_id::ResponseData>(&request_body)
            .await?
            .and_then(|data| data.asset);

        Ok(asset
            .map(|asset| RemoteAssetState {
                asset_type: asset.type_,
                preview_url: asset.preview_url,
                download_url: asset.download_url,
            })
            .unwrap_or_default())
    }
}

/// A poll loop is only successful when it stopped on a ready asset whose type,
/// preview URL and download URL are all known.
fn finish_polling(
    handle: &AssetHandle,
    state: RemoteAssetState,
    poll_error: Option<UploadError>,
) -> Result<(AssetType, String, String), UploadError> {
    if let Some(e) = poll_error {
        return Err(e);
    }

    match state {
        RemoteAssetState {
            asset_type: Some(asset_type),
            preview_url: Some(preview_url),
            download_url: Some(download_url),
        } => Ok((asset_type, preview_url, download_url)),
        _ => Err(UploadError::AssetNotReady {
            asset_id: handle.asset_id.clone(),
        }),
    }
}

/// Outcome message of a failed GraphQL phase, naming the operation.
fn operation_error(operation: &str, e: &UploadError) -> String {
    format!("{} failed: {}", operation, e)
}
