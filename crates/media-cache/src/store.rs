//! Chunk store: resumable download/assembly and chunked upload.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use cutforge_instruction_model::{ClipRef, MediaRecord, MediaRef};
use cutforge_server_client::wire::{ChunkPayload, NewMedia};
use cutforge_server_client::{ServerClient, TransportError};

use crate::naming::{chunk_file_name, safe_cache_key, target_extension};

/// Default upload chunk size: 2 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Errors raised while resolving or uploading media.
#[derive(Debug, thiserror::Error)]
pub enum MediaCacheError {
    #[error("unsupported media type: {media_type}")]
    UnsupportedType { media_type: String },

    #[error("chunk transfer failed for {media_id}[{index}]: {source}")]
    Transfer {
        media_id: String,
        index: u64,
        source: TransportError,
    },

    #[error("media registration failed for {media_id}: {source}")]
    Registration {
        media_id: String,
        source: TransportError,
    },

    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The transfer seam: where chunks come from and go to. `ServerClient`
/// is the production implementation; tests substitute instrumented mocks.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Fetch chunk `index` of a remote media file.
    async fn fetch_chunk(&self, media_id: &str, index: u64)
        -> Result<ChunkPayload, TransportError>;

    /// Push one chunk of a local file to the remote sink.
    async fn push_chunk(
        &self,
        media_id: &str,
        index: u64,
        total_chunks: u64,
        bytes: &[u8],
    ) -> Result<(), TransportError>;

    /// Register uploaded media with its metadata.
    async fn register_media(&self, media: &NewMedia<'_>) -> Result<MediaRecord, TransportError>;
}

#[async_trait]
impl ChunkSource for ServerClient {
    async fn fetch_chunk(
        &self,
        media_id: &str,
        index: u64,
    ) -> Result<ChunkPayload, TransportError> {
        self.read_chunk(media_id, index).await
    }

    async fn push_chunk(
        &self,
        media_id: &str,
        index: u64,
        total_chunks: u64,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        self.write_chunk(media_id, index, total_chunks, bytes).await
    }

    async fn register_media(&self, media: &NewMedia<'_>) -> Result<MediaRecord, TransportError> {
        self.add_media(media).await
    }
}

/// What resolving a clip reference produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedMedia {
    /// A fully assembled local media file.
    File(PathBuf),

    /// Literal text content; nothing touches the cache.
    Text(String),

    /// Nothing to resolve (scene references).
    Skip,
}

/// Metadata for an upload's registration step.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub title: String,
    pub description: String,
    pub user: String,
    pub mime: String,
    /// Media kind tag (e.g. "video").
    pub kind: String,
}

/// Content-addressed local cache keyed by media id, backed by a chunk
/// transfer source.
pub struct ChunkStore<S> {
    root: PathBuf,
    source: S,
    chunk_size: usize,
}

impl<S: ChunkSource> ChunkStore<S> {
    pub fn new(root: impl Into<PathBuf>, source: S) -> Self {
        Self {
            root: root.into(),
            source,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Resolve a clip reference to local content.
    ///
    /// Text and scene references short-circuit without touching cache or
    /// network. Media references resolve through the chunk cache; a fetch
    /// failure aborts resolution for this clip only.
    pub async fn resolve(&self, clip_ref: &ClipRef) -> Result<ResolvedMedia, MediaCacheError> {
        match clip_ref {
            ClipRef::Text { text } => Ok(ResolvedMedia::Text(text.clone())),
            ClipRef::Scene => Ok(ResolvedMedia::Skip),
            ClipRef::Video(media) | ClipRef::Audio(media) | ClipRef::Image(media) => {
                let path = self.resolve_file(media).await?;
                Ok(ResolvedMedia::File(path))
            }
            ClipRef::Unsupported { media_type } => Err(MediaCacheError::UnsupportedType {
                media_type: media_type.clone(),
            }),
        }
    }

    /// Resolve a media reference to an assembled local file, fetching any
    /// chunks not already on disk.
    pub async fn resolve_file(&self, media: &MediaRef) -> Result<PathBuf, MediaCacheError> {
        let entry_dir = self.root.join(safe_cache_key(&media.media_id));
        let extension = target_extension(media);
        let final_path = entry_dir.join(format!("final.{extension}"));

        // Cache hit: the final file exists, so the bytes are complete.
        if final_path.exists() {
            tracing::debug!(media = %media.media_id, path = %final_path.display(), "Cache hit");
            return Ok(final_path);
        }

        let chunks_dir = entry_dir.join("chunks");
        fs::create_dir_all(&chunks_dir)?;

        // Walk indices from zero. Chunks already on disk are from a prior
        // partial run and are skipped; the first fetch response's
        // total_chunks is authoritative for the whole walk.
        let mut total_chunks: Option<u64> = None;
        let mut index: u64 = 0;
        loop {
            if let Some(total) = total_chunks {
                if index >= total {
                    break;
                }
            }

            let part_path = chunks_dir.join(chunk_file_name(index));
            if part_path.exists() {
                index += 1;
                continue;
            }

            let payload = self
                .source
                .fetch_chunk(&media.media_id, index)
                .await
                .map_err(|source| MediaCacheError::Transfer {
                    media_id: media.media_id.clone(),
                    index,
                    source,
                })?;

            let total = *total_chunks.get_or_insert(payload.total_chunks);
            if index >= total {
                break;
            }

            fs::write(&part_path, &payload.data)?;
            tracing::debug!(
                media = %media.media_id,
                index,
                total,
                bytes = payload.data.len(),
                "Chunk persisted"
            );
            index += 1;
        }

        let total = total_chunks.unwrap_or(0);
        self.assemble(&chunks_dir, total, &final_path)?;

        tracing::info!(
            media = %media.media_id,
            chunks = total,
            path = %final_path.display(),
            "Media assembled"
        );
        Ok(final_path)
    }

    /// Concatenate chunk files `[0, total)` in ascending index order into
    /// the final file. Written to a temp path and renamed so a partially
    /// written final file can never be observed.
    fn assemble(
        &self,
        chunks_dir: &Path,
        total: u64,
        final_path: &Path,
    ) -> Result<(), MediaCacheError> {
        let tmp_path = final_path.with_extension("tmp");
        let mut out = File::create(&tmp_path)?;

        for index in 0..total {
            let part_path = chunks_dir.join(chunk_file_name(index));
            let mut part = File::open(&part_path)?;
            std::io::copy(&mut part, &mut out)?;
        }

        out.flush()?;
        drop(out);
        fs::rename(&tmp_path, final_path)?;
        Ok(())
    }

    /// Upload a local file in fixed-size chunks, strictly in ascending
    /// index order, then register its metadata. Registration failure is
    /// an error but the chunks are not re-sent.
    pub async fn upload(
        &self,
        path: &Path,
        request: &UploadRequest,
    ) -> Result<MediaRecord, MediaCacheError> {
        if !path.exists() {
            return Err(MediaCacheError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let total_size = fs::metadata(path)?.len();
        let total_chunks = total_size.div_ceil(self.chunk_size as u64).max(1);
        let media_id = upload_media_id();

        tracing::info!(
            media = %media_id,
            bytes = total_size,
            chunks = total_chunks,
            "Uploading rendered media"
        );

        let mut file = File::open(path)?;
        let mut buffer = vec![0u8; self.chunk_size];
        for index in 0..total_chunks {
            let read = read_up_to(&mut file, &mut buffer)?;
            self.source
                .push_chunk(&media_id, index, total_chunks, &buffer[..read])
                .await
                .map_err(|source| MediaCacheError::Transfer {
                    media_id: media_id.clone(),
                    index,
                    source,
                })?;
        }

        let record = self
            .source
            .register_media(&NewMedia {
                id: &media_id,
                title: &request.title,
                description: &request.description,
                user: &request.user,
                mime: &request.mime,
                kind: &request.kind,
                total_size,
            })
            .await
            .map_err(|source| MediaCacheError::Registration {
                media_id: media_id.clone(),
                source,
            })?;

        tracing::info!(media = %record.id, "Media registered");
        Ok(record)
    }
}

/// Fill as much of `buffer` as the file still has, returning bytes read.
fn read_up_to(file: &mut File, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let read = file.read(&mut buffer[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

/// Generate an upload media identifier without an external dependency.
fn upload_media_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (seed & 0xFFFFFFFF) as u32,
        ((seed >> 32) & 0xFFFF) as u16,
        ((seed >> 48) & 0x0FFF) as u16,
        (((seed >> 60) & 0x3F) | 0x80) as u16 | (((seed >> 66) & 0x3FF) as u16) << 6,
        (seed >> 76) & 0xFFFFFFFFFFFF,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Instrumented in-memory chunk source.
    struct MockSource {
        chunks: Vec<Vec<u8>>,
        poisoned: AtomicBool,
        fetched: Mutex<Vec<u64>>,
        pushed: Mutex<Vec<(u64, u64, Vec<u8>)>>,
        registered: AtomicUsize,
        reject_registration: bool,
    }

    impl MockSource {
        fn with_chunks(chunks: Vec<Vec<u8>>) -> Self {
            Self {
                chunks,
                poisoned: AtomicBool::new(false),
                fetched: Mutex::new(vec![]),
                pushed: Mutex::new(vec![]),
                registered: AtomicUsize::new(0),
                reject_registration: false,
            }
        }

        fn fetch_indices(&self) -> Vec<u64> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChunkSource for MockSource {
        async fn fetch_chunk(
            &self,
            _media_id: &str,
            index: u64,
        ) -> Result<ChunkPayload, TransportError> {
            if self.poisoned.load(Ordering::SeqCst) {
                return Err(TransportError::Rejected {
                    message: "poisoned".to_string(),
                });
            }
            self.fetched.lock().unwrap().push(index);
            let data = self
                .chunks
                .get(index as usize)
                .cloned()
                .ok_or(TransportError::Rejected {
                    message: "index out of range".to_string(),
                })?;
            Ok(ChunkPayload {
                data,
                total_chunks: self.chunks.len() as u64,
            })
        }

        async fn push_chunk(
            &self,
            _media_id: &str,
            index: u64,
            total_chunks: u64,
            bytes: &[u8],
        ) -> Result<(), TransportError> {
            self.pushed
                .lock()
                .unwrap()
                .push((index, total_chunks, bytes.to_vec()));
            Ok(())
        }

        async fn register_media(
            &self,
            media: &NewMedia<'_>,
        ) -> Result<MediaRecord, TransportError> {
            if self.reject_registration {
                return Err(TransportError::Rejected {
                    message: "registration refused".to_string(),
                });
            }
            self.registered.fetch_add(1, Ordering::SeqCst);
            Ok(MediaRecord {
                id: media.id.to_string(),
                title: media.title.to_string(),
                mime: Some(media.mime.to_string()),
                kind: media.kind.to_string(),
                total_size: media.total_size,
            })
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cutforge_cache_{name}"));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn video_ref(media_id: &str) -> ClipRef {
        ClipRef::Video(MediaRef {
            media_id: media_id.to_string(),
            mime: Some("video/mp4".to_string()),
            title: None,
            cut: None,
        })
    }

    #[tokio::test]
    async fn test_reassembly_equals_ordered_concatenation() {
        let dir = scratch_dir("reassembly");
        let chunks = vec![b"AAAA".to_vec(), b"BB".to_vec(), b"CCCCCC".to_vec()];
        let store = ChunkStore::new(&dir, MockSource::with_chunks(chunks));

        let resolved = store.resolve(&video_ref("m-1")).await.unwrap();
        let ResolvedMedia::File(path) = resolved else {
            panic!("expected a file");
        };

        assert_eq!(fs::read(&path).unwrap(), b"AAAABBCCCCCC");
        assert!(path.to_string_lossy().ends_with("final.mp4"));

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_cache_hit_issues_no_fetch() {
        let dir = scratch_dir("idempotence");
        let chunks = vec![b"one".to_vec(), b"two".to_vec()];
        let store = ChunkStore::new(&dir, MockSource::with_chunks(chunks));

        let first = store.resolve(&video_ref("m-2")).await.unwrap();

        // Poison the source: any further fetch errors out.
        store.source.poisoned.store(true, Ordering::SeqCst);

        let second = store.resolve(&video_ref("m-2")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.source.fetch_indices(), vec![0, 1]);

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_resumption_fetches_only_missing_chunks() {
        let dir = scratch_dir("resume");
        let chunks = vec![b"AA".to_vec(), b"BB".to_vec(), b"CC".to_vec()];

        // Pre-seed parts 0 and 1 as a prior partial run would have left them.
        let chunks_dir = dir.join(safe_cache_key("m-3")).join("chunks");
        fs::create_dir_all(&chunks_dir).unwrap();
        fs::write(chunks_dir.join(chunk_file_name(0)), b"AA").unwrap();
        fs::write(chunks_dir.join(chunk_file_name(1)), b"BB").unwrap();

        let store = ChunkStore::new(&dir, MockSource::with_chunks(chunks));
        let resolved = store.resolve(&video_ref("m-3")).await.unwrap();

        assert_eq!(store.source.fetch_indices(), vec![2]);
        let ResolvedMedia::File(path) = resolved else {
            panic!("expected a file");
        };
        assert_eq!(fs::read(&path).unwrap(), b"AABBCC");

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_resolution() {
        let dir = scratch_dir("fetch_failure");
        let mut source = MockSource::with_chunks(vec![b"AA".to_vec()]);
        source.poisoned = AtomicBool::new(true);
        let store = ChunkStore::new(&dir, source);

        let result = store.resolve(&video_ref("m-4")).await;
        assert!(matches!(result, Err(MediaCacheError::Transfer { .. })));

        // No final file may exist after a failed resolution.
        let entry = dir.join(safe_cache_key("m-4"));
        assert!(!entry.join("final.mp4").exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_text_and_scene_short_circuit() {
        let dir = scratch_dir("short_circuit");
        let store = ChunkStore::new(&dir, MockSource::with_chunks(vec![]));

        let text = store
            .resolve(&ClipRef::Text {
                text: "Lower third".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(text, ResolvedMedia::Text("Lower third".to_string()));

        let scene = store.resolve(&ClipRef::Scene).await.unwrap();
        assert_eq!(scene, ResolvedMedia::Skip);

        // Nothing touched the cache root.
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_unsupported_type_is_an_error() {
        let dir = scratch_dir("unsupported");
        let store = ChunkStore::new(&dir, MockSource::with_chunks(vec![]));

        let result = store
            .resolve(&ClipRef::Unsupported {
                media_type: "wiggle".to_string(),
            })
            .await;
        assert!(matches!(
            result,
            Err(MediaCacheError::UnsupportedType { media_type }) if media_type == "wiggle"
        ));
    }

    #[tokio::test]
    async fn test_upload_chunks_sequentially_then_registers() {
        let dir = scratch_dir("upload");
        fs::create_dir_all(&dir).unwrap();
        let file_path = dir.join("render.mp4");
        fs::write(&file_path, b"0123456789").unwrap();

        let store = ChunkStore::new(&dir, MockSource::with_chunks(vec![])).with_chunk_size(4);
        let record = store
            .upload(
                &file_path,
                &UploadRequest {
                    title: "render.mp4".to_string(),
                    description: String::new(),
                    user: "worker".to_string(),
                    mime: "video/mp4".to_string(),
                    kind: "video".to_string(),
                },
            )
            .await
            .unwrap();

        let pushed = store.source.pushed.lock().unwrap().clone();
        assert_eq!(pushed.len(), 3);
        assert_eq!(
            pushed.iter().map(|(i, _, _)| *i).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(pushed.iter().all(|(_, total, _)| *total == 3));
        assert_eq!(pushed[2].2, b"89");
        assert_eq!(record.total_size, 10);
        assert_eq!(store.source.registered.load(Ordering::SeqCst), 1);

        fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_registration_rejection_is_reported() {
        let dir = scratch_dir("register_reject");
        fs::create_dir_all(&dir).unwrap();
        let file_path = dir.join("render.mp4");
        fs::write(&file_path, b"abc").unwrap();

        let mut source = MockSource::with_chunks(vec![]);
        source.reject_registration = true;
        let store = ChunkStore::new(&dir, source).with_chunk_size(4);

        let result = store
            .upload(
                &file_path,
                &UploadRequest {
                    title: "render.mp4".to_string(),
                    description: String::new(),
                    user: "worker".to_string(),
                    mime: "video/mp4".to_string(),
                    kind: "video".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(MediaCacheError::Registration { .. })));
        // The chunk went out before registration failed; it is not re-sent.
        assert_eq!(store.source.pushed.lock().unwrap().len(), 1);

        fs::remove_dir_all(&dir).ok();
    }
}
