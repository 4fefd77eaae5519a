//! Voice cue cache
//!
//! Voice cues are short recordings of spoken numbers, one file per number.
//! The same cue is placed many times per score, so each source is decoded
//! once into a float WAV in a scratch directory and every placement reads
//! that artifact through its own handle. A handle opens the artifact on its
//! first read and closes it again at end of stream, so only handles being
//! read hold a file descriptor. [`AssetCache::dispose`] closes every handle
//! it issued and deletes the scratch directory.

use crate::samples::{decode_file, Sample};
use crate::{frames_to_micros, AudioError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Smallest voice cue number
pub const MIN_KEY: u32 = 1;
/// Largest voice cue number (four digits)
pub const MAX_KEY: u32 = 9999;

/// Extensions tried, in order, when looking for a voice file
const SOURCE_EXTENSIONS: [&str; 6] = ["wav", "flac", "mp3", "ogg", "m4a", "aac"];

type WavFileReader = WavReader<BufReader<File>>;
type ReaderSlot = Arc<Mutex<ReaderState>>;

/// Lifecycle of one handle's view of a scratch artifact
enum ReaderState {
    /// Issued, nothing read yet
    Pending,
    /// Being read; holds the file open
    Open(WavFileReader),
    /// Read to the end; the file is closed again
    Drained,
    /// Invalidated by `dispose()`
    Closed,
}

/// Format and length of a cached asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u64,
}

impl AssetInfo {
    pub fn duration_micros(&self) -> u64 {
        frames_to_micros(self.frames, self.sample_rate)
    }
}

/// An independent read cursor over a cached voice cue
///
/// Handles stay usable until the cache that issued them is disposed; after
/// that every read fails with [`AudioError::HandleClosed`].
pub struct ReaderHandle {
    key: u32,
    info: AssetInfo,
    path: PathBuf,
    slot: ReaderSlot,
}

impl fmt::Debug for ReaderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderHandle")
            .field("key", &self.key)
            .field("info", &self.info)
            .field("open", &self.is_open())
            .finish()
    }
}

impl ReaderHandle {
    pub fn key(&self) -> u32 {
        self.key
    }

    pub fn info(&self) -> AssetInfo {
        self.info
    }

    /// False once the issuing cache has been disposed
    pub fn is_open(&self) -> bool {
        !matches!(*self.slot.lock(), ReaderState::Closed)
    }

    /// Read up to `max_samples` interleaved samples from the current position
    ///
    /// The artifact is opened on the first read and closed as soon as a read
    /// reaches its end.
    pub fn read(&mut self, max_samples: usize) -> Result<Vec<f32>> {
        let mut guard = self.slot.lock();
        let state = &mut *guard;
        if matches!(state, ReaderState::Pending) {
            *state = ReaderState::Open(WavReader::open(&self.path)?);
        }

        let reader = match &mut *state {
            ReaderState::Open(reader) => reader,
            ReaderState::Drained => return Ok(Vec::new()),
            _ => return Err(AudioError::HandleClosed(self.key)),
        };
        let samples = reader
            .samples::<f32>()
            .take(max_samples)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        if samples.len() < max_samples {
            *state = ReaderState::Drained;
        }
        Ok(samples)
    }

    /// Read everything from the current position to the end
    pub fn read_to_end(&mut self) -> Result<Vec<f32>> {
        self.read(usize::MAX)
    }
}

struct CachedAsset {
    scratch_path: PathBuf,
    info: AssetInfo,
    handles: Vec<ReaderSlot>,
}

impl CachedAsset {
    fn live_handles(&self) -> usize {
        self.handles
            .iter()
            .filter(|slot| matches!(*slot.lock(), ReaderState::Open(_)))
            .count()
    }
}

/// Registry of decoded voice cues, scoped to one batch of work
pub struct AssetCache {
    voice_dir: PathBuf,
    scratch_root: Option<PathBuf>,
    scratch: Option<TempDir>,
    assets: HashMap<u32, CachedAsset>,
}

impl AssetCache {
    /// Create a cache reading voice files from `voice_dir`
    ///
    /// Scratch artifacts go to a fresh directory under `scratch_root`, or the
    /// system temp directory when none is given. Nothing touches the disk
    /// until the first request.
    pub fn new(voice_dir: impl Into<PathBuf>, scratch_root: Option<&Path>) -> Self {
        AssetCache {
            voice_dir: voice_dir.into(),
            scratch_root: scratch_root.map(Path::to_path_buf),
            scratch: None,
            assets: HashMap::new(),
        }
    }

    /// Get a new reader for voice cue `key`
    ///
    /// The first request for a key decodes its source file; later requests
    /// reuse the scratch artifact. No file is opened until the handle is read.
    pub fn get_reader(&mut self, key: u32) -> Result<ReaderHandle> {
        if !(MIN_KEY..=MAX_KEY).contains(&key) {
            return Err(AudioError::InvalidKey(key));
        }

        if !self.assets.contains_key(&key) {
            let asset = self.load(key)?;
            self.assets.insert(key, asset);
        }

        let asset = self
            .assets
            .get_mut(&key)
            .ok_or(AudioError::InvalidKey(key))?;
        let slot: ReaderSlot = Arc::new(Mutex::new(ReaderState::Pending));
        asset.handles.push(Arc::clone(&slot));

        Ok(ReaderHandle {
            key,
            info: asset.info,
            path: asset.scratch_path.clone(),
            slot,
        })
    }

    /// Keys decoded so far, in ascending order
    pub fn cached_keys(&self) -> Vec<u32> {
        let mut keys: Vec<u32> = self.assets.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Number of handles for `key` currently holding the artifact open
    pub fn live_handles(&self, key: u32) -> usize {
        self.assets.get(&key).map_or(0, CachedAsset::live_handles)
    }

    /// Number of handles issued for `key` since the last dispose
    pub fn issued_handles(&self, key: u32) -> usize {
        self.assets.get(&key).map_or(0, |asset| asset.handles.len())
    }

    /// Location of the scratch artifact for `key`, if it has been decoded
    pub fn scratch_path(&self, key: u32) -> Option<&Path> {
        self.assets.get(&key).map(|asset| asset.scratch_path.as_path())
    }

    /// Scratch directory, if one has been created
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }

    /// Close every issued handle and remove every scratch artifact
    ///
    /// Safe to call more than once. The cache can be used again afterwards,
    /// starting from an empty state.
    pub fn dispose(&mut self) -> Result<()> {
        let mut first_error: Option<std::io::Error> = None;

        for (key, asset) in self.assets.drain() {
            for slot in &asset.handles {
                *slot.lock() = ReaderState::Closed;
            }

            if let Err(e) = fs::remove_file(&asset.scratch_path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to remove scratch file for voice cue {}: {}", key, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(dir) = self.scratch.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                log::warn!("Failed to remove scratch directory {}: {}", path.display(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn load(&mut self, key: u32) -> Result<CachedAsset> {
        let source = self.source_path(key)?;
        let sample = decode_file(&source)?;
        let scratch_path = self.scratch_directory()?.join(format!("voice-{:04}.wav", key));
        write_scratch(&scratch_path, &sample)?;

        log::debug!(
            "Cached voice cue {} from {} ({} frames)",
            key,
            source.display(),
            sample.frames()
        );

        Ok(CachedAsset {
            scratch_path,
            info: AssetInfo {
                sample_rate: sample.sample_rate,
                channels: sample.channels,
                frames: sample.frames(),
            },
            handles: Vec::new(),
        })
    }

    /// Find `<key>.<ext>` or the zero-padded `<key:04>.<ext>` in the voice directory
    fn source_path(&self, key: u32) -> Result<PathBuf> {
        let stems = [key.to_string(), format!("{:04}", key)];
        stems
            .iter()
            .flat_map(|stem| {
                SOURCE_EXTENSIONS
                    .iter()
                    .map(move |ext| self.voice_dir.join(format!("{}.{}", stem, ext)))
            })
            .find(|path| path.is_file())
            .ok_or_else(|| AudioError::MissingAsset(self.voice_dir.join(format!("{}.wav", key))))
    }

    fn scratch_directory(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.scratch {
            return Ok(dir.path().to_path_buf());
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("clickmaker-voices-");
        let dir = match &self.scratch_root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();
        self.scratch = Some(dir);
        Ok(path)
    }
}

impl Drop for AssetCache {
    fn drop(&mut self) {
        if self.assets.is_empty() && self.scratch.is_none() {
            return;
        }
        if let Err(e) = self.dispose() {
            log::warn!("Voice cache cleanup failed: {}", e);
        }
    }
}

/// Persist decoded PCM as a 32-bit float WAV
fn write_scratch(path: &Path, sample: &Sample) -> Result<()> {
    let spec = WavSpec {
        channels: sample.channels,
        sample_rate: sample.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &value in sample.data.iter() {
        writer.write_sample(value)?;
    }
    writer.finalize()?;

    Ok(())
}
