use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

const APP_DIR_NAME: &str = "Facewatch";
const COPY_CHUNK: usize = 256 * 1024;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create model directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`, total is 0 when
/// the server sent no Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where model files live on disk.
///
/// An explicitly configured directory wins over the per-user cache so a
/// deployment can pin its models; anything missing from both is downloaded
/// into the cache.
pub struct ModelStore {
    cache_dir: PathBuf,
    models_dir: Option<PathBuf>,
}

impl ModelStore {
    pub fn new(cache_dir: PathBuf, models_dir: Option<PathBuf>) -> Self {
        Self {
            cache_dir,
            models_dir,
        }
    }

    /// Store rooted at the platform cache directory.
    pub fn user_cache(models_dir: Option<PathBuf>) -> Result<Self, ModelResolveError> {
        Ok(Self::new(model_cache_dir()?, models_dir))
    }

    /// Path of an already-present model file, without touching the network.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        self.models_dir
            .iter()
            .chain(std::iter::once(&self.cache_dir))
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    }

    pub fn resolve(
        &self,
        name: &str,
        url: &str,
        progress: Option<ProgressFn>,
    ) -> Result<PathBuf, ModelResolveError> {
        if let Some(path) = self.locate(name) {
            log::debug!("Using model {}", path.display());
            return Ok(path);
        }

        fs::create_dir_all(&self.cache_dir).map_err(|source| ModelResolveError::CreateDir {
            path: self.cache_dir.clone(),
            source,
        })?;
        let dest = self.cache_dir.join(name);
        log::info!("Downloading {name} from {url}");
        download(url, &dest, progress)?;
        Ok(dest)
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Facewatch/models/`
/// - Linux: `$XDG_CACHE_HOME/Facewatch/models/` or `~/.cache/Facewatch/models/`
/// - Windows: `%LOCALAPPDATA%/Facewatch/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    let base = dirs::data_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::cache_dir();

    base.map(|d| d.join(APP_DIR_NAME).join("models"))
        .ok_or(ModelResolveError::NoCacheDir)
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let download_err = |source| ModelResolveError::Download {
        url: url.to_string(),
        source,
    };
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;
    let total = response.content_length().unwrap_or(0);

    // Written under a temporary name and renamed so a partial download is
    // never picked up by `locate`.
    let temp_path = dest.with_extension("part");
    let write_err = |source| ModelResolveError::Write {
        path: temp_path.clone(),
        source,
    };
    let result = (|| {
        let mut file = fs::File::create(&temp_path).map_err(write_err)?;
        copy_with_progress(&mut response, &mut file, total, progress.as_deref())
            .map_err(write_err)?;
        file.flush().map_err(write_err)
    })();
    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, dest).map_err(|source| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source,
    })
}

fn copy_with_progress(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    total: u64,
    progress: Option<&(dyn Fn(u64, u64) + Send)>,
) -> io::Result<u64> {
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut copied = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(copied);
        }
        writer.write_all(&buf[..n])?;
        copied += n as u64;
        if let Some(cb) = progress {
            cb(copied, total);
        }
    }
}
