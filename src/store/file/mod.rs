use async_trait::async_trait;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs;

use crate::store::{Error, StoreBackend, decode_record, encode_record};
use crate::{Id, SessionRecord};

const EXTENSION: &str = "session";

/// Longest id, in bytes, that is hex-encoded verbatim into a file name.
/// Longer ids are named by their BLAKE3 hash to stay below `NAME_MAX`.
const MAX_HEX_ID_LEN: usize = 100;

/// A file-backed session store.
///
/// Each session is written to its own file inside a directory. The file name is
/// the hex encoding of the session id, or `b3-` followed by the id's BLAKE3
/// hash for ids longer than 100 bytes, so arbitrary ids are safe to store.
/// Writes go to a temporary file which is then renamed over the target.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: Arc<PathBuf>,
}

impl FileStore {
    /// Uses `dir` as the session directory. The directory must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
        }
    }

    /// Creates `dir` (and any missing parents) before using it.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &Id) -> PathBuf {
        let bytes = id.as_bytes();
        let mut name = String::with_capacity(bytes.len().min(MAX_HEX_ID_LEN) * 2 + 16);
        if bytes.len() <= MAX_HEX_ID_LEN {
            for byte in bytes {
                let _ = write!(name, "{byte:02x}");
            }
        } else {
            name.push_str("b3-");
            name.push_str(blake3::hash(bytes).to_hex().as_str());
        }
        name.push('.');
        name.push_str(EXTENSION);
        self.dir.join(name)
    }

    async fn read(path: &Path) -> Result<Option<SessionRecord>, Error> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(decode_record(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl StoreBackend for FileStore {
    async fn find(
        &self,
        id: &Id,
        valid_since: OffsetDateTime,
    ) -> Result<Option<SessionRecord>, Error> {
        let record = Self::read(&self.path_for(id)).await?;
        Ok(record.filter(|record| record.created_at() >= valid_since))
    }

    async fn store(&self, record: &SessionRecord) -> Result<bool, Error> {
        let bytes = encode_record(record)?;
        let path = self.path_for(record.id());
        let tmp = path.with_extension(format!("{EXTENSION}.tmp-{:016x}", rand::random::<u64>()));

        if let Err(err) = fs::write(&tmp, &bytes).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        Ok(true)
    }

    async fn remove(&self, id: &Id) -> Result<bool, Error> {
        match fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn remove_older_than(&self, cutoff: OffsetDateTime) -> Result<u64, Error> {
        let mut removed = 0;
        let mut entries = fs::read_dir(self.dir.as_path()).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }

            let record = match Self::read(&path).await {
                Ok(Some(record)) => record,
                // Removed concurrently.
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(err = %err, path = %path.display(), "skipping unreadable session file");
                    continue;
                }
            };

            if record.created_at() < cutoff {
                match fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(err) if err.kind() == ErrorKind::NotFound => {}
                    Err(err) => return Err(err.into()),
                }
            }
        }

        Ok(removed)
    }
}
