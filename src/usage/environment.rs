use std::fs::OpenOptions;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{FixedOffset, Local, Offset, Utc};
use md5::{Digest, Md5};
use tracing::debug;
use uuid::Uuid;

use super::version_source::VersionSource;

pub const USER_ID_FILE: &str = "user_id";
const USER_ID_LEN: usize = 16;
const BACKEND_SOFTWARE: &str = "hopsworks";

/// First 16 hex digits of a random v4 UUID.
pub fn generate_user_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(USER_ID_LEN);
    id
}

/// Reads `<dir>/user_id`, creating it with a fresh id when absent.
/// An existing file is never overwritten.
pub fn load_or_create_user_id(dir: &Path) -> io::Result<String> {
    let path = dir.join(USER_ID_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => return Ok(content.trim_end().to_string()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    std::fs::create_dir_all(dir)?;
    let user_id = generate_user_id();
    match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(mut file) => {
            file.write_all(user_id.as_bytes())?;
            debug!("Created anonymous usage id in {}", path.display());
            Ok(user_id)
        }
        // lost a race against another process: keep its id
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Ok(std::fs::read_to_string(&path)?.trim_end().to_string())
        }
        Err(e) => Err(e),
    }
}

/// Hex MD5 of the hostname, the same value the other Hopsworks clients report.
/// `None` when there is no hostname to hash.
pub fn hash_hostname(hostname: Option<&str>) -> Option<String> {
    hostname
        .filter(|h| !h.is_empty())
        .map(|h| hex::encode(Md5::digest(h.as_bytes())))
}

pub fn platform() -> String {
    format!(
        "{}-{}-{}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        std::env::consts::FAMILY
    )
}

/// Lazily computed facts about the running environment, cached after first use.
#[derive(Debug)]
pub struct EnvironmentAttributes {
    usage_dir: PathBuf,
    backend_hostname: Option<String>,
    user_id: Option<String>,
    platform: Option<String>,
    timezone: Option<FixedOffset>,
}

impl EnvironmentAttributes {
    pub fn new(usage_dir: PathBuf, backend_hostname: Option<String>) -> Self {
        Self {
            usage_dir,
            backend_hostname,
            user_id: None,
            platform: None,
            timezone: None,
        }
    }

    /// Failed reads are not cached.
    pub fn user_id(&mut self) -> io::Result<String> {
        if let Some(id) = &self.user_id {
            return Ok(id.clone());
        }
        let id = load_or_create_user_id(&self.usage_dir)?;
        self.user_id = Some(id.clone());
        Ok(id)
    }

    pub fn platform(&mut self) -> String {
        self.platform.get_or_insert_with(platform).clone()
    }

    pub fn timezone(&mut self) -> FixedOffset {
        *self
            .timezone
            .get_or_insert_with(|| Local::now().offset().fix())
    }

    /// Current time in the cached local timezone, e.g. `2024-03-01 13:45:10 +01:00`.
    pub fn datetime(&mut self) -> String {
        Utc::now()
            .with_timezone(&self.timezone())
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string()
    }

    pub fn backend_hostname(&self) -> Option<&str> {
        self.backend_hostname.as_deref()
    }

    pub fn sdk_version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

/// Backend version lookup. Only a successful lookup is remembered, so an
/// offline backend is asked again on the next call.
#[derive(Debug, Default)]
pub struct BackendVersion {
    cached: Mutex<Option<String>>,
}

impl BackendVersion {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, sources: &[Box<dyn VersionSource>]) -> Option<String> {
        if let Some(version) = self.peek() {
            return Some(version);
        }
        for source in sources {
            match source.get_version(BACKEND_SOFTWARE).await {
                Ok(version) => {
                    if let Ok(mut cached) = self.cached.lock() {
                        *cached = Some(version.clone());
                    }
                    return Some(version);
                }
                Err(e) => debug!("Backend version lookup via {} failed: {}", source.get_name(), e),
            }
        }
        None
    }

    pub fn peek(&self) -> Option<String> {
        self.cached.lock().ok().and_then(|cached| cached.clone())
    }

    pub fn clear(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            *cached = None;
        }
    }
}
