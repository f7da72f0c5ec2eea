use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::config::Config;

#[derive(Clone, Debug)]
pub struct Paths {
    pub sock: PathBuf,
    pub lock: PathBuf,
}

impl Paths {
    pub fn new(cfg: &Config) -> Self {
        Self::for_socket(&cfg.socket)
    }

    pub fn for_socket(sock: &Path) -> Self {
        Self {
            sock: sock.to_path_buf(),
            lock: sock.with_extension("lock"),
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = self.sock.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.as_path()
    }
}
