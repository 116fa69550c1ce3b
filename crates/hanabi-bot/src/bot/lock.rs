use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Mutual exclusion around an agent's poll and turn.
///
/// The guard releases the lock when dropped, on every exit path.
pub trait TurnLock {
    type Guard<'a>
    where
        Self: 'a;

    fn acquire(&mut self) -> io::Result<Self::Guard<'_>>;
}

/// Advisory lock on a file shared by every agent process of one game.
pub struct FileTurnLock {
    inner: fd_lock::RwLock<File>,
    path: PathBuf,
}

impl FileTurnLock {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self {
            inner: fd_lock::RwLock::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TurnLock for FileTurnLock {
    type Guard<'a> = fd_lock::RwLockWriteGuard<'a, File>;

    fn acquire(&mut self) -> io::Result<Self::Guard<'_>> {
        self.inner.write()
    }
}

/// Single-process stand-in that only counts acquisitions.
#[derive(Debug, Default)]
pub struct LocalTurnLock {
    acquisitions: usize,
}

impl LocalTurnLock {
    pub fn acquisitions(&self) -> usize {
        self.acquisitions
    }
}

impl TurnLock for LocalTurnLock {
    type Guard<'a> = ();

    fn acquire(&mut self) -> io::Result<()> {
        self.acquisitions += 1;
        Ok(())
    }
}
