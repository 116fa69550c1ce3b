use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::model::table::Table;
use crate::model::view::GameView;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Final state one agent hands back to the fitness evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalResult {
    pub player: String,
    pub table: Table,
    pub used_note_tokens: u8,
    pub used_storm_tokens: u8,
    pub score: usize,
}

#[derive(Debug, Error)]
pub enum ResultFileError {
    #[error("failed to access result file {path:?}: {source}")]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("malformed result file {path:?}: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },
}

impl TerminalResult {
    pub fn from_view(player: &str, view: &GameView) -> Self {
        Self {
            player: player.to_string(),
            table: view.table.clone(),
            used_note_tokens: view.used_note_tokens,
            used_storm_tokens: view.used_storm_tokens,
            score: view.table.score(),
        }
    }

    pub fn path_in(dir: &Path, player: &str) -> PathBuf {
        dir.join(format!("{player}.json"))
    }

    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ResultFileError> {
        let path = Self::path_in(dir, &self.player);
        let io_err = |source| ResultFileError::Io {
            source,
            path: path.clone(),
        };
        fs::create_dir_all(dir).map_err(io_err)?;
        let mut writer = BufWriter::new(File::create(&path).map_err(io_err)?);
        serde_json::to_writer_pretty(&mut writer, self).map_err(|source| ResultFileError::Json {
            source,
            path: path.clone(),
        })?;
        writer.flush().map_err(io_err)?;
        Ok(path)
    }

    pub fn read_from_dir(dir: &Path, player: &str) -> Result<Self, ResultFileError> {
        let path = Self::path_in(dir, player);
        let file = File::open(&path).map_err(|source| ResultFileError::Io {
            source,
            path: path.clone(),
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|source| ResultFileError::Json { source, path })
    }
}
