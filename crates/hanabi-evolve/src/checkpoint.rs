//! Best-genome checkpoint: the genome on the first line, its fitness on the second.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hanabi_bot::policy::{Genome, GenomeError};
use thiserror::Error;
use tracing::{Level, event};

#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub genome: Genome,
    pub fitness: f64,
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint {path:?}: {source}")]
    Io {
        #[source]
        source: io::Error,
        path: PathBuf,
    },
    #[error("checkpoint {path:?} is missing the {line} line")]
    MissingLine { path: PathBuf, line: &'static str },
    #[error("checkpoint {path:?} has an invalid genome: {source}")]
    Genome {
        #[source]
        source: GenomeError,
        path: PathBuf,
    },
    #[error("checkpoint {path:?} has an invalid fitness {raw:?}")]
    Fitness { path: PathBuf, raw: String },
}

impl Checkpoint {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| CheckpointError::Io {
            source,
            path: path.to_path_buf(),
        })?;
        Self::parse(&text, path)
    }

    /// `Ok(None)` when nothing has been saved at `path` yet.
    pub fn load_existing(path: impl AsRef<Path>) -> Result<Option<Self>, CheckpointError> {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(CheckpointError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                event!(
                    target: "hanabi_evolve::checkpoint",
                    Level::INFO,
                    path = %path.display(),
                    "no existing strategy"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn parse(text: &str, path: &Path) -> Result<Self, CheckpointError> {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
        let genome_line = lines.next().ok_or_else(|| CheckpointError::MissingLine {
            path: path.to_path_buf(),
            line: "genome",
        })?;
        let fitness_line = lines.next().ok_or_else(|| CheckpointError::MissingLine {
            path: path.to_path_buf(),
            line: "fitness",
        })?;
        let genome = genome_line
            .parse::<Genome>()
            .map_err(|source| CheckpointError::Genome {
                source,
                path: path.to_path_buf(),
            })?;
        let fitness = fitness_line
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| CheckpointError::Fitness {
                path: path.to_path_buf(),
                raw: fitness_line.to_string(),
            })?;
        Ok(Self { genome, fitness })
    }

    /// Writes through a sibling temp file so readers never see half a checkpoint.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CheckpointError> {
        let path = path.as_ref();
        let io_err = |source| CheckpointError::Io {
            source,
            path: path.to_path_buf(),
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, format!("{}\n{}\n", self.genome, self.fitness)).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        event!(
            target: "hanabi_evolve::checkpoint",
            Level::DEBUG,
            path = %path.display(),
            fitness = self.fitness,
            "checkpoint saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Checkpoint, CheckpointError};
    use hanabi_bot::policy::Genome;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_keeps_order_and_fitness() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("best_strategy.txt");
        let checkpoint = Checkpoint {
            genome: "3 1 0 2".parse::<Genome>().unwrap(),
            fitness: 17.25,
        };
        checkpoint.save(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "3 1 0 2\n17.25\n");
        assert_eq!(Checkpoint::load(&path).unwrap(), checkpoint);
        assert!(!path.with_extension("txt.tmp").exists());
    }

    #[test]
    fn bracketed_lists_are_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("best.txt");
        fs::write(&path, "[2, 0, 1]\n12.5\n").unwrap();
        let loaded = Checkpoint::load(&path).unwrap();
        assert_eq!(loaded.genome.genes(), &[2, 0, 1]);
        assert_eq!(loaded.fitness, 12.5);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempdir().unwrap();
        let loaded = Checkpoint::load_existing(dir.path().join("absent.txt")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn malformed_files_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.txt");

        fs::write(&path, "0 1 2\n").unwrap();
        assert!(matches!(
            Checkpoint::load_existing(&path),
            Err(CheckpointError::MissingLine { line: "fitness", .. })
        ));

        fs::write(&path, "0 0 2\n3\n").unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(CheckpointError::Genome { .. })
        ));

        fs::write(&path, "0 1 2\nlots\n").unwrap();
        assert!(matches!(
            Checkpoint::load(&path),
            Err(CheckpointError::Fitness { .. })
        ));
    }
}
