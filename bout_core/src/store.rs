//! Saved workout library with file locking.
//!
//! Workouts are kept in a single JSON file. Reads take a shared lock;
//! every mutation holds an exclusive lock on a sidecar `.lock` file for
//! the whole load-modify-save cycle and replaces the library atomically.

use crate::{BlockDefinition, Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A named, user-saved block sequence
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedWorkout {
    pub name: String,
    pub blocks: Vec<BlockDefinition>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct Library {
    #[serde(default)]
    workouts: Vec<SavedWorkout>,
}

impl Library {
    fn position(&self, name: &str) -> Option<usize> {
        self.workouts.iter().position(|w| w.name == name)
    }
}

/// Handle to the workout library file
pub struct WorkoutStore {
    path: PathBuf,
}

impl WorkoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All saved workouts, sorted by name
    pub fn list(&self) -> Result<Vec<SavedWorkout>> {
        let mut workouts = self.read()?.workouts;
        workouts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(workouts)
    }

    pub fn get(&self, name: &str) -> Result<SavedWorkout> {
        self.read()?
            .workouts
            .into_iter()
            .find(|w| w.name == name)
            .ok_or_else(|| Error::WorkoutNotFound(name.to_string()))
    }

    /// Save a sequence under `name`, replacing any workout of that name
    pub fn save(&self, name: &str, blocks: Vec<BlockDefinition>) -> Result<SavedWorkout> {
        let name = checked_name(name)?;
        let workout = SavedWorkout {
            name: name.to_string(),
            blocks,
            created_at: Utc::now(),
        };

        let saved = workout.clone();
        self.update(move |library| {
            match library.position(&workout.name) {
                Some(i) => library.workouts[i] = workout,
                None => library.workouts.push(workout),
            }
            Ok(())
        })?;

        tracing::info!("Saved workout '{}'", saved.name);
        Ok(saved)
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let to = checked_name(to)?;
        if from == to {
            return Ok(());
        }

        self.update(|library| {
            if library.position(to).is_some() {
                return Err(Error::WorkoutExists(to.to_string()));
            }
            let i = library
                .position(from)
                .ok_or_else(|| Error::WorkoutNotFound(from.to_string()))?;
            library.workouts[i].name = to.to_string();
            Ok(())
        })?;

        tracing::info!("Renamed workout '{}' to '{}'", from, to);
        Ok(())
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        self.update(|library| {
            let i = library
                .position(name)
                .ok_or_else(|| Error::WorkoutNotFound(name.to_string()))?;
            library.workouts.remove(i);
            Ok(())
        })?;

        tracing::info!("Deleted workout '{}'", name);
        Ok(())
    }

    /// Load a workout, change its blocks, and store it back
    pub fn modify_blocks<F>(&self, name: &str, f: F) -> Result<SavedWorkout>
    where
        F: FnOnce(&mut Vec<BlockDefinition>) -> Result<()>,
    {
        let mut modified = None;
        self.update(|library| {
            let i = library
                .position(name)
                .ok_or_else(|| Error::WorkoutNotFound(name.to_string()))?;
            f(&mut library.workouts[i].blocks)?;
            modified = Some(library.workouts[i].clone());
            Ok(())
        })?;

        modified.ok_or_else(|| Error::Store(format!("Workout '{}' was not modified", name)))
    }

    /// Read the library with a shared lock
    ///
    /// A missing file is an empty library. An unreadable or corrupted file
    /// is logged and treated as empty.
    fn read(&self) -> Result<Library> {
        if !self.path.exists() {
            tracing::debug!("No workout library at {:?}", self.path);
            return Ok(Library::default());
        }

        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open workout library {:?}: {}", self.path, e);
                return Ok(Library::default());
            }
        };

        file.lock_shared()?;
        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;

        if let Err(e) = read {
            tracing::warn!("Failed to read workout library {:?}: {}", self.path, e);
            return Ok(Library::default());
        }

        match serde_json::from_str::<Library>(&contents) {
            Ok(library) => Ok(library),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse workout library {:?}: {}. Treating as empty.",
                    self.path,
                    e
                );
                Ok(Library::default())
            }
        }
    }

    /// Load-modify-save under an exclusive lock
    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Library) -> Result<()>,
    {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Store(format!("{:?} has no parent directory", self.path)))?;
        std::fs::create_dir_all(parent)?;

        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;

        let result = self.read().and_then(|mut library| {
            f(&mut library)?;
            self.write(parent, &library)
        });

        lock.unlock()?;
        result
    }

    fn write(&self, parent: &Path, library: &Library) -> Result<()> {
        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, library)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Wrote {} workouts to {:?}", library.workouts.len(), self.path);
        Ok(())
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }
}

fn checked_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Store("Workout name must not be empty".into()));
    }
    Ok(trimmed)
}
