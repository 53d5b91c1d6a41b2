//! Persistence collaborators for part types and lots
//!
//! The core only needs load/save/delete by id. [`FileStore`] keeps one YAML
//! file per entity under the project directory; [`MemoryStore`] backs tests.

use miette::Diagnostic;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::project::{Project, ProjectError};
use crate::entities::{Lot, PartType};
use crate::yaml::YamlSyntaxError;

/// Errors raised by stores and codecs
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    #[diagnostic(code(ilt::store::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Corrupt(#[from] YamlSyntaxError),

    #[error("failed to serialize entity: {0}")]
    #[diagnostic(code(ilt::store::serialize))]
    Serialize(#[from] serde_yml::Error),

    #[error("malformed JSON blob: {0}")]
    #[diagnostic(code(ilt::store::codec))]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Project(#[from] ProjectError),
}

impl StoreError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Parse YAML, turning failures into a diagnostic pointing into the file
pub fn parse_yaml<T: DeserializeOwned>(contents: &str, path: &Path) -> StoreResult<T> {
    serde_yml::from_str(contents).map_err(|e| {
        StoreError::Corrupt(YamlSyntaxError::from_serde_error(
            &e,
            contents,
            &path.display().to_string(),
        ))
    })
}

/// Load/save contract for part types
pub trait PartTypeStore {
    fn get_part_type(&self, id: &EntityId) -> StoreResult<Option<PartType>>;

    fn list_part_types(&self) -> StoreResult<Vec<PartType>>;

    fn save_part_type(&self, part_type: &PartType) -> StoreResult<()>;

    fn delete_part_type(&self, id: &EntityId) -> StoreResult<()>;

    fn part_type_exists(&self, id: &EntityId) -> StoreResult<bool> {
        Ok(self.get_part_type(id)?.is_some())
    }
}

/// Load/save contract for lots (with their measurements)
pub trait BatchStore {
    fn get_lot(&self, id: &EntityId) -> StoreResult<Option<Lot>>;

    fn list_lots(&self) -> StoreResult<Vec<Lot>>;

    fn save_lot(&self, lot: &Lot) -> StoreResult<()>;

    fn delete_lot(&self, id: &EntityId) -> StoreResult<()>;

    fn lot_code_exists(&self, code: &str) -> StoreResult<bool> {
        Ok(self.list_lots()?.iter().any(|l| l.code == code))
    }

    /// Number of lots referencing a part type
    fn count_lots_for_part_type(&self, part_type: &EntityId) -> StoreResult<usize> {
        Ok(self
            .list_lots()?
            .iter()
            .filter(|l| &l.part_type == part_type)
            .count())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    part_types: RefCell<BTreeMap<EntityId, PartType>>,
    lots: RefCell<BTreeMap<EntityId, Lot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartTypeStore for MemoryStore {
    fn get_part_type(&self, id: &EntityId) -> StoreResult<Option<PartType>> {
        Ok(self.part_types.borrow().get(id).cloned())
    }

    fn list_part_types(&self) -> StoreResult<Vec<PartType>> {
        Ok(self.part_types.borrow().values().cloned().collect())
    }

    fn save_part_type(&self, part_type: &PartType) -> StoreResult<()> {
        self.part_types
            .borrow_mut()
            .insert(part_type.id.clone(), part_type.clone());
        Ok(())
    }

    fn delete_part_type(&self, id: &EntityId) -> StoreResult<()> {
        self.part_types.borrow_mut().remove(id);
        Ok(())
    }
}

impl BatchStore for MemoryStore {
    fn get_lot(&self, id: &EntityId) -> StoreResult<Option<Lot>> {
        Ok(self.lots.borrow().get(id).cloned())
    }

    fn list_lots(&self) -> StoreResult<Vec<Lot>> {
        Ok(self.lots.borrow().values().cloned().collect())
    }

    fn save_lot(&self, lot: &Lot) -> StoreResult<()> {
        self.lots.borrow_mut().insert(lot.id.clone(), lot.clone());
        Ok(())
    }

    fn delete_lot(&self, id: &EntityId) -> StoreResult<()> {
        self.lots.borrow_mut().remove(id);
        Ok(())
    }
}

/// One YAML file per entity under the project directory
#[derive(Debug, Clone)]
pub struct FileStore {
    project: Project,
}

impl FileStore {
    pub fn new(project: Project) -> Self {
        Self { project }
    }

    /// Store for the project containing the current directory
    pub fn discover() -> StoreResult<Self> {
        Ok(Self::new(Project::discover()?))
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Path where an entity is (or would be) stored
    pub fn path_of(&self, id: &EntityId) -> PathBuf {
        self.project.entity_path(id)
    }

    fn load<T: Entity>(&self, id: &EntityId) -> StoreResult<Option<T>> {
        let path = self.path_of(id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_file(&path).map(Some)
    }

    fn read_file<T: Entity>(path: &Path) -> StoreResult<T> {
        let contents = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        parse_yaml(&contents, path)
    }

    fn load_all<T: Entity>(&self, prefix: EntityPrefix) -> StoreResult<Vec<T>> {
        let dir = self.project.entity_dir(prefix);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| StoreError::io(&dir, e))? {
            let path = entry.map_err(|e| StoreError::io(&dir, e))?.path();
            if path.to_string_lossy().ends_with(".ilt.yaml") {
                paths.push(path);
            }
        }
        paths.sort();

        paths.iter().map(|p| Self::read_file(p)).collect()
    }

    /// Write to a sibling temp file, then rename over the target
    fn write<T: Entity>(&self, entity: &T) -> StoreResult<()> {
        let path = self.path_of(entity.id());
        let dir = self.project.entity_dir(T::PREFIX);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let contents = serde_yml::to_string(entity)?;
        let tmp = dir.join(format!(".{}.tmp", entity.file_name()));
        fs::write(&tmp, contents).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::io(&path, e))
    }

    fn remove(&self, id: &EntityId) -> StoreResult<()> {
        let path = self.path_of(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}

impl PartTypeStore for FileStore {
    fn get_part_type(&self, id: &EntityId) -> StoreResult<Option<PartType>> {
        self.load(id)
    }

    fn list_part_types(&self) -> StoreResult<Vec<PartType>> {
        self.load_all(EntityPrefix::Pt)
    }

    fn save_part_type(&self, part_type: &PartType) -> StoreResult<()> {
        self.write(part_type)
    }

    fn delete_part_type(&self, id: &EntityId) -> StoreResult<()> {
        self.remove(id)
    }
}

impl BatchStore for FileStore {
    fn get_lot(&self, id: &EntityId) -> StoreResult<Option<Lot>> {
        self.load(id)
    }

    fn list_lots(&self) -> StoreResult<Vec<Lot>> {
        self.load_all(EntityPrefix::Lot)
    }

    fn save_lot(&self, lot: &Lot) -> StoreResult<()> {
        self.write(lot)
    }

    fn delete_lot(&self, id: &EntityId) -> StoreResult<()> {
        self.remove(id)
    }
}
