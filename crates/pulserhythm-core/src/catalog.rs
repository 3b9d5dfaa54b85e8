//! Technique catalog: built-ins plus user-defined techniques.
//!
//! Custom techniques live in the `techniques` table; built-ins are
//! compiled in. The engine snapshots whichever technique it is handed,
//! so catalog edits never affect a session in flight.

use uuid::Uuid;

use crate::error::{CoreError, ValidationError};
use crate::storage::Database;
use crate::technique::Technique;

pub struct TechniqueCatalog {
    builtins: Vec<Technique>,
    custom: Vec<Technique>,
}

impl TechniqueCatalog {
    /// Load the catalog: compiled-in built-ins plus stored customs.
    pub fn load(db: &Database) -> Result<Self, CoreError> {
        Ok(Self {
            builtins: Technique::builtins(),
            custom: db.custom_techniques()?,
        })
    }

    /// All techniques, built-ins first.
    pub fn all(&self) -> Vec<&Technique> {
        self.builtins.iter().chain(self.custom.iter()).collect()
    }

    pub fn builtins(&self) -> &[Technique] {
        &self.builtins
    }

    pub fn custom(&self) -> &[Technique] {
        &self.custom
    }

    /// Look up by id.
    pub fn get(&self, id: Uuid) -> Option<&Technique> {
        self.all().into_iter().find(|t| t.id == id)
    }

    /// Look up by id string or case-insensitive name.
    ///
    /// # Errors
    /// Returns a [`ValidationError::NotFound`] when nothing matches.
    pub fn find(&self, query: &str) -> Result<&Technique, ValidationError> {
        if let Ok(id) = Uuid::parse_str(query) {
            if let Some(t) = self.get(id) {
                return Ok(t);
            }
        }
        self.all()
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(query))
            .ok_or_else(|| ValidationError::NotFound {
                kind: "technique",
                query: query.to_string(),
            })
    }

    /// Add a custom technique (validated) and persist it.
    pub fn add(&mut self, db: &Database, technique: Technique) -> Result<(), CoreError> {
        db.insert_technique(&technique)?;
        self.custom.push(technique);
        Ok(())
    }

    /// Update a stored custom technique by id.
    ///
    /// # Errors
    /// Returns [`ValidationError::NotFound`] if no custom technique has
    /// that id (built-ins are immutable).
    pub fn update(&mut self, db: &Database, technique: Technique) -> Result<(), CoreError> {
        if !db.update_technique(&technique)? {
            return Err(ValidationError::NotFound {
                kind: "custom technique",
                query: technique.id.to_string(),
            }
            .into());
        }
        if let Some(existing) = self.custom.iter_mut().find(|t| t.id == technique.id) {
            *existing = technique;
        }
        Ok(())
    }

    /// Remove a custom technique by id.
    ///
    /// # Errors
    /// Returns [`ValidationError::NotFound`] if no custom technique has
    /// that id.
    pub fn remove(&mut self, db: &Database, id: Uuid) -> Result<(), CoreError> {
        if !db.delete_technique(id)? {
            return Err(ValidationError::NotFound {
                kind: "custom technique",
                query: id.to_string(),
            }
            .into());
        }
        self.custom.retain(|t| t.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_come_first() {
        let db = Database::open_memory().unwrap();
        let catalog = TechniqueCatalog::load(&db).unwrap();
        assert_eq!(catalog.all().len(), 4);
        assert_eq!(catalog.all()[0].name, "4-7-8");
    }

    #[test]
    fn find_by_name_is_case_insensitive() {
        let db = Database::open_memory().unwrap();
        let catalog = TechniqueCatalog::load(&db).unwrap();
        assert_eq!(catalog.find("box breathing").unwrap().name, "Box Breathing");
        assert!(catalog.find("no such thing").is_err());
    }

    #[test]
    fn find_by_id() {
        let db = Database::open_memory().unwrap();
        let catalog = TechniqueCatalog::load(&db).unwrap();
        let id = catalog.builtins()[0].id;
        assert_eq!(catalog.find(&id.to_string()).unwrap().name, "4-7-8");
    }

    #[test]
    fn custom_crud_persists() {
        let db = Database::open_memory().unwrap();
        let mut catalog = TechniqueCatalog::load(&db).unwrap();

        let t = Technique::new("Evening Wind-Down", "", 5, 2, 7, 0).unwrap();
        let id = t.id;
        catalog.add(&db, t).unwrap();
        assert_eq!(catalog.custom().len(), 1);
        assert_eq!(catalog.find("evening wind-down").unwrap().id, id);

        // Survives a reload.
        let reloaded = TechniqueCatalog::load(&db).unwrap();
        assert_eq!(reloaded.custom().len(), 1);

        catalog.remove(&db, id).unwrap();
        assert!(catalog.custom().is_empty());
        assert!(catalog.remove(&db, id).is_err());
    }

    #[test]
    fn update_rejects_unknown_id() {
        let db = Database::open_memory().unwrap();
        let mut catalog = TechniqueCatalog::load(&db).unwrap();
        let stray = Technique::new("Stray", "", 4, 0, 4, 0).unwrap();
        assert!(catalog.update(&db, stray).is_err());
    }
}
