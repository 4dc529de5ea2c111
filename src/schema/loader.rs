//! Schema loader for schema declaration files
//!
//! - One JSON declaration per file, `*.json` only
//! - Declarations are concrete schemas, abstract family bases, or variants
//! - Variants are registered after every base they may extend
//! - Malformed declarations fail the whole load

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::errors::{FormError, FormResult};
use super::family::SchemaFamily;
use super::types::{FieldDef, Schema};
use crate::column::BindTarget;

/// A schema declaration as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaDecl {
    /// Plain instantiable schema
    Concrete {
        name: String,
        #[serde(default)]
        fields: Vec<FieldDef>,
    },
    /// Base of a polymorphic family
    Abstract {
        name: String,
        discriminator: String,
        #[serde(default)]
        fields: Vec<FieldDef>,
    },
    /// Concrete member of a family
    Variant {
        name: String,
        extends: String,
        tag: String,
        #[serde(default)]
        fields: Vec<FieldDef>,
    },
}

impl SchemaDecl {
    pub fn name(&self) -> &str {
        match self {
            SchemaDecl::Concrete { name, .. }
            | SchemaDecl::Abstract { name, .. }
            | SchemaDecl::Variant { name, .. } => name,
        }
    }

    fn is_variant(&self) -> bool {
        matches!(self, SchemaDecl::Variant { .. })
    }
}

/// Schema loader that reads declaration files and keeps an in-memory registry.
pub struct SchemaLoader {
    /// Directory containing declaration files
    schema_dir: PathBuf,
    /// Every schema by name, abstract ones included
    schemas: BTreeMap<String, Arc<Schema>>,
    /// Families by abstract base name
    families: BTreeMap<String, SchemaFamily>,
}

impl SchemaLoader {
    /// Creates a loader for declaration files in `schema_dir`.
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_dir: schema_dir.to_path_buf(),
            schemas: BTreeMap::new(),
            families: BTreeMap::new(),
        }
    }

    /// Returns the schema directory path.
    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every declaration file in the schema directory.
    ///
    /// A missing directory loads nothing. Files are read in name order.
    pub fn load_all(&mut self) -> FormResult<()> {
        if !self.schema_dir.exists() {
            debug!(dir = %self.schema_dir.display(), "schema directory absent");
            return Ok(());
        }

        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            malformed(&self.schema_dir, format!("failed to read schema directory: {}", e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| {
                    malformed(&self.schema_dir, format!("failed to read directory entry: {}", e))
                })?
                .path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut decls = Vec::with_capacity(paths.len());
        for path in &paths {
            decls.push((path, Self::read_decl(path)?));
        }

        // Bases before variants so `extends` always resolves.
        decls.sort_by_key(|(_, decl)| decl.is_variant());
        for (path, decl) in decls {
            self.register(decl)
                .map_err(|e| malformed(path, e.to_string()))?;
        }

        debug!(
            dir = %self.schema_dir.display(),
            schemas = self.schemas.len(),
            families = self.families.len(),
            "schemas loaded"
        );
        Ok(())
    }

    fn read_decl(path: &Path) -> FormResult<SchemaDecl> {
        let content = fs::read_to_string(path)
            .map_err(|e| malformed(path, format!("failed to read file: {}", e)))?;
        serde_json::from_str(&content).map_err(|e| malformed(path, format!("invalid JSON: {}", e)))
    }

    /// Registers a declaration directly.
    pub fn register(&mut self, decl: SchemaDecl) -> FormResult<()> {
        if self.schemas.contains_key(decl.name()) {
            return Err(FormError::configuration(format!(
                "schema '{}' is already declared",
                decl.name()
            )));
        }

        let schema = match decl {
            SchemaDecl::Concrete { name, fields } => Schema::builder(name).fields(fields).build()?,
            SchemaDecl::Abstract {
                name,
                discriminator,
                fields,
            } => {
                let schema = Schema::abstract_builder(name, discriminator)
                    .fields(fields)
                    .build()?;
                self.families
                    .insert(schema.name().to_string(), SchemaFamily::new(Arc::clone(&schema))?);
                schema
            }
            SchemaDecl::Variant {
                name,
                extends,
                tag,
                fields,
            } => {
                let family = self.families.get_mut(&extends).ok_or_else(|| {
                    FormError::configuration(format!(
                        "variant '{}' extends unknown abstract schema '{}'",
                        name, extends
                    ))
                })?;
                let schema = Schema::variant_of(family.base(), name, tag)
                    .fields(fields)
                    .build()?;
                family.register(Arc::clone(&schema))?;
                schema
            }
        };

        self.schemas.insert(schema.name().to_string(), schema);
        Ok(())
    }

    /// Gets a schema by name.
    pub fn schema(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    /// Gets a family by its abstract base name.
    pub fn family(&self, name: &str) -> Option<Arc<SchemaFamily>> {
        self.families.get(name).cloned().map(Arc::new)
    }

    /// Returns what a column should bind to for `name`: the family for an
    /// abstract schema, the schema itself otherwise.
    pub fn target(&self, name: &str) -> Option<BindTarget> {
        let schema = self.schema(name)?;
        if schema.is_abstract() {
            self.family(name).map(BindTarget::Family)
        } else {
            Some(BindTarget::Schema(Arc::clone(schema)))
        }
    }

    /// Iterates every loaded schema in name order.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }

    /// Returns the number of loaded schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Saves a declaration to `<schema_dir>/schema_<name>.json`.
    ///
    /// Existing files are never overwritten.
    pub fn save_decl(&self, decl: &SchemaDecl) -> FormResult<PathBuf> {
        let path = self.schema_dir.join(format!("schema_{}.json", decl.name()));
        if path.exists() {
            return Err(malformed(&path, "declaration file already exists"));
        }

        fs::create_dir_all(&self.schema_dir).map_err(|e| {
            malformed(&self.schema_dir, format!("failed to create schema directory: {}", e))
        })?;
        let content = serde_json::to_string_pretty(decl)
            .map_err(|e| malformed(&path, format!("failed to serialize declaration: {}", e)))?;
        fs::write(&path, content).map_err(|e| malformed(&path, format!("failed to write file: {}", e)))?;

        Ok(path)
    }
}

fn malformed(path: &Path, reason: impl AsRef<str>) -> FormError {
    FormError::configuration(format!(
        "malformed schema file '{}': {}",
        path.display(),
        reason.as_ref()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, file: &str, value: serde_json::Value) {
        fs::write(dir.join(file), value.to_string()).unwrap();
    }

    #[test]
    fn test_load_family_from_disk() {
        let tmp = TempDir::new().unwrap();
        // Variant sorts before its base by file name.
        write(
            tmp.path(),
            "a_cform.json",
            json!({
                "kind": "variant",
                "name": "CForm",
                "extends": "AForm",
                "tag": "a.c.v1",
                "fields": [{"name": "d", "type": "dict", "key": {"type": "string"}, "value": {"type": "string"}}]
            }),
        );
        write(
            tmp.path(),
            "b_aform.json",
            json!({
                "kind": "abstract",
                "name": "AForm",
                "discriminator": "_type_",
                "fields": [
                    {"name": "a", "type": "integer"},
                    {"name": "b", "type": "float", "default": 1.13}
                ]
            }),
        );
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let mut loader = SchemaLoader::new(tmp.path());
        loader.load_all().unwrap();

        assert_eq!(loader.schema_count(), 2);
        let family = loader.family("AForm").unwrap();
        assert_eq!(family.variant_by_tag("a.c.v1").unwrap().name(), "CForm");
        assert!(matches!(loader.target("AForm"), Some(BindTarget::Family(_))));
        assert!(matches!(loader.target("CForm"), Some(BindTarget::Schema(_))));
    }

    #[test]
    fn test_missing_directory_loads_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut loader = SchemaLoader::new(&tmp.path().join("absent"));
        assert!(loader.load_all().is_ok());
        assert_eq!(loader.schema_count(), 0);
    }

    #[test]
    fn test_malformed_file_fails_load() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("bad.json"), "{not json").unwrap();
        let mut loader = SchemaLoader::new(tmp.path());
        let err = loader.load_all().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_variant_of_unknown_base_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut loader = SchemaLoader::new(tmp.path());
        let err = loader
            .register(SchemaDecl::Variant {
                name: "CForm".into(),
                extends: "Nope".into(),
                tag: "a.c.v1".into(),
                fields: vec![],
            })
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let loader = SchemaLoader::new(tmp.path());
        let decl = SchemaDecl::Concrete {
            name: "Form".into(),
            fields: vec![
                FieldDef::integer("a"),
                FieldDef::tuple("c", vec![FieldType::String, FieldType::Boolean]),
            ],
        };
        let path = loader.save_decl(&decl).unwrap();
        assert!(path.ends_with("schema_Form.json"));
        assert!(loader.save_decl(&decl).is_err());

        let mut reloaded = SchemaLoader::new(tmp.path());
        reloaded.load_all().unwrap();
        assert_eq!(reloaded.schema("Form").unwrap().fields().len(), 2);
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut loader = SchemaLoader::new(tmp.path());
        let decl = SchemaDecl::Concrete {
            name: "Form".into(),
            fields: vec![FieldDef::integer("a")],
        };
        loader.register(decl.clone()).unwrap();
        assert!(loader.register(decl).unwrap_err().is_configuration());
    }
}
