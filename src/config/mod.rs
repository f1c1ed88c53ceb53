//! Configuration loading and management
//!
//! A deployment is described by one YAML document:
//!
//! ```yaml
//! server:
//!   bind: "127.0.0.1:3000"
//!   base_path: /api/v1
//!   cors: false
//!
//! model:
//!   name: TestModel
//!   id_field: _id
//!   strict: true
//!   fields:
//!     _id:  { type: integer }
//!     user: { type: string }
//!     text: { type: string, view: "true", edit: "user:admin" }
//! ```
//!
//! Permission strings are parsed by [`Permission::parse`].

use crate::core::auth::{FieldAuth, ModelAuth, Permission};
use crate::core::record::DEFAULT_ID_FIELD;
use crate::core::schema::{FieldSpec, FieldType, Schema};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_base_path() -> String {
    "/api/v1".to_string()
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

fn open() -> String {
    "true".to_string()
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Prefix under which models are mounted (`<base_path>/<Model>`)
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Allow cross-origin requests from anywhere
    #[serde(default)]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_path: default_base_path(),
            cors: false,
        }
    }
}

/// View and edit permissions as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default = "open")]
    pub view: String,

    #[serde(default = "open")]
    pub edit: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            view: open(),
            edit: open(),
        }
    }
}

impl AccessConfig {
    pub fn to_field_auth(&self) -> Result<FieldAuth> {
        Ok(FieldAuth::new(
            Permission::parse(&self.view).context("invalid view permission")?,
            Permission::parse(&self.edit).context("invalid edit permission")?,
        ))
    }
}

/// One field of the model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    /// Regular expression string values must match
    #[serde(default)]
    pub pattern: Option<String>,

    #[serde(flatten)]
    pub access: AccessConfig,
}

impl FieldConfig {
    fn to_spec(&self) -> Result<FieldSpec> {
        let mut spec = FieldSpec::new(self.field_type);
        if self.required {
            spec = spec.required();
        }
        if let Some(pattern) = &self.pattern {
            let re = Regex::new(pattern).with_context(|| format!("invalid pattern '{}'", pattern))?;
            spec = spec.with_pattern(re);
        }
        Ok(spec)
    }
}

/// The managed model: schema plus field permissions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,

    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Reject fields that are not declared
    #[serde(default)]
    pub strict: bool,

    /// Permissions of fields without their own entry
    #[serde(default)]
    pub default_access: AccessConfig,

    #[serde(default)]
    pub fields: IndexMap<String, FieldConfig>,
}

impl ModelConfig {
    /// Build the validation schema
    pub fn schema(&self) -> Result<Schema> {
        let mut schema = Schema::new().strict(self.strict);
        for (name, field) in &self.fields {
            let spec = field
                .to_spec()
                .with_context(|| format!("field '{}' of model '{}'", name, self.name))?;
            schema = schema.with_field(name.clone(), spec);
        }
        Ok(schema)
    }

    /// Build the field authorization table
    pub fn auth(&self) -> Result<ModelAuth> {
        let mut auth = ModelAuth::new().with_default(
            self.default_access
                .to_field_auth()
                .with_context(|| format!("default access of model '{}'", self.name))?,
        );
        for (name, field) in &self.fields {
            let entry = field
                .access
                .to_field_auth()
                .with_context(|| format!("field '{}' of model '{}'", name, self.name))?;
            auth = auth.field(name.clone(), entry);
        }
        Ok(auth)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub model: ModelConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        // Surface bad permissions and patterns at load time
        config.model.schema()?;
        config.model.auth()?;
        Ok(config)
    }
}
