//! tp-project: network file format, validation and graph construction.

pub mod convert;
pub mod schema;
pub mod validate;

pub use convert::{BuiltNetwork, build_graph, file_unit, reduce_options};
pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_network};

use tp_graph::{ConnectError, GraphError};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Attribute {attribute} of {element}: {reason}")]
    Attribute {
        element: String,
        attribute: &'static str,
        reason: String,
    },

    #[error("Cannot connect {from} to {to}: {source}")]
    Connect {
        from: String,
        to: String,
        source: ConnectError,
    },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn parse_yaml(content: &str) -> ProjectResult<NetworkFile> {
    let file: NetworkFile = serde_yaml::from_str(content)?;
    validate_network(&file)?;
    Ok(file)
}

pub fn parse_json(content: &str) -> ProjectResult<NetworkFile> {
    let file: NetworkFile = serde_json::from_str(content)?;
    validate_network(&file)?;
    Ok(file)
}

pub fn load_yaml(path: &std::path::Path) -> ProjectResult<NetworkFile> {
    parse_yaml(&std::fs::read_to_string(path)?)
}

pub fn load_json(path: &std::path::Path) -> ProjectResult<NetworkFile> {
    parse_json(&std::fs::read_to_string(path)?)
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &std::path::Path) -> ProjectResult<NetworkFile> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}

/// Read a separate reduction config file holding the fields of a `reduce:` section.
pub fn load_reduce_config(path: &std::path::Path) -> ProjectResult<ReduceConfigDef> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(serde_json::from_str(&content)?),
        _ => Ok(serde_yaml::from_str(&content)?),
    }
}
