//! Service document loading.
//!
//! A document is JSON or YAML, chosen by file extension. It holds either a
//! full service (a mapping with `groups`) or a single group, which is
//! wrapped into a one-group service named after it.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::domains::operations::{GroupConfig, ServiceConfig};

/// Errors raised while reading a service document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The document exists but could not be parsed.
    #[error("Invalid configuration in {}: {message}", .path.display())]
    Format { path: PathBuf, message: String },

    /// The extension is not one of `.json`, `.yaml`, `.yml`.
    #[error("Unsupported configuration format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The document could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Read and parse the service document at `path`.
pub fn load_service(path: &Path) -> Result<ServiceConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let format = DocumentFormat::from_path(path)
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;

    let text = std::fs::read_to_string(path)?;
    let service = parse_service(&text, format).map_err(|message| ConfigError::Format {
        path: path.to_path_buf(),
        message,
    })?;

    info!(
        "Loaded service '{}' from {} ({} groups)",
        service.name,
        path.display(),
        service.groups.len()
    );
    Ok(service)
}

/// Parse a service document already held in memory.
pub fn parse_service(text: &str, format: DocumentFormat) -> Result<ServiceConfig, String> {
    let value: Value = match format {
        DocumentFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string())?,
        DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string())?,
    };

    let Value::Object(map) = &value else {
        return Err("expected a mapping at the top level".to_string());
    };

    if map.contains_key("groups") {
        serde_json::from_value::<ServiceConfig>(value).map_err(|e| e.to_string())
    } else {
        debug!("Document has no 'groups' key, treating it as a single group");
        serde_json::from_value::<GroupConfig>(value)
            .map(ServiceConfig::from_group)
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_yaml_service_document() {
        let file = write_temp(
            ".yaml",
            r#"
name: calculator
description: Arithmetic service
groups:
  - name: math
    config:
      default_precision: 2
  - group_id: slow
    kind: timeout
    timeouts:
      sleep: 0.5
"#,
        );

        let service = load_service(file.path()).unwrap();
        assert_eq!(service.name, "calculator");
        assert_eq!(service.description.as_deref(), Some("Arithmetic service"));
        assert_eq!(service.groups.len(), 2);
        assert_eq!(service.groups[0].group_id, "math");
        assert_eq!(
            service.groups[0].config.get("default_precision"),
            Some(&serde_json::json!(2))
        );
        assert_eq!(service.groups[1].kind(), "timeout");
        assert_eq!(
            service.groups[1].timeout_for("sleep").unwrap(),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_json_group_document_is_wrapped() {
        let file = write_temp(
            ".json",
            r#"{"name": "example", "description": "Example group", "packages": ["serde"]}"#,
        );

        let service = load_service(file.path()).unwrap();
        assert_eq!(service.name, "example");
        assert_eq!(service.groups.len(), 1);
        assert_eq!(service.groups[0].packages, vec!["serde".to_string()]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_service(Path::new("/nonexistent/service.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_temp(".toml", "name = 'x'");
        let err = load_service(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_malformed_document() {
        let file = write_temp(".yml", "name: [unclosed");
        let err = load_service(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Format { .. }));

        let err = parse_service("[1, 2]", DocumentFormat::Json).unwrap_err();
        assert!(err.contains("mapping"));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/b.YML")),
            Some(DocumentFormat::Yaml)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("svc.json")),
            Some(DocumentFormat::Json)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("svc")), None);
    }

    #[test]
    fn test_demo_documents_build() {
        use crate::domains::groups::builtin_catalog;
        use crate::domains::operations::{DispatchOptions, Dispatcher};

        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");

        let service = tokio_test::assert_ok!(load_service(&demos.join("service.yaml")));
        let dispatcher = tokio_test::assert_ok!(Dispatcher::load(
            &builtin_catalog(),
            &service,
            DispatchOptions::default()
        ));
        assert_eq!(dispatcher.service_name(), "demo-service");
        assert!(dispatcher.handle("calc.divide").is_some());
        assert_eq!(
            dispatcher.handle("timeout.sleep").unwrap().timeout(),
            Duration::from_secs(5)
        );
        assert!(dispatcher.handle("stats.median").is_some());
        assert_eq!(
            dispatcher
                .handle("data-processor.process_data")
                .unwrap()
                .timeout(),
            Duration::from_secs(15)
        );

        let single = tokio_test::assert_ok!(load_service(&demos.join("example_group.json")));
        assert_eq!(single.name, "example");
        tokio_test::assert_err!(load_service(&demos.join("missing.yaml")));
    }
}
