//! Converter registry for dispatching uploads by format.

use std::collections::HashMap;
use std::sync::Arc;

use noteport_core::{
    ConversionResult, Error, FormatConverter, ImportFormat, ImportOptions, Result, SourceFile,
};

/// Registry mapping import formats to their converter implementations.
pub struct ConverterRegistry {
    converters: HashMap<ImportFormat, Arc<dyn FormatConverter>>,
}

impl ConverterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Register a converter. Replaces any existing converter for the same format.
    pub fn register(&mut self, converter: Arc<dyn FormatConverter>) {
        self.converters.insert(converter.format(), converter);
    }

    pub fn get(&self, format: ImportFormat) -> Option<Arc<dyn FormatConverter>> {
        self.converters.get(&format).cloned()
    }

    /// Convert with the converter registered for `format`.
    pub async fn convert(
        &self,
        format: ImportFormat,
        file: &SourceFile,
        options: &ImportOptions,
    ) -> Result<ConversionResult> {
        let converter = self.converters.get(&format).ok_or_else(|| {
            Error::UnsupportedFormat(format!("No converter registered for format: {}", format))
        })?;
        converter.convert(file, options).await
    }

    /// Formats with a registered converter, in declaration order.
    pub fn available_formats(&self) -> Vec<ImportFormat> {
        ImportFormat::ALL
            .into_iter()
            .filter(|f| self.converters.contains_key(f))
            .collect()
    }

    pub fn has_converter(&self, format: ImportFormat) -> bool {
        self.converters.contains_key(&format)
    }

    /// Run health checks on all registered converters.
    pub async fn health_check_all(&self) -> HashMap<ImportFormat, bool> {
        let mut results = HashMap::new();
        for (format, converter) in &self.converters {
            let healthy = converter.health_check().await.unwrap_or(false);
            results.insert(*format, healthy);
        }
        results
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{HtmlConverter, OnepkgConverter};

    #[test]
    fn test_registry_new_is_empty() {
        let registry = ConverterRegistry::new();
        assert!(registry.available_formats().is_empty());
        assert!(!registry.has_converter(ImportFormat::Html));
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(OnepkgConverter));
        registry.register(Arc::new(HtmlConverter));
        assert!(registry.has_converter(ImportFormat::Html));
        assert!(!registry.has_converter(ImportFormat::Pdf));
        assert_eq!(
            registry.available_formats(),
            vec![ImportFormat::Html, ImportFormat::Onepkg]
        );
        assert_eq!(registry.get(ImportFormat::Html).unwrap().name(), "html");
    }

    #[tokio::test]
    async fn test_registry_convert_missing_converter() {
        let registry = ConverterRegistry::new();
        let file = SourceFile::new("a.pdf", b"%PDF".to_vec());
        let err = registry
            .convert(ImportFormat::Pdf, &file, &ImportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_registry_convert_with_converter() {
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(HtmlConverter));
        let file = SourceFile::new("a.html", b"<h1>Hi</h1>".to_vec());
        let result = registry
            .convert(ImportFormat::Html, &file, &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(result.titles(), vec!["Hi"]);
    }

    #[tokio::test]
    async fn test_registry_health_check_all() {
        let mut registry = ConverterRegistry::new();
        registry.register(Arc::new(HtmlConverter));
        let results = registry.health_check_all().await;
        assert_eq!(results.len(), 1);
        assert!(results[&ImportFormat::Html]);
    }
}
