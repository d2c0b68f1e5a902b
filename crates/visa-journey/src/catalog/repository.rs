use super::domain::{CatalogDocument, CatalogStep, VisaType, VisaTypeKey};

/// Read access to visa reference data owned outside the journey engine.
pub trait VisaCatalog: Send + Sync {
    fn visa_type(&self, key: &VisaTypeKey) -> Result<Option<VisaType>, CatalogError>;

    fn visa_types_for_route(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<VisaType>, CatalogError>;

    fn documents(&self, key: &VisaTypeKey) -> Result<Vec<CatalogDocument>, CatalogError> {
        self.visa_type(key)?
            .map(|visa_type| visa_type.documents)
            .ok_or_else(|| CatalogError::NotFound(key.clone()))
    }

    fn steps(&self, key: &VisaTypeKey) -> Result<Vec<CatalogStep>, CatalogError> {
        self.visa_type(key)?
            .map(|visa_type| visa_type.steps)
            .ok_or_else(|| CatalogError::NotFound(key.clone()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("visa type {0} not found")]
    NotFound(VisaTypeKey),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}
