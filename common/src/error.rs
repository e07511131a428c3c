use thiserror::Error;

/// Errors surfaced to the boundary layer by dashboard queries and mutations
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Several datacenters are configured and the caller named none
    #[error("The datacenter name can't be empty")]
    NameRequired,

    #[error("Could not find the datacenter '{0}'")]
    DatacenterNotFound(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    /// Every replica of the datacenter failed
    #[error("Datacenter '{datacenter}' is unavailable: {message}")]
    Upstream { datacenter: String, message: String },
}

impl DashboardError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            DashboardError::NameRequired => 400,
            DashboardError::DatacenterNotFound(_) => 404,
            DashboardError::NotFound(_) => 404,
            DashboardError::InvalidRequest(_) => 400,
            DashboardError::Upstream { .. } => 502,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Resource not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        DashboardError::NotFound(message.into())
    }

    /// Invalid parameter error
    pub fn invalid_param(param_name: &str, reason: &str) -> Self {
        DashboardError::InvalidRequest(format!("Invalid {} parameter: {}", param_name, reason))
    }

    /// Whether this error came from the upstream APIs rather than the request
    pub fn is_upstream(&self) -> bool {
        matches!(self, DashboardError::Upstream { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_errors() {
        let error = DashboardError::NameRequired;
        assert_eq!(error.status_code(), 400);

        let error = DashboardError::DatacenterNotFound("west".to_string());
        assert_eq!(error.status_code(), 404);
        assert_eq!(error.message(), "Could not find the datacenter 'west'");
    }

    #[test]
    fn test_upstream_error() {
        let error = DashboardError::Upstream {
            datacenter: "east".to_string(),
            message: "connection refused".to_string(),
        };
        assert_eq!(error.status_code(), 502);
        assert!(error.is_upstream());
        assert_eq!(
            error.message(),
            "Datacenter 'east' is unavailable: connection refused"
        );
    }

    #[test]
    fn test_invalid_param() {
        let error = DashboardError::invalid_param("severity", "must be one of ok, warning");
        assert_eq!(error.status_code(), 400);
        assert_eq!(
            error.message(),
            "Invalid severity parameter: must be one of ok, warning"
        );
    }
}
