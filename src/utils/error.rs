use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Manifest parsing error: {message}")]
    ManifestParseError { message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed: {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Variable '{name}': {message}")]
    VariableError { name: String, message: String },

    #[error("Route '{route}' is claimed by both '{first}' and '{second}'")]
    RouteConflictError {
        route: String,
        first: String,
        second: String,
    },

    #[error("Component '{component}' is not allowed to reach '{url}'")]
    OutboundDeniedError { component: String, url: String },

    #[error("Upstream request failed: {0}")]
    UpstreamError(#[from] reqwest::Error),

    #[error("Server error: {message}")]
    ServerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Network,
    Io,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HostError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HostError::ManifestParseError { .. }
            | HostError::ConfigValidationError { .. }
            | HostError::InvalidConfigValueError { .. }
            | HostError::MissingConfigError { .. }
            | HostError::VariableError { .. } => ErrorCategory::Configuration,
            HostError::RouteConflictError { .. } | HostError::OutboundDeniedError { .. } => {
                ErrorCategory::Validation
            }
            HostError::UpstreamError(_) => ErrorCategory::Network,
            HostError::IoError(_) => ErrorCategory::Io,
            HostError::SerializationError(_) | HostError::ServerError { .. } => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HostError::ManifestParseError { .. }
            | HostError::ConfigValidationError { .. }
            | HostError::InvalidConfigValueError { .. }
            | HostError::MissingConfigError { .. }
            | HostError::VariableError { .. }
            | HostError::RouteConflictError { .. }
            | HostError::OutboundDeniedError { .. }
            | HostError::SerializationError(_) => ErrorSeverity::High,
            HostError::UpstreamError(_) => ErrorSeverity::Medium,
            HostError::IoError(_) | HostError::ServerError { .. } => ErrorSeverity::Critical,
        }
    }

    /// 依嚴重程度決定 process 結束碼
    pub fn exit_status(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            HostError::ManifestParseError { .. } => {
                "Check the manifest file for TOML syntax errors".to_string()
            }
            HostError::ConfigValidationError { field, .. }
            | HostError::MissingConfigError { field } => {
                format!("Review the '{}' setting in the manifest", field)
            }
            HostError::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' in the manifest", field)
            }
            HostError::VariableError { name, .. } => format!(
                "Provide a default for '{name}' or set SMALL_HOST_VARIABLE_{}",
                name.to_uppercase().replace('-', "_")
            ),
            HostError::RouteConflictError { route, .. } => {
                format!("Remove one of the triggers registered for '{}'", route)
            }
            HostError::OutboundDeniedError { component, url } => format!(
                "Add '{url}' to allowed_outbound_hosts of component '{component}'"
            ),
            HostError::UpstreamError(_) => {
                "Check that the upstream service is reachable".to_string()
            }
            HostError::IoError(_) => {
                "Check file permissions and that the referenced paths exist".to_string()
            }
            HostError::SerializationError(_) | HostError::ServerError { .. } => {
                "This is likely a bug; check the host log for details".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Application manifest problem: {}", self),
            ErrorCategory::Validation => format!("Application validation failed: {}", self),
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Io => format!("File system problem: {}", self),
            ErrorCategory::Internal => format!("Internal host error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_exit_with_one() {
        let err = HostError::MissingConfigError {
            field: "application.name".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.exit_status(), 1);
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err = HostError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.exit_status(), 3);
    }

    #[test]
    fn test_route_conflict_message_names_both_components() {
        let err = HostError::RouteConflictError {
            route: "/api/...".to_string(),
            first: "a".to_string(),
            second: "b".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("'a'"));
        assert!(message.contains("'b'"));
    }
}
