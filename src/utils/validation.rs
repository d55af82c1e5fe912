use crate::utils::error::{HostError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(HostError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(HostError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(HostError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 路由必須以 '/' 開頭；萬用字元 `...` 只能出現在結尾的 `/...`
pub fn validate_route(field_name: &str, route: &str) -> Result<()> {
    let invalid = |reason: String| HostError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: route.to_string(),
        reason,
    };

    if !route.starts_with('/') {
        return Err(invalid("Route must start with '/'".to_string()));
    }
    if route.chars().any(char::is_whitespace) {
        return Err(invalid("Route cannot contain whitespace".to_string()));
    }
    if let Some(pos) = route.find("...") {
        if pos + 3 != route.len() || !route.ends_with("/...") {
            return Err(invalid(
                "Wildcard '...' is only allowed as a trailing '/...' segment".to_string(),
            ));
        }
    }
    Ok(())
}

/// Component id 限小寫英數與 '-'
pub fn validate_component_id(field_name: &str, id: &str) -> Result<()> {
    let ok = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !id.starts_with('-')
        && !id.ends_with('-');
    if !ok {
        return Err(HostError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: id.to_string(),
            reason: "Component ids may only contain lowercase letters, digits and '-'".to_string(),
        });
    }
    Ok(())
}
