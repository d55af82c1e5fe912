use crate::domain::model::RouteEntry;
use crate::utils::error::{HostError, Result};
use std::collections::HashMap;

/// Host 保留的路徑前綴，應用路由不可佔用
pub const WELL_KNOWN_PREFIX: &str = "/.well-known/small-host/";

/// 路由表。精確路由優先於萬用路由，萬用路由取最長前綴
#[derive(Debug, Clone)]
pub struct Router {
    exact: HashMap<String, String>,
    /// (prefix, component)，依 prefix 長度由長到短
    wildcards: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub component: &'a str,
    /// 萬用路由比對後的尾段（不含開頭 '/'），精確路由為空字串
    pub trailer: String,
}

impl Router {
    pub fn new(entries: &[RouteEntry]) -> Result<Self> {
        let mut seen: HashMap<&str, &str> = HashMap::new();
        let mut exact = HashMap::new();
        let mut wildcards = Vec::new();

        for entry in entries {
            if entry.route.starts_with(WELL_KNOWN_PREFIX)
                || entry.route == WELL_KNOWN_PREFIX.trim_end_matches('/')
            {
                return Err(HostError::ConfigValidationError {
                    field: "trigger.http.route".to_string(),
                    message: format!(
                        "Route '{}' shadows the reserved prefix '{}'",
                        entry.route, WELL_KNOWN_PREFIX
                    ),
                });
            }

            if let Some(first) = seen.insert(&entry.route, &entry.component) {
                return Err(HostError::RouteConflictError {
                    route: entry.route.clone(),
                    first: first.to_string(),
                    second: entry.component.clone(),
                });
            }

            match entry.route.strip_suffix("/...") {
                Some(prefix) => wildcards.push((prefix.to_string(), entry.component.clone())),
                None => {
                    exact.insert(entry.route.clone(), entry.component.clone());
                }
            }
        }

        wildcards.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Ok(Self { exact, wildcards })
    }

    pub fn route(&self, path: &str) -> Option<RouteMatch<'_>> {
        if let Some(component) = self.exact.get(path) {
            return Some(RouteMatch {
                component,
                trailer: String::new(),
            });
        }

        for (prefix, component) in &self.wildcards {
            if let Some(trailer) = wildcard_trailer(prefix, path) {
                return Some(RouteMatch {
                    component,
                    trailer,
                });
            }
        }

        None
    }
}

/// `prefix` 本身或其下層路徑才算命中；回傳尾段
fn wildcard_trailer(prefix: &str, path: &str) -> Option<String> {
    if prefix.is_empty() {
        return Some(path.trim_start_matches('/').to_string());
    }
    if path == prefix {
        return Some(String::new());
    }
    path.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .map(str::to_string)
}
