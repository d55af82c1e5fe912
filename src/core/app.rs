use crate::config::manifest::{AppManifest, ComponentConfig};
use crate::domain::model::{
    App, AppComponent, ComponentBehavior, ResolvedVariable, RouteEntry,
};
use crate::utils::error::{HostError, Result};
use crate::utils::validation::Validate;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use url::Url;

/// 變數可由環境覆寫：SMALL_HOST_VARIABLE_<NAME>
pub const VARIABLE_ENV_PREFIX: &str = "SMALL_HOST_VARIABLE_";

const DEFAULT_STATUS: u16 = 200;
const DEFAULT_CONTENT_TYPE: &str = "text/plain";
const DEFAULT_INDEX: &str = "index.html";

/// Manifest → 完整解析的 App：變數求值、樣板展開、路徑定位
pub fn resolve(manifest: &AppManifest, manifest_dir: &Path) -> Result<App> {
    manifest.validate()?;

    let variables = resolve_variables(manifest)?;
    let lookup: HashMap<&str, &str> = variables
        .iter()
        .map(|v| (v.name.as_str(), v.value.as_str()))
        .collect();

    let mut ids: Vec<&String> = manifest.component.keys().collect();
    ids.sort();

    let mut components = Vec::with_capacity(ids.len());
    for id in ids {
        let config = &manifest.component[id];
        components.push(AppComponent {
            id: id.clone(),
            behavior: resolve_behavior(id, config, manifest_dir, &lookup)?,
            allowed_outbound_hosts: config.allowed_outbound_hosts.clone(),
        });
    }

    let routes = manifest
        .trigger
        .http
        .iter()
        .map(|t| RouteEntry {
            route: t.route.clone(),
            component: t.component.clone(),
        })
        .collect();

    Ok(App {
        name: manifest.application.name.clone(),
        version: manifest.application.version.clone(),
        description: manifest.application.description.clone(),
        variables,
        routes,
        components,
    })
}

fn resolve_variables(manifest: &AppManifest) -> Result<Vec<ResolvedVariable>> {
    let mut names: Vec<&String> = manifest.variables.keys().collect();
    names.sort();

    let mut resolved = Vec::with_capacity(names.len());
    for name in names {
        let definition = &manifest.variables[name];
        let value = match std::env::var(variable_env_key(name)) {
            Ok(value) => value,
            Err(_) => match &definition.default {
                Some(default) => default.clone(),
                None => {
                    return Err(HostError::VariableError {
                        name: name.clone(),
                        message: "Required variable has no value".to_string(),
                    })
                }
            },
        };
        resolved.push(ResolvedVariable {
            name: name.clone(),
            value,
            secret: definition.secret,
        });
    }
    Ok(resolved)
}

pub fn variable_env_key(name: &str) -> String {
    format!(
        "{}{}",
        VARIABLE_ENV_PREFIX,
        name.to_uppercase().replace('-', "_")
    )
}

fn resolve_behavior(
    id: &str,
    config: &ComponentConfig,
    manifest_dir: &Path,
    variables: &HashMap<&str, &str>,
) -> Result<ComponentBehavior> {
    if let Some(response) = &config.response {
        let field = format!("component.{}.response", id);
        let body = render_template(&field, response.body.as_deref().unwrap_or(""), variables)?;
        let mut headers = Vec::new();
        if let Some(configured) = &response.headers {
            let mut names: Vec<&String> = configured.keys().collect();
            names.sort();
            for name in names {
                headers.push((name.clone(), render_template(&field, &configured[name], variables)?));
            }
        }
        return Ok(ComponentBehavior::StaticResponse {
            status: response.status.unwrap_or(DEFAULT_STATUS),
            content_type: response
                .content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            headers,
            body,
        });
    }

    if let Some(files) = &config.files {
        let source = Path::new(&files.source);
        let source = if source.is_absolute() {
            source.to_path_buf()
        } else {
            manifest_dir.join(source)
        };
        return Ok(ComponentBehavior::FileServer {
            source,
            index: files
                .index
                .clone()
                .unwrap_or_else(|| DEFAULT_INDEX.to_string()),
        });
    }

    if let Some(proxy) = &config.proxy {
        let field = format!("component.{}.proxy.upstream", id);
        let upstream = Url::parse(&proxy.upstream).map_err(|e| {
            HostError::InvalidConfigValueError {
                field: field.clone(),
                value: proxy.upstream.clone(),
                reason: format!("Invalid URL: {}", e),
            }
        })?;
        if !matches!(upstream.scheme(), "http" | "https") {
            return Err(HostError::InvalidConfigValueError {
                field,
                value: proxy.upstream.clone(),
                reason: format!("Unsupported URL scheme: {}", upstream.scheme()),
            });
        }
        return Ok(ComponentBehavior::Proxy { upstream });
    }

    // validate() 已保證三選一
    Err(HostError::ConfigValidationError {
        field: format!("component.{}", id),
        message: "Component has no behavior".to_string(),
    })
}

/// `{{ name }}` 樣板展開；未定義的變數是錯誤
fn render_template(
    field: &str,
    text: &str,
    variables: &HashMap<&str, &str>,
) -> Result<String> {
    use regex::Regex;
    let re = Regex::new(r"\{\{\s*([A-Za-z0-9_][A-Za-z0-9_-]*)\s*\}\}").unwrap();

    let mut rendered = String::with_capacity(text.len());
    let mut last_end = 0;
    for caps in re.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let name = &caps[1];
        let value = variables.get(name).ok_or_else(|| HostError::VariableError {
            name: name.to_string(),
            message: format!("Referenced in '{}' but not defined in [variables]", field),
        })?;
        rendered.push_str(&text[last_end..whole.start()]);
        rendered.push_str(value);
        last_end = whole.end();
    }
    rendered.push_str(&text[last_end..]);
    Ok(rendered)
}

/// 寫進 temp 目錄的鎖定快照，secret 會遮蔽
#[derive(Debug, Serialize)]
pub struct LockedApp {
    pub lock_version: u32,
    pub application: LockedApplication,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<LockedVariable>,
    pub triggers: Vec<LockedTrigger>,
    pub components: Vec<LockedComponent>,
}

#[derive(Debug, Serialize)]
pub struct LockedApplication {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LockedVariable {
    pub name: String,
    pub value: String,
    pub secret: bool,
}

#[derive(Debug, Serialize)]
pub struct LockedTrigger {
    pub route: String,
    pub component: String,
}

#[derive(Debug, Serialize)]
pub struct LockedComponent {
    pub id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_outbound_hosts: Vec<String>,
}

impl LockedApp {
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(HostError::SerializationError)
    }
}

pub fn lock(app: &App) -> LockedApp {
    LockedApp {
        lock_version: 1,
        application: LockedApplication {
            name: app.name.clone(),
            version: app.version.clone(),
            description: app.description.clone(),
        },
        variables: app
            .variables
            .iter()
            .map(|v| LockedVariable {
                name: v.name.clone(),
                value: if v.secret {
                    "<redacted>".to_string()
                } else {
                    v.value.clone()
                },
                secret: v.secret,
            })
            .collect(),
        triggers: app
            .routes
            .iter()
            .map(|r| LockedTrigger {
                route: r.route.clone(),
                component: r.component.clone(),
            })
            .collect(),
        components: app
            .components
            .iter()
            .map(|c| LockedComponent {
                id: c.id.clone(),
                kind: c.behavior.kind().to_string(),
                source: match &c.behavior {
                    ComponentBehavior::StaticResponse { .. } => None,
                    ComponentBehavior::FileServer { source, .. } => {
                        Some(source.display().to_string())
                    }
                    ComponentBehavior::Proxy { upstream } => Some(upstream.to_string()),
                },
                allowed_outbound_hosts: c.allowed_outbound_hosts.clone(),
            })
            .collect(),
    }
}
