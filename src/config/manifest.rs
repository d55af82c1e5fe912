use crate::utils::error::{HostError, Result};
use crate::utils::validation::{
    validate_component_id, validate_non_empty_string, validate_route, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// 應用 manifest（TOML）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppManifest {
    pub application: ApplicationConfig,
    #[serde(default)]
    pub variables: HashMap<String, VariableConfig>,
    pub trigger: TriggerSection,
    #[serde(default)]
    pub component: HashMap<String, ComponentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationConfig {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 變數定義
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableConfig {
    /// `required = true`
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// `default = "default value"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// `secret = true`
    #[serde(default, skip_serializing_if = "is_false")]
    pub secret: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TriggerSection {
    #[serde(default)]
    pub http: Vec<HttpTriggerConfig>,
}

/// `[[trigger.http]]` 一條路由對應一個 component
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpTriggerConfig {
    pub route: String,
    pub component: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<FilesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_outbound_hosts: Vec<String>,
}

/// 固定回應。body 與 header 值可用 `{{ variable }}` 樣板
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
}

/// 靜態檔案目錄。`source` 相對路徑以 manifest 所在目錄為準
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    pub upstream: String,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl AppManifest {
    /// 從 TOML 檔案載入 manifest
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HostError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析 manifest
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 先做環境變數替換
        let processed_content = substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| HostError::ManifestParseError {
            message: e.to_string(),
        })
    }

    pub fn component(&self, id: &str) -> Option<&ComponentConfig> {
        self.component.get(id)
    }

    fn validate_manifest(&self) -> Result<()> {
        validate_non_empty_string("application.name", &self.application.name)?;
        validate_non_empty_string("application.version", &self.application.version)?;

        if self.trigger.http.is_empty() {
            return Err(HostError::MissingConfigError {
                field: "trigger.http".to_string(),
            });
        }

        for trigger in &self.trigger.http {
            validate_route("trigger.http.route", &trigger.route)?;
            validate_component_id("trigger.http.component", &trigger.component)?;
            if !self.component.contains_key(&trigger.component) {
                return Err(HostError::ConfigValidationError {
                    field: "trigger.http.component".to_string(),
                    message: format!(
                        "Route '{}' references undefined component '{}'",
                        trigger.route, trigger.component
                    ),
                });
            }
        }

        for (id, component) in &self.component {
            validate_component_id("component", id)?;
            component.validate_behavior(id)?;
        }

        for (name, variable) in &self.variables {
            validate_non_empty_string("variables", name)?;
            if variable.required && variable.default.is_some() {
                return Err(HostError::ConfigValidationError {
                    field: format!("variables.{}", name),
                    message: "'required' and 'default' are mutually exclusive".to_string(),
                });
            }
            if !variable.required && variable.default.is_none() {
                return Err(HostError::ConfigValidationError {
                    field: format!("variables.{}", name),
                    message: "Variable needs a 'default' unless marked 'required'".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl ComponentConfig {
    /// 每個 component 必須恰好有一種行為
    fn validate_behavior(&self, id: &str) -> Result<()> {
        let defined = [
            self.response.is_some(),
            self.files.is_some(),
            self.proxy.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if defined != 1 {
            return Err(HostError::ConfigValidationError {
                field: format!("component.{}", id),
                message: "Exactly one of 'response', 'files' or 'proxy' must be set".to_string(),
            });
        }

        if let Some(files) = &self.files {
            validate_non_empty_string(&format!("component.{}.files.source", id), &files.source)?;
        }
        if let Some(proxy) = &self.proxy {
            validate_non_empty_string(&format!("component.{}.proxy.upstream", id), &proxy.upstream)?;
        }

        Ok(())
    }
}

impl Validate for AppManifest {
    fn validate(&self) -> Result<()> {
        self.validate_manifest()
    }
}

/// 替換 `${VAR_NAME}`；未設定的環境變數保留原樣
fn substitute_env_vars(content: &str) -> String {
    use regex::Regex;
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    })
    .to_string()
}
