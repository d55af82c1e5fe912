use std::path::PathBuf;
use url::Url;

/// Manifest 解析、變數展開後的應用
#[derive(Debug, Clone)]
pub struct App {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub variables: Vec<ResolvedVariable>,
    pub routes: Vec<RouteEntry>,
    pub components: Vec<AppComponent>,
}

impl App {
    pub fn component(&self, id: &str) -> Option<&AppComponent> {
        self.components.iter().find(|c| c.id == id)
    }
}

/// 已解析出實際值的變數
#[derive(Debug, Clone)]
pub struct ResolvedVariable {
    pub name: String,
    pub value: String,
    pub secret: bool,
}

#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub route: String,
    pub component: String,
}

#[derive(Debug, Clone)]
pub struct AppComponent {
    pub id: String,
    pub behavior: ComponentBehavior,
    pub allowed_outbound_hosts: Vec<String>,
}

/// Component 行為，三選一
#[derive(Debug, Clone)]
pub enum ComponentBehavior {
    StaticResponse {
        status: u16,
        content_type: String,
        headers: Vec<(String, String)>,
        body: String,
    },
    FileServer {
        source: PathBuf,
        index: String,
    },
    Proxy {
        upstream: Url,
    },
}

impl ComponentBehavior {
    pub fn kind(&self) -> &'static str {
        match self {
            ComponentBehavior::StaticResponse { .. } => "response",
            ComponentBehavior::FileServer { .. } => "files",
            ComponentBehavior::Proxy { .. } => "proxy",
        }
    }
}
