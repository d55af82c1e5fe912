mod file_server;
mod proxy;
mod static_response;

pub use file_server::FileServerHandler;
pub use proxy::ProxyHandler;
pub use static_response::StaticResponseHandler;

use crate::domain::model::{App, ComponentBehavior};
use crate::domain::ports::RequestHandler;
use crate::utils::error::Result;
use http::StatusCode;
use hyper::body::Bytes;
use std::collections::HashMap;
use std::sync::Arc;

/// 依每個 component 的行為建出 handler 表
pub fn build_handlers(app: &App) -> Result<HashMap<String, Arc<dyn RequestHandler>>> {
    let mut handlers: HashMap<String, Arc<dyn RequestHandler>> = HashMap::new();

    for component in &app.components {
        let handler: Arc<dyn RequestHandler> = match &component.behavior {
            ComponentBehavior::StaticResponse {
                status,
                content_type,
                headers,
                body,
            } => Arc::new(StaticResponseHandler::new(
                &component.id,
                *status,
                content_type,
                headers,
                body,
            )?),
            ComponentBehavior::FileServer { source, index } => {
                Arc::new(FileServerHandler::new(&component.id, source, index)?)
            }
            ComponentBehavior::Proxy { upstream } => Arc::new(ProxyHandler::new(
                &component.id,
                upstream.clone(),
                &component.allowed_outbound_hosts,
            )?),
        };
        handlers.insert(component.id.clone(), handler);
    }

    Ok(handlers)
}

pub(crate) fn text_response(status: StatusCode, message: &'static str) -> http::Response<Bytes> {
    let mut response = http::Response::new(Bytes::from_static(message.as_bytes()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain"),
    );
    response
}
