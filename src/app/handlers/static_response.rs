use crate::domain::ports::{IncomingRequest, RequestHandler};
use crate::utils::error::{HostError, Result};
use async_trait::async_trait;
use http::header::{HeaderName, HeaderValue};
use http::StatusCode;
use hyper::body::Bytes;

/// 回傳 manifest 裡設定好的固定內容
pub struct StaticResponseHandler {
    status: StatusCode,
    content_type: HeaderValue,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl StaticResponseHandler {
    pub fn new(
        id: &str,
        status: u16,
        content_type: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<Self> {
        let field = format!("component.{}.response", id);
        let invalid = |part: &str, value: &str, reason: String| HostError::InvalidConfigValueError {
            field: format!("{}.{}", field, part),
            value: value.to_string(),
            reason,
        };

        let status = StatusCode::from_u16(status)
            .map_err(|e| invalid("status", &status.to_string(), e.to_string()))?;
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|e| invalid("content_type", content_type, e.to_string()))?;

        let mut parsed_headers = Vec::with_capacity(headers.len());
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| invalid("headers", name, e.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| invalid("headers", value, e.to_string()))?;
            parsed_headers.push((header_name, header_value));
        }

        Ok(Self {
            status,
            content_type,
            headers: parsed_headers,
            body: Bytes::from(body.to_string()),
        })
    }
}

#[async_trait]
impl RequestHandler for StaticResponseHandler {
    async fn handle(&self, _req: IncomingRequest) -> Result<http::Response<Bytes>> {
        let mut response = http::Response::new(self.body.clone());
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(http::header::CONTENT_TYPE, self.content_type.clone());
        for (name, value) in &self.headers {
            response.headers_mut().insert(name.clone(), value.clone());
        }
        Ok(response)
    }
}
