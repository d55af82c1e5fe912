use crate::domain::ports::{IncomingRequest, RequestHandler};
use crate::utils::allowed_hosts::AllowedHosts;
use crate::utils::error::{HostError, Result};
use async_trait::async_trait;
use http::header::HeaderName;
use hyper::body::Bytes;
use url::Url;

/// 反向代理：把請求轉給 upstream，回應原樣帶回
#[derive(Debug)]
pub struct ProxyHandler {
    component: String,
    upstream: Url,
    client: reqwest::Client,
}

/// RFC 9110 hop-by-hop headers，轉發時兩個方向都要拿掉
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

impl ProxyHandler {
    pub fn new(id: &str, upstream: Url, allowed_outbound_hosts: &[String]) -> Result<Self> {
        let allowed = AllowedHosts::parse(
            &format!("component.{}.allowed_outbound_hosts", id),
            allowed_outbound_hosts,
        )?;

        if !allowed.allows(&upstream) {
            return Err(HostError::OutboundDeniedError {
                component: id.to_string(),
                url: upstream.to_string(),
            });
        }

        Ok(Self {
            component: id.to_string(),
            upstream,
            client: reqwest::Client::new(),
        })
    }

    fn target_url(&self, trailer: &str, query: Option<&str>) -> Url {
        let mut target = self.upstream.clone();
        let base = target.path().trim_end_matches('/').to_string();
        let path = if trailer.is_empty() {
            if base.is_empty() {
                "/".to_string()
            } else {
                base
            }
        } else {
            format!("{}/{}", base, trailer)
        };
        target.set_path(&path);
        target.set_query(query);
        target
    }
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

#[async_trait]
impl RequestHandler for ProxyHandler {
    async fn handle(&self, req: IncomingRequest) -> Result<http::Response<Bytes>> {
        let target = self.target_url(&req.trailer, req.query.as_deref());
        tracing::debug!(
            "Proxying {} {} -> {} (component '{}')",
            req.method,
            req.path,
            target,
            self.component
        );

        let mut builder = self.client.request(req.method.clone(), target);
        for (name, value) in req.headers.iter() {
            if is_hop_by_hop(name) || name == http::header::HOST {
                continue;
            }
            builder = builder.header(name, value);
        }
        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }

        let upstream_response = builder.send().await?;
        let status = upstream_response.status();
        let headers = upstream_response.headers().clone();
        let body = upstream_response.bytes().await?;

        let mut response = http::Response::new(body);
        *response.status_mut() = status;
        for (name, value) in headers.iter() {
            if is_hop_by_hop(name) || name == http::header::CONTENT_LENGTH {
                continue;
            }
            response.headers_mut().insert(name.clone(), value.clone());
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler(upstream: &str) -> ProxyHandler {
        let upstream = Url::parse(upstream).unwrap();
        let allowed = vec!["*://*:*".to_string()];
        ProxyHandler::new("backend", upstream, &allowed).unwrap()
    }

    #[test]
    fn test_upstream_must_be_allowed() {
        let upstream = Url::parse("http://internal.test:9100/").unwrap();

        let err = ProxyHandler::new("backend", upstream.clone(), &[]).unwrap_err();
        assert!(matches!(err, HostError::OutboundDeniedError { .. }));

        let allowed = vec!["http://internal.test:9100".to_string()];
        assert!(ProxyHandler::new("backend", upstream, &allowed).is_ok());
    }

    #[test]
    fn test_target_url_joins_trailer_and_query() {
        let proxy = handler("http://upstream.test:8080/");
        assert_eq!(
            proxy.target_url("widgets/7", None).as_str(),
            "http://upstream.test:8080/widgets/7"
        );
        assert_eq!(
            proxy.target_url("", None).as_str(),
            "http://upstream.test:8080/"
        );
        assert_eq!(
            proxy.target_url("search", Some("q=x")).as_str(),
            "http://upstream.test:8080/search?q=x"
        );
    }

    #[test]
    fn test_target_url_preserves_base_path() {
        let proxy = handler("http://upstream.test/api/v2/");
        assert_eq!(
            proxy.target_url("things", None).as_str(),
            "http://upstream.test/api/v2/things"
        );
        assert_eq!(
            proxy.target_url("", None).as_str(),
            "http://upstream.test/api/v2"
        );
    }

    #[test]
    fn test_hop_by_hop_detection() {
        assert!(is_hop_by_hop(&http::header::CONNECTION));
        assert!(is_hop_by_hop(&http::header::TRANSFER_ENCODING));
        assert!(!is_hop_by_hop(&http::header::CONTENT_TYPE));
    }
}
