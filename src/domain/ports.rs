use crate::utils::error::Result;
use async_trait::async_trait;
use hyper::body::Bytes;

/// 送進 handler 的請求內容（body 已讀完）
#[derive(Debug)]
pub struct IncomingRequest {
    pub method: http::Method,
    /// 完整的請求路徑
    pub path: String,
    pub query: Option<String>,
    /// 萬用路由比對後剩下的尾段，無萬用字元時為空字串
    pub trailer: String,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, req: IncomingRequest) -> Result<http::Response<Bytes>>;
}
