pub mod app;
pub mod engine;
pub mod router;
pub mod server;

pub use crate::domain::model::App;
pub use crate::domain::ports::{IncomingRequest, RequestHandler};
pub use crate::utils::error::Result;
pub use engine::{HostEngine, RunningHost};
pub use router::Router;
pub use server::HttpServer;
