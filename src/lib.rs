pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod ratelimiter;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod systemd;
pub mod tls;

pub use config::{Cli, Config};
pub use error::{CastorError, HandlerError, RequestError};
pub use handlers::{Handler, StaticHandler, TemplateHandler};
pub use request::{GeminiRequest, check_url};
pub use response::{Response, TemplateError};
pub use router::{RouteTarget, Router};
pub use server::Server;
pub use tls::ServerIdentity;
