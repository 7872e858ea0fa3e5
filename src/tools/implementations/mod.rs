//! Tool handlers, one per tool kind

pub mod database;
pub mod function;
pub mod http;

pub use database::QueryBackend;
pub use function::{FunctionRegistry, ToolFunction};
pub use http::HttpHandler;
