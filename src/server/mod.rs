pub mod builder;
pub mod cors;
pub mod handler;
pub mod listener;

pub use builder::ServerBuilder;
pub use cors::cors_layer;
pub use handler::RequestHandler;
