pub mod chat_routes;
pub mod webhook_routes;
