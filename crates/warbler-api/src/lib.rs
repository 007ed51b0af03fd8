pub mod auth;
pub mod error;
pub mod flash;
pub mod messages;
pub mod middleware;
pub mod pages;
pub mod routes;
pub mod users;
