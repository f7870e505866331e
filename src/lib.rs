//! Multi-database MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to manage MySQL, Oracle, PostgreSQL, SQLite and SQL Server databases:
//! named connections, schema introspection and DDL, and CRUD with batches.

pub mod catalog;
pub mod config;
pub mod db;
pub mod dialect;
pub mod error;
pub mod facade;
pub mod mcp;
pub mod models;
pub mod ops;
pub mod tools;
pub mod transport;

pub use catalog::ConnectionCatalog;
pub use config::Config;
pub use error::DbError;
pub use facade::DatabaseFacade;
pub use mcp::DbService;
