//! Data models for the multi-database MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{ConnectionDescriptor, ConnectionSummary, DatabaseType};
pub use query::{
    BatchResult, BoundQuery, ColumnTypes, Conditions, FailedRecord, PaginatedResult, QueryParam,
    Row,
};
pub use schema::{AlterOperation, ColumnDefinition, ColumnInfo, ColumnLength};
