//! MCP tool implementations.
//!
//! This module contains the tool handlers behind the MCP service:
//! - `connection`: live connections and the configuration file
//! - `schema`: table listing, introspection and DDL
//! - `data`: CRUD, batches, pagination and raw statements

pub mod connection;
pub mod data;
pub mod schema;

pub use connection::{
    AddConnectionInput, AddConnectionOutput, ConfiguredConnectionInput, ConnectionToolHandler,
    ListConfiguredConnectionsOutput, ListConnectionsOutput, ReloadConfigurationsOutput,
    RemoveConnectionInput, RemoveConnectionOutput, SetEnabledOutput,
};
pub use data::{
    BatchDeleteInput, BatchInsertInput, BatchUpdateInput, DataToolHandler, DeleteInput,
    ExecuteRawQueryInput, InsertInput, InsertOutput, RowsAffectedOutput, RowsOutput, SelectInput,
    SelectPaginatedInput, UpdateInput,
};
pub use schema::{
    AlterTableInput, CreateTableInput, DescribeTableInput, DescribeTableOutput, DropTableInput,
    ListTablesInput, ListTablesOutput, SchemaChangeOutput, SchemaToolHandler,
};
