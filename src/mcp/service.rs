//! MCP service implementation using rmcp.
//!
//! This module defines the DbService struct with every database tool
//! exposed via the MCP protocol using the rmcp framework's macros.
//! Tool names are camelCase (`listTables`, `batchInsert`, ...).

use crate::catalog::ConnectionCatalog;
use crate::facade::DatabaseFacade;
use crate::models::{BatchResult, PaginatedResult};
use crate::tools::{
    AddConnectionInput, AddConnectionOutput, AlterTableInput, BatchDeleteInput, BatchInsertInput,
    BatchUpdateInput, ConfiguredConnectionInput, ConnectionToolHandler, CreateTableInput,
    DataToolHandler, DeleteInput, DescribeTableInput, DescribeTableOutput, DropTableInput,
    ExecuteRawQueryInput, InsertInput, InsertOutput, ListConfiguredConnectionsOutput,
    ListConnectionsOutput, ListTablesInput, ListTablesOutput, ReloadConfigurationsOutput,
    RemoveConnectionInput, RemoveConnectionOutput, RowsAffectedOutput, RowsOutput,
    SchemaChangeOutput, SchemaToolHandler, SelectInput, SelectPaginatedInput, SetEnabledOutput,
    UpdateInput,
};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct DbService {
    /// Shared facade over the connection registry and operations
    facade: Arc<DatabaseFacade>,
    /// Shared configuration file
    catalog: Arc<ConnectionCatalog>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl DbService {
    /// Create a new DbService instance.
    pub fn new(facade: Arc<DatabaseFacade>, catalog: Arc<ConnectionCatalog>) -> Self {
        Self {
            facade,
            catalog,
            tool_router: Self::tool_router(),
        }
    }

    fn connections(&self) -> ConnectionToolHandler {
        ConnectionToolHandler::new(self.facade.clone(), self.catalog.clone())
    }

    fn schema(&self) -> SchemaToolHandler {
        SchemaToolHandler::new(self.facade.clone())
    }

    fn data(&self) -> DataToolHandler {
        DataToolHandler::new(self.facade.clone())
    }

    /// Trim a connection name and check that a live connection exists.
    ///
    /// Unknown names surface as `resource_not_found` instead of a bare
    /// failure flag, pointing the caller at listConnections.
    async fn require_connection(&self, provided: &str) -> Result<String, McpError> {
        let trimmed = provided.trim();
        if trimmed.is_empty() {
            return Err(McpError::invalid_params(
                "connection_name is required. Call listConnections first to get available names.",
                None,
            ));
        }
        if !self.facade.has_connection(trimmed).await {
            return Err(McpError::resource_not_found(
                format!("Connection '{trimmed}' not found. Call listConnections to see available names."),
                None,
            ));
        }
        Ok(trimmed.to_string())
    }
}

#[tool_router]
impl DbService {
    #[tool(
        name = "addConnection",
        description = "Connect to a database and register it under a name.\nEngines: mysql, oracle, postgresql, sqlite, sqlserver. SQLite only needs `database` (the file path).\nSet save_to_config to also store it in the configuration file."
    )]
    async fn add_connection(
        &self,
        Parameters(input): Parameters<AddConnectionInput>,
    ) -> Result<Json<AddConnectionOutput>, McpError> {
        self.connections()
            .add_connection(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "removeConnection",
        description = "Close a live connection.\nSet remove_from_config to also delete it from the configuration file."
    )]
    async fn remove_connection(
        &self,
        Parameters(input): Parameters<RemoveConnectionInput>,
    ) -> Result<Json<RemoveConnectionOutput>, McpError> {
        self.connections()
            .remove_connection(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "listConnections",
        description = "List live database connections with their engine types."
    )]
    async fn list_connections(&self) -> Json<ListConnectionsOutput> {
        Json(self.connections().list_connections().await)
    }

    #[tool(
        name = "listConfiguredConnections",
        description = "List connections stored in the configuration file (passwords hidden), with enabled and connected flags."
    )]
    async fn list_configured_connections(&self) -> Json<ListConfiguredConnectionsOutput> {
        Json(self.connections().list_configured_connections().await)
    }

    #[tool(
        name = "enableConfiguredConnection",
        description = "Mark a configured connection as enabled. Run reloadConfigurations to connect it."
    )]
    async fn enable_configured_connection(
        &self,
        Parameters(input): Parameters<ConfiguredConnectionInput>,
    ) -> Result<Json<SetEnabledOutput>, McpError> {
        self.connections()
            .set_enabled(input, true)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "disableConfiguredConnection",
        description = "Mark a configured connection as disabled so it is skipped at startup and on reload."
    )]
    async fn disable_configured_connection(
        &self,
        Parameters(input): Parameters<ConfiguredConnectionInput>,
    ) -> Result<Json<SetEnabledOutput>, McpError> {
        self.connections()
            .set_enabled(input, false)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "reloadConfigurations",
        description = "Re-read the configuration file and connect every enabled connection.\nReturns whether each one connected."
    )]
    async fn reload_configurations(&self) -> Result<Json<ReloadConfigurationsOutput>, McpError> {
        self.connections()
            .reload_configurations()
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "listTables",
        description = "List tables of a connection, as `table(comment)` where the engine stores a comment.\nOptional pattern supports `*` and `?` wildcards."
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<Json<ListTablesOutput>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.schema()
            .list_tables(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "describeTable",
        description = "Describe the columns of a table: name, type, nullable, default and engine-specific details.\nOptional column_pattern supports `*` and `?` wildcards."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<Json<DescribeTableOutput>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.schema()
            .describe_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "createTable",
        description = "Create a table from column definitions (name, type, length, nullable, primary_key, default, comment).\nRuns in a transaction together with any comment statements."
    )]
    async fn create_table(
        &self,
        Parameters(input): Parameters<CreateTableInput>,
    ) -> Result<Json<SchemaChangeOutput>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.schema()
            .create_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "dropTable",
        description = "Drop a table. cascade also drops dependent objects where the engine supports it."
    )]
    async fn drop_table(
        &self,
        Parameters(input): Parameters<DropTableInput>,
    ) -> Result<Json<SchemaChangeOutput>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.schema()
            .drop_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "alterTable",
        description = "Alter a table with add_column, drop_column, modify_column and rename_column steps.\nAll steps run in one transaction: either every step applies or none does.\nSQLite only supports add_column."
    )]
    async fn alter_table(
        &self,
        Parameters(input): Parameters<AlterTableInput>,
    ) -> Result<Json<SchemaChangeOutput>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.schema()
            .alter_table(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "executeRawQuery",
        description = "Run a SQL statement with positional parameters in the engine's placeholder syntax.\nReturns rows for queries and an empty list otherwise. Set commit to run it in a committed transaction."
    )]
    async fn execute_raw_query(
        &self,
        Parameters(input): Parameters<ExecuteRawQueryInput>,
    ) -> Result<Json<RowsOutput>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.data()
            .execute_raw_query(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "select",
        description = "Read rows from a table, filtered by column equality conditions.\nDates and times are returned as `YYYY-MM-DD HH:MM:SS`."
    )]
    async fn select(
        &self,
        Parameters(input): Parameters<SelectInput>,
    ) -> Result<Json<RowsOutput>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.data()
            .select(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "selectPaginated",
        description = "Read one page of rows plus page and record totals.\npage is 1-based; page_size defaults to 20."
    )]
    async fn select_paginated(
        &self,
        Parameters(input): Parameters<SelectPaginatedInput>,
    ) -> Result<Json<PaginatedResult>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.data()
            .select_paginated(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "insert",
        description = "Insert one row. Date strings (`YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`) are bound as dates where the engine needs it."
    )]
    async fn insert(
        &self,
        Parameters(input): Parameters<InsertInput>,
    ) -> Result<Json<InsertOutput>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.data()
            .insert(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "batchInsert",
        description = "Insert many rows, each in its own transaction. Failures are reported per row and do not stop the batch.\nSet concurrent to dispatch the inserts in parallel."
    )]
    async fn batch_insert(
        &self,
        Parameters(input): Parameters<BatchInsertInput>,
    ) -> Result<Json<BatchResult>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.data()
            .batch_insert(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "update",
        description = "Update rows matching the conditions and return the affected count (-1 on failure).\nWithout conditions EVERY row is updated."
    )]
    async fn update(
        &self,
        Parameters(input): Parameters<UpdateInput>,
    ) -> Result<Json<RowsAffectedOutput>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.data()
            .update(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "batchUpdate",
        description = "Apply data_list[i] to rows matching conditions_list[i], each pair in its own transaction.\nBoth lists must have the same length."
    )]
    async fn batch_update(
        &self,
        Parameters(input): Parameters<BatchUpdateInput>,
    ) -> Result<Json<BatchResult>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.data()
            .batch_update(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "delete",
        description = "Delete rows matching the conditions and return the affected count (-1 on failure).\nWithout conditions EVERY row is deleted."
    )]
    async fn delete(
        &self,
        Parameters(input): Parameters<DeleteInput>,
    ) -> Result<Json<RowsAffectedOutput>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.data()
            .delete(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        name = "batchDelete",
        description = "Delete rows for each entry of conditions_list, each in its own transaction.\nReports per-entry failures and the total affected rows."
    )]
    async fn batch_delete(
        &self,
        Parameters(input): Parameters<BatchDeleteInput>,
    ) -> Result<Json<BatchResult>, McpError> {
        let mut input = input;
        input.connection_name = self.require_connection(&input.connection_name).await?;
        self.data()
            .batch_delete(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for DbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "multidb-mcp-server".to_owned(),
                title: Some("Multi-Database MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for managing MySQL, Oracle, PostgreSQL, SQLite and SQL Server databases.\n\
                \n\
                ## Workflow\n\
                1. Call `listConnections` to get live connection names\n\
                   (or `addConnection` / `reloadConfigurations` to create them)\n\
                2. Pass the name as `connection_name` to every other tool\n\
                \n\
                ## Writes\n\
                - Every insert, update, delete and DDL call runs in its own transaction\n\
                - `update` and `delete` without conditions affect EVERY row\n\
                - `alterTable` applies all steps or none\n\
                - Batch tools report per-item failures instead of stopping\n\
                \n\
                ## Values\n\
                - Dates and times are returned as `YYYY-MM-DD HH:MM:SS`\n\
                - Binary values are returned as base64 strings"
                    .to_string(),
            ),
        }
    }
}
