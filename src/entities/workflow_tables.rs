//! Table-set definition shared by every workflow.
//!
//! Production, shipping and subcontracting orders are stored in separate tables with an
//! identical shape. `workflow_tables!` declares the sea-orm entities for one table set and the
//! conversions into the workflow-independent records in [`crate::models`].

macro_rules! workflow_tables {
    (
        $(#[$meta:meta])*
        $vis:vis mod $name:ident {
            headers: $headers:tt,
            lines: $lines:tt,
            line_serials: $line_serials:tt,
            header_serials: $header_serials:tt,
            terminal_lines: $terminal_lines:tt,
            import_lines: $import_lines:tt,
            routes: $routes:tt,
            parameters: $parameters:tt $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis mod $name {
            use sea_orm::sea_query::TableCreateStatement;
            use sea_orm::Schema;

            pub mod header {
                use sea_orm::entity::prelude::*;
                use serde::{Deserialize, Serialize};

                #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
                #[sea_orm(table_name = $headers)]
                pub struct Model {
                    #[sea_orm(primary_key)]
                    pub id: i64,
                    pub branch_code: String,
                    pub document_no: Option<String>,
                    pub customer_code: Option<String>,
                    pub source_warehouse_code: Option<String>,
                    pub target_warehouse_code: Option<String>,
                    pub planned_date: Option<DateTimeUtc>,
                    pub description: Option<String>,
                    pub is_completed: bool,
                    pub completion_date: Option<DateTimeUtc>,
                    pub is_pending_approval: bool,
                    pub approval_status: Option<bool>,
                    pub approved_by_user_id: Option<i64>,
                    pub approval_date: Option<DateTimeUtc>,
                    pub is_erp_integrated: bool,
                    pub created_by: Option<i64>,
                    pub created_at: DateTimeUtc,
                    pub updated_at: Option<DateTimeUtc>,
                    pub is_deleted: bool,
                    pub deleted_at: Option<DateTimeUtc>,
                    pub deleted_by: Option<i64>,
                }

                #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
                pub enum Relation {}

                impl ActiveModelBehavior for ActiveModel {}

                impl From<Model> for crate::models::Header {
                    fn from(m: Model) -> Self {
                        Self {
                            id: m.id,
                            branch_code: m.branch_code,
                            document_no: m.document_no,
                            customer_code: m.customer_code,
                            source_warehouse_code: m.source_warehouse_code,
                            target_warehouse_code: m.target_warehouse_code,
                            planned_date: m.planned_date,
                            description: m.description,
                            is_completed: m.is_completed,
                            completion_date: m.completion_date,
                            is_pending_approval: m.is_pending_approval,
                            approval_status: m.approval_status,
                            approved_by_user_id: m.approved_by_user_id,
                            approval_date: m.approval_date,
                            is_erp_integrated: m.is_erp_integrated,
                            created_by: m.created_by,
                            created_at: m.created_at,
                            is_deleted: m.is_deleted,
                            deleted_at: m.deleted_at,
                            deleted_by: m.deleted_by,
                        }
                    }
                }
            }

            pub mod line {
                use sea_orm::entity::prelude::*;
                use serde::{Deserialize, Serialize};

                #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
                #[sea_orm(table_name = $lines)]
                pub struct Model {
                    #[sea_orm(primary_key)]
                    pub id: i64,
                    pub header_id: i64,
                    pub stock_code: String,
                    pub configuration_code: Option<String>,
                    pub quantity: Decimal,
                    pub unit: Option<String>,
                    pub erp_order_no: Option<String>,
                    pub erp_order_line_no: Option<String>,
                    pub description: Option<String>,
                    pub created_at: DateTimeUtc,
                    pub is_deleted: bool,
                    pub deleted_at: Option<DateTimeUtc>,
                    pub deleted_by: Option<i64>,
                }

                #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
                pub enum Relation {
                    #[sea_orm(
                        belongs_to = "super::header::Entity",
                        from = "Column::HeaderId",
                        to = "super::header::Column::Id"
                    )]
                    Header,
                }

                impl Related<super::header::Entity> for Entity {
                    fn to() -> RelationDef {
                        Relation::Header.def()
                    }
                }

                impl ActiveModelBehavior for ActiveModel {}

                impl From<Model> for crate::models::Line {
                    fn from(m: Model) -> Self {
                        Self {
                            id: m.id,
                            header_id: m.header_id,
                            stock_code: m.stock_code,
                            configuration_code: m.configuration_code,
                            quantity: m.quantity,
                            unit: m.unit,
                            erp_order_no: m.erp_order_no,
                            erp_order_line_no: m.erp_order_line_no,
                            description: m.description,
                            created_at: m.created_at,
                            is_deleted: m.is_deleted,
                            deleted_at: m.deleted_at,
                            deleted_by: m.deleted_by,
                        }
                    }
                }
            }

            pub mod line_serial {
                use sea_orm::entity::prelude::*;
                use serde::{Deserialize, Serialize};

                #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
                #[sea_orm(table_name = $line_serials)]
                pub struct Model {
                    #[sea_orm(primary_key)]
                    pub id: i64,
                    pub line_id: i64,
                    pub quantity: Decimal,
                    pub serial_no: Option<String>,
                    pub serial_no2: Option<String>,
                    pub serial_no3: Option<String>,
                    pub serial_no4: Option<String>,
                    pub source_cell_code: Option<String>,
                    pub target_cell_code: Option<String>,
                    pub created_at: DateTimeUtc,
                    pub is_deleted: bool,
                    pub deleted_at: Option<DateTimeUtc>,
                    pub deleted_by: Option<i64>,
                }

                #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
                pub enum Relation {
                    #[sea_orm(
                        belongs_to = "super::line::Entity",
                        from = "Column::LineId",
                        to = "super::line::Column::Id"
                    )]
                    Line,
                }

                impl Related<super::line::Entity> for Entity {
                    fn to() -> RelationDef {
                        Relation::Line.def()
                    }
                }

                impl ActiveModelBehavior for ActiveModel {}

                impl From<Model> for crate::models::LineSerial {
                    fn from(m: Model) -> Self {
                        Self {
                            id: m.id,
                            line_id: m.line_id,
                            quantity: m.quantity,
                            serial_no: m.serial_no,
                            serial_no2: m.serial_no2,
                            serial_no3: m.serial_no3,
                            serial_no4: m.serial_no4,
                            source_cell_code: m.source_cell_code,
                            target_cell_code: m.target_cell_code,
                            created_at: m.created_at,
                            is_deleted: m.is_deleted,
                            deleted_at: m.deleted_at,
                            deleted_by: m.deleted_by,
                        }
                    }
                }
            }

            pub mod header_serial {
                use sea_orm::entity::prelude::*;
                use serde::{Deserialize, Serialize};

                #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
                #[sea_orm(table_name = $header_serials)]
                pub struct Model {
                    #[sea_orm(primary_key)]
                    pub id: i64,
                    pub header_id: i64,
                    pub serial_no: String,
                    pub description: Option<String>,
                    pub created_at: DateTimeUtc,
                    pub is_deleted: bool,
                    pub deleted_at: Option<DateTimeUtc>,
                    pub deleted_by: Option<i64>,
                }

                #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
                pub enum Relation {
                    #[sea_orm(
                        belongs_to = "super::header::Entity",
                        from = "Column::HeaderId",
                        to = "super::header::Column::Id"
                    )]
                    Header,
                }

                impl ActiveModelBehavior for ActiveModel {}

                impl From<Model> for crate::models::HeaderSerial {
                    fn from(m: Model) -> Self {
                        Self {
                            id: m.id,
                            header_id: m.header_id,
                            serial_no: m.serial_no,
                            description: m.description,
                            created_at: m.created_at,
                            is_deleted: m.is_deleted,
                            deleted_at: m.deleted_at,
                            deleted_by: m.deleted_by,
                        }
                    }
                }
            }

            pub mod terminal_line {
                use sea_orm::entity::prelude::*;
                use serde::{Deserialize, Serialize};

                use crate::models::document::{HasHeaderId, HasId, HasTerminalUserId};

                #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
                #[sea_orm(table_name = $terminal_lines)]
                pub struct Model {
                    #[sea_orm(primary_key)]
                    pub id: i64,
                    pub header_id: i64,
                    pub terminal_user_id: i64,
                    pub created_at: DateTimeUtc,
                    pub is_deleted: bool,
                    pub deleted_at: Option<DateTimeUtc>,
                    pub deleted_by: Option<i64>,
                }

                #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
                pub enum Relation {
                    #[sea_orm(
                        belongs_to = "super::header::Entity",
                        from = "Column::HeaderId",
                        to = "super::header::Column::Id"
                    )]
                    Header,
                }

                impl ActiveModelBehavior for ActiveModel {}

                impl HasId for Model {
                    fn id(&self) -> i64 {
                        self.id
                    }
                }

                impl HasHeaderId for Model {
                    fn header_id(&self) -> i64 {
                        self.header_id
                    }
                }

                impl HasTerminalUserId for Model {
                    fn terminal_user_id(&self) -> i64 {
                        self.terminal_user_id
                    }
                }

                impl From<Model> for crate::models::TerminalLine {
                    fn from(m: Model) -> Self {
                        Self {
                            id: m.id,
                            header_id: m.header_id,
                            terminal_user_id: m.terminal_user_id,
                            created_at: m.created_at,
                            is_deleted: m.is_deleted,
                            deleted_at: m.deleted_at,
                            deleted_by: m.deleted_by,
                        }
                    }
                }
            }

            pub mod import_line {
                use sea_orm::entity::prelude::*;
                use serde::{Deserialize, Serialize};

                #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
                #[sea_orm(table_name = $import_lines)]
                pub struct Model {
                    #[sea_orm(primary_key)]
                    pub id: i64,
                    pub header_id: i64,
                    pub line_id: Option<i64>,
                    pub stock_code: String,
                    pub configuration_code: Option<String>,
                    pub description: Option<String>,
                    pub created_by: Option<i64>,
                    pub created_at: DateTimeUtc,
                    pub is_deleted: bool,
                    pub deleted_at: Option<DateTimeUtc>,
                    pub deleted_by: Option<i64>,
                }

                #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
                pub enum Relation {
                    #[sea_orm(
                        belongs_to = "super::header::Entity",
                        from = "Column::HeaderId",
                        to = "super::header::Column::Id"
                    )]
                    Header,
                    #[sea_orm(
                        belongs_to = "super::line::Entity",
                        from = "Column::LineId",
                        to = "super::line::Column::Id"
                    )]
                    Line,
                }

                impl ActiveModelBehavior for ActiveModel {}

                impl From<Model> for crate::models::ImportLine {
                    fn from(m: Model) -> Self {
                        Self {
                            id: m.id,
                            header_id: m.header_id,
                            line_id: m.line_id,
                            stock_code: m.stock_code,
                            configuration_code: m.configuration_code,
                            description: m.description,
                            created_by: m.created_by,
                            created_at: m.created_at,
                            is_deleted: m.is_deleted,
                            deleted_at: m.deleted_at,
                            deleted_by: m.deleted_by,
                        }
                    }
                }
            }

            pub mod route {
                use sea_orm::entity::prelude::*;
                use serde::{Deserialize, Serialize};

                #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
                #[sea_orm(table_name = $routes)]
                pub struct Model {
                    #[sea_orm(primary_key)]
                    pub id: i64,
                    pub import_line_id: i64,
                    pub scanned_barcode: String,
                    pub quantity: Decimal,
                    pub serial_no: Option<String>,
                    pub serial_no2: Option<String>,
                    pub serial_no3: Option<String>,
                    pub serial_no4: Option<String>,
                    pub source_cell_code: Option<String>,
                    pub target_cell_code: Option<String>,
                    pub source_warehouse_code: Option<String>,
                    pub target_warehouse_code: Option<String>,
                    pub description: Option<String>,
                    pub created_by: Option<i64>,
                    pub created_at: DateTimeUtc,
                    pub is_deleted: bool,
                    pub deleted_at: Option<DateTimeUtc>,
                    pub deleted_by: Option<i64>,
                }

                #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
                pub enum Relation {
                    #[sea_orm(
                        belongs_to = "super::import_line::Entity",
                        from = "Column::ImportLineId",
                        to = "super::import_line::Column::Id"
                    )]
                    ImportLine,
                }

                impl Related<super::import_line::Entity> for Entity {
                    fn to() -> RelationDef {
                        Relation::ImportLine.def()
                    }
                }

                impl ActiveModelBehavior for ActiveModel {}

                impl From<Model> for crate::models::Route {
                    fn from(m: Model) -> Self {
                        Self {
                            id: m.id,
                            import_line_id: m.import_line_id,
                            scanned_barcode: m.scanned_barcode,
                            quantity: m.quantity,
                            serial_no: m.serial_no,
                            serial_no2: m.serial_no2,
                            serial_no3: m.serial_no3,
                            serial_no4: m.serial_no4,
                            source_cell_code: m.source_cell_code,
                            target_cell_code: m.target_cell_code,
                            source_warehouse_code: m.source_warehouse_code,
                            target_warehouse_code: m.target_warehouse_code,
                            description: m.description,
                            created_by: m.created_by,
                            created_at: m.created_at,
                            is_deleted: m.is_deleted,
                            deleted_at: m.deleted_at,
                            deleted_by: m.deleted_by,
                        }
                    }
                }
            }

            pub mod parameter {
                use sea_orm::entity::prelude::*;
                use serde::{Deserialize, Serialize};

                #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
                #[sea_orm(table_name = $parameters)]
                pub struct Model {
                    #[sea_orm(primary_key)]
                    pub id: i64,
                    pub allow_less_quantity_based_on_order: bool,
                    pub allow_more_quantity_based_on_order: bool,
                    pub require_all_order_items_collected: bool,
                    pub require_approval_before_erp: bool,
                    pub updated_at: Option<DateTimeUtc>,
                    pub is_deleted: bool,
                }

                #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
                pub enum Relation {}

                impl ActiveModelBehavior for ActiveModel {}

                impl From<Model> for crate::models::WorkflowParameter {
                    fn from(m: Model) -> Self {
                        Self {
                            id: m.id,
                            allow_less_quantity_based_on_order: m.allow_less_quantity_based_on_order,
                            allow_more_quantity_based_on_order: m.allow_more_quantity_based_on_order,
                            require_all_order_items_collected: m.require_all_order_items_collected,
                            require_approval_before_erp: m.require_approval_before_erp,
                        }
                    }
                }
            }

            /// `CREATE TABLE` statements in dependency order (parents first).
            pub fn create_table_statements(schema: &Schema) -> Vec<TableCreateStatement> {
                vec![
                    schema.create_table_from_entity(header::Entity),
                    schema.create_table_from_entity(line::Entity),
                    schema.create_table_from_entity(line_serial::Entity),
                    schema.create_table_from_entity(header_serial::Entity),
                    schema.create_table_from_entity(terminal_line::Entity),
                    schema.create_table_from_entity(import_line::Entity),
                    schema.create_table_from_entity(route::Entity),
                    schema.create_table_from_entity(parameter::Entity),
                ]
            }
        }
    };
}
