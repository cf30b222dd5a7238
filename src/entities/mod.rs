#[macro_use]
mod workflow_tables;

use sea_orm::sea_query::TableCreateStatement;
use sea_orm::Schema;

use crate::models::Workflow;

workflow_tables! {
    /// Production order tables.
    pub mod pr {
        headers: "pr_headers",
        lines: "pr_lines",
        line_serials: "pr_line_serials",
        header_serials: "pr_header_serials",
        terminal_lines: "pr_terminal_lines",
        import_lines: "pr_import_lines",
        routes: "pr_routes",
        parameters: "pr_parameters",
    }
}

workflow_tables! {
    /// Shipping order tables.
    pub mod sh {
        headers: "sh_headers",
        lines: "sh_lines",
        line_serials: "sh_line_serials",
        header_serials: "sh_header_serials",
        terminal_lines: "sh_terminal_lines",
        import_lines: "sh_import_lines",
        routes: "sh_routes",
        parameters: "sh_parameters",
    }
}

workflow_tables! {
    /// Subcontracting issue/transfer tables.
    pub mod sit {
        headers: "sit_headers",
        lines: "sit_lines",
        line_serials: "sit_line_serials",
        header_serials: "sit_header_serials",
        terminal_lines: "sit_terminal_lines",
        import_lines: "sit_import_lines",
        routes: "sit_routes",
        parameters: "sit_parameters",
    }
}

/// Table definitions for one workflow.
pub fn create_table_statements(workflow: Workflow, schema: &Schema) -> Vec<TableCreateStatement> {
    match workflow {
        Workflow::Production => pr::create_table_statements(schema),
        Workflow::Shipping => sh::create_table_statements(schema),
        Workflow::Subcontracting => sit::create_table_statements(schema),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbBackend;
    use strum::IntoEnumIterator;

    #[test]
    fn every_workflow_defines_eight_tables() {
        let schema = Schema::new(DbBackend::Sqlite);
        for workflow in Workflow::iter() {
            assert_eq!(create_table_statements(workflow, &schema).len(), 8);
        }
    }

    #[test]
    fn tables_are_prefixed_by_workflow() {
        let schema = Schema::new(DbBackend::Sqlite);
        let sql: Vec<String> = create_table_statements(Workflow::Subcontracting, &schema)
            .iter()
            .map(|stmt| DbBackend::Sqlite.build(stmt).sql)
            .collect();
        assert!(sql[0].contains("\"sit_headers\""));
        assert!(sql[6].contains("\"sit_routes\""));
        assert!(sql.iter().all(|s| !s.contains("pr_")));
    }
}
