use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::storage::{QueryRows, StoreStats};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Rows")]
    pub rows: String,
}

/// Render raw query results with a header row
pub fn query_table(result: &QueryRows) -> String {
    if result.columns.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(result.columns.iter().cloned());
    for row in &result.rows {
        builder.push_record(row.iter().map(ToString::to_string));
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &StoreStats) -> String {
    let rows: Vec<TableRow> = [
        ("debtors", stats.debtors),
        ("tags", stats.tags),
        ("debtors_tags_association", stats.debtor_tags),
        ("companies", stats.companies),
        ("employee_types", stats.employee_types),
        ("employees", stats.employees),
    ]
    .into_iter()
    .map(|(table, rows)| TableRow {
        table: table.to_string(),
        rows: rows.to_string(),
    })
    .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqlValue;

    #[test]
    fn test_query_table_renders_header_and_cells() {
        let result = QueryRows {
            columns: vec!["id".into(), "name".into()],
            rows: vec![vec![SqlValue::Integer(1), SqlValue::Text("Debtor 1".into())]],
        };
        let rendered = query_table(&result);
        assert!(rendered.contains("name"));
        assert!(rendered.contains("Debtor 1"));
    }

    #[test]
    fn test_query_table_without_columns_is_empty() {
        let result = QueryRows {
            columns: Vec::new(),
            rows: Vec::new(),
        };
        assert!(query_table(&result).is_empty());
    }

    #[test]
    fn test_stats_table_lists_every_table() {
        let rendered = stats_table(&StoreStats {
            employees: 42,
            ..StoreStats::default()
        });
        assert!(rendered.contains("employee_types"));
        assert!(rendered.contains("42"));
    }
}
