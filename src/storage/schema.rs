//! Database schema definitions
//!
//! Column types are the portable subset (`BIGINT`, `VARCHAR`) so one set of
//! statements serves every engine; only the generated tag key differs.

use super::dialect::Dialect;

const CREATE_DEBTORS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS debtors (
    id BIGINT NOT NULL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    number VARCHAR(255)
)
"#;

/// The (number, hex_color, label) triple identifies a tag store-wide
fn create_tags_table(dialect: Dialect) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS tags (
    id {},
    number BIGINT NOT NULL,
    hex_color VARCHAR(32) NOT NULL,
    label VARCHAR(255) NOT NULL,
    UNIQUE (number, hex_color, label)
)
"#,
        dialect.generated_key()
    )
}

const CREATE_DEBTORS_TAGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS debtors_tags_association (
    debtor_id BIGINT NOT NULL,
    tag_id BIGINT NOT NULL,
    PRIMARY KEY (debtor_id, tag_id),
    FOREIGN KEY (debtor_id) REFERENCES debtors(id),
    FOREIGN KEY (tag_id) REFERENCES tags(id)
)
"#;

const CREATE_COMPANIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    id BIGINT NOT NULL PRIMARY KEY,
    debtor_id BIGINT NOT NULL,
    number BIGINT,
    name VARCHAR(255) NOT NULL,
    phone_number VARCHAR(255),
    fax_number VARCHAR(255),
    email VARCHAR(255),
    website VARCHAR(255),
    filing_period VARCHAR(255),
    registration_number VARCHAR(255),
    FOREIGN KEY (debtor_id) REFERENCES debtors(id)
)
"#;

const CREATE_EMPLOYEE_TYPES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS employee_types (
    id BIGINT NOT NULL PRIMARY KEY,
    description VARCHAR(255) NOT NULL
)
"#;

const CREATE_EMPLOYEES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS employees (
    id BIGINT NOT NULL PRIMARY KEY,
    company_id BIGINT NOT NULL,
    type_id BIGINT NOT NULL,
    number BIGINT,
    name VARCHAR(255) NOT NULL,
    FOREIGN KEY (company_id) REFERENCES companies(id),
    FOREIGN KEY (type_id) REFERENCES employee_types(id)
)
"#;

/// Foreign key indexes. MySQL builds these itself and has no
/// `CREATE INDEX IF NOT EXISTS`.
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_companies_debtor ON companies(debtor_id)",
    "CREATE INDEX IF NOT EXISTS idx_employees_company ON employees(company_id)",
    "CREATE INDEX IF NOT EXISTS idx_employees_type ON employees(type_id)",
    "CREATE INDEX IF NOT EXISTS idx_debtors_tags_tag ON debtors_tags_association(tag_id)",
];

/// Every table, parents before children
pub const TABLES: &[&str] = &[
    "debtors",
    "tags",
    "debtors_tags_association",
    "companies",
    "employee_types",
    "employees",
];

/// Schema creation statements for one engine, in dependency order
pub fn create_statements(dialect: Dialect) -> Vec<String> {
    let mut stmts = vec![
        CREATE_DEBTORS_TABLE.to_string(),
        create_tags_table(dialect),
        CREATE_DEBTORS_TAGS_TABLE.to_string(),
        CREATE_COMPANIES_TABLE.to_string(),
        CREATE_EMPLOYEE_TYPES_TABLE.to_string(),
        CREATE_EMPLOYEES_TABLE.to_string(),
    ];
    if dialect != Dialect::Mysql {
        stmts.extend(CREATE_INDEXES.iter().map(|s| s.to_string()));
    }
    stmts
}

/// Drop statements, children before parents so foreign keys never dangle
pub fn drop_statements() -> Vec<String> {
    TABLES
        .iter()
        .rev()
        .map(|table| format!("DROP TABLE IF EXISTS {}", table))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::{OpenMode, StorageBackend};
    use crate::storage::sqlite::SqliteBackend;
    use std::time::Duration;

    #[test]
    fn test_drop_order_is_reverse_of_creation() {
        let drops = drop_statements();
        assert_eq!(drops.first().map(String::as_str), Some("DROP TABLE IF EXISTS employees"));
        assert_eq!(drops.last().map(String::as_str), Some("DROP TABLE IF EXISTS debtors"));
        assert_eq!(drops.len(), TABLES.len());
    }

    #[test]
    fn test_schema_applies_twice() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("schema.db"), Duration::from_secs(1));
        let mut conn = backend.open_connection(OpenMode::Create).unwrap();
        for _ in 0..2 {
            for stmt in create_statements(Dialect::Sqlite) {
                conn.execute_batch(&stmt).unwrap();
            }
        }
        let count = conn
            .query_i64(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                &[],
            )
            .unwrap();
        assert_eq!(count, Some(TABLES.len() as i64));
    }

    #[test]
    fn test_server_statements_differ_only_where_needed() {
        let pg = create_statements(Dialect::Postgresql);
        assert!(pg[1].contains("BIGSERIAL PRIMARY KEY"));
        assert_eq!(pg.len(), TABLES.len() + CREATE_INDEXES.len());

        let mysql = create_statements(Dialect::Mysql);
        assert!(mysql[1].contains("AUTO_INCREMENT"));
        assert_eq!(mysql.len(), TABLES.len());
        assert!(mysql.iter().all(|s| !s.contains("CREATE INDEX")));
    }
}
