//! Relational engines and the SQL that differs between them

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Relational engines a connection string can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Sqlite,
    Postgresql,
    Mysql,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgresql => "postgresql",
            Dialect::Mysql => "mysql",
        }
    }

    /// Statement opening a write transaction.
    ///
    /// SQLite takes the write lock up front so concurrent workers queue on
    /// the busy timeout instead of failing on lock upgrade.
    pub fn begin_write(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "BEGIN IMMEDIATE",
            Dialect::Postgresql => "BEGIN",
            Dialect::Mysql => "START TRANSACTION",
        }
    }

    /// Column definition of a generated integer primary key
    pub fn generated_key(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Dialect::Postgresql => "BIGSERIAL PRIMARY KEY",
            Dialect::Mysql => "BIGINT AUTO_INCREMENT PRIMARY KEY",
        }
    }

    /// Rewrite `?` bind markers into the engine's own syntax.
    ///
    /// Statements passed here never contain a literal `?`.
    pub fn bind_markers<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        if *self != Dialect::Postgresql || !sql.contains('?') {
            return Cow::Borrowed(sql);
        }
        let mut out = String::with_capacity(sql.len() + 8);
        let mut n = 0;
        for c in sql.chars() {
            if c == '?' {
                n += 1;
                out.push('$');
                out.push_str(&n.to_string());
            } else {
                out.push(c);
            }
        }
        Cow::Owned(out)
    }

    /// `INSERT` that skips rows colliding with a unique key
    pub fn insert_ignoring_duplicates(&self, table: &str, columns: &[&str]) -> String {
        let markers = vec!["?"; columns.len()].join(", ");
        match self {
            Dialect::Mysql => format!(
                "INSERT IGNORE INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                markers
            ),
            Dialect::Sqlite | Dialect::Postgresql => format!(
                "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT DO NOTHING",
                table,
                columns.join(", "),
                markers
            ),
        }
    }

    /// Suffix making a `SELECT` see rows committed after the transaction's
    /// snapshot was taken (MySQL reads from a snapshot by default)
    pub fn latest_read(&self) -> &'static str {
        match self {
            Dialect::Mysql => " LOCK IN SHARE MODE",
            Dialect::Sqlite | Dialect::Postgresql => "",
        }
    }

    /// Quote an identifier such as a database name
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Dialect::Mysql => format!("`{}`", name.replace('`', "``")),
            Dialect::Sqlite | Dialect::Postgresql => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            "postgresql" | "postgres" => Ok(Dialect::Postgresql),
            "mysql" | "mariadb" => Ok(Dialect::Mysql),
            other => Err(Error::InvalidUrl(format!("Unknown dialect: {}", other))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_numbers_bind_markers() {
        let sql = "SELECT id FROM tags WHERE number = ? AND hex_color = ? AND label = ?";
        assert_eq!(
            Dialect::Postgresql.bind_markers(sql),
            "SELECT id FROM tags WHERE number = $1 AND hex_color = $2 AND label = $3"
        );
        assert!(matches!(Dialect::Sqlite.bind_markers(sql), Cow::Borrowed(_)));
        assert!(matches!(Dialect::Mysql.bind_markers(sql), Cow::Borrowed(_)));
    }

    #[test]
    fn test_insert_ignoring_duplicates_per_engine() {
        let cols = ["debtor_id", "tag_id"];
        assert_eq!(
            Dialect::Mysql.insert_ignoring_duplicates("debtors_tags_association", &cols),
            "INSERT IGNORE INTO debtors_tags_association (debtor_id, tag_id) VALUES (?, ?)"
        );
        assert_eq!(
            Dialect::Postgresql.insert_ignoring_duplicates("debtors_tags_association", &cols),
            "INSERT INTO debtors_tags_association (debtor_id, tag_id) VALUES (?, ?) ON CONFLICT DO NOTHING"
        );
    }

    #[test]
    fn test_quote_identifier_escapes() {
        assert_eq!(Dialect::Postgresql.quote_identifier("pay\"roll"), "\"pay\"\"roll\"");
        assert_eq!(Dialect::Mysql.quote_identifier("pay`roll"), "`pay``roll`");
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!("postgres".parse::<Dialect>().unwrap(), Dialect::Postgresql);
        assert_eq!("MariaDB".parse::<Dialect>().unwrap(), Dialect::Mysql);
        assert!("oracle".parse::<Dialect>().is_err());
    }
}
