//! Row types mirrored from the payroll provider
//!
//! The hierarchy is a rooted tree with one cross-cutting edge:
//! - `Debtor` owns `Company` rows
//! - `Company` owns `Employee` rows, each classified by an `EmployeeType`
//! - `Tag` is attached to debtors many-to-many and deduplicated by
//!   its `(number, hex_color, label)` triple

use serde::{Deserialize, Serialize};

/// The employee type codes the provider knows about.
///
/// Employees are fetched once per company for every code in this list.
pub const EMPLOYEE_TYPE_CODES: [i64; 7] = [1, 2, 3, 4, 5, 6, 7];

/// Top-level billing entity. `id` comes from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debtor {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub number: Option<String>,
}

impl Debtor {
    /// Create a debtor without a debtor number
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            number: None,
        }
    }

    /// Set the debtor number
    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }
}

/// Organizational unit under a debtor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    pub id: i64,
    pub number: Option<i64>,
    pub name: String,
    pub phone_number: Option<String>,
    pub fax_number: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    /// Wage tax filing period (e.g. monthly, four-weekly)
    pub filing_period: Option<String>,
    /// Chamber of commerce registration number
    pub registration_number: Option<String>,
}

impl Company {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Classification shared by all companies (codes 1..=7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeType {
    pub id: i64,
    pub description: String,
}

impl EmployeeType {
    pub fn new(id: i64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub number: Option<i64>,
}

impl Employee {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            number: None,
        }
    }

    pub fn with_number(mut self, number: i64) -> Self {
        self.number = Some(number);
        self
    }
}

/// A label attachable to debtors.
///
/// Tags have no provider identity; two tags are the same tag when
/// their `(number, hex_color, label)` triples are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub number: i64,
    pub hex_color: String,
    pub label: String,
}

impl Tag {
    pub fn new(number: i64, hex_color: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            number,
            hex_color: hex_color.into(),
            label: label.into(),
        }
    }

    /// The dedup key
    pub fn key(&self) -> (i64, &str, &str) {
        (self.number, &self.hex_color, &self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_employee_type_codes_are_one_through_seven() {
        assert_eq!(EMPLOYEE_TYPE_CODES.len(), 7);
        assert_eq!(EMPLOYEE_TYPE_CODES.first(), Some(&1));
        assert_eq!(EMPLOYEE_TYPE_CODES.last(), Some(&7));
    }

    #[test]
    fn test_company_deserializes_with_missing_fields() {
        let company: Company = serde_json::from_str(r#"{"id": 10, "name": "Acme BV"}"#).unwrap();
        assert_eq!(company.id, 10);
        assert_eq!(company.name, "Acme BV");
        assert!(company.email.is_none());
        assert!(company.number.is_none());
    }

    #[test]
    fn test_tag_key_ignores_nothing() {
        let a = Tag::new(1, "#ff0000", "VIP");
        let b = Tag::new(1, "#ff0000", "vip");
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), Tag::new(1, "#ff0000", "VIP").key());
    }
}
