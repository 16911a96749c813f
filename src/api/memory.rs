//! In-memory provider backed by owned data
//!
//! Used for offline loads from a JSON snapshot of the provider and as the
//! test double for the pipeline. Snapshot layout:
//!
//! ```json
//! {
//!   "debtors": [{"id": 1, "name": "Debtor 1"}],
//!   "employee_types": [{"id": 1, "description": "Employee"}],
//!   "companies": {"1": [{"id": 10, "name": "Acme BV"}]},
//!   "employees": {"10": {"1": [{"id": 100, "name": "Jan"}]}},
//!   "tags": {"1": [{"number": 1, "hex_color": "#ff0000", "label": "VIP"}]}
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ApiResult, NmbrsApi};
use crate::model::{Company, Debtor, Employee, EmployeeType, Tag};
use crate::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryApi {
    debtors: Vec<Debtor>,
    employee_types: Vec<EmployeeType>,
    companies: BTreeMap<i64, Vec<Company>>,
    employees: BTreeMap<i64, BTreeMap<i64, Vec<Employee>>>,
    tags: BTreeMap<i64, Vec<Tag>>,
}

impl InMemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a snapshot file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn with_debtor(mut self, debtor: Debtor) -> Self {
        self.debtors.push(debtor);
        self
    }

    pub fn with_employee_type(mut self, employee_type: EmployeeType) -> Self {
        self.employee_types.push(employee_type);
        self
    }

    /// Register the seven standard employee types
    pub fn with_standard_employee_types(mut self) -> Self {
        const DESCRIPTIONS: [&str; 7] = [
            "Employee",
            "Director-major shareholder",
            "Intern",
            "Temporary worker",
            "Freelancer",
            "Pensioner",
            "Other",
        ];
        for (id, description) in (1_i64..).zip(DESCRIPTIONS) {
            self.employee_types.push(EmployeeType::new(id, description));
        }
        self
    }

    pub fn with_company(mut self, debtor_id: i64, company: Company) -> Self {
        self.companies.entry(debtor_id).or_default().push(company);
        self
    }

    pub fn with_employee(mut self, company_id: i64, type_id: i64, employee: Employee) -> Self {
        self.employees
            .entry(company_id)
            .or_default()
            .entry(type_id)
            .or_default()
            .push(employee);
        self
    }

    pub fn with_tag(mut self, debtor_id: i64, tag: Tag) -> Self {
        self.tags.entry(debtor_id).or_default().push(tag);
        self
    }
}

impl NmbrsApi for InMemoryApi {
    fn list_debtors(&self) -> ApiResult<Vec<Debtor>> {
        Ok(self.debtors.clone())
    }

    fn list_companies_by_debtor(&self, debtor_id: i64) -> ApiResult<Vec<Company>> {
        Ok(self.companies.get(&debtor_id).cloned().unwrap_or_default())
    }

    fn list_employee_types(&self) -> ApiResult<Vec<EmployeeType>> {
        Ok(self.employee_types.clone())
    }

    fn list_employees_by_company_and_type(
        &self,
        company_id: i64,
        type_id: i64,
    ) -> ApiResult<Vec<Employee>> {
        Ok(self
            .employees
            .get(&company_id)
            .and_then(|by_type| by_type.get(&type_id))
            .cloned()
            .unwrap_or_default())
    }

    fn list_tags_by_debtor(&self, debtor_id: i64) -> ApiResult<Vec<Tag>> {
        Ok(self.tags.get(&debtor_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_parsing() {
        let api = InMemoryApi::from_json_str(
            r##"{
                "debtors": [{"id": 1, "name": "Debtor 1", "number": "D-1"}],
                "employee_types": [{"id": 1, "description": "Employee"}],
                "companies": {"1": [{"id": 10, "name": "Acme BV", "email": "info@acme.nl"}]},
                "employees": {"10": {"1": [{"id": 100, "name": "Jan", "number": 7}]}},
                "tags": {"1": [{"number": 1, "hex_color": "#ff0000", "label": "VIP"}]}
            }"##,
        )
        .unwrap();

        let debtors = api.list_debtors().unwrap();
        assert_eq!(debtors, vec![Debtor::new(1, "Debtor 1").with_number("D-1")]);

        let companies = api.list_companies_by_debtor(1).unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].email.as_deref(), Some("info@acme.nl"));

        let employees = api.list_employees_by_company_and_type(10, 1).unwrap();
        assert_eq!(employees, vec![Employee::new(100, "Jan").with_number(7)]);

        assert_eq!(api.list_tags_by_debtor(1).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_keys_are_empty() {
        let api = InMemoryApi::from_json_str("{}").unwrap();
        assert!(api.list_debtors().unwrap().is_empty());
        assert!(api.list_companies_by_debtor(42).unwrap().is_empty());
        assert!(api.list_employees_by_company_and_type(42, 3).unwrap().is_empty());
        assert!(api.list_tags_by_debtor(42).unwrap().is_empty());
    }

    #[test]
    fn test_standard_employee_types() {
        let api = InMemoryApi::new().with_standard_employee_types();
        let ids: Vec<i64> = api.list_employee_types().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, crate::model::EMPLOYEE_TYPE_CODES.to_vec());
    }
}
