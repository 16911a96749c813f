//! Payroll provider API contract
//!
//! The ingestion pipeline only sees the provider through [`NmbrsApi`].
//! Every call is synchronous and may fail with an [`ApiError`]; the pipeline
//! never catches these, they abort the debtor being processed.

pub mod memory;

use crate::model::{Company, Debtor, Employee, EmployeeType, Tag};

pub use memory::InMemoryApi;

/// Result type alias for provider calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures reported by a provider client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Read-only view of the payroll provider.
///
/// Implementations are shared by every ingestion worker, hence `Send + Sync`.
pub trait NmbrsApi: Send + Sync {
    /// All debtors visible to the credentials
    fn list_debtors(&self) -> ApiResult<Vec<Debtor>>;

    /// Companies owned by one debtor
    fn list_companies_by_debtor(&self, debtor_id: i64) -> ApiResult<Vec<Company>>;

    /// The fixed employee type enumeration
    fn list_employee_types(&self) -> ApiResult<Vec<EmployeeType>>;

    /// Employees of one company with the given type code
    fn list_employees_by_company_and_type(
        &self,
        company_id: i64,
        type_id: i64,
    ) -> ApiResult<Vec<Employee>>;

    /// Tags attached to one debtor
    fn list_tags_by_debtor(&self, debtor_id: i64) -> ApiResult<Vec<Tag>>;
}

impl<T: NmbrsApi + ?Sized> NmbrsApi for &T {
    fn list_debtors(&self) -> ApiResult<Vec<Debtor>> {
        (**self).list_debtors()
    }

    fn list_companies_by_debtor(&self, debtor_id: i64) -> ApiResult<Vec<Company>> {
        (**self).list_companies_by_debtor(debtor_id)
    }

    fn list_employee_types(&self) -> ApiResult<Vec<EmployeeType>> {
        (**self).list_employee_types()
    }

    fn list_employees_by_company_and_type(
        &self,
        company_id: i64,
        type_id: i64,
    ) -> ApiResult<Vec<Employee>> {
        (**self).list_employees_by_company_and_type(company_id, type_id)
    }

    fn list_tags_by_debtor(&self, debtor_id: i64) -> ApiResult<Vec<Tag>> {
        (**self).list_tags_by_debtor(debtor_id)
    }
}
