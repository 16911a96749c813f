//! Typed row writes performed through a [`Session`]
//!
//! Every write joins the session's open transaction; callers decide when
//! to commit.

use super::connection::Param;
use super::session::Session;
use crate::model::{Company, Debtor, Employee, EmployeeType, Tag};
use crate::{Error, Result};

const SELECT_TAG: &str = "SELECT id FROM tags WHERE number = ? AND hex_color = ? AND label = ?";

fn tag_params(tag: &Tag) -> [Param<'_>; 3] {
    [
        Param::from(tag.number),
        Param::from(&tag.hex_color),
        Param::from(&tag.label),
    ]
}

impl Session {
    // ========== Reference data ==========

    /// Insert the employee type enumeration
    pub fn insert_employee_types(&mut self, employee_types: &[EmployeeType]) -> Result<usize> {
        let conn = self.writer()?;
        for employee_type in employee_types {
            conn.execute(
                "INSERT INTO employee_types (id, description) VALUES (?, ?)",
                &[Param::from(employee_type.id), Param::from(&employee_type.description)],
            )?;
        }
        Ok(employee_types.len())
    }

    // ========== Debtor subtree ==========

    pub fn insert_debtor(&mut self, debtor: &Debtor) -> Result<()> {
        self.writer()?.execute(
            "INSERT INTO debtors (id, name, number) VALUES (?, ?, ?)",
            &[
                Param::from(debtor.id),
                Param::from(&debtor.name),
                Param::from(&debtor.number),
            ],
        )?;
        Ok(())
    }

    pub fn insert_company(&mut self, debtor_id: i64, company: &Company) -> Result<()> {
        self.writer()?.execute(
            r#"
            INSERT INTO companies (id, debtor_id, number, name, phone_number, fax_number, email, website, filing_period, registration_number)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            &[
                Param::from(company.id),
                Param::from(debtor_id),
                Param::from(company.number),
                Param::from(&company.name),
                Param::from(&company.phone_number),
                Param::from(&company.fax_number),
                Param::from(&company.email),
                Param::from(&company.website),
                Param::from(&company.filing_period),
                Param::from(&company.registration_number),
            ],
        )?;
        Ok(())
    }

    /// Insert one batch of employees sharing a company and type
    pub fn insert_employees(
        &mut self,
        company_id: i64,
        type_id: i64,
        employees: &[Employee],
    ) -> Result<usize> {
        if employees.is_empty() {
            return Ok(0);
        }
        let conn = self.writer()?;
        for employee in employees {
            conn.execute(
                "INSERT INTO employees (id, company_id, type_id, number, name) VALUES (?, ?, ?, ?, ?)",
                &[
                    Param::from(employee.id),
                    Param::from(company_id),
                    Param::from(type_id),
                    Param::from(employee.number),
                    Param::from(&employee.name),
                ],
            )?;
        }
        Ok(employees.len())
    }

    // ========== Tags ==========

    /// Look up a tag by its dedup triple
    pub fn find_tag(&mut self, tag: &Tag) -> Result<Option<i64>> {
        self.connection().query_i64(SELECT_TAG, &tag_params(tag))
    }

    /// Get-or-create a tag, returning the canonical row id.
    ///
    /// The insert is a no-op when the triple already exists, whoever
    /// inserted it; the follow-up lookup then reads the winning row.
    pub fn resolve_tag(&mut self, tag: &Tag) -> Result<i64> {
        if let Some(id) = self.find_tag(tag)? {
            return Ok(id);
        }

        let dialect = self.dialect();
        let insert =
            dialect.insert_ignoring_duplicates("tags", &["number", "hex_color", "label"]);
        let lookup = format!("{}{}", SELECT_TAG, dialect.latest_read());

        let conn = self.writer()?;
        conn.execute(&insert, &tag_params(tag))?;
        conn.query_i64(&lookup, &tag_params(tag))?
            .ok_or_else(|| Error::RowNotFound(format!("tag {:?}", tag.key())))
    }

    /// Attach a tag to a debtor. Returns false when the link already existed.
    pub fn link_tag(&mut self, debtor_id: i64, tag_id: i64) -> Result<bool> {
        let insert = self
            .dialect()
            .insert_ignoring_duplicates("debtors_tags_association", &["debtor_id", "tag_id"]);
        let changed = self
            .writer()?
            .execute(&insert, &[Param::from(debtor_id), Param::from(tag_id)])?;
        Ok(changed > 0)
    }
}
