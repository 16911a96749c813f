//! Facade composing the storage gateway and the ingestion pipeline

use crossbeam::channel::Sender;

use crate::api::NmbrsApi;
use crate::ingest::{IngestEvent, IngestReport, Pipeline, PipelineOptions};
use crate::model::Debtor;
use crate::storage::{ConnectionStatus, Gateway, GatewayOptions, QueryRows};
use crate::{Error, Result};

/// A local mirror of one payroll provider account
pub struct NmbrsDatabase<A: NmbrsApi> {
    api: A,
    db_url: String,
    gateway_options: GatewayOptions,
    pipeline_options: PipelineOptions,
    events: Option<Sender<IngestEvent>>,
    database: Option<Gateway>,
}

impl<A: NmbrsApi> NmbrsDatabase<A> {
    pub fn new(api: A, db_url: impl Into<String>) -> Self {
        Self {
            api,
            db_url: db_url.into(),
            gateway_options: GatewayOptions::default(),
            pipeline_options: PipelineOptions::default(),
            events: None,
            database: None,
        }
    }

    pub fn with_gateway_options(mut self, options: GatewayOptions) -> Self {
        self.gateway_options = options;
        self
    }

    pub fn with_pipeline_options(mut self, options: PipelineOptions) -> Self {
        self.pipeline_options = options;
        self
    }

    /// Forward ingestion progress to `events`
    pub fn with_progress(mut self, events: Sender<IngestEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// The gateway opened by the last initialize/create call
    pub fn database(&self) -> Option<&Gateway> {
        self.database.as_ref()
    }

    /// Attach to an existing store and ping it.
    ///
    /// Nothing is created or dropped. Failures are reported in the returned
    /// status, never as an error.
    pub fn initialize_basic(&mut self) -> ConnectionStatus {
        let gateway = match Gateway::connect_existing(&self.db_url, &self.gateway_options) {
            Ok(gateway) => gateway,
            Err(e) => {
                tracing::warn!("Could not attach to {}: {}", self.db_url, e);
                return ConnectionStatus::Unreachable(e.to_string());
            }
        };

        let status = gateway.initialize();
        self.database = status.is_connected().then_some(gateway);
        status
    }

    /// Build (or extend) the store and mirror `debtors` into it.
    ///
    /// Without an explicit list every debtor the API exposes is mirrored.
    /// `delete` drops all tables before they are recreated.
    pub fn create_basic(&mut self, debtors: Option<Vec<Debtor>>, delete: bool) -> Result<IngestReport> {
        let debtors = match debtors {
            Some(debtors) => debtors,
            None => self.api.list_debtors()?,
        };

        let gateway = Gateway::open(&self.db_url, delete, &self.pool_options())?;
        let database = self.database.insert(gateway);

        let mut pipeline = Pipeline::new(&self.api, database.pool(), self.pipeline_options.clone());
        if let Some(events) = &self.events {
            pipeline = pipeline.with_events(events.clone());
        }
        pipeline.create(&debtors)
    }

    /// Gateway options with room for every worker plus the caller
    fn pool_options(&self) -> GatewayOptions {
        let workers = u32::try_from(self.pipeline_options.workers.get()).unwrap_or(u32::MAX);
        let mut options = self.gateway_options.clone();
        options.pool_size = options.pool_size.max(workers.saturating_add(1));
        options
    }

    /// Raw SQL passthrough to the gateway
    pub fn query(&self, sql: &str) -> Result<QueryRows> {
        self.database.as_ref().ok_or(Error::NotInitialized)?.query(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResult, InMemoryApi};
    use crate::model::{Company, Employee, EmployeeType, Tag};
    use crate::storage::{DatabaseUrl, SqlValue};
    use std::time::Duration;

    /// Answers like the wrapped API, but slowly when listing companies
    struct SlowApi(InMemoryApi, Duration);

    impl NmbrsApi for SlowApi {
        fn list_debtors(&self) -> ApiResult<Vec<Debtor>> {
            self.0.list_debtors()
        }

        fn list_companies_by_debtor(&self, debtor_id: i64) -> ApiResult<Vec<Company>> {
            std::thread::sleep(self.1);
            self.0.list_companies_by_debtor(debtor_id)
        }

        fn list_employee_types(&self) -> ApiResult<Vec<EmployeeType>> {
            self.0.list_employee_types()
        }

        fn list_employees_by_company_and_type(
            &self,
            company_id: i64,
            type_id: i64,
        ) -> ApiResult<Vec<Employee>> {
            self.0.list_employees_by_company_and_type(company_id, type_id)
        }

        fn list_tags_by_debtor(&self, debtor_id: i64) -> ApiResult<Vec<Tag>> {
            self.0.list_tags_by_debtor(debtor_id)
        }
    }

    fn sample_api() -> InMemoryApi {
        InMemoryApi::new()
            .with_standard_employee_types()
            .with_debtor(Debtor::new(1, "Debtor 1"))
            .with_debtor(Debtor::new(2, "Debtor 2"))
            .with_company(1, Company::new(1, "Debtor 1"))
            .with_company(2, Company::new(2, "Debtor 2"))
            .with_employee(1, 1, Employee::new(11, "Jan"))
    }

    fn url_in(dir: &tempfile::TempDir) -> String {
        DatabaseUrl::sqlite(&dir.path().join("nmbrs.db")).as_str().to_string()
    }

    #[test]
    fn test_create_basic_fetches_all_debtors() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = NmbrsDatabase::new(sample_api(), url_in(&dir));

        let report = db.create_basic(None, false).unwrap();
        assert_eq!(report.debtors, 2);
        assert_eq!(report.companies, 2);
        assert_eq!(report.employees, 1);

        let rows = db.query("SELECT name FROM debtors ORDER BY id").unwrap();
        assert_eq!(
            rows.rows,
            vec![
                vec![SqlValue::Text("Debtor 1".into())],
                vec![SqlValue::Text("Debtor 2".into())],
            ]
        );
    }

    #[test]
    fn test_create_basic_with_explicit_subset() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = NmbrsDatabase::new(sample_api(), url_in(&dir))
            .with_pipeline_options(PipelineOptions::with_workers(1));

        db.create_basic(Some(vec![Debtor::new(2, "Debtor 2")]), false)
            .unwrap();
        let stats = db.database().unwrap().stats().unwrap();
        assert_eq!(stats.debtors, 1);
        assert_eq!(stats.companies, 1);
        assert_eq!(stats.employees, 0);
    }

    #[test]
    fn test_create_basic_with_empty_list_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = NmbrsDatabase::new(sample_api(), url_in(&dir));

        let report = db.create_basic(Some(Vec::new()), false).unwrap();
        assert_eq!(report, IngestReport::default());
        let stats = db.database().unwrap().stats().unwrap();
        assert_eq!(stats.debtors, 0);
        assert_eq!(stats.employee_types, 0);
    }

    #[test]
    fn test_delete_allows_a_clean_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = NmbrsDatabase::new(sample_api(), url_in(&dir));

        db.create_basic(None, false).unwrap();
        assert!(db.create_basic(None, false).is_err());

        let report = db.create_basic(None, true).unwrap();
        assert_eq!(report.debtors, 2);
        assert_eq!(db.database().unwrap().stats().unwrap().debtors, 2);
    }

    #[test]
    fn test_initialize_basic_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let url = url_in(&dir);

        let mut fresh = NmbrsDatabase::new(sample_api(), url.clone());
        assert!(!fresh.initialize_basic().is_connected());
        assert!(matches!(fresh.query("SELECT 1"), Err(Error::NotInitialized)));

        NmbrsDatabase::new(sample_api(), url.clone())
            .create_basic(None, false)
            .unwrap();

        let mut existing = NmbrsDatabase::new(sample_api(), url);
        assert_eq!(existing.initialize_basic(), ConnectionStatus::Connected);
        let rows = existing.query("SELECT COUNT(*) FROM companies").unwrap();
        assert_eq!(rows.rows[0][0], SqlValue::Integer(2));
    }

    #[test]
    fn test_initialize_basic_with_malformed_url() {
        let mut db = NmbrsDatabase::new(InMemoryApi::new(), "nowhere");
        assert!(matches!(db.initialize_basic(), ConnectionStatus::Unreachable(_)));
    }

    #[test]
    fn test_progress_events_reach_listener() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = crossbeam::channel::unbounded();
        let mut db = NmbrsDatabase::new(sample_api(), url_in(&dir)).with_progress(tx);

        db.create_basic(None, false).unwrap();
        let finished = rx.try_iter().filter(IngestEvent::is_terminal).count();
        assert_eq!(finished, 2);
    }

    #[test]
    fn test_small_pool_grows_to_fit_workers() {
        let dir = tempfile::tempdir().unwrap();
        let api = SlowApi(sample_api(), Duration::from_millis(400));
        let mut db = NmbrsDatabase::new(api, url_in(&dir))
            .with_gateway_options(GatewayOptions {
                pool_size: 1,
                connection_timeout: Duration::from_millis(200),
                ..GatewayOptions::default()
            })
            .with_pipeline_options(PipelineOptions::with_workers(2));

        let report = db.create_basic(None, false).unwrap();
        assert_eq!(report.debtors, 2);
        assert!(db.database().unwrap().pool().max_size() >= 3);
    }
}
