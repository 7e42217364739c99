//! Job persistence descriptor and job lookups.
//!
//! # Responsibility
//! - Map `Job` with its eagerly loaded customer and pay to the `jobs` table.
//! - Cascade inserts to transient customer/pay associations.
//! - Provide lookups by order number, developer and status.
//!
//! # Invariants
//! - Inserts cascade; updates and removals never touch associated rows.
//! - Updating a job whose association was never saved fails with
//!   `TransientAssociation`.

use crate::model::audit::Audit;
use crate::model::job::{Job, JobBuilder, JobId};
use crate::model::validation::ModelValidationError;
use crate::repo::crud_repo::{
    CrudRepository, NamedQuery, RepoError, RepoResult, SqliteCrudRepository,
};
use crate::repo::customer_repo::{read_customer, CustomerColumns};
use crate::repo::entity::{
    association_key, read_audit, AuditColumns, Cascade, Entity, AUDIT_COLUMNS,
};
use crate::repo::pay_repo::{read_pay, PayColumns};
use rusqlite::{params, Connection, Row};

const JOB_SELECT_SQL: &str = "SELECT
    j.job_id,
    j.developer_id,
    j.order_number,
    j.project,
    j.branch,
    j.package,
    j.class_name,
    j.status,
    j.comment,
    j.created_at,
    j.created_by,
    j.modified_at,
    j.modified_by,
    j.version,
    c.customer_id AS c_customer_id,
    c.name AS c_name,
    c.contact AS c_contact,
    c.created_at AS c_created_at,
    c.created_by AS c_created_by,
    c.modified_at AS c_modified_at,
    c.modified_by AS c_modified_by,
    c.version AS c_version,
    p.pay_id AS p_pay_id,
    p.hourly_rate AS p_hourly_rate,
    p.currency AS p_currency,
    p.worked_minutes AS p_worked_minutes,
    p.paid AS p_paid,
    p.created_at AS p_created_at,
    p.created_by AS p_created_by,
    p.modified_at AS p_modified_at,
    p.modified_by AS p_modified_by,
    p.version AS p_version
FROM jobs j
LEFT JOIN customers c ON c.customer_id = j.customer_id
LEFT JOIN pays p ON p.pay_id = j.pay_id";

const JOINED_CUSTOMER_COLUMNS: CustomerColumns = CustomerColumns {
    customer_id: "c_customer_id",
    name: "c_name",
    contact: "c_contact",
    audit: AuditColumns {
        created_at: "c_created_at",
        created_by: "c_created_by",
        modified_at: "c_modified_at",
        modified_by: "c_modified_by",
    },
    version: "c_version",
};

const JOINED_PAY_COLUMNS: PayColumns = PayColumns {
    pay_id: "p_pay_id",
    hourly_rate: "p_hourly_rate",
    currency: "p_currency",
    worked_minutes: "p_worked_minutes",
    paid: "p_paid",
    audit: AuditColumns {
        created_at: "p_created_at",
        created_by: "p_created_by",
        modified_at: "p_modified_at",
        modified_by: "p_modified_by",
    },
    version: "p_version",
};

const GET_BY_ORDER_NUMBER: NamedQuery = NamedQuery {
    name: "getByOrderNumber",
    filter: "j.order_number = ?1",
};

const LIST_BY_DEVELOPER_ID: NamedQuery = NamedQuery {
    name: "listByDeveloperId",
    filter: "j.developer_id = ?1",
};

const LIST_BY_STATUS: NamedQuery = NamedQuery {
    name: "listByStatus",
    filter: "j.status = ?1",
};

/// SQLite repository for jobs.
pub type SqliteJobRepository<'s> = SqliteCrudRepository<'s, Job>;

/// Job lookups beyond primary-key access.
pub trait JobRepository: CrudRepository<Job> {
    /// # Errors
    /// - `NotFound` on zero matches, `NonUnique` on more than one.
    fn get_by_order_number(&self, order_number: i32) -> RepoResult<Job>;
    fn list_by_developer_id(&self, developer_id: i32) -> RepoResult<Vec<Job>>;
    fn list_by_status(&self, status: &str) -> RepoResult<Vec<Job>>;
    /// Replaces the job status and returns the stored job.
    ///
    /// # Errors
    /// - `NotFound` when no job has this id.
    fn update_status_by_job_id(&self, job_id: JobId, status: &str) -> RepoResult<Job>;
}

impl JobRepository for SqliteJobRepository<'_> {
    fn get_by_order_number(&self, order_number: i32) -> RepoResult<Job> {
        self.single_result(GET_BY_ORDER_NUMBER, [order_number], order_number)
    }

    fn list_by_developer_id(&self, developer_id: i32) -> RepoResult<Vec<Job>> {
        self.result_list(LIST_BY_DEVELOPER_ID, [developer_id])
    }

    fn list_by_status(&self, status: &str) -> RepoResult<Vec<Job>> {
        self.result_list(LIST_BY_STATUS, [status])
    }

    fn update_status_by_job_id(&self, job_id: JobId, status: &str) -> RepoResult<Job> {
        let current = self.get(job_id)?.ok_or_else(|| RepoError::NotFound {
            entity: Job::NAME,
            key: job_id.to_string(),
        })?;
        let changed = JobBuilder::from(current).status(status).build()?;
        self.update(&changed)
    }
}

impl Entity for Job {
    type Key = JobId;

    const NAME: &'static str = "job";
    const TABLE: &'static str = "jobs";
    const KEY_COLUMN: &'static str = "job_id";
    const SELECT_SQL: &'static str = JOB_SELECT_SQL;
    const KEY_FILTER: &'static str = "j.job_id";

    fn key(&self) -> Option<JobId> {
        self.job_id
    }

    fn set_key(&mut self, key: JobId) {
        self.job_id = Some(key);
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn validate(&self) -> Result<(), ModelValidationError> {
        Job::validate(self)
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        let customer = match row.get::<_, Option<i64>>(JOINED_CUSTOMER_COLUMNS.customer_id)? {
            Some(_) => Some(read_customer(row, &JOINED_CUSTOMER_COLUMNS)?),
            None => None,
        };
        let pay = match row.get::<_, Option<i64>>(JOINED_PAY_COLUMNS.pay_id)? {
            Some(_) => Some(read_pay(row, &JOINED_PAY_COLUMNS)?),
            None => None,
        };

        Ok(Job {
            job_id: Some(row.get("job_id")?),
            developer_id: row.get("developer_id")?,
            order_number: row.get("order_number")?,
            project_name: row.get("project")?,
            branch_name: row.get("branch")?,
            package_name: row.get("package")?,
            class_name: row.get("class_name")?,
            status: row.get("status")?,
            comment: row.get("comment")?,
            customer,
            pay,
            audit: read_audit(row, &AUDIT_COLUMNS)?,
            version: row.get("version")?,
        })
    }

    fn insert_row(&self, conn: &Connection) -> RepoResult<JobId> {
        let customer_id = association_key(Self::NAME, self.customer.as_ref())?;
        let pay_id = association_key(Self::NAME, self.pay.as_ref())?;

        let key = conn.query_row(
            "INSERT INTO jobs (
                developer_id,
                order_number,
                project,
                branch,
                package,
                class_name,
                status,
                comment,
                customer_id,
                pay_id,
                created_at,
                created_by,
                modified_at,
                modified_by,
                version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            RETURNING job_id;",
            params![
                self.developer_id,
                self.order_number,
                self.project_name.as_str(),
                self.branch_name.as_deref(),
                self.package_name.as_deref(),
                self.class_name.as_deref(),
                self.status.as_str(),
                self.comment.as_deref(),
                customer_id,
                pay_id,
                self.audit.created_at,
                self.audit.created_by.as_str(),
                self.audit.modified_at,
                self.audit.modified_by.as_deref(),
                self.version,
            ],
            |row| row.get(0),
        )?;
        Ok(key)
    }

    fn update_row(&self, conn: &Connection, key: JobId) -> RepoResult<usize> {
        let customer_id = association_key(Self::NAME, self.customer.as_ref())?;
        let pay_id = association_key(Self::NAME, self.pay.as_ref())?;

        let changed = conn.execute(
            "UPDATE jobs
             SET
                developer_id = ?1,
                order_number = ?2,
                project = ?3,
                branch = ?4,
                package = ?5,
                class_name = ?6,
                status = ?7,
                comment = ?8,
                customer_id = ?9,
                pay_id = ?10,
                modified_at = ?11,
                modified_by = ?12,
                version = version + 1
             WHERE job_id = ?13
               AND version = ?14;",
            params![
                self.developer_id,
                self.order_number,
                self.project_name.as_str(),
                self.branch_name.as_deref(),
                self.package_name.as_deref(),
                self.class_name.as_deref(),
                self.status.as_str(),
                self.comment.as_deref(),
                customer_id,
                pay_id,
                self.audit.modified_at,
                self.audit.modified_by.as_deref(),
                key,
                self.version,
            ],
        )?;
        Ok(changed)
    }

    fn cascade_persist(&mut self, cascade: &Cascade<'_>) -> RepoResult<()> {
        if let Some(customer) = self.customer.as_mut() {
            cascade.persist(customer)?;
        }
        if let Some(pay) = self.pay.as_mut() {
            cascade.persist(pay)?;
        }
        Ok(())
    }
}
