//! Customer persistence descriptor and business-key lookups.
//!
//! # Responsibility
//! - Map `Customer` to the `customers` table.
//! - Provide named lookups by id and by name, contact updates and removal by
//!   id on top of the generic repository.
//!
//! # Invariants
//! - Customer names are not unique; `get_by_customer_name` surfaces duplicates
//!   as `NonUnique` instead of picking one.
//! - `update_contact_by_customer_id` is read-then-write; only the version check
//!   inside `update` catches a concurrent modification in between.

use crate::model::audit::Audit;
use crate::model::customer::{Customer, CustomerBuilder, CustomerId};
use crate::model::validation::ModelValidationError;
use crate::repo::crud_repo::{CrudRepository, NamedQuery, RepoResult, SqliteCrudRepository};
use crate::repo::entity::{read_audit, AuditColumns, Entity, AUDIT_COLUMNS};
use rusqlite::{params, Connection, Row};

const CUSTOMER_SELECT_SQL: &str = "SELECT
    customer_id,
    name,
    contact,
    created_at,
    created_by,
    modified_at,
    modified_by,
    version
FROM customers";

const GET_BY_CUSTOMER_ID: NamedQuery = NamedQuery {
    name: "getByCustomerId",
    filter: "customer_id = ?1",
};

const GET_BY_CUSTOMER_NAME: NamedQuery = NamedQuery {
    name: "getByCustomerName",
    filter: "name = ?1",
};

/// SQLite repository for customers.
pub type SqliteCustomerRepository<'s> = SqliteCrudRepository<'s, Customer>;

/// Customer lookups beyond primary-key access.
pub trait CustomerRepository: CrudRepository<Customer> {
    /// # Errors
    /// - `NotFound` when no customer has this id.
    fn get_by_customer_id(&self, customer_id: CustomerId) -> RepoResult<Customer>;
    /// # Errors
    /// - `NotFound` on zero matches, `NonUnique` on more than one.
    fn get_by_customer_name(&self, name: &str) -> RepoResult<Customer>;
    /// Replaces the contact person and returns the stored customer.
    fn update_contact_by_customer_id(
        &self,
        customer_id: CustomerId,
        contact: &str,
    ) -> RepoResult<Customer>;
    fn remove_by_customer_id(&self, customer_id: CustomerId) -> RepoResult<()>;
    /// Scans every customer for a matching id.
    fn is_exist_with_customer_id(&self, customer_id: CustomerId) -> RepoResult<bool>;
}

impl CustomerRepository for SqliteCustomerRepository<'_> {
    fn get_by_customer_id(&self, customer_id: CustomerId) -> RepoResult<Customer> {
        self.single_result(GET_BY_CUSTOMER_ID, [customer_id], customer_id)
    }

    fn get_by_customer_name(&self, name: &str) -> RepoResult<Customer> {
        self.single_result(GET_BY_CUSTOMER_NAME, [name], name)
    }

    fn update_contact_by_customer_id(
        &self,
        customer_id: CustomerId,
        contact: &str,
    ) -> RepoResult<Customer> {
        let current = self.get_by_customer_id(customer_id)?;
        let changed = CustomerBuilder::from(current).contact(contact).build()?;
        self.update(&changed)
    }

    fn remove_by_customer_id(&self, customer_id: CustomerId) -> RepoResult<()> {
        let current = self.get_by_customer_id(customer_id)?;
        self.remove(&current)
    }

    fn is_exist_with_customer_id(&self, customer_id: CustomerId) -> RepoResult<bool> {
        Ok(self
            .get_all()?
            .iter()
            .any(|customer| customer.customer_id == Some(customer_id)))
    }
}

/// Column names of a customer inside one result set.
pub(crate) struct CustomerColumns {
    pub customer_id: &'static str,
    pub name: &'static str,
    pub contact: &'static str,
    pub audit: AuditColumns,
    pub version: &'static str,
}

const CUSTOMER_COLUMNS: CustomerColumns = CustomerColumns {
    customer_id: "customer_id",
    name: "name",
    contact: "contact",
    audit: AUDIT_COLUMNS,
    version: "version",
};

pub(crate) fn read_customer(row: &Row<'_>, columns: &CustomerColumns) -> RepoResult<Customer> {
    Ok(Customer {
        customer_id: Some(row.get(columns.customer_id)?),
        name: row.get(columns.name)?,
        contact: row.get(columns.contact)?,
        audit: read_audit(row, &columns.audit)?,
        version: row.get(columns.version)?,
    })
}

impl Entity for Customer {
    type Key = CustomerId;

    const NAME: &'static str = "customer";
    const TABLE: &'static str = "customers";
    const KEY_COLUMN: &'static str = "customer_id";
    const SELECT_SQL: &'static str = CUSTOMER_SELECT_SQL;
    const KEY_FILTER: &'static str = "customer_id";

    fn key(&self) -> Option<CustomerId> {
        self.customer_id
    }

    fn set_key(&mut self, key: CustomerId) {
        self.customer_id = Some(key);
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
        Customer::validate(self)
    }

    fn from_row(row: &Row<'_>) -> RepoResult<Self> {
        read_customer(row, &CUSTOMER_COLUMNS)
    }

    fn insert_row(&self, conn: &Connection) -> RepoResult<CustomerId> {
        let key = conn.query_row(
            "INSERT INTO customers (
                name,
                contact,
                created_at,
                created_by,
                modified_at,
                modified_by,
                version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING customer_id;",
            params![
                self.name.as_str(),
                self.contact.as_deref(),
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

    fn update_row(&self, conn: &Connection, key: CustomerId) -> RepoResult<usize> {
        let changed = conn.execute(
            "UPDATE customers
             SET
                name = ?1,
                contact = ?2,
                modified_at = ?3,
                modified_by = ?4,
                version = version + 1
             WHERE customer_id = ?5
               AND version = ?6;",
            params![
                self.name.as_str(),
                self.contact.as_deref(),
                self.audit.modified_at,
                self.audit.modified_by.as_deref(),
                key,
                self.version,
            ],
        )?;
        Ok(changed)
    }
}
