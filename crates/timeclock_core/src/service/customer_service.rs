//! Customer use-case service.

use crate::model::customer::{Customer, CustomerId};
use crate::repo::crud_repo::RepoResult;
use crate::repo::customer_repo::{CustomerRepository, SqliteCustomerRepository};
use crate::service::crud_service::CrudService;

/// Transactional customer service over the SQLite repository.
pub type CustomerService<'s> = CrudService<Customer, SqliteCustomerRepository<'s>>;

impl<R: CustomerRepository> CrudService<Customer, R> {
    pub fn get_by_customer_id(&self, customer_id: CustomerId) -> RepoResult<Customer> {
        self.transactional("get_by_customer_id", |repo| {
            repo.get_by_customer_id(customer_id)
        })
    }

    pub fn get_by_customer_name(&self, name: &str) -> RepoResult<Customer> {
        self.transactional("get_by_customer_name", |repo| {
            repo.get_by_customer_name(name)
        })
    }

    /// Read, rebuild and update run in one transaction.
    pub fn update_contact_by_customer_id(
        &self,
        customer_id: CustomerId,
        contact: &str,
    ) -> RepoResult<Customer> {
        self.transactional("update_contact_by_customer_id", |repo| {
            repo.update_contact_by_customer_id(customer_id, contact)
        })
    }

    pub fn remove_by_customer_id(&self, customer_id: CustomerId) -> RepoResult<()> {
        self.transactional("remove_by_customer_id", |repo| {
            repo.remove_by_customer_id(customer_id)
        })
    }

    pub fn is_exist_with_customer_id(&self, customer_id: CustomerId) -> RepoResult<bool> {
        self.transactional("is_exist_with_customer_id", |repo| {
            repo.is_exist_with_customer_id(customer_id)
        })
    }
}
