//! Job use-case service.

use crate::model::job::{Job, JobId};
use crate::repo::crud_repo::RepoResult;
use crate::repo::job_repo::{JobRepository, SqliteJobRepository};
use crate::service::crud_service::CrudService;

/// Transactional job service over the SQLite repository.
pub type JobService<'s> = CrudService<Job, SqliteJobRepository<'s>>;

impl<R: JobRepository> CrudService<Job, R> {
    pub fn get_by_order_number(&self, order_number: i32) -> RepoResult<Job> {
        self.transactional("get_by_order_number", |repo| {
            repo.get_by_order_number(order_number)
        })
    }

    pub fn list_by_developer_id(&self, developer_id: i32) -> RepoResult<Vec<Job>> {
        self.transactional("list_by_developer_id", |repo| {
            repo.list_by_developer_id(developer_id)
        })
    }

    pub fn list_by_status(&self, status: &str) -> RepoResult<Vec<Job>> {
        self.transactional("list_by_status", |repo| repo.list_by_status(status))
    }

    pub fn update_status_by_job_id(&self, job_id: JobId, status: &str) -> RepoResult<Job> {
        self.transactional("update_status_by_job_id", |repo| {
            repo.update_status_by_job_id(job_id, status)
        })
    }
}
