//! Generic transactional CRUD service.
//!
//! # Responsibility
//! - Delegate every operation to a `CrudRepository`.
//! - Apply each call atomically: committed on success, rolled back on error.
//!
//! # Invariants
//! - Service APIs add no behaviour beyond the transaction boundary.
//! - Repository errors are returned unchanged.

use crate::repo::crud_repo::{CrudRepository, RepoResult};
use crate::repo::entity::Entity;
use log::debug;
use std::marker::PhantomData;

/// Transactional facade over one repository.
pub struct CrudService<E: Entity, R: CrudRepository<E>> {
    repo: R,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity, R: CrudRepository<E>> CrudService<E, R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            _entity: PhantomData,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Runs `work` against the repository inside one transaction.
    pub(crate) fn transactional<T>(
        &self,
        operation: &'static str,
        work: impl FnOnce(&R) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let result = self.repo.session().in_transaction(|| work(&self.repo));
        match &result {
            Ok(_) => debug!(
                "event=service_call module=service status=ok entity={} op={operation}",
                E::NAME
            ),
            Err(err) => debug!(
                "event=service_call module=service status=error entity={} op={operation} error_kind={:?}",
                E::NAME,
                err.kind()
            ),
        }
        result
    }

    pub fn save(&self, entity: &mut E) -> RepoResult<()> {
        self.transactional("save", |repo| repo.save(entity))
    }

    pub fn get(&self, key: E::Key) -> RepoResult<Option<E>> {
        self.transactional("get", |repo| repo.get(key))
    }

    pub fn get_all(&self) -> RepoResult<Vec<E>> {
        self.transactional("get_all", |repo| repo.get_all())
    }

    pub fn update(&self, entity: &E) -> RepoResult<E> {
        self.transactional("update", |repo| repo.update(entity))
    }

    pub fn remove(&self, entity: &E) -> RepoResult<()> {
        self.transactional("remove", |repo| repo.remove(entity))
    }

    /// Removes every entity; either all rows go or none do.
    pub fn remove_all(&self) -> RepoResult<usize> {
        self.transactional("remove_all", |repo| repo.remove_all())
    }

    pub fn is_exist(&self, key: E::Key) -> RepoResult<bool> {
        self.transactional("is_exist", |repo| repo.is_exist(key))
    }

    pub fn is_exist_entity(&self, entity: &E) -> RepoResult<bool> {
        self.transactional("is_exist_entity", |repo| repo.is_exist_entity(entity))
    }

    pub fn clear(&self) {
        self.repo.clear();
    }

    pub fn close(&self) -> RepoResult<()> {
        self.repo.close()
    }
}
