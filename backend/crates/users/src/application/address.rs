//! Address Use Cases
//!
//! Every operation on a single address checks that it belongs to the
//! caller. At most one active address per user is the default.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{AddressId, UserId};

use crate::application::config::UsersConfig;
use crate::domain::change_set::ChangeSet;
use crate::domain::entity::{Address, AddressDraft};
use crate::domain::repository::UsersStore;
use crate::error::{UsersError, UsersResult};

/// Create or update input
#[derive(Debug, Clone, Default)]
pub struct AddressInput {
    pub draft: AddressDraft,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Ask for this address to become the default
    pub is_default: bool,
}

/// Address use cases
pub struct AddressUseCase<R>
where
    R: UsersStore,
{
    repo: Arc<R>,
    config: Arc<UsersConfig>,
}

impl<R> AddressUseCase<R>
where
    R: UsersStore,
{
    pub fn new(repo: Arc<R>, config: Arc<UsersConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn list(&self, user_id: UserId) -> UsersResult<Vec<Address>> {
        self.repo.list_addresses(user_id).await
    }

    pub async fn get(&self, user_id: UserId, address_id: AddressId) -> UsersResult<Address> {
        self.owned(user_id, address_id).await
    }

    /// The first address always becomes the default
    pub async fn create(&self, user_id: UserId, input: AddressInput) -> UsersResult<Address> {
        let now = Utc::now();
        let existing = self.repo.list_addresses(user_id).await?;
        if existing.len() >= self.config.max_addresses {
            return Err(UsersError::AddressLimitReached(self.config.max_addresses));
        }

        let make_default = existing.is_empty() || input.is_default;
        let mut address = Address::create(user_id, &input.draft, make_default, now)?;
        if let (Some(lat), Some(lon)) = (input.latitude, input.longitude) {
            address.set_coordinates(lat, lon)?;
        }

        let mut changes = ChangeSet::new(now);
        if make_default {
            for mut other in existing.into_iter().filter(|a| a.is_default) {
                other.remove_default();
                changes.update(other);
            }
        }
        let mut created = address.clone();
        created.events.clear();
        changes.insert(address);
        self.repo.commit(changes).await?;

        tracing::info!(user_id = %user_id, address_id = %created.id, is_default = created.is_default, "Address created");
        Ok(created)
    }

    pub async fn update(
        &self,
        user_id: UserId,
        address_id: AddressId,
        input: AddressInput,
    ) -> UsersResult<Address> {
        let now = Utc::now();
        let mut address = self.owned(user_id, address_id).await?;
        address.update(&input.draft)?;
        if let (Some(lat), Some(lon)) = (input.latitude, input.longitude) {
            address.set_coordinates(lat, lon)?;
        }

        let mut changes = ChangeSet::new(now);
        if input.is_default && !address.is_default {
            self.clear_default(user_id, address_id, &mut changes).await?;
            address.set_as_default();
        }
        let updated = snapshot(&address, now);
        changes.update(address);
        self.repo.commit(changes).await?;

        tracing::info!(user_id = %user_id, address_id = %address_id, "Address updated");
        Ok(updated)
    }

    /// The default address can only go once it is the last one
    pub async fn delete(&self, user_id: UserId, address_id: AddressId) -> UsersResult<()> {
        let now = Utc::now();
        let address = self.owned(user_id, address_id).await?;
        if address.is_default && self.repo.count_active_addresses(user_id).await? > 1 {
            return Err(UsersError::CannotDeleteDefaultAddress);
        }

        let mut changes = ChangeSet::new(now);
        changes.delete(address);
        self.repo.commit(changes).await?;

        tracing::info!(user_id = %user_id, address_id = %address_id, "Address deleted");
        Ok(())
    }

    pub async fn set_default(&self, user_id: UserId, address_id: AddressId) -> UsersResult<Address> {
        let now = Utc::now();
        let mut address = self.owned(user_id, address_id).await?;
        if address.is_default {
            return Ok(address);
        }

        let mut changes = ChangeSet::new(now);
        self.clear_default(user_id, address_id, &mut changes).await?;
        address.set_as_default();
        let updated = snapshot(&address, now);
        changes.update(address);
        self.repo.commit(changes).await?;

        tracing::info!(user_id = %user_id, address_id = %address_id, "Default address changed");
        Ok(updated)
    }

    pub async fn set_billing(
        &self,
        user_id: UserId,
        address_id: AddressId,
        is_billing: bool,
    ) -> UsersResult<Address> {
        let now = Utc::now();
        let mut address = self.owned(user_id, address_id).await?;
        address.set_as_billing(is_billing);
        let updated = snapshot(&address, now);

        let mut changes = ChangeSet::new(now);
        changes.update(address);
        self.repo.commit(changes).await?;
        Ok(updated)
    }

    async fn owned(&self, user_id: UserId, address_id: AddressId) -> UsersResult<Address> {
        let address = self
            .repo
            .find_address(address_id)
            .await?
            .ok_or(UsersError::AddressNotFound)?;
        if !address.belongs_to(user_id) {
            tracing::warn!(user_id = %user_id, address_id = %address_id, "Address ownership check failed");
            return Err(UsersError::Forbidden);
        }
        Ok(address)
    }

    async fn clear_default(
        &self,
        user_id: UserId,
        keep: AddressId,
        changes: &mut ChangeSet,
    ) -> UsersResult<()> {
        for mut other in self.repo.list_addresses(user_id).await? {
            if other.id != keep && other.is_default {
                other.remove_default();
                changes.update(other);
            }
        }
        Ok(())
    }
}

fn snapshot(address: &Address, now: chrono::DateTime<Utc>) -> Address {
    let mut copy = address.clone();
    copy.updated_at = now;
    copy.events.clear();
    copy
}
