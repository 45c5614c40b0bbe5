//! [`Store`] bundle over a single SurrealDB connection.

use huddle_core::repository::Store;
use surrealdb::{Connection, Surreal};

use crate::repository::{
    SurrealAccountRepository, SurrealActivityRepository, SurrealConfigRepository,
    SurrealPrivilegeRepository, SurrealProfileRepository, SurrealRoleRepository,
    SurrealRoomRepository, SurrealSessionRepository, SurrealTenantRepository,
};

/// Every repository, sharing one client.
#[derive(Clone)]
pub struct SurrealStore<C: Connection> {
    tenants: SurrealTenantRepository<C>,
    config: SurrealConfigRepository<C>,
    accounts: SurrealAccountRepository<C>,
    profiles: SurrealProfileRepository<C>,
    roles: SurrealRoleRepository<C>,
    privileges: SurrealPrivilegeRepository<C>,
    rooms: SurrealRoomRepository<C>,
    sessions: SurrealSessionRepository<C>,
    activity: SurrealActivityRepository<C>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            tenants: SurrealTenantRepository::new(db.clone()),
            config: SurrealConfigRepository::new(db.clone()),
            accounts: SurrealAccountRepository::new(db.clone()),
            profiles: SurrealProfileRepository::new(db.clone()),
            roles: SurrealRoleRepository::new(db.clone()),
            privileges: SurrealPrivilegeRepository::new(db.clone()),
            rooms: SurrealRoomRepository::new(db.clone()),
            sessions: SurrealSessionRepository::new(db.clone()),
            activity: SurrealActivityRepository::new(db),
        }
    }
}

impl<C: Connection> Store for SurrealStore<C> {
    type Tenants = SurrealTenantRepository<C>;
    type Config = SurrealConfigRepository<C>;
    type Accounts = SurrealAccountRepository<C>;
    type Profiles = SurrealProfileRepository<C>;
    type Roles = SurrealRoleRepository<C>;
    type Privileges = SurrealPrivilegeRepository<C>;
    type Rooms = SurrealRoomRepository<C>;
    type Sessions = SurrealSessionRepository<C>;
    type Activity = SurrealActivityRepository<C>;

    fn tenants(&self) -> &Self::Tenants {
        &self.tenants
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn accounts(&self) -> &Self::Accounts {
        &self.accounts
    }

    fn profiles(&self) -> &Self::Profiles {
        &self.profiles
    }

    fn roles(&self) -> &Self::Roles {
        &self.roles
    }

    fn privileges(&self) -> &Self::Privileges {
        &self.privileges
    }

    fn rooms(&self) -> &Self::Rooms {
        &self.rooms
    }

    fn sessions(&self) -> &Self::Sessions {
        &self.sessions
    }

    fn activity(&self) -> &Self::Activity {
        &self.activity
    }
}
