//! SurrealDB implementation of [`RoomRepository`].
//!
//! `(conference_id, title)` is a unique index, so two concurrent
//! creations of the same title yield one room and one `Conflict`.

use chrono::{DateTime, Utc};
use huddle_core::error::HuddleResult;
use huddle_core::models::room::{CreateRoom, Room};
use huddle_core::repository::RoomRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{acl_from_value, acl_to_value, parse_uuid, parse_uuids, uuid_strings};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoomRowWithId {
    record_id: String,
    conference_id: String,
    title: String,
    call_id: Option<String>,
    persistence: String,
    visibility: String,
    mode: String,
    capacity: Option<u32>,
    members: Vec<String>,
    acl: serde_json::Value,
    last_observed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoomRowWithId {
    fn try_into_room(self) -> Result<Room, DbError> {
        Ok(Room {
            id: parse_uuid("room", &self.record_id)?,
            tenant_id: parse_uuid("room", &self.conference_id)?,
            title: self.title,
            call_id: self.call_id,
            persistence: self
                .persistence
                .parse()
                .map_err(|e| DbError::decode("room", e))?,
            visibility: self
                .visibility
                .parse()
                .map_err(|e| DbError::decode("room", e))?,
            mode: self.mode.parse().map_err(|e| DbError::decode("room", e))?,
            capacity: self.capacity,
            members: parse_uuids("room", &self.members)?,
            acl: acl_from_value(self.acl)?,
            last_observed_at: self.last_observed_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn into_rooms(rows: Vec<RoomRowWithId>) -> Result<Vec<Room>, DbError> {
    rows.into_iter().map(|r| r.try_into_room()).collect()
}

/// SurrealDB implementation of the Room repository.
#[derive(Clone)]
pub struct SurrealRoomRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoomRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoomRepository for SurrealRoomRepository<C> {
    async fn create(&self, input: CreateRoom) -> HuddleResult<Room> {
        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('room', $id) SET \
                 conference_id = $conference_id, title = $title, \
                 call_id = $call_id, persistence = $persistence, \
                 visibility = $visibility, mode = $mode, \
                 capacity = $capacity, members = [], acl = $acl, \
                 last_observed_at = NONE; \
                 SELECT meta::id(id) AS record_id, * FROM \
                 type::record('room', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("conference_id", input.tenant_id.to_string()))
            .bind(("title", input.title))
            .bind(("call_id", input.call_id))
            .bind(("persistence", input.persistence.as_str().to_string()))
            .bind(("visibility", input.visibility.as_str().to_string()))
            .bind(("mode", input.mode.as_str().to_string()))
            .bind(("capacity", input.capacity))
            .bind(("acl", acl_to_value(&input.acl)?))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("room", e))?;

        let rows: Vec<RoomRowWithId> = result.take(1).map_err(DbError::from)?;
        Ok(into_rooms(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("room", id))?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> HuddleResult<Room> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM type::record('room', $id) \
                 WHERE conference_id = $conference_id",
            )
            .bind(("id", id.to_string()))
            .bind(("conference_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoomRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(into_rooms(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("room", id))?)
    }

    async fn find_by_call_id(&self, tenant_id: Uuid, call_id: &str) -> HuddleResult<Option<Room>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM room \
                 WHERE conference_id = $conference_id AND call_id = $call_id \
                 LIMIT 1",
            )
            .bind(("conference_id", tenant_id.to_string()))
            .bind(("call_id", call_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoomRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(into_rooms(rows)?.into_iter().next())
    }

    async fn find_by_title(&self, tenant_id: Uuid, title: &str) -> HuddleResult<Option<Room>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM room \
                 WHERE conference_id = $conference_id AND title = $title \
                 LIMIT 1",
            )
            .bind(("conference_id", tenant_id.to_string()))
            .bind(("title", title.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoomRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(into_rooms(rows)?.into_iter().next())
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> HuddleResult<Vec<Room>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM room \
                 WHERE conference_id = $conference_id \
                 ORDER BY created_at ASC",
            )
            .bind(("conference_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoomRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(into_rooms(rows)?)
    }

    async fn save(&self, room: &Room) -> HuddleResult<Room> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('room', $id) SET \
                 call_id = $call_id, persistence = $persistence, \
                 visibility = $visibility, mode = $mode, \
                 capacity = $capacity, members = $members, acl = $acl, \
                 last_observed_at = $last_observed_at, \
                 updated_at = time::now() \
                 WHERE conference_id = $conference_id; \
                 SELECT meta::id(id) AS record_id, * FROM \
                 type::record('room', $id);",
            )
            .bind(("id", room.id.to_string()))
            .bind(("conference_id", room.tenant_id.to_string()))
            .bind(("call_id", room.call_id.clone()))
            .bind(("persistence", room.persistence.as_str().to_string()))
            .bind(("visibility", room.visibility.as_str().to_string()))
            .bind(("mode", room.mode.as_str().to_string()))
            .bind(("capacity", room.capacity))
            .bind(("members", uuid_strings(&room.members)))
            .bind(("acl", acl_to_value(&room.acl)?))
            .bind(("last_observed_at", room.last_observed_at))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("room", e))?;

        let rows: Vec<RoomRowWithId> = result.take(1).map_err(DbError::from)?;
        Ok(into_rooms(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("room", room.id))?)
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> HuddleResult<()> {
        self.db
            .query(
                "DELETE type::record('room', $id) \
                 WHERE conference_id = $conference_id",
            )
            .bind(("id", id.to_string()))
            .bind(("conference_id", tenant_id.to_string()))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("room", e))?;

        Ok(())
    }
}
