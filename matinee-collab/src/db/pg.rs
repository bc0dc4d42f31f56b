use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    query, Error as SqlxError, PgPool, Row,
};

use crate::{
    auth::Role, DatabaseError, DatabaseResult, IntoDatabaseError, NewParticipant, ParticipantData,
    Result, RoomData, UpdatedRoom,
};

use super::Database;
use async_trait::async_trait;

/// A postgres database implementation for matinee.
///
/// Queries are bound at runtime so the crate builds without a live database;
/// the schema is created on connect, mirroring the tables described in
/// the SQL setup.
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        let db = Self { pool };
        db.init_schema().await?;

        Ok(db)
    }

    async fn init_schema(&self) -> Result<()> {
        query(
            "CREATE TABLE IF NOT EXISTS rooms (
                id VARCHAR(100) PRIMARY KEY,
                video_id TEXT NOT NULL DEFAULT 'ikmY-nMFDQA',
                position_seconds DOUBLE PRECISION NOT NULL DEFAULT 0,
                is_playing BOOLEAN NOT NULL DEFAULT false,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        query(
            "CREATE TABLE IF NOT EXISTS participants (
                connection_id VARCHAR(100) PRIMARY KEY,
                room_id VARCHAR(100) NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
                username TEXT NOT NULL,
                role VARCHAR(20) NOT NULL,
                joined_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(())
    }

    fn room_from_row(row: &PgRow) -> Result<RoomData> {
        Ok(RoomData {
            id: row.try_get("id").map_err(|e| e.any())?,
            video_id: row.try_get("video_id").map_err(|e| e.any())?,
            position_seconds: row.try_get("position_seconds").map_err(|e| e.any())?,
            is_playing: row.try_get("is_playing").map_err(|e| e.any())?,
            created_at: row.try_get("created_at").map_err(|e| e.any())?,
        })
    }

    fn participant_from_row(row: &PgRow) -> Result<ParticipantData> {
        let role: String = row.try_get("role").map_err(|e| e.any())?;
        let role = Role::parse(&role)
            .ok_or_else(|| DatabaseError::Internal(format!("unknown role: {role}").into()))?;

        Ok(ParticipantData {
            connection_id: row.try_get("connection_id").map_err(|e| e.any())?,
            room_id: row.try_get("room_id").map_err(|e| e.any())?,
            username: row.try_get("username").map_err(|e| e.any())?,
            role,
            joined_at: row.try_get("joined_at").map_err(|e| e.any())?,
        })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn room_by_id(&self, room_id: &str) -> Result<RoomData> {
        let row = query("SELECT * FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("room", "id"))?;

        Self::room_from_row(&row)
    }

    async fn create_room(&self, room_id: &str) -> Result<RoomData> {
        self.room_by_id(room_id)
            .await
            .conflict_or_ok("room", "id", room_id)?;

        let row = query("INSERT INTO rooms (id) VALUES ($1) RETURNING *")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())?;

        Self::room_from_row(&row)
    }

    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<RoomData> {
        let room = self.room_by_id(&updated_room.id).await?;

        query(
            "UPDATE rooms SET
                video_id = $1,
                position_seconds = $2,
                is_playing = $3
            WHERE id = $4",
        )
        .bind(updated_room.video_id.unwrap_or(room.video_id))
        .bind(updated_room.position_seconds.unwrap_or(room.position_seconds))
        .bind(updated_room.is_playing.unwrap_or(room.is_playing))
        .bind(&updated_room.id)
        .execute(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.room_by_id(&updated_room.id).await
    }

    async fn delete_room(&self, room_id: &str) -> Result<()> {
        // Ensure room exists
        let _ = self.room_by_id(room_id).await?;

        query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn participant_by_connection(&self, connection_id: &str) -> Result<ParticipantData> {
        let row = query("SELECT * FROM participants WHERE connection_id = $1")
            .bind(connection_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("participant", "connection_id"))?;

        Self::participant_from_row(&row)
    }

    async fn participants_in_room(&self, room_id: &str) -> Result<Vec<ParticipantData>> {
        let rows = query(
            "SELECT * FROM participants
            WHERE room_id = $1
            ORDER BY joined_at, connection_id",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.iter().map(Self::participant_from_row).collect()
    }

    async fn create_participant(&self, new_participant: NewParticipant) -> Result<ParticipantData> {
        self.participant_by_connection(&new_participant.connection_id)
            .await
            .conflict_or_ok(
                "participant",
                "connection_id",
                &new_participant.connection_id,
            )?;

        let row = query(
            "INSERT INTO participants (connection_id, room_id, username, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *",
        )
        .bind(&new_participant.connection_id)
        .bind(&new_participant.room_id)
        .bind(&new_participant.username)
        .bind(new_participant.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Self::participant_from_row(&row)
    }

    async fn update_participant_role(&self, connection_id: &str, role: Role) -> Result<ParticipantData> {
        // Ensure participant exists
        let _ = self.participant_by_connection(connection_id).await?;

        query("UPDATE participants SET role = $1 WHERE connection_id = $2")
            .bind(role.as_str())
            .bind(connection_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.participant_by_connection(connection_id).await
    }

    async fn delete_participant(&self, connection_id: &str) -> Result<()> {
        // Ensure participant exists
        let _ = self.participant_by_connection(connection_id).await?;

        query("DELETE FROM participants WHERE connection_id = $1")
            .bind(connection_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
