mod embedded;

use embedded::migrations;

use rusqlite::{Connection, OptionalExtension, Row, params};

use std::{fs, path::Path};

use crate::models::Note;

const NOTE_COLUMNS: &str = "id, img, title, content, created_time, updated_time";

pub struct Repository {
    conn: Connection,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open database: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Repository {
    pub fn open(database_path: &Path) -> Result<Self, OpenError> {
        if let Some(parent) = database_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(database_path)?;
        tracing::info!("Opened database at {}", database_path.display());

        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn migrate(&mut self) -> Result<(), refinery::Error> {
        let migrations_report = migrations::runner().run(&mut self.conn)?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }

    /// Inserts the note and returns the id assigned by the store. `note.id` is ignored.
    pub fn create_note(&self, note: &Note) -> Result<i64, rusqlite::Error> {
        self.conn.execute(
            "INSERT INTO notes (img, title, content, created_time, updated_time) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                note.img,
                note.title,
                note.content,
                note.created_time,
                note.updated_time
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Overwrites title, content, img and `updated_time`. Returns `false` if no row has `note.id`.
    pub fn update_note(&self, note: &Note) -> Result<bool, rusqlite::Error> {
        let rows = self.conn.execute(
            "UPDATE notes SET img = ?1, title = ?2, content = ?3, updated_time = ?4 WHERE id = ?5",
            params![note.img, note.title, note.content, note.updated_time, note.id],
        )?;

        Ok(rows == 1)
    }

    pub fn delete_note(&self, id: i64) -> Result<bool, rusqlite::Error> {
        let rows = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;

        Ok(rows == 1)
    }

    pub fn get_one_note(&self, id: i64) -> Result<Option<Note>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                params![id],
                note_from_row,
            )
            .optional()
    }

    pub fn get_all_notes(&self) -> Result<Vec<Note>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {NOTE_COLUMNS} FROM notes"))?;

        let mut vec: Vec<Note> = Vec::new();

        for note in stmt.query_map([], note_from_row)? {
            vec.push(note?);
        }

        Ok(vec)
    }
}

fn note_from_row(row: &Row<'_>) -> Result<Note, rusqlite::Error> {
    // title and img are nullable in the schema, an absent value reads as empty
    Ok(Note {
        id: row.get("id")?,
        img: row.get::<_, Option<String>>("img")?.unwrap_or_default(),
        title: row.get::<_, Option<String>>("title")?.unwrap_or_default(),
        content: row.get("content")?,
        created_time: row.get("created_time")?,
        updated_time: row.get("updated_time")?,
    })
}
