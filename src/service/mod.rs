use chrono::Utc;

use crate::{models::Note, repository::Repository};

use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum NoteServiceError {
    #[error("note {0} not found")]
    NotFound(i64),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Applies the timestamp policy on top of the repository.
///
/// `rusqlite` calls block, so every repository access runs on the blocking
/// thread pool.
#[derive(Clone)]
pub struct NoteService {
    repo: Arc<Mutex<Repository>>,
}

impl NoteService {
    pub const fn new(repo: Arc<Mutex<Repository>>) -> Self {
        Self { repo }
    }

    async fn with_repo<T, F>(&self, f: F) -> Result<T, NoteServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&Repository) -> Result<T, NoteServiceError> + Send + 'static,
    {
        let repo = Arc::clone(&self.repo);
        tokio::task::spawn_blocking(move || {
            let repo = repo.lock().unwrap_or_else(PoisonError::into_inner);
            f(&repo)
        })
        .await?
    }

    pub async fn create_note(
        &self,
        title: String,
        content: String,
        img: String,
    ) -> Result<Note, NoteServiceError> {
        let mut note = Note {
            id: 0,
            title,
            content,
            img,
            created_time: Utc::now(),
            updated_time: None,
        };

        let note = self
            .with_repo(move |repo| {
                note.id = repo.create_note(&note)?;
                Ok(note)
            })
            .await?;

        tracing::info!("Created note {}", note.id);

        Ok(note)
    }

    /// Overwrites the note and returns the row as stored after the update.
    pub async fn update_note(
        &self,
        id: i64,
        title: String,
        content: String,
        img: String,
    ) -> Result<Note, NoteServiceError> {
        let now = Utc::now();
        let note = Note {
            id,
            title,
            content,
            img,
            // not written by the update statement
            created_time: now,
            updated_time: Some(now),
        };

        let stored = self
            .with_repo(move |repo| {
                if !repo.update_note(&note)? {
                    return Err(NoteServiceError::NotFound(id));
                }
                repo.get_one_note(id)?.ok_or(NoteServiceError::NotFound(id))
            })
            .await?;

        tracing::info!("Updated note {id}");

        Ok(stored)
    }

    pub async fn get_note(&self, id: i64) -> Result<Note, NoteServiceError> {
        self.with_repo(move |repo| repo.get_one_note(id)?.ok_or(NoteServiceError::NotFound(id)))
            .await
    }

    pub async fn list_notes(&self) -> Result<Vec<Note>, NoteServiceError> {
        self.with_repo(|repo| Ok(repo.get_all_notes()?)).await
    }

    /// Returns `false` when there was no note with this id.
    pub async fn delete_note(&self, id: i64) -> Result<bool, NoteServiceError> {
        let deleted = self.with_repo(move |repo| Ok(repo.delete_note(id)?)).await?;

        if deleted {
            tracing::info!("Deleted note {id}");
        }

        Ok(deleted)
    }
}

#[cfg(test)]
pub(crate) fn in_memory_service() -> NoteService {
    let mut repo = Repository::open_in_memory().expect("failed to open in-memory database");
    repo.migrate().expect("failed to migrate in-memory database");
    NoteService::new(Arc::new(Mutex::new(repo)))
}
