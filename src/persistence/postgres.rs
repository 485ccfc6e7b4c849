//! PostgreSQL implementation of the persistence layer.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{FileRepository, FolderRepository, MIGRATOR};
use crate::config::StorageConfig;
use crate::domain::{
    FileChanges, FileId, Folder, FolderChanges, FolderId, NewFile, NewFolder, Page, PageRequest,
    Relocation, StoredFile,
};
use crate::error::StorageError;

const FOLDER_COLUMNS: &str = "id, name, storage_path, virtual_path, creator_user_id, parent_id, \
     access_url, is_published, created_at, updated_at";

const FILE_COLUMNS: &str = "id, name, storage_path, virtual_path, uploader_user_id, size_bytes, \
     mime_type, folder_id, access_url, created_at, updated_at";

/// Builds a lazily-connecting pool from the service configuration.
///
/// # Errors
///
/// Returns [`StorageError::Database`] if the URL cannot be parsed.
pub fn connect_lazy(config: &StorageConfig) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect_lazy(&config.database_url)?;
    Ok(pool)
}

/// Runs `SELECT 1` against the pool.
///
/// # Errors
///
/// Returns [`StorageError::Database`] if no connection can be acquired.
pub async fn ping(pool: &PgPool) -> Result<(), StorageError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Applies pending embedded migrations.
///
/// # Errors
///
/// Returns [`StorageError::Database`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StorageError> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn total_from(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

/// Storage-path prefixes for descendant rewrites, with trailing separator.
fn storage_prefixes(relocation: &Relocation) -> (String, String) {
    (
        format!("{}/", relocation.old_storage_path.trim_end_matches('/')),
        format!("{}/", relocation.new_storage_path.trim_end_matches('/')),
    )
}

/// PostgreSQL-backed folder repository.
#[derive(Debug, Clone)]
pub struct PgFolderRepository {
    pool: PgPool,
}

impl PgFolderRepository {
    /// Creates a repository on the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderRepository for PgFolderRepository {
    async fn insert(&self, folder: NewFolder) -> Result<Folder, StorageError> {
        let sql = format!(
            "INSERT INTO folders (id, name, storage_path, virtual_path, creator_user_id, \
             parent_id, is_published) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {FOLDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, Folder>(&sql)
            .bind(FolderId::new())
            .bind(folder.name.as_str())
            .bind(&folder.storage_path)
            .bind(&folder.virtual_path)
            .bind(folder.creator_user_id)
            .bind(folder.parent_id)
            .bind(folder.is_published)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get(&self, id: FolderId) -> Result<Folder, StorageError> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = $1");
        sqlx::query_as::<_, Folder>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::FolderNotFound(id.to_string()))
    }

    async fn find_by_virtual_path(&self, path: &str) -> Result<Option<Folder>, StorageError> {
        let sql = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE virtual_path = $1");
        let row = sqlx::query_as::<_, Folder>(&sql)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_children(
        &self,
        parent: Option<FolderId>,
        request: PageRequest,
    ) -> Result<Page<Folder>, StorageError> {
        let sql = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE parent_id IS NOT DISTINCT FROM $1 \
             ORDER BY name, id LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, Folder>(&sql)
            .bind(parent)
            .bind(to_i64(request.limit()))
            .bind(to_i64(request.offset()))
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM folders WHERE parent_id IS NOT DISTINCT FROM $1",
        )
        .bind(parent)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page {
            items,
            total: total_from(total),
            request,
        })
    }

    async fn update(&self, id: FolderId, changes: FolderChanges) -> Result<Folder, StorageError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE folders SET \
                 name = COALESCE($2, name), \
                 parent_id = CASE WHEN $3 THEN $4 ELSE parent_id END, \
                 creator_user_id = COALESCE($5, creator_user_id), \
                 is_published = COALESCE($6, is_published), \
                 virtual_path = COALESCE($7, virtual_path), \
                 storage_path = COALESCE($8, storage_path), \
                 updated_at = now() \
             WHERE id = $1 RETURNING {FOLDER_COLUMNS}"
        );
        let relocation = changes.relocation.as_ref();
        let updated = sqlx::query_as::<_, Folder>(&sql)
            .bind(id)
            .bind(changes.name.as_ref().map(|n| n.as_str().to_string()))
            .bind(changes.parent_id.is_some())
            .bind(changes.parent_id.flatten())
            .bind(changes.creator_user_id)
            .bind(changes.is_published)
            .bind(relocation.map(|r| r.new_virtual_path.clone()))
            .bind(relocation.map(|r| r.new_storage_path.clone()))
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StorageError::FolderNotFound(id.to_string()))?;

        if let Some(relocation) = relocation {
            let (old_storage, new_storage) = storage_prefixes(relocation);

            let moved_folders = sqlx::query(
                "UPDATE folders SET \
                     virtual_path = $2 || substr(virtual_path, char_length($1) + 1), \
                     storage_path = $4 || substr(storage_path, char_length($3) + 1), \
                     updated_at = now() \
                 WHERE left(virtual_path, char_length($1)) = $1 AND id <> $5",
            )
            .bind(&relocation.old_virtual_path)
            .bind(&relocation.new_virtual_path)
            .bind(&old_storage)
            .bind(&new_storage)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let moved_files = sqlx::query(
                "UPDATE files SET \
                     virtual_path = $2 || substr(virtual_path, char_length($1) + 1), \
                     storage_path = $4 || substr(storage_path, char_length($3) + 1), \
                     updated_at = now() \
                 WHERE left(virtual_path, char_length($1)) = $1",
            )
            .bind(&relocation.old_virtual_path)
            .bind(&relocation.new_virtual_path)
            .bind(&old_storage)
            .bind(&new_storage)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            tracing::debug!(%id, moved_folders, moved_files, "rewrote descendant paths");
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: FolderId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::FolderNotFound(id.to_string()));
        }
        Ok(())
    }
}

/// PostgreSQL-backed file repository.
#[derive(Debug, Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    /// Creates a repository on the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn insert(&self, file: NewFile) -> Result<StoredFile, StorageError> {
        let sql = format!(
            "INSERT INTO files (id, name, storage_path, virtual_path, uploader_user_id, \
             size_bytes, mime_type, folder_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {FILE_COLUMNS}"
        );
        let row = sqlx::query_as::<_, StoredFile>(&sql)
            .bind(file.id)
            .bind(file.name.as_str())
            .bind(&file.storage_path)
            .bind(&file.virtual_path)
            .bind(file.uploader_user_id)
            .bind(file.size_bytes)
            .bind(&file.mime_type)
            .bind(file.folder_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get(&self, id: FileId) -> Result<StoredFile, StorageError> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = $1");
        sqlx::query_as::<_, StoredFile>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::FileNotFound(id.to_string()))
    }

    async fn find_by_virtual_path(&self, path: &str) -> Result<Option<StoredFile>, StorageError> {
        let sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE virtual_path = $1");
        let row = sqlx::query_as::<_, StoredFile>(&sql)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_in_folder(
        &self,
        folder: FolderId,
        request: PageRequest,
    ) -> Result<Page<StoredFile>, StorageError> {
        let sql = format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE folder_id = $1 \
             ORDER BY name, id LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, StoredFile>(&sql)
            .bind(folder)
            .bind(to_i64(request.limit()))
            .bind(to_i64(request.offset()))
            .fetch_all(&self.pool)
            .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM files WHERE folder_id = $1")
            .bind(folder)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page {
            items,
            total: total_from(total),
            request,
        })
    }

    async fn update(&self, id: FileId, changes: FileChanges) -> Result<StoredFile, StorageError> {
        let sql = format!(
            "UPDATE files SET \
                 name = COALESCE($2, name), \
                 folder_id = COALESCE($3, folder_id), \
                 storage_path = COALESCE($4, storage_path), \
                 virtual_path = COALESCE($5, virtual_path), \
                 updated_at = now() \
             WHERE id = $1 RETURNING {FILE_COLUMNS}"
        );
        sqlx::query_as::<_, StoredFile>(&sql)
            .bind(id)
            .bind(changes.name.as_ref().map(|n| n.as_str().to_string()))
            .bind(changes.folder_id)
            .bind(changes.storage_path)
            .bind(changes.virtual_path)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::FileNotFound(id.to_string()))
    }

    async fn delete(&self, id: FileId) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::FileNotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_prefixes_end_with_separator() {
        let relocation = Relocation {
            old_virtual_path: "/a/".into(),
            new_virtual_path: "/b/".into(),
            old_storage_path: "/srv/a".into(),
            new_storage_path: "/srv/b/".into(),
        };
        assert_eq!(
            storage_prefixes(&relocation),
            ("/srv/a/".to_string(), "/srv/b/".to_string())
        );
    }

    #[test]
    fn counts_saturate() {
        assert_eq!(to_i64(u64::MAX), i64::MAX);
        assert_eq!(total_from(-1), 0);
        assert_eq!(total_from(7), 7);
    }
}
