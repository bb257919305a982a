//! Material folder tree.

use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use crate::db::DbPool;
use crate::db::folders::insert_folder;
use crate::entity::material_folder;
use crate::error::{AppError, AppResult};
use crate::models::{CreateFolderRequest, FolderResponse, ListFoldersQuery, UpdateFolderRequest};

/// Nest folders under their parents. Folders whose parent is gone are roots.
pub fn build_tree(folders: Vec<material_folder::Model>) -> Vec<FolderResponse> {
    let known: std::collections::HashSet<Uuid> = folders.iter().map(|f| f.id).collect();
    let mut by_parent: HashMap<Option<Uuid>, Vec<material_folder::Model>> = HashMap::new();
    for folder in folders {
        let parent = folder.parent_id.filter(|p| known.contains(p));
        by_parent.entry(parent).or_default().push(folder);
    }

    fn attach(
        parent: Option<Uuid>,
        by_parent: &mut HashMap<Option<Uuid>, Vec<material_folder::Model>>,
    ) -> Vec<FolderResponse> {
        let Some(children) = by_parent.remove(&parent) else {
            return Vec::new();
        };
        children
            .into_iter()
            .map(|child| {
                let id = child.id;
                let mut node = FolderResponse::from(child);
                node.children = attach(Some(id), by_parent);
                node
            })
            .collect()
    }

    attach(None, &mut by_parent)
}

pub async fn list_folders(db: &DbPool, query: &ListFoldersQuery) -> AppResult<Vec<FolderResponse>> {
    let folders = db.list_folders().await?;
    if query.is_flat() {
        return Ok(folders.into_iter().map(FolderResponse::from).collect());
    }
    Ok(build_tree(folders))
}

fn folder_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("文件夹名称不能为空".to_string()));
    }
    if name.contains('/') {
        return Err(AppError::InvalidInput("文件夹名称不能包含 /".to_string()));
    }
    Ok(name.to_string())
}

/// Sibling names are unique, which keeps folder paths unique.
async fn ensure_unique_name(
    db: &DbPool,
    parent_id: Option<Uuid>,
    name: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    if db.sibling_name_taken(parent_id, name, except).await? {
        return Err(AppError::Conflict(format!("同级目录下已存在文件夹「{}」", name)));
    }
    Ok(())
}

async fn load_parent(db: &DbPool, parent_id: Uuid) -> AppResult<material_folder::Model> {
    db.get_folder(parent_id)
        .await?
        .ok_or_else(|| AppError::InvalidInput("父文件夹不存在".to_string()))
}

pub async fn create_folder(db: &DbPool, req: &CreateFolderRequest) -> AppResult<FolderResponse> {
    let name = folder_name(&req.name)?;
    let parent = match req.parent_id {
        Some(id) => Some(load_parent(db, id).await?),
        None => None,
    };
    ensure_unique_name(db, req.parent_id, &name, None).await?;

    let folder = insert_folder(db.connection(), &name, parent.as_ref()).await?;
    info!("Folder {} created at {}", folder.id, folder.path);
    Ok(folder.into())
}

/// Whether `candidate` is `folder` itself or lies below it.
fn within_subtree(folder: &material_folder::Model, candidate: &material_folder::Model) -> bool {
    candidate.id == folder.id || candidate.path.starts_with(&format!("{}/", folder.path))
}

/// Rename and/or move a folder together with its subtree.
pub async fn update_folder(
    db: &DbPool,
    id: Uuid,
    req: &UpdateFolderRequest,
) -> AppResult<FolderResponse> {
    let existing = db
        .get_folder(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Folder".to_string()))?;

    let name = match req.name.as_deref() {
        Some(raw) => folder_name(raw)?,
        None => existing.name.clone(),
    };

    let parent = if req.move_to_root {
        None
    } else {
        match req.parent_id.or(existing.parent_id) {
            Some(parent_id) if parent_id == existing.id => {
                return Err(AppError::InvalidInput("不能将文件夹设为自己的父级".to_string()));
            }
            Some(parent_id) => {
                let parent = load_parent(db, parent_id).await?;
                if within_subtree(&existing, &parent) {
                    return Err(AppError::InvalidInput(
                        "不能将文件夹移动到其子文件夹下".to_string(),
                    ));
                }
                Some(parent)
            }
            None => None,
        }
    };

    ensure_unique_name(db, parent.as_ref().map(|p| p.id), &name, Some(existing.id)).await?;

    let old_path = existing.path.clone();
    let updated = db.relocate_folder(existing, name, parent).await?;
    info!("Folder {} moved from {} to {}", updated.id, old_path, updated.path);
    Ok(updated.into())
}

/// Delete an empty folder.
pub async fn delete_folder(db: &DbPool, id: Uuid) -> AppResult<()> {
    let folder = db
        .get_folder(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Folder".to_string()))?;

    if db.count_child_folders(folder.id).await? > 0 {
        return Err(AppError::Conflict("文件夹下存在子文件夹，无法删除".to_string()));
    }
    if db.count_materials_in_folder(folder.id).await? > 0 {
        return Err(AppError::Conflict("文件夹下存在素材，无法删除".to_string()));
    }

    db.delete_folder(folder.id).await?;
    info!("Folder {} ({}) deleted", folder.id, folder.path);
    Ok(())
}
