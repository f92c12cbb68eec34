pub mod reconcile;
pub mod switch;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::{Store, keys};
use crate::tabs::{Tab, extract_domain, is_internal_url};

/// Reserved id of the sentinel workspace holding tabs not yet assigned to
/// any named workspace. Always present, always order 0, never deletable.
pub const UNSAVED_WORKSPACE_ID: &str = "unsaved";

const DEFAULT_COLOR: &str = "bg-blue-500";
const DEFAULT_ICON: &str = "briefcase";
const SENTINEL_COLOR: &str = "bg-slate-400";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    /// Sort key; the sentinel workspace is always 0.
    #[serde(default)]
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn is_sentinel(&self) -> bool {
        self.id == UNSAVED_WORKSPACE_ID
    }
}

/// A tab persisted in a workspace. Uniqueness within a workspace is by
/// `url`, not by id: two entries with the same URL never coexist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTab {
    pub id: String,
    pub title: String,
    pub url: String,
    pub domain: String,
    #[serde(default)]
    pub favicon: String,
    pub saved_at: DateTime<Utc>,
}

impl SavedTab {
    pub fn from_live(tab: &Tab) -> Self {
        Self {
            id: generate_id("saved"),
            title: if tab.title.is_empty() { "Untitled".into() } else { tab.title.clone() },
            url: tab.url.clone(),
            domain: extract_domain(&tab.url),
            favicon: tab.favicon.clone().unwrap_or_default(),
            saved_at: Utc::now(),
        }
    }

    /// Same entry with title/domain/favicon refreshed from the live tab.
    /// `id` and `saved_at` are preserved.
    fn refreshed_from(&self, tab: &Tab) -> Self {
        Self {
            id: self.id.clone(),
            title: if tab.title.is_empty() { self.title.clone() } else { tab.title.clone() },
            url: self.url.clone(),
            domain: extract_domain(&self.url),
            favicon: tab.favicon.clone().unwrap_or_else(|| self.favicon.clone()),
            saved_at: self.saved_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Link,
    File,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Optional fields for creating or renaming a workspace.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceMeta {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

pub(crate) fn generate_id(prefix: &str) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &uuid[..8])
}

/// True when a live tab participates in reconciliation: it has a real URL,
/// is not a browser-internal page, is not the anchor tab, and is not pinned.
pub(crate) fn is_workspace_tab(tab: &Tab, anchor_url: &str) -> bool {
    !tab.url.is_empty() && !is_internal_url(&tab.url) && tab.url != anchor_url && !tab.pinned
}

/// Diff/merge a saved-tab list against the live tab set.
///
/// Entries whose URL is still live are kept in their saved order, refreshed
/// from the live tab; entries whose URL is gone drop out; live URLs not yet
/// saved are appended in strip order. Deduplicated by URL throughout.
pub(crate) fn merge_live(existing: &[SavedTab], live: &[Tab]) -> Vec<SavedTab> {
    let mut by_url: HashMap<&str, &Tab> = HashMap::new();
    for tab in live {
        by_url.entry(tab.url.as_str()).or_insert(tab);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged: Vec<SavedTab> = Vec::with_capacity(live.len());
    for entry in existing {
        if let Some(tab) = by_url.get(entry.url.as_str()) {
            if seen.insert(entry.url.as_str()) {
                merged.push(entry.refreshed_from(tab));
            }
        }
    }
    for tab in live {
        if seen.insert(tab.url.as_str()) {
            merged.push(SavedTab::from_live(tab));
        }
    }
    merged
}

fn normalize_orders(workspaces: &mut [Workspace]) {
    workspaces.sort_by_key(|w| (!w.is_sentinel(), w.order));
    for (i, ws) in workspaces.iter_mut().enumerate() {
        ws.order = i as u32;
    }
}

/// Owns all persisted workspace state. Every read-modify-write sequence on
/// a list or map value runs inside the store's named lock scope for that
/// key, so UI-initiated and background-initiated writes cannot race.
pub struct WorkspaceManager {
    store: Store,
    anchor_url: String,
}

impl WorkspaceManager {
    pub fn new(store: Store, anchor_url: impl Into<String>) -> Self {
        Self {
            store,
            anchor_url: anchor_url.into(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn anchor_url(&self) -> &str {
        &self.anchor_url
    }

    /// Ensure the sentinel workspace exists and the active id resolves.
    /// Call once at startup; safe to call again.
    pub async fn init(&self) -> Result<()> {
        {
            let _guard = self.store.lock(keys::WORKSPACES).await;
            let mut workspaces: Vec<Workspace> =
                self.store.get_or_default(keys::WORKSPACES).await?;
            if !workspaces.iter().any(|w| w.is_sentinel()) {
                let now = Utc::now();
                workspaces.push(Workspace {
                    id: UNSAVED_WORKSPACE_ID.to_string(),
                    name: "Unsaved".to_string(),
                    color: SENTINEL_COLOR.to_string(),
                    icon: DEFAULT_ICON.to_string(),
                    order: 0,
                    created_at: now,
                    updated_at: now,
                });
                normalize_orders(&mut workspaces);
                self.store.set(keys::WORKSPACES, &workspaces).await?;
                info!("created sentinel workspace");
            }
        }
        self.active_workspace_id().await?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Workspaces
    // -----------------------------------------------------------------

    /// All workspaces, sorted by order (sentinel first).
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let mut workspaces: Vec<Workspace> = self.store.get_or_default(keys::WORKSPACES).await?;
        workspaces.sort_by_key(|w| (!w.is_sentinel(), w.order));
        Ok(workspaces)
    }

    pub async fn get_workspace(&self, id: &str) -> Result<Workspace> {
        self.list_workspaces()
            .await?
            .into_iter()
            .find(|w| w.id == id)
            .ok_or_else(|| Error::not_found("workspace", id))
    }

    pub async fn add_workspace(&self, meta: WorkspaceMeta) -> Result<Workspace> {
        let _guard = self.store.lock(keys::WORKSPACES).await;
        let mut workspaces: Vec<Workspace> = self.store.get_or_default(keys::WORKSPACES).await?;

        let now = Utc::now();
        let workspace = Workspace {
            id: generate_id("ws"),
            name: meta.name.unwrap_or_else(|| "New Workspace".to_string()),
            color: meta.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            icon: meta.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
            order: workspaces.iter().map(|w| w.order + 1).max().unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        workspaces.push(workspace.clone());
        self.store.set(keys::WORKSPACES, &workspaces).await?;
        info!(workspace_id = %workspace.id, name = %workspace.name, "workspace created");
        Ok(workspace)
    }

    pub async fn update_workspace(&self, id: &str, meta: WorkspaceMeta) -> Result<Workspace> {
        let _guard = self.store.lock(keys::WORKSPACES).await;
        let mut workspaces: Vec<Workspace> = self.store.get_or_default(keys::WORKSPACES).await?;
        let workspace = workspaces
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| Error::not_found("workspace", id))?;

        if let Some(name) = meta.name {
            workspace.name = name;
        }
        if let Some(color) = meta.color {
            workspace.color = color;
        }
        if let Some(icon) = meta.icon {
            workspace.icon = icon;
        }
        workspace.updated_at = Utc::now();
        let updated = workspace.clone();
        self.store.set(keys::WORKSPACES, &workspaces).await?;
        Ok(updated)
    }

    /// Delete a workspace and cascade its saved tabs, resources, note and
    /// todos. Deleting the sentinel fails with `Protected`.
    pub async fn delete_workspace(&self, id: &str) -> Result<()> {
        if id == UNSAVED_WORKSPACE_ID {
            return Err(Error::Protected(
                "the Unsaved workspace cannot be deleted".to_string(),
            ));
        }

        {
            let _guard = self.store.lock(keys::WORKSPACES).await;
            let mut workspaces: Vec<Workspace> =
                self.store.get_or_default(keys::WORKSPACES).await?;
            let before = workspaces.len();
            workspaces.retain(|w| w.id != id);
            if workspaces.len() == before {
                return Err(Error::not_found("workspace", id));
            }
            normalize_orders(&mut workspaces);
            self.store.set(keys::WORKSPACES, &workspaces).await?;
        }

        self.remove_map_entry::<Vec<SavedTab>>(keys::SAVED_TABS, id).await?;
        self.remove_map_entry::<Vec<Resource>>(keys::RESOURCES, id).await?;
        self.remove_map_entry::<String>(keys::NOTES, id).await?;
        self.remove_map_entry::<Vec<Todo>>(keys::TODOS, id).await?;

        // Repairs the active id if it pointed at the deleted workspace.
        self.active_workspace_id().await?;
        info!(workspace_id = %id, "workspace deleted");
        Ok(())
    }

    /// Move `dragged_id` to the position `target_id` occupies. The sentinel
    /// stays at order 0; dragging it or dropping onto it is rejected.
    pub async fn reorder_workspaces(
        &self,
        dragged_id: &str,
        target_id: &str,
    ) -> Result<Vec<Workspace>> {
        if dragged_id == UNSAVED_WORKSPACE_ID || target_id == UNSAVED_WORKSPACE_ID {
            return Err(Error::Protected(
                "the Unsaved workspace cannot be reordered".to_string(),
            ));
        }
        if dragged_id == target_id {
            return self.list_workspaces().await;
        }

        let _guard = self.store.lock(keys::WORKSPACES).await;
        let mut workspaces: Vec<Workspace> = self.store.get_or_default(keys::WORKSPACES).await?;
        workspaces.sort_by_key(|w| (!w.is_sentinel(), w.order));

        let from = workspaces
            .iter()
            .position(|w| w.id == dragged_id)
            .ok_or_else(|| Error::not_found("workspace", dragged_id))?;
        if !workspaces.iter().any(|w| w.id == target_id) {
            return Err(Error::not_found("workspace", target_id));
        }

        let dragged = workspaces.remove(from);
        let to = workspaces
            .iter()
            .position(|w| w.id == target_id)
            .unwrap_or(workspaces.len());
        workspaces.insert(to.max(1), dragged);

        for (i, ws) in workspaces.iter_mut().enumerate() {
            ws.order = i as u32;
        }
        self.store.set(keys::WORKSPACES, &workspaces).await?;
        Ok(workspaces)
    }

    // -----------------------------------------------------------------
    // Active workspace & switching guard
    // -----------------------------------------------------------------

    /// The active workspace id. Falls back to the sentinel (and persists
    /// the fix) if the stored id is missing or dangling.
    pub async fn active_workspace_id(&self) -> Result<String> {
        let active: Option<String> = self.store.get(keys::ACTIVE_WORKSPACE_ID).await?;
        if let Some(id) = active {
            let workspaces = self.list_workspaces().await?;
            if workspaces.iter().any(|w| w.id == id) {
                return Ok(id);
            }
            debug!(workspace_id = %id, "active workspace id is dangling, falling back to sentinel");
        }
        self.store
            .set(keys::ACTIVE_WORKSPACE_ID, &UNSAVED_WORKSPACE_ID)
            .await?;
        Ok(UNSAVED_WORKSPACE_ID.to_string())
    }

    /// Blind single-key write; the underlying store write is atomic, so no
    /// lock scope is needed.
    pub async fn set_active_workspace_id(&self, id: &str) -> Result<()> {
        self.store.set(keys::ACTIVE_WORKSPACE_ID, &id).await
    }

    pub async fn is_switching(&self) -> Result<bool> {
        self.store.get_or_default(keys::IS_SWITCHING).await
    }

    pub async fn set_switching(&self, switching: bool) -> Result<()> {
        self.store.set(keys::IS_SWITCHING, &switching).await
    }

    // -----------------------------------------------------------------
    // Saved tabs
    // -----------------------------------------------------------------

    pub async fn get_saved_tabs(&self, workspace_id: &str) -> Result<Vec<SavedTab>> {
        let all: HashMap<String, Vec<SavedTab>> =
            self.store.get_or_default(keys::SAVED_TABS).await?;
        Ok(all.get(workspace_id).cloned().unwrap_or_default())
    }

    /// Replace a workspace's saved-tab list. The anchor URL is filtered out
    /// and duplicates by URL collapse to the first entry.
    pub async fn save_tabs(&self, workspace_id: &str, tabs: Vec<SavedTab>) -> Result<()> {
        let mut seen: HashSet<String> = HashSet::new();
        let sanitized: Vec<SavedTab> = tabs
            .into_iter()
            .filter(|t| !t.url.is_empty() && t.url != self.anchor_url)
            .filter(|t| seen.insert(t.url.clone()))
            .collect();

        let _guard = self.store.lock(keys::SAVED_TABS).await;
        let mut all: HashMap<String, Vec<SavedTab>> =
            self.store.get_or_default(keys::SAVED_TABS).await?;
        all.insert(workspace_id.to_string(), sanitized);
        self.store.set(keys::SAVED_TABS, &all).await
    }

    /// Persist the live tab snapshot as the workspace's saved list, merged
    /// by URL against the existing list so `saved_at` survives. Writes even
    /// when the snapshot is empty: closing every tab is a valid state.
    pub async fn snapshot_tabs(&self, workspace_id: &str, live: &[Tab]) -> Result<Vec<SavedTab>> {
        let _guard = self.store.lock(keys::SAVED_TABS).await;
        let mut all: HashMap<String, Vec<SavedTab>> =
            self.store.get_or_default(keys::SAVED_TABS).await?;
        let existing = all.get(workspace_id).cloned().unwrap_or_default();
        let merged = merge_live(&existing, live);
        all.insert(workspace_id.to_string(), merged.clone());
        self.store.set(keys::SAVED_TABS, &all).await?;
        Ok(merged)
    }

    /// Add a tab to a workspace, merging by URL: an existing entry with the
    /// same URL is updated in place (original `saved_at` preserved) rather
    /// than duplicated.
    pub async fn add_tab_to_workspace(
        &self,
        workspace_id: &str,
        tab: SavedTab,
    ) -> Result<SavedTab> {
        if tab.url == self.anchor_url {
            return Err(Error::Protected(
                "the anchor tab is never saved into a workspace".to_string(),
            ));
        }

        let _guard = self.store.lock(keys::SAVED_TABS).await;
        let mut all: HashMap<String, Vec<SavedTab>> =
            self.store.get_or_default(keys::SAVED_TABS).await?;
        let tabs = all.entry(workspace_id.to_string()).or_default();

        let saved = match tabs.iter_mut().find(|t| t.url == tab.url) {
            Some(existing) => {
                if !tab.title.is_empty() {
                    existing.title = tab.title;
                }
                if !tab.domain.is_empty() {
                    existing.domain = tab.domain;
                }
                if !tab.favicon.is_empty() {
                    existing.favicon = tab.favicon;
                }
                existing.clone()
            }
            None => {
                tabs.push(tab.clone());
                tab
            }
        };
        self.store.set(keys::SAVED_TABS, &all).await?;
        Ok(saved)
    }

    pub async fn remove_tab_by_url(&self, workspace_id: &str, url: &str) -> Result<()> {
        let _guard = self.store.lock(keys::SAVED_TABS).await;
        let mut all: HashMap<String, Vec<SavedTab>> =
            self.store.get_or_default(keys::SAVED_TABS).await?;
        if let Some(tabs) = all.get_mut(workspace_id) {
            tabs.retain(|t| t.url != url);
            self.store.set(keys::SAVED_TABS, &all).await?;
        }
        Ok(())
    }

    pub async fn remove_tab(&self, workspace_id: &str, tab_id: &str) -> Result<()> {
        let _guard = self.store.lock(keys::SAVED_TABS).await;
        let mut all: HashMap<String, Vec<SavedTab>> =
            self.store.get_or_default(keys::SAVED_TABS).await?;
        let tabs = all
            .get_mut(workspace_id)
            .ok_or_else(|| Error::not_found("workspace", workspace_id))?;
        let before = tabs.len();
        tabs.retain(|t| t.id != tab_id);
        if tabs.len() == before {
            return Err(Error::not_found("saved tab", tab_id));
        }
        self.store.set(keys::SAVED_TABS, &all).await
    }

    /// Move a saved tab between workspaces; merges by URL on the receiving
    /// side. Both lists are mutated under one lock acquisition.
    pub async fn move_tab_between_workspaces(
        &self,
        from_id: &str,
        to_id: &str,
        tab_id: &str,
    ) -> Result<SavedTab> {
        let _guard = self.store.lock(keys::SAVED_TABS).await;
        let mut all: HashMap<String, Vec<SavedTab>> =
            self.store.get_or_default(keys::SAVED_TABS).await?;

        let from_tabs = all
            .get_mut(from_id)
            .ok_or_else(|| Error::not_found("workspace", from_id))?;
        let position = from_tabs
            .iter()
            .position(|t| t.id == tab_id)
            .ok_or_else(|| Error::not_found("saved tab", tab_id))?;
        let tab = from_tabs.remove(position);

        let to_tabs = all.entry(to_id.to_string()).or_default();
        let moved = match to_tabs.iter().position(|t| t.url == tab.url) {
            // URL already saved in the destination: the move collapses into
            // the existing entry.
            Some(i) => to_tabs[i].clone(),
            None => {
                to_tabs.push(tab.clone());
                tab
            }
        };
        self.store.set(keys::SAVED_TABS, &all).await?;
        Ok(moved)
    }

    // -----------------------------------------------------------------
    // Resources / notes / todos (pass-through CRUD, outside the
    // reconciliation core)
    // -----------------------------------------------------------------

    pub async fn get_resources(&self, workspace_id: &str) -> Result<Vec<Resource>> {
        let all: HashMap<String, Vec<Resource>> =
            self.store.get_or_default(keys::RESOURCES).await?;
        Ok(all.get(workspace_id).cloned().unwrap_or_default())
    }

    pub async fn add_resource(
        &self,
        workspace_id: &str,
        title: &str,
        url: &str,
        kind: ResourceKind,
    ) -> Result<Resource> {
        let resource = Resource {
            id: generate_id("resource"),
            title: title.to_string(),
            url: url.to_string(),
            kind,
        };
        let _guard = self.store.lock(keys::RESOURCES).await;
        let mut all: HashMap<String, Vec<Resource>> =
            self.store.get_or_default(keys::RESOURCES).await?;
        all.entry(workspace_id.to_string()).or_default().push(resource.clone());
        self.store.set(keys::RESOURCES, &all).await?;
        Ok(resource)
    }

    pub async fn remove_resource(&self, workspace_id: &str, resource_id: &str) -> Result<()> {
        let _guard = self.store.lock(keys::RESOURCES).await;
        let mut all: HashMap<String, Vec<Resource>> =
            self.store.get_or_default(keys::RESOURCES).await?;
        let resources = all
            .get_mut(workspace_id)
            .ok_or_else(|| Error::not_found("workspace", workspace_id))?;
        let before = resources.len();
        resources.retain(|r| r.id != resource_id);
        if resources.len() == before {
            return Err(Error::not_found("resource", resource_id));
        }
        self.store.set(keys::RESOURCES, &all).await
    }

    pub async fn move_resource_between_workspaces(
        &self,
        from_id: &str,
        to_id: &str,
        resource_id: &str,
    ) -> Result<()> {
        let _guard = self.store.lock(keys::RESOURCES).await;
        let mut all: HashMap<String, Vec<Resource>> =
            self.store.get_or_default(keys::RESOURCES).await?;
        let from = all
            .get_mut(from_id)
            .ok_or_else(|| Error::not_found("workspace", from_id))?;
        let position = from
            .iter()
            .position(|r| r.id == resource_id)
            .ok_or_else(|| Error::not_found("resource", resource_id))?;
        let resource = from.remove(position);
        all.entry(to_id.to_string()).or_default().push(resource);
        self.store.set(keys::RESOURCES, &all).await
    }

    /// Turn a saved tab into a link resource in the same workspace.
    pub async fn convert_tab_to_resource(
        &self,
        workspace_id: &str,
        tab: &SavedTab,
    ) -> Result<Resource> {
        let title = if tab.title.is_empty() { tab.url.clone() } else { tab.title.clone() };
        self.add_resource(workspace_id, &title, &tab.url, ResourceKind::Link)
            .await
    }

    pub async fn get_note(&self, workspace_id: &str) -> Result<String> {
        let all: HashMap<String, String> = self.store.get_or_default(keys::NOTES).await?;
        Ok(all.get(workspace_id).cloned().unwrap_or_default())
    }

    pub async fn set_note(&self, workspace_id: &str, content: &str) -> Result<()> {
        let _guard = self.store.lock(keys::NOTES).await;
        let mut all: HashMap<String, String> = self.store.get_or_default(keys::NOTES).await?;
        all.insert(workspace_id.to_string(), content.to_string());
        self.store.set(keys::NOTES, &all).await
    }

    pub async fn get_todos(&self, workspace_id: &str) -> Result<Vec<Todo>> {
        let all: HashMap<String, Vec<Todo>> = self.store.get_or_default(keys::TODOS).await?;
        Ok(all.get(workspace_id).cloned().unwrap_or_default())
    }

    pub async fn add_todo(&self, workspace_id: &str, text: &str) -> Result<Todo> {
        let todo = Todo {
            id: generate_id("todo"),
            text: text.to_string(),
            completed: false,
            created_at: Utc::now(),
        };
        let _guard = self.store.lock(keys::TODOS).await;
        let mut all: HashMap<String, Vec<Todo>> = self.store.get_or_default(keys::TODOS).await?;
        all.entry(workspace_id.to_string()).or_default().push(todo.clone());
        self.store.set(keys::TODOS, &all).await?;
        Ok(todo)
    }

    pub async fn toggle_todo(&self, workspace_id: &str, todo_id: &str) -> Result<Todo> {
        let _guard = self.store.lock(keys::TODOS).await;
        let mut all: HashMap<String, Vec<Todo>> = self.store.get_or_default(keys::TODOS).await?;
        let todos = all
            .get_mut(workspace_id)
            .ok_or_else(|| Error::not_found("workspace", workspace_id))?;
        let todo = todos
            .iter_mut()
            .find(|t| t.id == todo_id)
            .ok_or_else(|| Error::not_found("todo", todo_id))?;
        todo.completed = !todo.completed;
        let toggled = todo.clone();
        self.store.set(keys::TODOS, &all).await?;
        Ok(toggled)
    }

    pub async fn delete_todo(&self, workspace_id: &str, todo_id: &str) -> Result<()> {
        let _guard = self.store.lock(keys::TODOS).await;
        let mut all: HashMap<String, Vec<Todo>> = self.store.get_or_default(keys::TODOS).await?;
        let todos = all
            .get_mut(workspace_id)
            .ok_or_else(|| Error::not_found("workspace", workspace_id))?;
        let before = todos.len();
        todos.retain(|t| t.id != todo_id);
        if todos.len() == before {
            return Err(Error::not_found("todo", todo_id));
        }
        self.store.set(keys::TODOS, &all).await
    }

    async fn remove_map_entry<T>(&self, key: &str, workspace_id: &str) -> Result<()>
    where
        T: serde::de::DeserializeOwned + Serialize,
    {
        let _guard = self.store.lock(key).await;
        let mut all: HashMap<String, T> = self.store.get_or_default(key).await?;
        if all.remove(workspace_id).is_some() {
            self.store.set(key, &all).await?;
        }
        Ok(())
    }
}

/// Convenience constructor for a manager over an in-memory store.
pub fn memory_manager(anchor_url: &str) -> Arc<WorkspaceManager> {
    let store = Store::new(Arc::new(crate::store::memory::MemoryStore::new()));
    Arc::new(WorkspaceManager::new(store, anchor_url))
}
