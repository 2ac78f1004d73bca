/// In-process store
///
/// Keeps every table in ordered maps behind one mutex. Uniqueness of
/// usernames, emails and role names, active scoping, sort order with the id
/// tie-breaker and paging follow the Postgres store, so service and route
/// tests exercise the same rules without a database.
///
/// The mutex is never held across an `.await`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{RepositoryError, RepositoryResult, RoleRepository, Store, TaskRepository, UserRepository};
use crate::models::role::{ROLE_ADMIN, ROLE_USER};
use crate::models::{
    Direction, NewTask, NewUser, Page, PageRequest, Role, SortField, Task, TaskChanges, TaskSortField, User,
    UserSortField,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    roles: BTreeMap<i64, Role>,
    user_roles: BTreeSet<(i64, i64)>,
    tasks: BTreeMap<i64, Task>,
    next_user_id: i64,
    next_role_id: i64,
    next_task_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn roles_of(&self, user_id: i64) -> Vec<Role> {
        let mut roles: Vec<Role> = self
            .user_roles
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .filter_map(|(_, role_id)| self.roles.get(role_id).cloned())
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    fn user_with_roles(&self, user: &User) -> User {
        User {
            roles: self.roles_of(user.id),
            ..user.clone()
        }
    }

    /// Task row with the owner's username joined in
    fn joined(&self, task: &Task) -> Task {
        Task {
            owner_username: task
                .user_id
                .and_then(|id| self.users.get(&id))
                .map(|u| u.username.clone()),
            ..task.clone()
        }
    }

    fn link_roles(&mut self, user_id: i64, roles: &[Role]) {
        self.user_roles.retain(|(uid, _)| *uid != user_id);
        self.user_roles.extend(roles.iter().map(|r| (user_id, r.id)));
    }
}

/// Store backed by in-memory maps
#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Empty store seeded with `ROLE_USER` and `ROLE_ADMIN`
    pub fn new() -> Self {
        let store = Self {
            tables: Mutex::new(Tables::default()),
        };
        store.add_role(ROLE_USER);
        store.add_role(ROLE_ADMIN);
        store
    }

    /// Adds a role, returning the existing one if the name is taken
    pub fn add_role(&self, name: &str) -> Role {
        let mut tables = self.lock();

        if let Some(role) = tables.roles.values().find(|r| r.name == name) {
            return role.clone();
        }

        let role = Role {
            id: Tables::next_id(&mut tables.next_role_id),
            name: name.to_string(),
        };
        tables.roles.insert(role.id, role.clone());
        role
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorts by the requested field, then by id ascending, and slices one page
fn paginate<T: Clone, F: SortField>(
    mut rows: Vec<T>,
    request: &PageRequest<F>,
    compare: impl Fn(&T, &T, &F) -> Ordering,
    id: impl Fn(&T) -> i64,
) -> Page<T> {
    rows.sort_by(|a, b| {
        let ordering = compare(a, b, &request.sort.field);
        let ordering = match request.sort.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        ordering.then_with(|| id(a).cmp(&id(b)))
    });

    let total = rows.len() as u64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let size = usize::try_from(request.size).unwrap_or(usize::MAX);
    let content = rows.into_iter().skip(offset).take(size).collect();

    Page::new(content, request, total)
}

fn compare_tasks(a: &Task, b: &Task, field: &TaskSortField) -> Ordering {
    match field {
        TaskSortField::Id => a.id.cmp(&b.id),
        TaskSortField::Title => a.title.cmp(&b.title),
        TaskSortField::Completed => a.completed.cmp(&b.completed),
        TaskSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        TaskSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

fn compare_users(a: &User, b: &User, field: &UserSortField) -> Ordering {
    match field {
        UserSortField::Id => a.id.cmp(&b.id),
        UserSortField::Username => a.username.cmp(&b.username),
        UserSortField::Email => a.email.cmp(&b.email),
        UserSortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn find_active_tasks(&self, request: &PageRequest<TaskSortField>) -> RepositoryResult<Page<Task>> {
        let tables = self.lock();
        let rows: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.active)
            .map(|t| tables.joined(t))
            .collect();

        Ok(paginate(rows, request, compare_tasks, |t| t.id))
    }

    async fn find_active_task_by_id(&self, id: i64) -> RepositoryResult<Option<Task>> {
        let tables = self.lock();
        Ok(tables.tasks.get(&id).filter(|t| t.active).map(|t| tables.joined(t)))
    }

    async fn find_task_by_id(&self, id: i64) -> RepositoryResult<Option<Task>> {
        let tables = self.lock();
        Ok(tables.tasks.get(&id).map(|t| tables.joined(t)))
    }

    async fn find_tasks_by_owner(&self, username: &str) -> RepositoryResult<Vec<Task>> {
        let tables = self.lock();

        let Some(owner) = tables.users.values().find(|u| u.username == username) else {
            return Ok(Vec::new());
        };

        Ok(tables
            .tasks
            .values()
            .filter(|t| t.user_id == Some(owner.id))
            .map(|t| tables.joined(t))
            .collect())
    }

    async fn insert_task(&self, task: NewTask) -> RepositoryResult<Task> {
        let mut tables = self.lock();

        if !tables.users.contains_key(&task.user_id) {
            return Err(RepositoryError::Conflict(format!("User {} does not exist", task.user_id)));
        }

        let row = Task {
            id: Tables::next_id(&mut tables.next_task_id),
            title: task.title,
            description: task.description,
            completed: task.completed,
            active: true,
            user_id: Some(task.user_id),
            owner_username: None,
            created_at: task.created_at,
            updated_at: task.created_at,
        };
        tables.tasks.insert(row.id, row.clone());

        Ok(tables.joined(&row))
    }

    async fn update_task(&self, id: i64, changes: TaskChanges) -> RepositoryResult<Option<Task>> {
        let mut tables = self.lock();

        if let Some(user_id) = changes.user_id {
            if !tables.users.contains_key(&user_id) {
                return Err(RepositoryError::Conflict(format!("User {} does not exist", user_id)));
            }
        }

        let Some(task) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = Some(description);
        }
        if let Some(completed) = changes.completed {
            task.completed = completed;
        }
        if let Some(user_id) = changes.user_id {
            task.user_id = Some(user_id);
        }
        task.updated_at = changes.updated_at;

        let task = task.clone();
        Ok(Some(tables.joined(&task)))
    }

    async fn deactivate_task(&self, id: i64, at: DateTime<Utc>) -> RepositoryResult<bool> {
        let mut tables = self.lock();

        match tables.tasks.get_mut(&id) {
            Some(task) => {
                task.active = false;
                task.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_active_users(&self, request: &PageRequest<UserSortField>) -> RepositoryResult<Page<User>> {
        let tables = self.lock();
        let rows: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.active)
            .map(|u| tables.user_with_roles(u))
            .collect();

        Ok(paginate(rows, request, compare_users, |u| u.id))
    }

    async fn find_user_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let tables = self.lock();
        Ok(tables.users.get(&id).map(|u| tables.user_with_roles(u)))
    }

    async fn find_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let tables = self.lock();
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .map(|u| tables.user_with_roles(u)))
    }

    async fn find_active_user_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let tables = self.lock();
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username && u.active)
            .map(|u| tables.user_with_roles(u)))
    }

    async fn insert_user(&self, user: NewUser, roles: &[Role]) -> RepositoryResult<User> {
        let mut tables = self.lock();

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::Conflict("Username already exists".to_string()));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict("Email already exists".to_string()));
        }

        let row = User {
            id: Tables::next_id(&mut tables.next_user_id),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            active: true,
            created_at: user.created_at,
            updated_at: user.created_at,
            roles: Vec::new(),
        };
        tables.link_roles(row.id, roles);
        tables.users.insert(row.id, row.clone());

        Ok(tables.user_with_roles(&row))
    }

    async fn replace_roles(&self, user_id: i64, roles: &[Role], at: DateTime<Utc>) -> RepositoryResult<Option<User>> {
        let mut tables = self.lock();

        let Some(user) = tables.users.get_mut(&user_id) else {
            return Ok(None);
        };
        user.updated_at = at;
        let user = user.clone();

        tables.link_roles(user_id, roles);
        Ok(Some(tables.user_with_roles(&user)))
    }

    async fn deactivate_user(&self, id: i64, at: DateTime<Utc>) -> RepositoryResult<bool> {
        let mut tables = self.lock();

        match tables.users.get_mut(&id) {
            Some(user) => {
                user.active = false;
                user.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_user(&self, id: i64) -> RepositoryResult<bool> {
        let mut tables = self.lock();

        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.tasks.retain(|_, t| t.user_id != Some(id));
        tables.user_roles.retain(|(uid, _)| *uid != id);

        Ok(true)
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn find_role_by_name(&self, name: &str) -> RepositoryResult<Option<Role>> {
        Ok(self.lock().roles.values().find(|r| r.name == name).cloned())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> RepositoryResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortOrder;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "$argon2id$stub".to_string(),
            created_at: Utc::now(),
        }
    }

    fn new_task(title: &str, user_id: i64) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            completed: false,
            user_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_seeded_roles() {
        let store = MemoryStore::new();
        assert!(store.find_role_by_name(ROLE_USER).await.unwrap().is_some());
        assert!(store.find_role_by_name(ROLE_ADMIN).await.unwrap().is_some());
        assert!(store.find_role_by_name("ROLE_GHOST").await.unwrap().is_none());
        assert_eq!(store.add_role(ROLE_USER).name, ROLE_USER);
    }

    #[tokio::test]
    async fn test_username_and_email_unique_even_when_inactive() {
        let store = MemoryStore::new();
        let alice = store.insert_user(new_user("alice"), &[]).await.unwrap();
        store.deactivate_user(alice.id, Utc::now()).await.unwrap();

        let dup_name = store.insert_user(new_user("alice"), &[]).await;
        assert!(matches!(dup_name, Err(RepositoryError::Conflict(_))));

        let mut other = new_user("alice2");
        other.email = "alice@example.com".to_string();
        assert!(matches!(store.insert_user(other, &[]).await, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_tasks_join_owner_and_scope_active() {
        let store = MemoryStore::new();
        let alice = store.insert_user(new_user("alice"), &[]).await.unwrap();
        let task = store.insert_task(new_task("one", alice.id)).await.unwrap();
        assert_eq!(task.owner_username.as_deref(), Some("alice"));
        assert!(task.active);

        store.deactivate_task(task.id, Utc::now()).await.unwrap();

        assert!(store.find_active_task_by_id(task.id).await.unwrap().is_none());
        assert!(store.find_task_by_id(task.id).await.unwrap().is_some());
        assert_eq!(store.find_tasks_by_owner("alice").await.unwrap().len(), 1);
        assert!(store.find_tasks_by_owner("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_paging_orders_with_id_tie_breaker() {
        let store = MemoryStore::new();
        let alice = store.insert_user(new_user("alice"), &[]).await.unwrap();
        for title in ["b", "a", "b", "a", "c"] {
            store.insert_task(new_task(title, alice.id)).await.unwrap();
        }

        let request = PageRequest {
            page: 0,
            size: 3,
            sort: SortOrder {
                field: TaskSortField::Title,
                direction: Direction::Desc,
            },
        };
        let page = store.find_active_tasks(&request).await.unwrap();

        let seen: Vec<(String, i64)> = page.content.iter().map(|t| (t.title.clone(), t.id)).collect();
        assert_eq!(
            seen,
            vec![("c".to_string(), 5), ("b".to_string(), 1), ("b".to_string(), 3)]
        );
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn test_replace_roles_overwrites() {
        let store = MemoryStore::new();
        let user_role = store.find_role_by_name(ROLE_USER).await.unwrap().unwrap();
        let admin_role = store.find_role_by_name(ROLE_ADMIN).await.unwrap().unwrap();

        let alice = store
            .insert_user(new_user("alice"), &[user_role.clone(), admin_role.clone()])
            .await
            .unwrap();
        assert_eq!(alice.roles.len(), 2);

        let updated = store
            .replace_roles(alice.id, &[admin_role.clone()], Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.roles, vec![admin_role]);

        assert!(store.replace_roles(999, &[], Utc::now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_removes_tasks_and_links() {
        let store = MemoryStore::new();
        let role = store.find_role_by_name(ROLE_USER).await.unwrap().unwrap();
        let alice = store.insert_user(new_user("alice"), &[role]).await.unwrap();
        let bob = store.insert_user(new_user("bob"), &[]).await.unwrap();
        store.insert_task(new_task("mine", alice.id)).await.unwrap();
        let kept = store.insert_task(new_task("bobs", bob.id)).await.unwrap();

        assert!(store.purge_user(alice.id).await.unwrap());
        assert!(!store.purge_user(alice.id).await.unwrap());

        assert!(store.find_user_by_id(alice.id).await.unwrap().is_none());
        assert!(store.find_task_by_id(kept.id).await.unwrap().is_some());
        assert_eq!(store.lock().tasks.len(), 1);
        assert!(store.lock().user_roles.is_empty());
    }
}
