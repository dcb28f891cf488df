//! In-memory platform.
//!
//! Keeps groups, containers and posted notices in process memory and records
//! every side effect. Failures can be injected per operation. Each call yields
//! to the runtime once before touching state, so concurrent callers really
//! interleave.

use super::{AccessList, ContainerSummary, Notice, Platform};
use crate::{ContainerRef, GroupRef, SubjectId};

use anyhow::Context as _;

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// A group held by [`MemoryPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryGroup {
    pub id: GroupRef,
    pub name: String,
    pub access: AccessList,
}

/// A container held by [`MemoryPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryContainer {
    pub id: ContainerRef,
    pub name: String,
    pub group: Option<GroupRef>,
    pub access: AccessList,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    groups: Vec<MemoryGroup>,
    containers: Vec<MemoryContainer>,
    posts: Vec<(ContainerRef, Notice)>,
    in_voice: HashSet<SubjectId>,
    disconnects: Vec<SubjectId>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
struct Failures {
    lookups: AtomicBool,
    group_creation: AtomicBool,
    container_creation: AtomicBool,
    moves: AtomicBool,
    posts: AtomicBool,
    disconnects: AtomicBool,
}

/// Platform backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
    failures: Failures,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory platform lock poisoned")
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.failures.lookups.store(fail, Ordering::SeqCst);
    }

    pub fn fail_group_creation(&self, fail: bool) {
        self.failures.group_creation.store(fail, Ordering::SeqCst);
    }

    pub fn fail_container_creation(&self, fail: bool) {
        self.failures.container_creation.store(fail, Ordering::SeqCst);
    }

    pub fn fail_moves(&self, fail: bool) {
        self.failures.moves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_posts(&self, fail: bool) {
        self.failures.posts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_disconnects(&self, fail: bool) {
        self.failures.disconnects.store(fail, Ordering::SeqCst);
    }

    /// Create a group directly, bypassing failure injection.
    pub fn seed_group(&self, name: &str) -> GroupRef {
        let mut state = self.state();
        let id = GroupRef(state.allocate_id());
        state.groups.push(MemoryGroup {
            id,
            name: name.to_string(),
            access: AccessList::new(),
        });
        id
    }

    /// Create a container directly, bypassing failure injection.
    pub fn seed_container(&self, group: Option<GroupRef>, name: &str) -> ContainerRef {
        let mut state = self.state();
        let id = ContainerRef(state.allocate_id());
        state.containers.push(MemoryContainer {
            id,
            name: name.to_string(),
            group,
            access: AccessList::new(),
        });
        id
    }

    /// Remove a container as an outside actor would.
    pub fn delete_container(&self, container: ContainerRef) {
        self.state().containers.retain(|existing| existing.id != container);
    }

    pub fn join_voice(&self, subject: SubjectId) {
        self.state().in_voice.insert(subject);
    }

    pub fn is_in_voice(&self, subject: SubjectId) -> bool {
        self.state().in_voice.contains(&subject)
    }

    pub fn group_named(&self, name: &str) -> Option<MemoryGroup> {
        self.state()
            .groups
            .iter()
            .find(|group| group.name == name)
            .cloned()
    }

    pub fn groups(&self) -> Vec<MemoryGroup> {
        self.state().groups.clone()
    }

    pub fn container(&self, container: ContainerRef) -> Option<MemoryContainer> {
        self.state()
            .containers
            .iter()
            .find(|existing| existing.id == container)
            .cloned()
    }

    pub fn containers_in(&self, group: GroupRef) -> Vec<MemoryContainer> {
        self.state()
            .containers
            .iter()
            .filter(|container| container.group == Some(group))
            .cloned()
            .collect()
    }

    /// Every notice posted so far, in order.
    pub fn posts(&self) -> Vec<(ContainerRef, Notice)> {
        self.state().posts.clone()
    }

    /// Subjects that were actually taken out of voice, in order.
    pub fn disconnects(&self) -> Vec<SubjectId> {
        self.state().disconnects.clone()
    }
}

fn check(flag: &AtomicBool, operation: &str) -> anyhow::Result<()> {
    if flag.load(Ordering::SeqCst) {
        anyhow::bail!("injected failure: {operation}");
    }
    Ok(())
}

impl Platform for MemoryPlatform {
    fn name(&self) -> &str {
        "memory"
    }

    async fn find_group_by_name(&self, name: &str) -> anyhow::Result<Option<GroupRef>> {
        tokio::task::yield_now().await;
        check(&self.failures.lookups, "find group")?;
        Ok(self
            .state()
            .groups
            .iter()
            .find(|group| group.name == name)
            .map(|group| group.id))
    }

    async fn create_group(&self, name: &str, access: &AccessList) -> anyhow::Result<GroupRef> {
        tokio::task::yield_now().await;
        check(&self.failures.group_creation, "create group")?;
        let mut state = self.state();
        let id = GroupRef(state.allocate_id());
        state.groups.push(MemoryGroup {
            id,
            name: name.to_string(),
            access: access.clone(),
        });
        Ok(id)
    }

    async fn list_containers(&self, group: GroupRef) -> anyhow::Result<Vec<ContainerSummary>> {
        tokio::task::yield_now().await;
        check(&self.failures.lookups, "list containers")?;
        let state = self.state();
        if !state.groups.iter().any(|existing| existing.id == group) {
            anyhow::bail!("group {group} does not exist");
        }
        Ok(state
            .containers
            .iter()
            .filter(|container| container.group == Some(group))
            .map(|container| ContainerSummary {
                id: container.id,
                name: container.name.clone(),
                group: container.group,
            })
            .collect())
    }

    async fn container_info(&self, container: ContainerRef) -> anyhow::Result<ContainerSummary> {
        tokio::task::yield_now().await;
        check(&self.failures.lookups, "container info")?;
        self.state()
            .containers
            .iter()
            .find(|existing| existing.id == container)
            .map(|existing| ContainerSummary {
                id: existing.id,
                name: existing.name.clone(),
                group: existing.group,
            })
            .with_context(|| format!("container {container} does not exist"))
    }

    async fn create_container(
        &self,
        group: GroupRef,
        name: &str,
        access: &AccessList,
    ) -> anyhow::Result<ContainerRef> {
        tokio::task::yield_now().await;
        check(&self.failures.container_creation, "create container")?;
        let mut state = self.state();
        if !state.groups.iter().any(|existing| existing.id == group) {
            anyhow::bail!("group {group} does not exist");
        }
        let id = ContainerRef(state.allocate_id());
        state.containers.push(MemoryContainer {
            id,
            name: name.to_string(),
            group: Some(group),
            access: access.clone(),
        });
        Ok(id)
    }

    async fn move_container(
        &self,
        container: ContainerRef,
        group: GroupRef,
        sync_access: bool,
    ) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        check(&self.failures.moves, "move container")?;
        let mut state = self.state();
        let group_access = state
            .groups
            .iter()
            .find(|existing| existing.id == group)
            .map(|existing| existing.access.clone())
            .with_context(|| format!("group {group} does not exist"))?;
        let target = state
            .containers
            .iter_mut()
            .find(|existing| existing.id == container)
            .with_context(|| format!("container {container} does not exist"))?;
        target.group = Some(group);
        if sync_access {
            target.access = group_access;
        }
        Ok(())
    }

    async fn post_message(&self, container: ContainerRef, notice: Notice) -> anyhow::Result<()> {
        tokio::task::yield_now().await;
        check(&self.failures.posts, "post message")?;
        let mut state = self.state();
        if !state.containers.iter().any(|existing| existing.id == container) {
            anyhow::bail!("container {container} does not exist");
        }
        state.posts.push((container, notice));
        Ok(())
    }

    async fn disconnect_from_voice(&self, subject: SubjectId) -> anyhow::Result<bool> {
        tokio::task::yield_now().await;
        check(&self.failures.disconnects, "disconnect from voice")?;
        let mut state = self.state();
        if !state.in_voice.remove(&subject) {
            return Ok(false);
        }
        state.disconnects.push(subject);
        Ok(true)
    }
}
