//! Spreads low-frequency per-avatar work across frames.
//!
//! Work is registered into named groups. Each frame the scheduler runs only a
//! few tasks per group, round-robin, so the cost per frame stays bounded no
//! matter how many avatars are in the scene.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub type TaskId = u64;

/// A callback invoked on some frames, never every frame.
pub trait ScheduledWork: Send + Sync {
    fn run(&self);
}

pub trait Scheduler: Send {
    fn schedule(&mut self, group: &str, work: Arc<dyn ScheduledWork>) -> TaskId;

    /// Removes a task. Unknown ids are ignored; returns whether anything was removed.
    fn unschedule(&mut self, group: &str, id: TaskId) -> bool;
}

pub type SharedScheduler = Arc<Mutex<dyn Scheduler>>;

struct TaskGroup {
    tasks: Vec<(TaskId, Arc<dyn ScheduledWork>)>,
    cursor: usize,
}

impl TaskGroup {
    fn new() -> Self {
        Self {
            tasks: Vec::new(),
            cursor: 0,
        }
    }
}

/// Round-robin scheduler running `tasks_per_frame` tasks of every group per tick.
pub struct FrameScheduler {
    groups: HashMap<String, TaskGroup>,
    next_id: TaskId,
    tasks_per_frame: usize,
}

impl FrameScheduler {
    pub fn new(tasks_per_frame: usize) -> Self {
        Self {
            groups: HashMap::new(),
            next_id: 0,
            tasks_per_frame: tasks_per_frame.max(1),
        }
    }

    pub fn shared(self) -> Arc<Mutex<FrameScheduler>> {
        Arc::new(Mutex::new(self))
    }

    /// Runs this frame's share of every group. Returns how many tasks ran.
    pub fn tick(&mut self) -> usize {
        let mut ran = 0;

        for group in self.groups.values_mut() {
            let count = self.tasks_per_frame.min(group.tasks.len());
            for _ in 0..count {
                if group.cursor >= group.tasks.len() {
                    group.cursor = 0;
                }
                group.tasks[group.cursor].1.run();
                group.cursor += 1;
                ran += 1;
            }
        }

        ran
    }

    pub fn task_count(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, |g| g.tasks.len())
    }
}

impl Scheduler for FrameScheduler {
    fn schedule(&mut self, group: &str, work: Arc<dyn ScheduledWork>) -> TaskId {
        let id = self.next_id;
        self.next_id += 1;

        self.groups
            .entry(group.to_string())
            .or_insert_with(TaskGroup::new)
            .tasks
            .push((id, work));

        log::debug!("Scheduled task {} in group '{}'", id, group);
        id
    }

    fn unschedule(&mut self, group: &str, id: TaskId) -> bool {
        let Some(tasks) = self.groups.get_mut(group) else {
            return false;
        };
        let Some(index) = tasks.tasks.iter().position(|(task_id, _)| *task_id == id) else {
            return false;
        };

        tasks.tasks.remove(index);
        // Keep the rotation on the task that would have run next.
        if index < tasks.cursor {
            tasks.cursor -= 1;
        }
        if tasks.tasks.is_empty() {
            self.groups.remove(group);
        }

        log::debug!("Unscheduled task {} from group '{}'", id, group);
        true
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(1)
    }
}
