use crate::dom::NodeId;

/// Work a timer can carry. Timers hold data, not closures, so the page can
/// run them with full mutable access to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScheduledAction {
    /// Click the close control of the given alert element.
    DismissAlert(NodeId),
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduledTask {
    pub(crate) id: i64,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) action: ScheduledAction,
}

/// One-shot tasks over a virtual millisecond clock. Tasks run in
/// `(due_at, order)` order; `order` breaks ties by scheduling sequence.
#[derive(Debug, Clone)]
pub(crate) struct TimerQueue {
    now_ms: i64,
    tasks: Vec<ScheduledTask>,
    next_id: i64,
    next_order: i64,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self {
            now_ms: 0,
            tasks: Vec::new(),
            next_id: 1,
            next_order: 0,
        }
    }

    pub(crate) fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(crate) fn schedule(&mut self, action: ScheduledAction, delay_ms: i64) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        let order = self.next_order;
        self.next_order += 1;
        let due_at = self.now_ms.saturating_add(delay_ms.max(0));
        log::debug!("timer schedule id={id} due_at={due_at}");
        self.tasks.push(ScheduledTask {
            id,
            due_at,
            order,
            action,
        });
        id
    }

    pub(crate) fn advance_clock(&mut self, delta_ms: i64) {
        self.now_ms = self.now_ms.saturating_add(delta_ms);
    }

    /// Removes and returns the next task due at or before the current now.
    pub(crate) fn take_next_due(&mut self) -> Option<ScheduledTask> {
        let next = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| task.due_at <= self.now_ms)
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)?;
        Some(self.tasks.remove(next))
    }

    pub(crate) fn pending(&self) -> Vec<&ScheduledTask> {
        let mut tasks = self.tasks.iter().collect::<Vec<_>>();
        tasks.sort_by_key(|task| (task.due_at, task.order));
        tasks
    }

    pub(crate) fn clear_all(&mut self) -> usize {
        let cleared = self.tasks.len();
        self.tasks.clear();
        cleared
    }
}
