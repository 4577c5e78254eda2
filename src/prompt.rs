//! The blocking confirm/alert surface, abstracted so handler logic runs
//! without a real UI. The page owns one `UserPrompt`; handlers call it
//! synchronously and the answer decides whether default actions proceed.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub trait UserPrompt {
    /// Blocking yes/no question. `true` lets the pending action proceed.
    fn confirm(&mut self, message: &str) -> bool;

    /// Blocking notification with only a dismiss affordance.
    fn notify(&mut self, message: &str);
}

/// Default prompt: every confirmation is accepted, notifications are
/// dropped. Matches a user who clicks through everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl UserPrompt for AcceptAll {
    fn confirm(&mut self, _message: &str) -> bool {
        true
    }

    fn notify(&mut self, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptRecord {
    Confirm { message: String, accepted: bool },
    Notify { message: String },
}

#[derive(Debug, Default)]
struct ScriptedState {
    answers: VecDeque<bool>,
    log: Vec<PromptRecord>,
}

/// Test prompt with queued confirm answers and a log of everything shown.
/// Clones share state, so a test can keep a handle while the page owns
/// another.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompt {
    state: Rc<RefCell<ScriptedState>>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the answer for the next unanswered confirm. When the queue
    /// runs dry, confirms are accepted.
    pub fn push_answer(&self, accept: bool) {
        self.state.borrow_mut().answers.push_back(accept);
    }

    pub fn log(&self) -> Vec<PromptRecord> {
        self.state.borrow().log.clone()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.state
            .borrow()
            .log
            .iter()
            .filter_map(|record| match record {
                PromptRecord::Notify { message } => Some(message.clone()),
                PromptRecord::Confirm { .. } => None,
            })
            .collect()
    }
}

impl UserPrompt for ScriptedPrompt {
    fn confirm(&mut self, message: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let accepted = state.answers.pop_front().unwrap_or(true);
        state.log.push(PromptRecord::Confirm {
            message: message.to_string(),
            accepted,
        });
        accepted
    }

    fn notify(&mut self, message: &str) {
        self.state.borrow_mut().log.push(PromptRecord::Notify {
            message: message.to_string(),
        });
    }
}
