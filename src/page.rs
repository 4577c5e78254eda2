use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use log::{debug, trace};

use crate::behavior::{self, BehaviorAction};
use crate::dom::{Dom, NodeId};
use crate::html::parse_html;
use crate::prompt::{AcceptAll, UserPrompt};
use crate::schedule::{ScheduledAction, TimerQueue};
use crate::selector::Selector;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<BehaviorAction>>>,
}

impl ListenerStore {
    fn add(&mut self, node_id: NodeId, event: String, action: BehaviorAction) {
        self.map
            .entry(node_id)
            .or_default()
            .entry(event)
            .or_default()
            .push(action);
    }

    fn get(&self, node_id: NodeId, event: &str) -> Vec<BehaviorAction> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EventState {
    pub(crate) event_type: String,
    pub(crate) target: NodeId,
    pub(crate) current_target: NodeId,
    pub(crate) default_prevented: bool,
}

impl EventState {
    fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            default_prevented: false,
        }
    }

    pub(crate) fn prevent_default(&mut self) {
        self.default_prevented = true;
    }
}

/// A form submission the page would have sent to the server, captured at
/// the moment the unprevented `submit` event completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSubmission {
    pub action: String,
    pub method: String,
    pub data: Vec<(String, String)>,
}

/// A navigation the page would have performed, from an unprevented click
/// on an anchor with an `href`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub href: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
}

/// A loaded page: parsed DOM, registered behaviors, a virtual clock, and
/// records of every boundary crossing (submission, navigation, prompt).
/// All interaction goes through the methods here, the way a user would
/// drive the real page.
pub struct Page {
    dom: Dom,
    listeners: ListenerStore,
    timers: TimerQueue,
    prompt: Box<dyn UserPrompt>,
    loaded_at: NaiveDateTime,
    timer_step_limit: usize,
    submissions: Vec<FormSubmission>,
    navigations: Vec<Navigation>,
}

impl Page {
    /// Parses `html` into a page whose local wall clock reads `loaded_at`
    /// at virtual time zero.
    pub fn from_html(html: &str, loaded_at: NaiveDateTime) -> Result<Self> {
        Ok(Self {
            dom: parse_html(html)?,
            listeners: ListenerStore::default(),
            timers: TimerQueue::new(),
            prompt: Box::new(AcceptAll),
            loaded_at,
            timer_step_limit: 10_000,
            submissions: Vec::new(),
            navigations: Vec::new(),
        })
    }

    pub fn set_prompt(&mut self, prompt: Box<dyn UserPrompt>) {
        self.prompt = prompt;
    }

    /// The page's local wall clock: load time plus elapsed virtual time.
    pub fn now_local(&self) -> NaiveDateTime {
        self.loaded_at + Duration::milliseconds(self.timers.now_ms())
    }

    pub fn now_ms(&self) -> i64 {
        self.timers.now_ms()
    }

    /// Moves the virtual clock forward and runs every timer that came due,
    /// in `(due_at, scheduling)` order.
    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Page(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        self.timers.advance_clock(delta_ms);
        let mut steps = 0usize;
        while let Some(task) = self.timers.take_next_due() {
            steps += 1;
            if steps > self.timer_step_limit {
                return Err(Error::Page(format!(
                    "timer flush exceeded {} steps at now_ms={}",
                    self.timer_step_limit,
                    self.timers.now_ms()
                )));
            }
            debug!("timer run id={} due_at={}", task.id, task.due_at);
            self.run_scheduled(task.action)?;
        }
        Ok(())
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.timers
            .pending()
            .into_iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
            })
            .collect()
    }

    pub fn clear_all_timers(&mut self) -> usize {
        self.timers.clear_all()
    }

    /// Replaces the control's value and fires `input`, like typing does.
    /// Disabled and readonly controls swallow the interaction.
    pub fn type_text(&mut self, selector: &str, text: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) || self.dom.readonly(target) {
            return Ok(());
        }

        let tag = self
            .dom
            .tag_name(target)
            .unwrap_or_default()
            .to_ascii_lowercase();
        if tag != "input" && tag != "textarea" {
            return Err(Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "input or textarea".into(),
                actual: tag,
            });
        }

        self.dom.set_value(target, text)?;
        self.dispatch_node(target, "input")?;
        Ok(())
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.click_node(target)
    }

    /// Submits the form matched by `selector`, or the form owning the
    /// matched element.
    pub fn submit(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let Some(form) = self.form_owner(target) else {
            return Ok(());
        };
        self.submit_form(form)
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        self.dispatch_node(target, event)?;
        Ok(())
    }

    pub fn value_of(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn submissions(&self) -> &[FormSubmission] {
        &self.submissions
    }

    pub fn navigations(&self) -> &[Navigation] {
        &self.navigations
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.dom.dump_node(target),
            });
        }
        Ok(())
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target).trim().to_string();
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.dom.dump_node(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_absent(&self, selector: &str) -> Result<()> {
        match Selector::parse(selector)?.query(&self.dom) {
            None => Ok(()),
            Some(node) => Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: "no match".into(),
                actual: "a match".into(),
                dom_snippet: self.dom.dump_node(node),
            }),
        }
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        Selector::parse(selector)?
            .query(&self.dom)
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    // ---- crate-internal surface used by the behavior controller ----

    pub(crate) fn dom(&self) -> &Dom {
        &self.dom
    }

    pub(crate) fn set_node_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.dom.set_value(node, value)
    }

    pub(crate) fn add_listener(&mut self, node: NodeId, event: &str, action: BehaviorAction) {
        trace!("listener add node={node:?} event={event} action={action:?}");
        self.listeners.add(node, event.to_string(), action);
    }

    pub(crate) fn schedule_dismiss(&mut self, alert: NodeId, delay_ms: i64) -> i64 {
        self.timers
            .schedule(ScheduledAction::DismissAlert(alert), delay_ms)
    }

    pub(crate) fn confirm(&mut self, message: &str) -> bool {
        self.prompt.confirm(message)
    }

    pub(crate) fn notify(&mut self, message: &str) {
        self.prompt.notify(message);
    }

    pub(crate) fn dispatch_node(&mut self, target: NodeId, event_type: &str) -> Result<EventState> {
        let mut event = EventState::new(event_type, target);

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }

        // Target phase, then bubble through the ancestor path. No behavior
        // stops propagation or registers capture listeners, so neither is
        // modeled.
        for node in path {
            event.current_target = node;
            self.invoke_listeners(node, &mut event)?;
        }

        debug!(
            "event {} target={:?} default_prevented={}",
            event.event_type, event.target, event.default_prevented
        );
        Ok(event)
    }

    fn invoke_listeners(&mut self, node: NodeId, event: &mut EventState) -> Result<()> {
        for action in self.listeners.get(node, &event.event_type) {
            trace!("listener run node={:?} action={action:?}", node);
            behavior::run(&action, self, event)?;
        }
        Ok(())
    }

    fn click_node(&mut self, target: NodeId) -> Result<()> {
        if self.dom.disabled(target) {
            return Ok(());
        }

        let click = self.dispatch_node(target, "click")?;
        if click.default_prevented {
            return Ok(());
        }

        // Built-in click defaults, in precedence order: alert close
        // controls dismiss their alert, anchors navigate, submit controls
        // submit their form.
        if self.dom.has_class(target, "btn-close") {
            if let Some(alert) = self.find_ancestor_with_class(target, "alert-dismissible") {
                debug!("alert dismissed node={:?}", alert);
                self.dom.remove_subtree(alert);
            }
            return Ok(());
        }

        if self.dom.tag_name(target) == Some("a") {
            if let Some(href) = self.dom.attr(target, "href") {
                self.navigations.push(Navigation { href });
            }
            return Ok(());
        }

        if self.is_submit_control(target) {
            if let Some(form) = self.form_owner(target) {
                self.submit_form(form)?;
            }
        }

        Ok(())
    }

    fn submit_form(&mut self, form: NodeId) -> Result<()> {
        let submit = self.dispatch_node(form, "submit")?;
        if submit.default_prevented {
            return Ok(());
        }
        let submission = FormSubmission {
            action: self.dom.attr(form, "action").unwrap_or_default(),
            method: self
                .dom
                .attr(form, "method")
                .unwrap_or_else(|| "get".into())
                .to_ascii_lowercase(),
            data: self.form_data_entries(form)?,
        };
        debug!("form submitted action={}", submission.action);
        self.submissions.push(submission);
        Ok(())
    }

    /// Name/value pairs of the form's successful controls, in document
    /// order.
    fn form_data_entries(&self, form: NodeId) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        for control in self.dom.element_nodes_within(form) {
            let tag = self
                .dom
                .tag_name(control)
                .unwrap_or_default()
                .to_ascii_lowercase();
            if !matches!(tag.as_str(), "input" | "textarea" | "select") {
                continue;
            }
            if self.dom.disabled(control) {
                continue;
            }
            let name = self.dom.attr(control, "name").unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            if tag == "input" {
                let kind = self
                    .dom
                    .attr(control, "type")
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                if matches!(kind.as_str(), "button" | "submit" | "reset" | "file" | "image") {
                    continue;
                }
                // Only checked boxes are successful; checkedness is the
                // markup attribute, the harness does not toggle it.
                if matches!(kind.as_str(), "checkbox" | "radio")
                    && self.dom.attr(control, "checked").is_none()
                {
                    continue;
                }
            }
            out.push((name, self.dom.value(control)?));
        }
        Ok(out)
    }

    fn run_scheduled(&mut self, action: ScheduledAction) -> Result<()> {
        match action {
            ScheduledAction::DismissAlert(alert) => {
                // The timer is never cleared; firing after the alert was
                // removed by other means is a no-op.
                if !self.dom.is_attached(alert) {
                    return Ok(());
                }
                let close = Selector::parse(".btn-close")?.query_within(&self.dom, alert);
                if let Some(close) = close {
                    self.click_node(close)?;
                }
                Ok(())
            }
        }
    }

    fn is_submit_control(&self, node: NodeId) -> bool {
        let Some(tag) = self.dom.tag_name(node) else {
            return false;
        };
        if tag.eq_ignore_ascii_case("button") {
            return self
                .dom
                .attr(node, "type")
                .map(|kind| kind.eq_ignore_ascii_case("submit"))
                .unwrap_or(true);
        }
        if tag.eq_ignore_ascii_case("input") {
            return self
                .dom
                .attr(node, "type")
                .map(|kind| {
                    kind.eq_ignore_ascii_case("submit") || kind.eq_ignore_ascii_case("image")
                })
                .unwrap_or(false);
        }
        false
    }

    fn form_owner(&self, node: NodeId) -> Option<NodeId> {
        if self
            .dom
            .tag_name(node)
            .map(|tag| tag.eq_ignore_ascii_case("form"))
            .unwrap_or(false)
        {
            return Some(node);
        }
        self.dom.find_ancestor_by_tag(node, "form")
    }

    fn find_ancestor_with_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        let mut cursor = self.dom.parent(node);
        while let Some(ancestor) = cursor {
            if self.dom.has_class(ancestor, class) {
                return Some(ancestor);
            }
            cursor = self.dom.parent(ancestor);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn loaded_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|date| date.and_hms_opt(9, 0, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn submitting_records_successful_controls_only() -> Result<()> {
        let mut page = Page::from_html(
            r#"
            <form action="/parking/2/checkin" method="POST">
              <input type="text" name="licensePlate" value="XYZ123">
              <input type="hidden" name="reservedFromApp" value="false">
              <input type="text" name="note" disabled value="ignored">
              <input type="checkbox" name="covered">
              <input type="submit" name="go" value="Check in">
            </form>
            "#,
            loaded_at(),
        )?;
        page.submit("form")?;
        assert_eq!(
            page.submissions(),
            &[FormSubmission {
                action: "/parking/2/checkin".into(),
                method: "post".into(),
                data: vec![
                    ("licensePlate".into(), "XYZ123".into()),
                    ("reservedFromApp".into(), "false".into()),
                ],
            }]
        );
        Ok(())
    }

    #[test]
    fn clicking_a_submit_button_submits_the_owning_form() -> Result<()> {
        let mut page = Page::from_html(
            r#"
            <form action="/parking/2/checkin">
              <button>Check in</button>
            </form>
            <button id="outside">elsewhere</button>
            "#,
            loaded_at(),
        )?;
        page.click("#outside")?;
        assert!(page.submissions().is_empty());
        page.click("form button")?;
        assert_eq!(page.submissions().len(), 1);
        Ok(())
    }

    #[test]
    fn clicking_an_anchor_records_a_navigation() -> Result<()> {
        let mut page = Page::from_html(
            r#"<a href="/vehicles/9/delete">remove</a>"#,
            loaded_at(),
        )?;
        page.click("a")?;
        assert_eq!(
            page.navigations(),
            &[Navigation {
                href: "/vehicles/9/delete".into()
            }]
        );
        Ok(())
    }

    #[test]
    fn btn_close_click_removes_the_enclosing_alert() -> Result<()> {
        let mut page = Page::from_html(
            r#"
            <div class="alert alert-dismissible">saved
              <button type="button" class="btn-close"></button>
            </div>
            "#,
            loaded_at(),
        )?;
        page.assert_exists(".alert-dismissible")?;
        page.click(".btn-close")?;
        page.assert_absent(".alert-dismissible")?;
        Ok(())
    }

    #[test]
    fn disabled_controls_swallow_interaction() -> Result<()> {
        let mut page = Page::from_html(
            r#"
            <form action="/parking/2/checkin">
              <input type="text" name="licensePlate" disabled>
              <button disabled>Check in</button>
            </form>
            "#,
            loaded_at(),
        )?;
        page.type_text("input", "abc")?;
        page.assert_value("input", "")?;
        page.click("button")?;
        assert!(page.submissions().is_empty());
        Ok(())
    }

    #[test]
    fn clock_tracks_virtual_time() -> Result<()> {
        let mut page = Page::from_html("<p>empty</p>", loaded_at())?;
        page.advance_time(90_000)?;
        assert_eq!(page.now_ms(), 90_000);
        assert_eq!(
            page.now_local(),
            loaded_at() + Duration::milliseconds(90_000)
        );
        assert!(page.advance_time(-1).is_err());
        Ok(())
    }
}
