//! The page behaviors of the parking application's check-in and
//! reservation screens, expressed as an explicit binding table plus a
//! handful of page-ready actions. Handlers are stateless; everything they
//! read or write lives in the DOM.

use log::debug;

use crate::datetime::{format_local, next_full_hour, parse_local, plus_one_hour};
use crate::page::{EventState, Page};
use crate::selector::Selector;
use crate::Result;

/// Dismissible alerts close themselves this long after page load.
pub const ALERT_DISMISS_DELAY_MS: i64 = 5000;

/// Confirmation text used when `data-confirm` is empty or absent.
pub const DEFAULT_CONFIRM_MESSAGE: &str = "Are you sure you want to proceed?";

/// Shown when the check-in form is submitted without a plate number.
pub const PLATE_REQUIRED_MESSAGE: &str = "Please enter a license plate number";

/// Shown when the reservation interval is empty or inverted.
pub const END_AFTER_START_MESSAGE: &str = "End time must be after start time";

const START_TIME_ID: &str = "startTime";
const END_TIME_ID: &str = "endTime";
const PLATE_SELECTOR: &str = r#"input[name="licensePlate"]"#;

/// One event-driven behavior. The table of these is the whole wiring of
/// the controller, so tests can check it for completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorAction {
    /// On `change` of the start input: default the end input to one hour
    /// later.
    DefaultEndTime,
    /// On `click` of an element with `data-confirm`: ask before letting
    /// the default action proceed.
    ConfirmDestructive,
    /// On `input` of a license-plate field: uppercase the value in place.
    UppercasePlate,
    /// On `submit` of the check-in form: require a non-blank plate.
    GuardCheckin,
    /// On `submit` of the reservation form: require end after start.
    GuardReservation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub selector: &'static str,
    pub event: &'static str,
    pub action: BehaviorAction,
}

const BINDINGS: [Binding; 5] = [
    Binding {
        selector: "#startTime",
        event: "change",
        action: BehaviorAction::DefaultEndTime,
    },
    Binding {
        selector: "button[data-confirm], a[data-confirm]",
        event: "click",
        action: BehaviorAction::ConfirmDestructive,
    },
    Binding {
        selector: PLATE_SELECTOR,
        event: "input",
        action: BehaviorAction::UppercasePlate,
    },
    Binding {
        selector: r#"form[action*="/checkin"]"#,
        event: "submit",
        action: BehaviorAction::GuardCheckin,
    },
    Binding {
        selector: r#"form[action*="/reserve"]"#,
        event: "submit",
        action: BehaviorAction::GuardReservation,
    },
];

pub struct FormBehaviorController;

impl FormBehaviorController {
    /// The `{selector, event, action}` wiring table, registered once per
    /// matching element by [`install`](Self::install).
    pub fn bindings() -> &'static [Binding] {
        &BINDINGS
    }

    /// Wires every behavior into `page`, then performs the page-ready
    /// work: default the start time to the next full hour, schedule the
    /// alert auto-dismiss timers, and fire one synthetic `change` so the
    /// end time is populated before the user touches anything. Each piece
    /// is a silent no-op when its element is absent.
    pub fn install(page: &mut Page) -> Result<()> {
        for binding in Self::bindings() {
            let selector = Selector::parse(binding.selector)?;
            for node in selector.query_all(page.dom()) {
                page.add_listener(node, binding.event, binding.action);
            }
        }

        if let Some(start) = page.dom().get_element_by_id(START_TIME_ID) {
            let default_start = next_full_hour(page.now_local());
            page.set_node_value(start, &format_local(default_start))?;
        }

        for alert in Selector::parse(".alert-dismissible")?.query_all(page.dom()) {
            page.schedule_dismiss(alert, ALERT_DISMISS_DELAY_MS);
        }

        // Strictly after listener registration, so DefaultEndTime runs.
        if let Some(start) = page.dom().get_element_by_id(START_TIME_ID) {
            page.dispatch_node(start, "change")?;
        }

        Ok(())
    }
}

/// Runs one behavior against the event's current target.
pub(crate) fn run(action: &BehaviorAction, page: &mut Page, event: &mut EventState) -> Result<()> {
    match action {
        BehaviorAction::DefaultEndTime => default_end_time(page, event),
        BehaviorAction::ConfirmDestructive => confirm_destructive(page, event),
        BehaviorAction::UppercasePlate => uppercase_plate(page, event),
        BehaviorAction::GuardCheckin => guard_checkin(page, event),
        BehaviorAction::GuardReservation => guard_reservation(page, event),
    }
}

fn default_end_time(page: &mut Page, event: &EventState) -> Result<()> {
    let Some(end) = page.dom().get_element_by_id(END_TIME_ID) else {
        return Ok(());
    };
    let raw = page.dom().value(event.current_target)?;
    let Some(start) = parse_local(&raw) else {
        // Unparseable start: leave the end field untouched.
        debug!("start time {raw:?} did not parse, end time unchanged");
        return Ok(());
    };
    page.set_node_value(end, &format_local(plus_one_hour(start)))
}

fn confirm_destructive(page: &mut Page, event: &mut EventState) -> Result<()> {
    let message = page
        .dom()
        .attr(event.current_target, "data-confirm")
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIRM_MESSAGE.to_string());
    if !page.confirm(&message) {
        event.prevent_default();
    }
    Ok(())
}

fn uppercase_plate(page: &mut Page, event: &EventState) -> Result<()> {
    let value = page.dom().value(event.current_target)?;
    page.set_node_value(event.current_target, &value.to_uppercase())
}

fn guard_checkin(page: &mut Page, event: &mut EventState) -> Result<()> {
    let form = event.current_target;
    let Some(plate) = Selector::parse(PLATE_SELECTOR)?.query_within(page.dom(), form) else {
        return Ok(());
    };
    if page.dom().value(plate)?.trim().is_empty() {
        page.notify(PLATE_REQUIRED_MESSAGE);
        event.prevent_default();
    }
    Ok(())
}

fn guard_reservation(page: &mut Page, event: &mut EventState) -> Result<()> {
    let field_value = |id: &str| {
        page.dom()
            .get_element_by_id(id)
            .and_then(|node| page.dom().value(node).ok())
            .and_then(|raw| parse_local(&raw))
    };
    let interval_valid = match (field_value(START_TIME_ID), field_value(END_TIME_ID)) {
        (Some(start), Some(end)) => end > start,
        // Missing or unparseable bounds never form a valid interval.
        _ => false,
    };
    if !interval_valid {
        page.notify(END_AFTER_START_MESSAGE);
        event.prevent_default();
    }
    Ok(())
}
