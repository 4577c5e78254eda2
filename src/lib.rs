//! Deterministic form-behavior harness for a vehicle parking and
//! reservation UI.
//!
//! The crate models the page-level behaviors of the parking application's
//! check-in and reservation screens — default date-time values, linked
//! end-time defaulting, alert auto-dismiss, destructive-action
//! confirmation, license-plate normalization, and the two client-side
//! submit guards — as native Rust handlers over a lightweight in-memory
//! DOM. Time is virtual, user prompts are an injected capability, and
//! form submissions and navigations are recorded as data, so every
//! behavior is testable without a browser.
//!
//! ```
//! use chrono::NaiveDate;
//! use parking_forms::{FormBehaviorController, Page};
//!
//! # fn main() -> parking_forms::Result<()> {
//! let loaded_at = NaiveDate::from_ymd_opt(2024, 3, 1)
//!     .and_then(|d| d.and_hms_opt(9, 42, 17))
//!     .expect("valid timestamp");
//! let mut page = Page::from_html(
//!     r#"
//!     <form action="/parking/7/reserve" method="post">
//!       <input type="datetime-local" id="startTime" name="startTime">
//!       <input type="datetime-local" id="endTime" name="endTime">
//!       <button type="submit">Reserve</button>
//!     </form>
//!     "#,
//!     loaded_at,
//! )?;
//! FormBehaviorController::install(&mut page)?;
//! page.assert_value("#startTime", "2024-03-01T10:00")?;
//! page.assert_value("#endTime", "2024-03-01T11:00")?;
//! # Ok(())
//! # }
//! ```

use thiserror::Error as ThisError;

mod behavior;
mod datetime;
mod dom;
mod html;
mod page;
mod prompt;
mod schedule;
mod selector;

pub use behavior::{
    Binding, BehaviorAction, FormBehaviorController, ALERT_DISMISS_DELAY_MS,
    DEFAULT_CONFIRM_MESSAGE, END_AFTER_START_MESSAGE, PLATE_REQUIRED_MESSAGE,
};
pub use datetime::{
    format_local, next_full_hour, parse_local, plus_one_hour, LOCAL_DATETIME_FORMAT,
};
pub use page::{FormSubmission, Navigation, Page, PendingTimer};
pub use prompt::{AcceptAll, PromptRecord, ScriptedPrompt, UserPrompt};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("type mismatch for {selector}: expected {expected}, actual {actual}")]
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    #[error("assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}")]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
    #[error("page error: {0}")]
    Page(String),
}
