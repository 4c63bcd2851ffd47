//! Selected-date state machine.
//!
//! Every date change issues a [`FetchTicket`] with a fresh request id. Only the
//! ticket from the most recent change may move the state; responses to older
//! tickets are reported as [`Step::Stale`] and ignored.

use chrono::NaiveDate;
use tracing::debug;

use crate::calendar;
use crate::error::ApiFailure;
use crate::model::HistoryDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Loading,
    Displaying,
    NoData,
    AuthRetry,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub date: NaiveDate,
}

/// What the driver must do after a response was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Display(HistoryDay),
    NoData,
    /// Sign in silently, then fetch the same ticket once more.
    SignInAndRetry,
    Failed(ApiFailure),
    Stale,
}

pub struct HistoryController {
    selected: NaiveDate,
    state: ViewState,
    day: Option<HistoryDay>,
    retry_allowed: bool,
    latest_request: u64,
}

impl HistoryController {
    pub fn new(selected: NaiveDate) -> Self {
        Self {
            selected,
            state: ViewState::Idle,
            day: None,
            retry_allowed: true,
            latest_request: 0,
        }
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn day(&self) -> Option<&HistoryDay> {
        self.day.as_ref()
    }

    pub fn retry_allowed(&self) -> bool {
        self.retry_allowed
    }

    /// Select `date` and start loading it.
    pub fn set_date(&mut self, date: NaiveDate) -> FetchTicket {
        self.selected = date;
        self.state = ViewState::Loading;
        // Each flow gets its own re-authentication permit.
        self.retry_allowed = true;
        self.latest_request += 1;
        FetchTicket {
            id: self.latest_request,
            date,
        }
    }

    /// Reload the selected date.
    pub fn reload(&mut self) -> FetchTicket {
        self.set_date(self.selected)
    }

    pub fn advance(&mut self) -> FetchTicket {
        self.set_date(calendar::next_day(self.selected))
    }

    pub fn retreat(&mut self) -> FetchTicket {
        self.set_date(calendar::previous_day(self.selected))
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.id == self.latest_request
    }

    pub fn resolve(
        &mut self,
        ticket: FetchTicket,
        outcome: Result<HistoryDay, ApiFailure>,
    ) -> Step {
        if !self.is_current(&ticket) {
            debug!(
                "Dropping response for {} (request {}, latest {})",
                ticket.date, ticket.id, self.latest_request
            );
            return Step::Stale;
        }

        match outcome {
            Ok(day) => {
                self.retry_allowed = true;
                self.state = ViewState::Displaying;
                self.day = Some(day.clone());
                Step::Display(day)
            }
            Err(ApiFailure::NoData) => {
                self.retry_allowed = true;
                self.state = ViewState::NoData;
                self.day = None;
                Step::NoData
            }
            Err(ApiFailure::AuthExpired) if self.retry_allowed => {
                self.retry_allowed = false;
                self.state = ViewState::AuthRetry;
                Step::SignInAndRetry
            }
            Err(failure) => {
                self.retry_allowed = true;
                self.state = ViewState::Error;
                self.day = None;
                Step::Failed(failure)
            }
        }
    }
}
