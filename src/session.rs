//! Drives the history controller against the backend, the map and the page.
//!
//! No `RefCell` borrow is held across an `.await`, so a click that starts a
//! new date change while a fetch is pending never panics; the older response
//! is simply dropped as stale.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::controller::{FetchTicket, HistoryController, Step, ViewState};
use crate::endpoints::{Backend, EndpointClient};
use crate::overlay::{MapSurface, OverlayManager};
use crate::timefmt::HourFormat;

pub const NO_DATA_MESSAGE: &str = "No location data for date";
pub const API_ERROR_MESSAGE: &str = "API Access Error";
pub const NO_ACCESS_MESSAGE: &str = "No API Access";

/// The page elements the session drives: busy indicator, banner and date header.
pub trait StatusSurface {
    fn show_busy(&self);
    fn hide_busy(&self);
    fn show_message(&self, text: &str);
    fn hide_message(&self);
    fn show_date(&self, date: NaiveDate);
}

pub struct HistorySession<B: Backend, M: MapSurface, S: StatusSurface> {
    client: Rc<EndpointClient<B>>,
    controller: RefCell<HistoryController>,
    overlays: RefCell<OverlayManager<M>>,
    status: S,
}

impl<B: Backend, M: MapSurface, S: StatusSurface> HistorySession<B, M, S> {
    pub fn new(
        client: Rc<EndpointClient<B>>,
        overlays: OverlayManager<M>,
        status: S,
        initial: NaiveDate,
    ) -> Self {
        Self {
            client,
            controller: RefCell::new(HistoryController::new(initial)),
            overlays: RefCell::new(overlays),
            status,
        }
    }

    pub fn client(&self) -> &EndpointClient<B> {
        &self.client
    }

    pub fn status(&self) -> &S {
        &self.status
    }

    pub fn controller(&self) -> Ref<'_, HistoryController> {
        self.controller.borrow()
    }

    pub fn overlays(&self) -> Ref<'_, OverlayManager<M>> {
        self.overlays.borrow()
    }

    pub fn selected(&self) -> NaiveDate {
        self.controller.borrow().selected()
    }

    pub fn state(&self) -> ViewState {
        self.controller.borrow().state()
    }

    pub async fn show(&self, date: NaiveDate) -> ViewState {
        let ticket = self.controller.borrow_mut().set_date(date);
        self.run(ticket).await
    }

    pub async fn refresh(&self) -> ViewState {
        let ticket = self.controller.borrow_mut().reload();
        self.run(ticket).await
    }

    pub async fn advance(&self) -> ViewState {
        let ticket = self.controller.borrow_mut().advance();
        self.run(ticket).await
    }

    pub async fn retreat(&self) -> ViewState {
        let ticket = self.controller.borrow_mut().retreat();
        self.run(ticket).await
    }

    /// Marker click handler.
    pub fn select_point(&self, index: usize) -> bool {
        self.overlays.borrow_mut().select_point(index).is_some()
    }

    pub fn set_hour_format(&self, format: HourFormat) {
        self.overlays.borrow_mut().set_hour_format(format);
    }

    async fn run(&self, ticket: FetchTicket) -> ViewState {
        self.status.hide_message();
        self.status.show_busy();
        self.status.show_date(ticket.date);
        debug!("Loading history for {} (request {})", ticket.date, ticket.id);

        loop {
            let outcome = self.client.fetch_history(ticket.date).await;
            let step = self.controller.borrow_mut().resolve(ticket, outcome);

            match step {
                Step::Stale => {}
                Step::SignInAndRetry => {
                    info!("Access token expired; refreshing silently");
                    if let Err(e) = self.client.sign_in(true).await {
                        warn!("Silent token refresh failed: {}", e);
                    }
                    continue;
                }
                Step::Display(day) => {
                    let drawn = self.overlays.borrow_mut().render(&day);
                    info!("Showing {} locations for {}", drawn, day.date);
                    self.status.hide_busy();
                }
                Step::NoData => {
                    self.overlays.borrow_mut().dispose();
                    self.status.show_message(NO_DATA_MESSAGE);
                    self.status.hide_busy();
                }
                Step::Failed(failure) => {
                    warn!("History fetch for {} failed: {}", ticket.date, failure);
                    self.overlays.borrow_mut().dispose();
                    self.status.show_message(API_ERROR_MESSAGE);
                    self.status.hide_busy();
                }
            }
            return self.state();
        }
    }
}
