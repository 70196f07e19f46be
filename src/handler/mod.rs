//! Routes the five site-interaction hooks to Dub lead/sale tracking.
//!
//! Handling is split into [`Dispatcher::prepare`], which resolves identity,
//! writes cookies and normalizes the payload synchronously, and
//! [`Dispatcher::deliver`], which performs the outbound call inside its own
//! error boundary. Entry points can run `deliver` detached so the response
//! carrying the cookie writes is not held up by the Dub API.

use tracing::{debug, error, info};

use crate::client::EventClient;
use crate::config::CookieNames;
use crate::dub::{TrackKind, TrackSender};
use crate::event::{EventKind, McEvent};
use crate::identity::resolve_identity;
use crate::normalize::{build_lead_record, build_sale_record, LeadRecord, SaleRecord};

/// Event name forced onto pageview leads.
pub const PAGEVIEW_EVENT: &str = "Pageview";

/// What handling an event asked of the Dub API.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackCall {
    Lead(LeadRecord),
    Sale(SaleRecord),
}

impl TrackCall {
    pub fn kind(&self) -> TrackKind {
        match self {
            TrackCall::Lead(_) => TrackKind::Lead,
            TrackCall::Sale(_) => TrackKind::Sale,
        }
    }
}

/// Action taken for an event, reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Lead,
    Sale,
    Identify,
    None,
}

impl Action {
    pub fn for_call(call: Option<&TrackCall>, kind: EventKind) -> Self {
        match (call, kind) {
            (Some(TrackCall::Lead(_)), _) => Action::Lead,
            (Some(TrackCall::Sale(_)), _) => Action::Sale,
            (None, EventKind::Identify) => Action::Identify,
            (None, _) => Action::None,
        }
    }
}

/// Outcome of delivering a [`TrackCall`]. Failures are already logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent(TrackKind),
    Failed(TrackKind),
}

#[derive(Debug, serde::Serialize)]
pub struct HandleResponse {
    pub status: &'static str,
    pub action: Action,
}

impl HandleResponse {
    pub fn accepted(action: Action) -> Self {
        Self {
            status: "accepted",
            action,
        }
    }
}

/// Per-process event dispatcher, owning the tracking client and cookie names.
pub struct Dispatcher<S> {
    sender: S,
    cookies: CookieNames,
}

impl<S: TrackSender> Dispatcher<S> {
    pub fn new(sender: S, cookies: CookieNames) -> Self {
        Self { sender, cookies }
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn cookie_names(&self) -> &CookieNames {
        &self.cookies
    }

    /// Resolve identity and build the outbound record for an event.
    ///
    /// Returns `None` when the event needs no API call (`identify`).
    pub fn prepare<C: EventClient + ?Sized>(
        &self,
        kind: EventKind,
        event: McEvent,
        client: &mut C,
    ) -> Option<TrackCall> {
        info!(kind = kind.as_str(), "event received");

        match kind {
            EventKind::Pageview => {
                let mut event = event;
                event.payload.event_name = Some(PAGEVIEW_EVENT.to_string());
                Some(self.lead(&event, client))
            }
            EventKind::Event | EventKind::Track => {
                if event.payload.has_revenue() {
                    Some(self.sale(&event, client))
                } else {
                    Some(self.lead(&event, client))
                }
            }
            EventKind::Ecommerce => Some(self.sale(&event, client)),
            EventKind::Identify => {
                match event.payload.supplied_customer_id() {
                    Some(customer_id) => {
                        let session = resolve_identity(client, &self.cookies, Some(customer_id));
                        debug!(session_id = %session.session_id, "identify stored customer");
                    }
                    None => debug!("identify without customer id ignored"),
                }
                None
            }
        }
    }

    fn lead<C: EventClient + ?Sized>(&self, event: &McEvent, client: &mut C) -> TrackCall {
        TrackCall::Lead(build_lead_record(event, client, &self.cookies))
    }

    fn sale<C: EventClient + ?Sized>(&self, event: &McEvent, client: &mut C) -> TrackCall {
        TrackCall::Sale(build_sale_record(event, client, &self.cookies))
    }

    /// Send a prepared call. Errors are logged and never propagated.
    #[tracing::instrument(name = "deliver", skip(self, call), fields(track = call.kind().as_str()))]
    pub async fn deliver(&self, kind: EventKind, call: TrackCall) -> Delivery {
        let track = call.kind();
        let result = match &call {
            TrackCall::Lead(record) => self.sender.track_lead(record).await,
            TrackCall::Sale(record) => self.sender.track_sale(record).await,
        };

        match result {
            Ok(()) => {
                debug!(kind = kind.as_str(), "tracked");
                Delivery::Sent(track)
            }
            Err(e) => {
                error!(error = %e, kind = kind.as_str(), "failed to track {} event", kind);
                Delivery::Failed(track)
            }
        }
    }

    /// Prepare and deliver in one step.
    pub async fn dispatch<C: EventClient + ?Sized>(
        &self,
        kind: EventKind,
        event: McEvent,
        client: &mut C,
    ) -> Option<Delivery> {
        let call = self.prepare(kind, event, client)?;
        Some(self.deliver(kind, call).await)
    }
}
