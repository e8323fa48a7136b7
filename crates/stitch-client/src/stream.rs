//! Authenticated server-sent event streams

use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use transport::{Event, EventStream};

use crate::error::{Error, Result};
use crate::service_error::classify_event_data;

/// Events from an authenticated stream.
///
/// An `error` event ends up as `Err(Error::Service)` carrying the envelope
/// the server sent; a broken connection is `Err(Error::Transport)`.
pub type ClientEventStream = Pin<Box<dyn Stream<Item = Result<Event>> + Send>>;

pub(crate) fn into_client_stream(events: EventStream) -> ClientEventStream {
    events
        .map(|item| match item {
            Ok(event) if event.event == "error" => Err(classify_event_data(&event.data)),
            Ok(event) => Ok(event),
            Err(e) => Err(Error::Transport(e)),
        })
        .boxed()
}
