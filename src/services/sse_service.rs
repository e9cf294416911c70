use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::{
        session::SessionView,
        sse::{Handshake, ServerEvent, SessionUpdatedEvent},
    },
    services::sse_events::{EVENT_HANDSHAKE, EVENT_SESSION_UPDATED},
    state::SharedState,
};

/// A new subscription plus the events only this subscriber should see first.
pub struct Subscription {
    receiver: broadcast::Receiver<ServerEvent>,
    greeting: Vec<ServerEvent>,
}

/// Subscribe to the session stream and prepare the handshake and current snapshot.
///
/// The receiver is registered before the snapshot is taken so no change can fall in between.
pub async fn subscribe_session(state: &SharedState) -> Subscription {
    let receiver = state.events().subscribe();
    let view = state.read_session(SessionView::build).await;

    let handshake = Handshake {
        stream: "session".to_string(),
        message: "session stream connected".to_string(),
        degraded: state.is_degraded(),
    };
    let greeting = [
        ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &handshake),
        ServerEvent::json(
            Some(EVENT_SESSION_UPDATED.to_string()),
            &SessionUpdatedEvent { session: view },
        ),
    ]
    .into_iter()
    .filter_map(|event| {
        event
            .inspect_err(|err| warn!(error = %err, "failed to serialize SSE greeting"))
            .ok()
    })
    .collect();

    Subscription { receiver, greeting }
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Convert a subscription into an SSE response, forwarding events until the client leaves.
pub fn to_sse_stream(
    subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Subscription {
        mut receiver,
        greeting,
    } = subscription;
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        for payload in greeting {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // The next session.updated carries the full state anyway.
                            warn!(skipped, "session SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!("Session SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
