use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::FutureExt;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{Event, EventTarget};

/// Resolves when the first of a set of DOM events fires on a target.
///
/// `Ok(())` for a success event, `Err(Some(event))` for an error event. `Err(None)` only
/// happens if the listeners could not be registered at all.
pub struct CBFuture {
    receiver: oneshot::Receiver<Result<(), Option<Event>>>,
    registrations: Vec<(&'static str, Closure<dyn FnMut(Event)>, EventTarget)>,
}

// SAFETY: wasm32 without threads has a single execution context, so the JS handles held
// here are never touched from two threads.
unsafe impl Send for CBFuture {}

#[derive(Clone)]
pub enum EventNames {
    Single(Option<&'static str>),
    Multiple(std::slice::Iter<'static, &'static str>),
}

impl Iterator for EventNames {
    type Item = &'static str;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            EventNames::Single(name) => name.take(),
            EventNames::Multiple(names) => names.next().copied(),
        }
    }
}

impl From<&'static str> for EventNames {
    fn from(event: &'static str) -> Self { Self::Single(Some(event)) }
}

impl<const N: usize> From<&'static [&'static str; N]> for EventNames {
    fn from(events: &'static [&'static str; N]) -> Self { Self::Multiple(events.iter()) }
}

impl CBFuture {
    pub fn new<T: AsRef<EventTarget>, S: Into<EventNames>, E: Into<EventNames>>(target: T, success_events: S, error_events: E) -> Self {
        let (sender, receiver) = oneshot::channel();
        let sender = Rc::new(RefCell::new(Some(sender)));
        let target = target.as_ref();
        let mut this = Self { receiver, registrations: Vec::new() };

        for event_name in success_events.into() {
            let sender = sender.clone();
            this.listen(target, event_name, move |_event| {
                if let Some(sender) = sender.borrow_mut().take() {
                    let _ = sender.send(Ok(()));
                }
            });
        }
        for event_name in error_events.into() {
            let sender = sender.clone();
            this.listen(target, event_name, move |event| {
                debug!("settled by {} event", event.type_());
                if let Some(sender) = sender.borrow_mut().take() {
                    let _ = sender.send(Err(Some(event)));
                }
            });
        }

        if this.registrations.is_empty() {
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(Err(None));
            }
        }
        this
    }

    fn listen(&mut self, target: &EventTarget, event_name: &'static str, callback: impl FnMut(Event) + 'static) {
        let callback = Closure::wrap(Box::new(callback) as Box<dyn FnMut(Event)>);
        match target.add_event_listener_with_callback(event_name, callback.as_ref().unchecked_ref()) {
            Ok(()) => self.registrations.push((event_name, callback, target.clone())),
            Err(e) => warn!("could not listen for {}: {}", event_name, crate::error::extract_message(e)),
        }
    }
}

impl Future for CBFuture {
    type Output = Result<(), Option<Event>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // the senders live in our own registrations, so the channel cannot be cancelled while we are polled
        self.receiver.poll_unpin(cx).map(|r| r.unwrap_or(Err(None)))
    }
}

impl Drop for CBFuture {
    fn drop(&mut self) {
        for (event_name, callback, target) in &self.registrations {
            let _ = target.remove_event_listener_with_callback(event_name, callback.as_ref().unchecked_ref());
        }
    }
}
