use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::oneshot::{self, Receiver};
use wasm_bindgen::prelude::Closure;

/// Captures the result of the first invocation of a wrapped JS callback.
///
/// Used for `onupgradeneeded`, whose outcome has to be inspected after the open request
/// itself has settled.
pub struct CBRace<T: 'static> {
    sender: Rc<RefCell<Option<oneshot::Sender<T>>>>,
    receiver: Receiver<T>,
}

impl<T: 'static> CBRace<T> {
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self { sender: Rc::new(RefCell::new(Some(sender))), receiver }
    }

    /// Wrap a closure so its first result is kept; later invocations still run but are discarded.
    pub fn wrap<Args>(&self, f: impl Fn(Args) -> T + 'static) -> Closure<dyn FnMut(Args)>
    where Args: wasm_bindgen::convert::FromWasmAbi + 'static {
        let sender = self.sender.clone();
        Closure::wrap(Box::new(move |args| {
            let result = f(args);
            if let Some(sender) = sender.borrow_mut().take() {
                let _ = sender.send(result);
            }
        }))
    }
}

impl<E> CBRace<Result<(), E>> {
    /// The callback's error, if it ran and failed. Not having run at all counts as success.
    pub fn take_err(mut self) -> Result<(), E> {
        match self.receiver.try_recv() {
            Ok(Some(result)) => result,
            Ok(None) | Err(_) => Ok(()),
        }
    }
}
