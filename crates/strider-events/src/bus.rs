use std::panic::{catch_unwind, AssertUnwindSafe};

use futures::future::LocalBoxFuture;
use strider_types::{PlayerState, Position};

/// Events the bot emits over the course of a session.
#[derive(Clone)]
pub enum BotEvent {
    Join(PlayerState),
    Spawn(Position),
    Health { health: f32, food: i32 },
    Death,
    Disconnect(String),
}

/// A registered handler: either a plain synchronous callback, or one that returns a
/// suspended computation to be awaited before the next handler runs.
pub enum Handler {
    Sync(Box<dyn Fn(&BotEvent) + 'static>),
    Async(Box<dyn Fn(&BotEvent) -> LocalBoxFuture<'static, ()> + 'static>),
}

#[derive(Default)]
struct Kind {
    handlers: Vec<Handler>,
}

impl Kind {
    fn push(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }
}

/// Per-event-kind subscriber lists, dispatched in registration order.
#[derive(Default)]
pub struct Listeners {
    join: Kind,
    spawn: Kind,
    health: Kind,
    death: Kind,
    disconnect: Kind,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_join(&mut self, handler: Handler) {
        self.join.push(handler);
    }

    pub fn on_spawn(&mut self, handler: Handler) {
        self.spawn.push(handler);
    }

    pub fn on_health(&mut self, handler: Handler) {
        self.health.push(handler);
    }

    pub fn on_death(&mut self, handler: Handler) {
        self.death.push(handler);
    }

    pub fn on_disconnect(&mut self, handler: Handler) {
        self.disconnect.push(handler);
    }

    fn kind_for(&self, event: &BotEvent) -> &Kind {
        match event {
            BotEvent::Join(_) => &self.join,
            BotEvent::Spawn(_) => &self.spawn,
            BotEvent::Health { .. } => &self.health,
            BotEvent::Death => &self.death,
            BotEvent::Disconnect(_) => &self.disconnect,
        }
    }

    /// Dispatch `event` to every handler registered for its kind, in registration
    /// order. A handler that panics is caught and logged; later handlers still run.
    pub async fn emit(&self, event: BotEvent) {
        for handler in &self.kind_for(&event).handlers {
            match handler {
                Handler::Sync(f) => {
                    let result = catch_unwind(AssertUnwindSafe(|| f(&event)));
                    if let Err(payload) = result {
                        tracing::error!("event handler panicked: {}", panic_message(&payload));
                    }
                }
                Handler::Async(f) => {
                    let fut = f(&event);
                    fut.await;
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::new();

        let o1 = order.clone();
        listeners.on_join(Handler::Sync(Box::new(move |_| o1.borrow_mut().push(1))));
        let o2 = order.clone();
        listeners.on_join(Handler::Sync(Box::new(move |_| o2.borrow_mut().push(2))));

        listeners
            .emit(BotEvent::Join(PlayerState::default()))
            .await;

        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_block_later_handlers() {
        let ran = Rc::new(RefCell::new(false));
        let mut listeners = Listeners::new();

        listeners.on_death(Handler::Sync(Box::new(|_| panic!("boom"))));
        let ran2 = ran.clone();
        listeners.on_death(Handler::Sync(Box::new(move |_| *ran2.borrow_mut() = true)));

        listeners.emit(BotEvent::Death).await;

        assert!(*ran.borrow());
    }

    #[tokio::test]
    async fn emit_only_reaches_handlers_of_matching_kind() {
        let count = Rc::new(RefCell::new(0));
        let mut listeners = Listeners::new();
        let c = count.clone();
        listeners.on_join(Handler::Sync(Box::new(move |_| *c.borrow_mut() += 1)));

        listeners.emit(BotEvent::Death).await;
        assert_eq!(*count.borrow(), 0);

        listeners
            .emit(BotEvent::Join(PlayerState::default()))
            .await;
        assert_eq!(*count.borrow(), 1);
    }
}
