mod bus;

pub use bus::{BotEvent, Handler, Listeners};
