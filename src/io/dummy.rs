use std::sync::mpsc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};

use log::trace;

/// An IO stand-in that is driven by messages, for tests and simulation.
pub trait DummyIO {
    type MessageType;
    type Config;

    fn create(config: &Self::Config) -> (Self, Sender<Self::MessageType>)
    where
        Self: Sized,
    {
        let (sender, receiver) = mpsc::channel();
        let dummy_obj = Self::new(receiver, config);
        (dummy_obj, sender)
    }

    fn new(receiver: Receiver<Self::MessageType>, config: &Self::Config) -> Self;
}

/// Apply every pending message.
pub fn read_all<T, F>(receiver: &Receiver<T>, mut on_value: F)
where
    F: FnMut(T),
{
    loop {
        match receiver.try_recv() {
            Ok(x) => on_value(x),
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                trace!("Dummy handle dropped, keeping last state");
                break;
            }
        }
    }
}

pub fn to_on_off(on: bool) -> &'static str {
    match on {
        true => "On",
        false => "Off",
    }
}
