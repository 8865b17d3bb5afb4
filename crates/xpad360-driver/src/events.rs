use crossbeam_channel::Receiver;

use crate::types::ControllerInfo;

/// Lifecycle events broadcast by [`crate::Xbox360Controller`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// A controller has been attached and is being polled.
    Connected(ControllerInfo),
    /// The attached controller went away; polling has stopped.
    Disconnected(ControllerInfo),
}

/// Receiving end for controller events subscription.
pub type EventReceiver = Receiver<ControllerEvent>;
