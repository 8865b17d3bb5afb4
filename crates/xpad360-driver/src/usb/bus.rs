use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ahash::AHashMap;

use super::{DeviceIdentity, DeviceListener, SubscriptionId, UsbDevice};

/// Bookkeeping shared by [`super::DeviceNotifier`] implementations: the
/// registered listeners and the devices currently present.
///
/// Listeners are always invoked with no lock held, so they may subscribe,
/// unsubscribe or block.
#[derive(Default)]
pub struct DeviceBus {
    listeners: Mutex<AHashMap<SubscriptionId, Arc<dyn DeviceListener>>>,
    present: Mutex<Vec<Arc<dyn UsbDevice>>>,
    next_id: AtomicU64,
}

impl DeviceBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and replays every present device to it.
    pub fn subscribe(&self, listener: Arc<dyn DeviceListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&listener));

        for device in self.present() {
            listener.device_connected(device.as_ref());
        }
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Records a new device and announces it.
    pub fn arrived(&self, device: Arc<dyn UsbDevice>) {
        let identity = device.identity();
        {
            let mut present = self.present.lock().unwrap_or_else(PoisonError::into_inner);
            if present.iter().any(|d| d.identity() == identity) {
                return;
            }
            present.push(Arc::clone(&device));
        }
        for listener in self.listeners() {
            listener.device_connected(device.as_ref());
        }
    }

    /// Forgets the device occupying the same bus slot as `identity` and
    /// announces its removal.
    pub fn left(&self, identity: &DeviceIdentity) {
        let removed = {
            let mut present = self.present.lock().unwrap_or_else(PoisonError::into_inner);
            present
                .iter()
                .position(|d| d.identity().same_slot(identity))
                .map(|index| present.remove(index))
        };
        let Some(device) = removed else {
            return;
        };
        for listener in self.listeners() {
            listener.device_disconnected(device.as_ref());
        }
    }

    pub fn present(&self) -> Vec<Arc<dyn UsbDevice>> {
        self.present
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn listeners(&self) -> Vec<Arc<dyn DeviceListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::usb::mock::MockDevice;

    #[derive(Default)]
    struct Counter {
        connected: AtomicUsize,
        disconnected: AtomicUsize,
    }

    impl DeviceListener for Counter {
        fn device_connected(&self, _device: &dyn UsbDevice) {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }

        fn device_disconnected(&self, _device: &dyn UsbDevice) {
            self.disconnected.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn duplicate_arrivals_are_announced_once() {
        let bus = DeviceBus::new();
        let counter = Arc::new(Counter::default());
        bus.subscribe(counter.clone());

        let device = MockDevice::xbox360();
        bus.arrived(Arc::new(device.clone()));
        bus.arrived(Arc::new(device));
        assert_eq!(counter.connected.load(Ordering::SeqCst), 1);
        assert_eq!(bus.present().len(), 1);
    }

    #[test]
    fn new_listeners_see_present_devices() {
        let bus = DeviceBus::new();
        bus.arrived(Arc::new(MockDevice::xbox360()));
        bus.arrived(Arc::new(MockDevice::xbox360().with_address(2, 7)));

        let counter = Arc::new(Counter::default());
        bus.subscribe(counter.clone());
        assert_eq!(counter.connected.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removal_matches_the_slot() {
        let bus = DeviceBus::new();
        let counter = Arc::new(Counter::default());
        bus.subscribe(counter.clone());
        let device = MockDevice::xbox360();
        bus.arrived(Arc::new(device.clone()));

        bus.left(&device.clone().with_address(3, 3).identity());
        assert_eq!(counter.disconnected.load(Ordering::SeqCst), 0);
        bus.left(&device.identity());
        assert_eq!(counter.disconnected.load(Ordering::SeqCst), 1);
        assert!(bus.present().is_empty());
    }

    #[test]
    fn unsubscribed_listeners_are_not_called() {
        let bus = DeviceBus::new();
        let counter = Arc::new(Counter::default());
        let id = bus.subscribe(counter.clone());
        bus.unsubscribe(id);
        assert_eq!(bus.listener_count(), 0);

        bus.arrived(Arc::new(MockDevice::xbox360()));
        assert_eq!(counter.connected.load(Ordering::SeqCst), 0);
    }
}
