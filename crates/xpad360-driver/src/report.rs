use std::sync::{PoisonError, RwLock};

/// Latest input report, shared between the poller (single writer) and any
/// number of readers.
///
/// Length is fixed at creation. A reader never sees a partially written
/// report.
#[derive(Debug)]
pub(crate) struct ReportBuffer {
    bytes: RwLock<Box<[u8]>>,
    len: usize,
}

impl ReportBuffer {
    pub(crate) fn zeroed(len: usize) -> Self {
        Self {
            bytes: RwLock::new(vec![0; len].into_boxed_slice()),
            len,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Runs `f` on a consistent snapshot of the report.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let bytes = self.bytes.read().unwrap_or_else(PoisonError::into_inner);
        f(&bytes)
    }

    /// Replaces the report with `data`. Bytes past `data` are zeroed and
    /// extra input is dropped.
    pub(crate) fn publish(&self, data: &[u8]) {
        let mut bytes = self.bytes.write().unwrap_or_else(PoisonError::into_inner);
        let n = data.len().min(bytes.len());
        bytes[..n].copy_from_slice(&data[..n]);
        bytes[n..].fill(0);
    }

    pub(crate) fn clear(&self) {
        self.bytes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fill(0);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn starts_zeroed() {
        let buffer = ReportBuffer::zeroed(32);
        assert_eq!(buffer.len(), 32);
        assert!(buffer.read(|b| b.iter().all(|&x| x == 0)));
    }

    #[test]
    fn short_publish_zeroes_the_tail() {
        let buffer = ReportBuffer::zeroed(8);
        buffer.publish(&[0xFF; 8]);
        buffer.publish(&[1, 2, 3]);
        buffer.read(|b| assert_eq!(b, &[1, 2, 3, 0, 0, 0, 0, 0]));
    }

    #[test]
    fn long_publish_is_truncated() {
        let buffer = ReportBuffer::zeroed(4);
        buffer.publish(&[9; 16]);
        buffer.read(|b| assert_eq!(b, &[9, 9, 9, 9]));
    }

    #[test]
    fn clear_resets_every_byte() {
        let buffer = ReportBuffer::zeroed(4);
        buffer.publish(&[1, 2, 3, 4]);
        buffer.clear();
        buffer.read(|b| assert_eq!(b, &[0; 4]));
    }

    #[test]
    fn readers_never_see_torn_reports() {
        let buffer = Arc::new(ReportBuffer::zeroed(20));
        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 0..2_000u32 {
                    let fill = if i % 2 == 0 { 0x00 } else { 0xFF };
                    buffer.publish(&[fill; 20]);
                }
            })
        };
        for _ in 0..2_000 {
            buffer.read(|b| {
                let first = b[0];
                assert!(b.iter().all(|&x| x == first));
            });
        }
        writer.join().unwrap();
    }
}
