/// Running state of a byte copy, handed to [`ProgressListener`] callbacks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyProgressEvent {
    total_read: u64,
    read: usize,
}

impl CopyProgressEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes copied so far.
    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    /// Size of the chunk that produced this event; zero on the terminal event.
    pub fn read(&self) -> usize {
        self.read
    }

    pub(crate) fn update(&mut self, read: usize, total_read: u64) -> &Self {
        self.read = read;
        self.total_read = total_read;
        self
    }
}

/// Observer of a single copy.
///
/// `start` fires before the first chunk, `progress` after every chunk and
/// `end` once the streams are released, carrying the zero-length terminal
/// event. Callbacks cannot fail and must not block for long.
pub trait ProgressListener: Send + Sync {
    fn start(&self, _event: &CopyProgressEvent) {}

    fn progress(&self, _event: &CopyProgressEvent) {}

    fn end(&self, _event: &CopyProgressEvent) {}
}

impl<F> ProgressListener for F
where
    F: Fn(&CopyProgressEvent) + Send + Sync,
{
    fn progress(&self, event: &CopyProgressEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_tracks_last_chunk() {
        let mut event = CopyProgressEvent::new();
        event.update(10, 10);
        event.update(4, 14);
        assert_eq!(event.total_read(), 14);
        assert_eq!(event.read(), 4);

        event.update(0, 14);
        assert_eq!(event.read(), 0);
    }
}
