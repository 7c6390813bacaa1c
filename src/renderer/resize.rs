/// Serialises surface resizes against passes that render into the
/// surface-sized attachments.
///
/// A request arriving while a pass is open is parked and only the latest
/// parked request is applied when the pass ends. Zero-sized requests and
/// requests matching the current size are ignored, so attachments are only
/// recreated on a real dimension change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeGate {
    current: (u32, u32),
    pending: Option<(u32, u32)>,
    in_pass: bool,
}

impl ResizeGate {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            current: (width, height),
            pending: None,
            in_pass: false,
        }
    }

    pub fn current(&self) -> (u32, u32) {
        self.current
    }

    pub fn in_pass(&self) -> bool {
        self.in_pass
    }

    /// Returns the size to recreate attachments at, if it should happen now.
    pub fn request(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring zero-sized resize to {}x{}", width, height);
            return None;
        }
        if self.in_pass {
            log::debug!("Deferring resize to {}x{} until the pass ends", width, height);
            self.pending = Some((width, height));
            return None;
        }
        if (width, height) == self.current {
            return None;
        }
        self.current = (width, height);
        Some(self.current)
    }

    pub fn begin_pass(&mut self) {
        self.in_pass = true;
    }

    /// Closes the pass and releases the latest deferred request.
    pub fn end_pass(&mut self) -> Option<(u32, u32)> {
        self.in_pass = false;
        let (width, height) = self.pending.take()?;
        self.request(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_size_is_ignored() {
        let mut gate = ResizeGate::new(800, 600);
        assert_eq!(gate.request(800, 600), None);
        assert_eq!(gate.request(1024, 600), Some((1024, 600)));
        assert_eq!(gate.request(1024, 600), None);
    }

    #[test]
    fn zero_size_is_ignored() {
        let mut gate = ResizeGate::new(800, 600);
        assert_eq!(gate.request(0, 600), None);
        assert_eq!(gate.request(800, 0), None);
        assert_eq!(gate.current(), (800, 600));
    }

    #[test]
    fn requests_during_a_pass_collapse_to_the_latest() {
        let mut gate = ResizeGate::new(800, 600);
        gate.begin_pass();
        assert_eq!(gate.request(640, 480), None);
        assert_eq!(gate.request(1920, 1080), None);
        assert_eq!(gate.current(), (800, 600));

        assert_eq!(gate.end_pass(), Some((1920, 1080)));
        assert!(!gate.in_pass());
        assert_eq!(gate.end_pass(), None);
    }

    #[test]
    fn deferred_request_back_to_current_size_is_dropped() {
        let mut gate = ResizeGate::new(800, 600);
        gate.begin_pass();
        gate.request(640, 480);
        gate.request(800, 600);
        assert_eq!(gate.end_pass(), None);
    }
}
