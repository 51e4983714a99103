//! Cooperative progress reporting.
//!
//! A [`SubProgress`] claims a fixed number of its parent's units and scales
//! whatever total its own caller announces into that share, so nested
//! traversals report proportionally without knowing the tree shape. Any
//! unclaimed share is flushed to the parent on drop.

/// Receiver of progress updates. Cancellation is advisory and polled between node visits.
pub trait ProgressSink {
    fn begin(&mut self, name: &str, total: usize);

    fn worked(&mut self, units: usize);

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn begin(&mut self, _name: &str, _total: usize) {}

    fn worked(&mut self, _units: usize) {}
}

pub struct SubProgress<'a> {
    parent: &'a mut dyn ProgressSink,
    ticks: usize,
    scale: f64,
    consumed: f64,
    reported: usize,
}

impl<'a> SubProgress<'a> {
    pub fn new(parent: &'a mut dyn ProgressSink, ticks: usize) -> Self {
        Self {
            parent,
            ticks,
            scale: 0.0,
            consumed: 0.0,
            reported: 0,
        }
    }

    fn forward(&mut self, target: usize) {
        let target = target.min(self.ticks);
        if target > self.reported {
            self.parent.worked(target - self.reported);
            self.reported = target;
        }
    }
}

impl ProgressSink for SubProgress<'_> {
    fn begin(&mut self, _name: &str, total: usize) {
        self.scale = if total == 0 {
            0.0
        } else {
            self.ticks as f64 / total as f64
        };
    }

    fn worked(&mut self, units: usize) {
        self.consumed += units as f64 * self.scale;
        // Small epsilon so 3 x (1/3) reaches the whole tick.
        self.forward((self.consumed + 1e-9).floor() as usize);
    }

    fn is_cancelled(&self) -> bool {
        self.parent.is_cancelled()
    }
}

impl Drop for SubProgress<'_> {
    fn drop(&mut self) {
        self.forward(self.ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        total: usize,
        worked: usize,
        calls: usize,
    }

    impl ProgressSink for Recorder {
        fn begin(&mut self, _name: &str, total: usize) {
            self.total = total;
        }
        fn worked(&mut self, units: usize) {
            self.worked += units;
            self.calls += 1;
        }
    }

    #[test]
    fn sub_progress_scales_into_parent_share() {
        let mut root = Recorder::default();
        root.begin("", 5);
        {
            let mut sub = SubProgress::new(&mut root, 4);
            sub.begin("", 8);
            sub.worked(2);
            sub.worked(2);
        }
        assert_eq!(root.worked, 4);
        {
            let mut sub = SubProgress::new(&mut root, 1);
            sub.begin("", 3);
            sub.worked(1);
            sub.worked(1);
            sub.worked(1);
        }
        assert_eq!(root.worked, 5);
        assert_eq!(root.total, 5);
    }

    #[test]
    fn dropped_sub_progress_flushes_remaining_share() {
        let mut root = Recorder::default();
        {
            let mut sub = SubProgress::new(&mut root, 3);
            sub.begin("", 100);
            sub.worked(10);
        }
        assert_eq!(root.worked, 3);
    }

    #[test]
    fn nested_sub_progress_never_exceeds_share() {
        let mut root = Recorder::default();
        {
            let mut outer = SubProgress::new(&mut root, 2);
            outer.begin("", 1);
            {
                let mut inner = SubProgress::new(&mut outer, 1);
                inner.begin("", 2);
                inner.worked(5);
            }
            outer.worked(1);
        }
        assert_eq!(root.worked, 2);
    }

    #[test]
    fn zero_total_reports_on_drop_only() {
        let mut root = Recorder::default();
        {
            let mut sub = SubProgress::new(&mut root, 2);
            sub.begin("", 0);
            sub.worked(7);
        }
        assert_eq!(root.worked, 2);
        assert_eq!(root.calls, 1);
    }
}
