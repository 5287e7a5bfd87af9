use futures::channel::oneshot;

/// Bytes of a fetched model, or why the fetch failed.
pub type FetchReceiver = oneshot::Receiver<anyhow::Result<Vec<u8>>>;

/// Anything that can fetch a model by reference without blocking the caller.
pub trait ModelSource {
    /// Starts a fetch. The result arrives on the returned channel; dropping the
    /// receiver abandons the fetch and any late result is discarded.
    fn fetch(&self, reference: &str) -> FetchReceiver;
}

#[derive(Debug)]
pub enum LoadOutcome {
    Fetched(Vec<u8>),
    Failed(anyhow::Error),
    TimedOut,
}

#[derive(Debug)]
enum AttemptState {
    Pending {
        deadline: f64,
        receiver: FetchReceiver,
    },
    Resolved,
}

/// One model load racing a deadline. Whichever of fetch result and deadline is
/// observed first resolves the attempt; everything after that is ignored.
#[derive(Debug)]
pub struct LoadAttempt {
    state: AttemptState,
}

impl LoadAttempt {
    pub fn start(source: &dyn ModelSource, reference: &str, now: f64, timeout: f64) -> Self {
        log::info!("loading token model {}", reference);
        Self {
            state: AttemptState::Pending {
                deadline: now + timeout,
                receiver: source.fetch(reference),
            },
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, AttemptState::Pending { .. })
    }

    /// Returns the outcome exactly once. A fetch that has settled wins over a
    /// deadline that passed in the same poll.
    pub fn poll(&mut self, now: f64) -> Option<LoadOutcome> {
        let AttemptState::Pending { deadline, receiver } = &mut self.state else {
            return None;
        };
        let outcome = match receiver.try_recv() {
            Ok(Some(Ok(bytes))) => LoadOutcome::Fetched(bytes),
            Ok(Some(Err(err))) => LoadOutcome::Failed(err),
            Ok(None) if now >= *deadline => LoadOutcome::TimedOut,
            Ok(None) => return None,
            Err(oneshot::Canceled) => {
                LoadOutcome::Failed(anyhow::anyhow!("model source dropped the request"))
            }
        };
        self.state = AttemptState::Resolved;
        Some(outcome)
    }

    /// Abandons the attempt. Later polls return `None`.
    pub fn cancel(&mut self) {
        self.state = AttemptState::Resolved;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Hands every fetch's sender to the test so it decides when and how it settles.
    #[derive(Default)]
    pub(crate) struct ManualSource {
        pub senders: RefCell<Vec<oneshot::Sender<anyhow::Result<Vec<u8>>>>>,
    }

    impl ModelSource for ManualSource {
        fn fetch(&self, _reference: &str) -> FetchReceiver {
            let (sender, receiver) = oneshot::channel();
            self.senders.borrow_mut().push(sender);
            receiver
        }
    }

    impl ManualSource {
        pub(crate) fn settle(&self, result: anyhow::Result<Vec<u8>>) -> bool {
            match self.senders.borrow_mut().pop() {
                Some(sender) => sender.send(result).is_ok(),
                None => false,
            }
        }
    }

    #[test]
    fn should_stay_pending_until_settled() {
        let source = ManualSource::default();
        let mut attempt = LoadAttempt::start(&source, "token.glb", 0.0, 10_000.0);
        assert!(attempt.poll(500.0).is_none());
        assert!(source.settle(Ok(vec![1, 2, 3])));
        assert!(matches!(attempt.poll(600.0), Some(LoadOutcome::Fetched(b)) if b == [1, 2, 3]));
        assert!(!attempt.is_pending());
        assert!(attempt.poll(700.0).is_none());
    }

    #[test]
    fn should_time_out_at_deadline() {
        let source = ManualSource::default();
        let mut attempt = LoadAttempt::start(&source, "token.glb", 100.0, 10_000.0);
        assert!(attempt.poll(10_099.0).is_none());
        assert!(matches!(attempt.poll(10_100.0), Some(LoadOutcome::TimedOut)));
        // a late result finds the receiver gone
        assert!(!source.settle(Ok(vec![])));
        assert!(attempt.poll(20_000.0).is_none());
    }

    #[test]
    fn should_prefer_settled_fetch_over_expired_deadline() {
        let source = ManualSource::default();
        let mut attempt = LoadAttempt::start(&source, "token.glb", 0.0, 10.0);
        source.settle(Err(anyhow::anyhow!("404")));
        assert!(matches!(attempt.poll(50.0), Some(LoadOutcome::Failed(_))));
        assert!(attempt.poll(60.0).is_none());
    }

    #[test]
    fn should_fail_when_source_drops_sender() {
        let source = ManualSource::default();
        let mut attempt = LoadAttempt::start(&source, "token.glb", 0.0, 10_000.0);
        source.senders.borrow_mut().clear();
        assert!(matches!(attempt.poll(1.0), Some(LoadOutcome::Failed(_))));
    }

    #[test]
    fn should_ignore_everything_after_cancel() {
        let source = ManualSource::default();
        let mut attempt = LoadAttempt::start(&source, "token.glb", 0.0, 10.0);
        attempt.cancel();
        assert!(!source.settle(Ok(vec![1])));
        assert!(attempt.poll(100.0).is_none());
    }
}
