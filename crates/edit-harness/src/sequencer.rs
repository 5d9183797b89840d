//! Cooperative step sequencing.
//!
//! A test is a chain of small steps. Before each step the host is asked to
//! drain its pending work (input dispatch, layout, render) so that a step
//! always observes the effects of the previous one. Steps queue their
//! successors; the chain ends when the queue is empty or a step fails.

use crate::{TestError, TestResult};
use std::collections::VecDeque;
use std::panic;

/// Something with pending work that must settle between steps.
pub trait Host {
    /// Process all pending host work.
    fn do_events(&mut self) -> TestResult<()>;
}

/// A single deferred unit of test work.
pub type Step<C> = Box<dyn FnOnce(&mut C, &mut StepQueue<C>) -> TestResult<()>>;

/// FIFO of pending steps.
pub struct StepQueue<C> {
    steps: VecDeque<Step<C>>,
}

impl<C> StepQueue<C> {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
        }
    }

    /// Schedule a step to run after all previously queued steps.
    pub fn queue_step<F>(&mut self, step: F)
    where
        F: FnOnce(&mut C, &mut StepQueue<C>) -> TestResult<()> + 'static,
    {
        self.steps.push_back(Box::new(step));
    }

    /// Number of pending steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Drop all pending steps.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    fn pop(&mut self) -> Option<Step<C>> {
        self.steps.pop_front()
    }
}

impl<C> Default for StepQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for StepQueue<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepQueue")
            .field("pending", &self.steps.len())
            .finish()
    }
}

/// Runs step chains against a host context.
pub struct Sequencer;

impl Sequencer {
    /// Run `first` and every step it (transitively) queues.
    ///
    /// Returns the number of steps executed.
    pub fn run<C, F>(ctx: &mut C, first: F) -> TestResult<usize>
    where
        C: Host,
        F: FnOnce(&mut C, &mut StepQueue<C>) -> TestResult<()> + 'static,
    {
        let mut queue = StepQueue::new();
        queue.queue_step(first);
        Self::run_queue(ctx, queue)
    }

    /// Run an already populated queue to completion.
    ///
    /// The first failing step (error or panic) stops the chain; remaining
    /// steps are dropped and the error is returned.
    pub fn run_queue<C: Host>(ctx: &mut C, mut queue: StepQueue<C>) -> TestResult<usize> {
        let mut executed = 0;

        while let Some(step) = queue.pop() {
            ctx.do_events()?;

            let result = panic::catch_unwind(panic::AssertUnwindSafe(|| step(ctx, &mut queue)))
                .unwrap_or_else(|payload| Err(TestError::StepPanicked(panic_message(&*payload))));
            executed += 1;

            if let Err(e) = result {
                tracing::warn!(step = executed, pending = queue.len(), error = %e, "step failed");
                queue.clear();
                return Err(e);
            }
            tracing::trace!(step = executed, pending = queue.len(), "step completed");
        }

        Ok(executed)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        pending: usize,
        fail_events: bool,
    }

    impl Host for Recorder {
        fn do_events(&mut self) -> TestResult<()> {
            if self.fail_events {
                return Err(TestError::Host("dispatcher stopped".into()));
            }
            self.events.push(format!("drain({})", self.pending));
            self.pending = 0;
            Ok(())
        }
    }

    #[test]
    fn test_chain_order() {
        let mut ctx = Recorder::default();
        let executed = Sequencer::run(&mut ctx, |c: &mut Recorder, q| {
            c.events.push("a".into());
            c.pending = 2;
            q.queue_step(|c: &mut Recorder, q| {
                c.events.push("b".into());
                q.queue_step(|c: &mut Recorder, _| {
                    c.events.push("c".into());
                    Ok(())
                });
                Ok(())
            });
            Ok(())
        })
        .unwrap();

        assert_eq!(executed, 3);
        assert_eq!(
            ctx.events,
            vec!["drain(0)", "a", "drain(2)", "b", "drain(0)", "c"]
        );
    }

    #[test]
    fn test_fifo_between_siblings() {
        let mut ctx = Recorder::default();
        Sequencer::run(&mut ctx, |_: &mut Recorder, q| {
            q.queue_step(|c: &mut Recorder, q| {
                c.events.push("first".into());
                q.queue_step(|c: &mut Recorder, _| {
                    c.events.push("third".into());
                    Ok(())
                });
                Ok(())
            });
            q.queue_step(|c: &mut Recorder, _| {
                c.events.push("second".into());
                Ok(())
            });
            Ok(())
        })
        .unwrap();

        let steps: Vec<&str> = ctx
            .events
            .iter()
            .filter(|e| !e.starts_with("drain"))
            .map(String::as_str)
            .collect();
        assert_eq!(steps, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_error_stops_chain() {
        let mut ctx = Recorder::default();
        let result = Sequencer::run(&mut ctx, |_: &mut Recorder, q| {
            q.queue_step(|_: &mut Recorder, _| {
                Err(TestError::VerificationFailed("boom".into()))
            });
            q.queue_step(|c: &mut Recorder, _| {
                c.events.push("never".into());
                Ok(())
            });
            Ok(())
        });

        assert!(matches!(result, Err(TestError::VerificationFailed(_))));
        assert!(!ctx.events.iter().any(|e| e == "never"));
    }

    #[test]
    fn test_panic_becomes_error() {
        let mut ctx = Recorder::default();
        let result = Sequencer::run(&mut ctx, |_: &mut Recorder, _| -> TestResult<()> {
            panic!("step blew up")
        });

        match result {
            Err(TestError::StepPanicked(msg)) => assert_eq!(msg, "step blew up"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_host_error_propagates() {
        let mut ctx = Recorder {
            fail_events: true,
            ..Default::default()
        };
        let result = Sequencer::run(&mut ctx, |c: &mut Recorder, _| {
            c.events.push("ran".into());
            Ok(())
        });

        assert!(matches!(result, Err(TestError::Host(_))));
        assert!(ctx.events.is_empty());
    }

    #[test]
    fn test_empty_queue() {
        let mut ctx = Recorder::default();
        let executed = Sequencer::run_queue(&mut ctx, StepQueue::new()).unwrap();
        assert_eq!(executed, 0);
        assert!(ctx.events.is_empty());
    }
}
