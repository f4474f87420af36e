//! Analysis phase sequencer
//!
//! Drives a session from `Preparing` to `Complete` through a fixed schedule
//! of named, delayed transitions. The schedule runs as one tokio task keyed
//! to the session id. Cancelling (or dropping) the sequencer aborts the task,
//! and every transition is re-checked against the session id before it is
//! applied, so a superseded schedule can never touch a newer session.

use crate::core::config::AnalysisTimings;
use crate::core::session::{Phase, SessionId};
use log::debug;
use std::time::Duration;
use tokio::task::JoinHandle;

/// One delayed transition in the analysis schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTransition {
    /// Timer name used in logs
    pub name: &'static str,
    /// Delay measured from the previous transition
    pub delay: Duration,
    /// Phase entered when the timer fires
    pub to: Phase,
}

/// The three timers of the simulated analysis
pub fn analysis_schedule(timings: &AnalysisTimings) -> [ScheduledTransition; 3] {
    [
        ScheduledTransition {
            name: "preparing-done",
            delay: timings.preparing(),
            to: Phase::Analyzing,
        },
        ScheduledTransition {
            name: "analyzing-done",
            delay: timings.analyzing(),
            to: Phase::Finalizing,
        },
        ScheduledTransition {
            name: "finalizing-done",
            delay: timings.finalizing(),
            to: Phase::Complete,
        },
    ]
}

/// Running schedule for one session
#[derive(Debug)]
pub struct PhaseSequencer {
    session: SessionId,
    task: JoinHandle<()>,
}

impl PhaseSequencer {
    /// Spawn the schedule on the current tokio runtime.
    ///
    /// `apply` is called as each timer fires and returns `false` when the
    /// transition no longer applies, which ends the schedule.
    pub fn spawn<F>(session: SessionId, schedule: Vec<ScheduledTransition>, mut apply: F) -> Self
    where
        F: FnMut(SessionId, ScheduledTransition) -> bool + Send + 'static,
    {
        let task = tokio::spawn(async move {
            for step in schedule {
                tokio::time::sleep(step.delay).await;
                if !apply(session, step) {
                    debug!("Timer '{}' for session {} no longer applies", step.name, session);
                    return;
                }
                debug!("Timer '{}' fired for session {}", step.name, session);
            }
        });

        Self { session, task }
    }

    /// Session this schedule belongs to
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Whether every timer has fired (or the schedule stopped early)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort all pending timers
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for PhaseSequencer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::time::sleep;

    fn recorder() -> (
        Arc<Mutex<Vec<Phase>>>,
        impl FnMut(SessionId, ScheduledTransition) -> bool + Send + 'static,
    ) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        (fired, move |_, step: ScheduledTransition| {
            sink.lock().unwrap().push(step.to);
            true
        })
    }

    #[test]
    fn test_schedule_order_and_delays() {
        let schedule = analysis_schedule(&AnalysisTimings::upload());
        let phases: Vec<_> = schedule.iter().map(|s| s.to).collect();
        assert_eq!(
            phases,
            vec![Phase::Analyzing, Phase::Finalizing, Phase::Complete]
        );
        assert_eq!(schedule[0].delay, Duration::from_millis(800));
        assert_eq!(schedule[1].delay, Duration::from_millis(1400));
        assert_eq!(schedule[2].delay, Duration::from_millis(1300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_fire_in_order_relative_to_each_other() {
        let (fired, apply) = recorder();
        let schedule = analysis_schedule(&AnalysisTimings::camera()).to_vec();
        let sequencer = PhaseSequencer::spawn(SessionId(1), schedule, apply);

        sleep(Duration::from_millis(999)).await;
        assert!(fired.lock().unwrap().is_empty());

        sleep(Duration::from_millis(2)).await;
        assert_eq!(*fired.lock().unwrap(), vec![Phase::Analyzing]);

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(
            *fired.lock().unwrap(),
            vec![Phase::Analyzing, Phase::Finalizing]
        );

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(fired.lock().unwrap().len(), 3);
        assert!(sequencer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_pending_timers() {
        let (fired, apply) = recorder();
        let schedule = analysis_schedule(&AnalysisTimings::uniform(100)).to_vec();
        let sequencer = PhaseSequencer::spawn(SessionId(2), schedule, apply);

        sleep(Duration::from_millis(150)).await;
        sequencer.cancel();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(*fired.lock().unwrap(), vec![Phase::Analyzing]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_transition_ends_schedule() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let schedule = analysis_schedule(&AnalysisTimings::uniform(10)).to_vec();
        let sequencer = PhaseSequencer::spawn(SessionId(3), schedule, move |_, _| {
            *counter.lock().unwrap() += 1;
            false
        });

        sleep(Duration::from_millis(100)).await;
        assert_eq!(*calls.lock().unwrap(), 1);
        assert!(sequencer.is_finished());
        assert_eq!(sequencer.session(), SessionId(3));
    }
}
