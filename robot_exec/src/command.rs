//! # Command scheduling
//!
//! A command is a unit of behaviour that takes control of a subsystem for a number of cycles,
//! for example balancing on the charge station or driving from the joysticks. The `CommandRunner`
//! owns one command and makes sure its lifecycle is followed: `initialize` once, `execute` once
//! per cycle, then `end` exactly once whether the command finished by itself or was cancelled.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A behaviour that runs against the subsystem `S`.
pub trait Command<S> {
    /// Called once before the first `execute`.
    fn initialize(&mut self, _subsystem: &mut S) {}

    /// Called once per cycle while the command is running.
    fn execute(&mut self, subsystem: &mut S);

    /// True once the command has nothing more to do.
    fn is_finished(&self) -> bool {
        false
    }

    /// Called exactly once when the command stops running. `interrupted` is true if the command
    /// was cancelled rather than finishing.
    fn end(&mut self, _subsystem: &mut S, _interrupted: bool) {}
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Lifecycle state of a command held by a `CommandRunner`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerState {
    /// Not yet initialised.
    Pending,

    Running,

    /// `is_finished` returned true and `end(false)` has been called.
    Finished,

    /// Cancelled. If the command had started `end(true)` has been called.
    Interrupted,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Drives a single command through its lifecycle.
pub struct CommandRunner<C> {
    name: &'static str,
    command: C,
    state: RunnerState,
    num_cycles: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl RunnerState {
    /// True if the command will not run again.
    pub fn is_done(&self) -> bool {
        matches!(self, RunnerState::Finished | RunnerState::Interrupted)
    }
}

impl<C> CommandRunner<C> {
    pub fn new(name: &'static str, command: C) -> Self {
        Self {
            name,
            command,
            state: RunnerState::Pending,
            num_cycles: 0,
        }
    }

    /// Run one cycle of the command, initialising it first if needed.
    ///
    /// Once the command is done further calls do nothing.
    pub fn step<S>(&mut self, subsystem: &mut S) -> RunnerState
    where
        C: Command<S>,
    {
        match self.state {
            RunnerState::Pending => {
                debug!("Initialising command {}", self.name);
                self.command.initialize(subsystem);
                self.state = RunnerState::Running;
            }
            RunnerState::Running => (),
            RunnerState::Finished | RunnerState::Interrupted => return self.state,
        }

        self.command.execute(subsystem);
        self.num_cycles += 1;

        if self.command.is_finished() {
            debug!("Command {} finished after {} cycles", self.name, self.num_cycles);
            self.command.end(subsystem, false);
            self.state = RunnerState::Finished;
        }

        self.state
    }

    /// Stop the command.
    ///
    /// A running command is ended with `interrupted` set. A command that never started is marked
    /// interrupted without being ended, and a command that is already done is left alone.
    pub fn cancel<S>(&mut self, subsystem: &mut S) -> RunnerState
    where
        C: Command<S>,
    {
        match self.state {
            RunnerState::Running => {
                debug!("Command {} interrupted after {} cycles", self.name, self.num_cycles);
                self.command.end(subsystem, true);
                self.state = RunnerState::Interrupted;
            }
            RunnerState::Pending => self.state = RunnerState::Interrupted,
            RunnerState::Finished | RunnerState::Interrupted => (),
        }

        self.state
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of times `execute` has been called.
    pub fn num_cycles(&self) -> u64 {
        self.num_cycles
    }

    pub fn command(&self) -> &C {
        &self.command
    }

    pub fn command_mut(&mut self) -> &mut C {
        &mut self.command
    }

    pub fn into_inner(self) -> C {
        self.command
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Records every lifecycle call made against it.
    #[derive(Default)]
    struct Log {
        calls: Vec<&'static str>,
    }

    struct CountTo {
        target: u32,
        count: u32,
    }

    impl Command<Log> for CountTo {
        fn initialize(&mut self, log: &mut Log) {
            log.calls.push("initialize");
        }

        fn execute(&mut self, log: &mut Log) {
            self.count += 1;
            log.calls.push("execute");
        }

        fn is_finished(&self) -> bool {
            self.count >= self.target
        }

        fn end(&mut self, log: &mut Log, interrupted: bool) {
            log.calls.push(if interrupted { "end_interrupted" } else { "end" });
        }
    }

    fn count_ends(log: &Log) -> usize {
        log.calls.iter().filter(|c| c.starts_with("end")).count()
    }

    #[test]
    fn test_end_called_once_on_finish() {
        let mut log = Log::default();
        let mut runner = CommandRunner::new("count", CountTo { target: 3, count: 0 });

        assert_eq!(runner.step(&mut log), RunnerState::Running);
        assert_eq!(runner.step(&mut log), RunnerState::Running);
        assert_eq!(runner.step(&mut log), RunnerState::Finished);

        // Further steps and a late cancel must not end it again
        assert_eq!(runner.step(&mut log), RunnerState::Finished);
        assert_eq!(runner.cancel(&mut log), RunnerState::Finished);

        assert_eq!(
            log.calls,
            vec!["initialize", "execute", "execute", "execute", "end"]
        );
        assert_eq!(runner.num_cycles(), 3);
    }

    #[test]
    fn test_end_called_once_on_cancel() {
        let mut log = Log::default();
        let mut runner = CommandRunner::new("count", CountTo { target: 10, count: 0 });

        runner.step(&mut log);
        runner.step(&mut log);
        assert_eq!(runner.cancel(&mut log), RunnerState::Interrupted);
        assert_eq!(runner.cancel(&mut log), RunnerState::Interrupted);
        assert_eq!(runner.step(&mut log), RunnerState::Interrupted);

        assert_eq!(count_ends(&log), 1);
        assert_eq!(log.calls.last(), Some(&"end_interrupted"));
        assert_eq!(runner.command().count, 2);
    }

    #[test]
    fn test_cancel_before_start() {
        let mut log = Log::default();
        let mut runner = CommandRunner::new("count", CountTo { target: 1, count: 0 });

        assert_eq!(runner.cancel(&mut log), RunnerState::Interrupted);
        assert!(runner.state().is_done());
        assert!(log.calls.is_empty());
    }

    #[test]
    fn test_finishes_on_first_cycle() {
        let mut log = Log::default();
        let mut runner = CommandRunner::new("count", CountTo { target: 1, count: 0 });

        assert_eq!(runner.step(&mut log), RunnerState::Finished);
        assert_eq!(count_ends(&log), 1);
    }
}
