//! Performance instrumentation.
//!
//! Wraps a unit of work, measures wall-clock time and emits one record with
//! a [`PerformanceMetrics`] attachment. The work's result (or error) is
//! returned untouched. Each call keeps its own start instant, so overlapping
//! measurements never share state.

use crate::domain::{Attachment, Context, PerformanceMetrics, Severity, SourceLocation};
use crate::logger::DiagnosticLogger;
use std::fmt::Display;
use std::future::Future;
use std::panic::Location;
use std::time::{Duration, Instant};

/// Emits a record when dropped unless `finish` ran first, which covers
/// panics inside synchronous work and futures dropped before completion.
struct TimingGuard<'a> {
    logger: &'a DiagnosticLogger,
    operation: &'a str,
    source: SourceLocation,
    started: Instant,
    armed: bool,
}

impl<'a> TimingGuard<'a> {
    fn start(logger: &'a DiagnosticLogger, operation: &'a str, source: SourceLocation) -> Self {
        Self {
            logger,
            operation,
            source,
            started: Instant::now(),
            armed: true,
        }
    }

    fn finish(mut self, severity: Severity, message: String, context: Context) -> Duration {
        self.armed = false;
        let elapsed = self.started.elapsed();
        self.record(severity, message, context, elapsed);
        elapsed
    }

    fn record(&self, severity: Severity, message: String, context: Context, elapsed: Duration) {
        self.logger.emit(
            severity,
            self.operation,
            message,
            context,
            Some(Attachment::Performance(PerformanceMetrics::from_elapsed(elapsed))),
            Some(self.source.clone()),
        );
    }
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let elapsed = self.started.elapsed();
        let outcome = if std::thread::panicking() {
            "panicked"
        } else {
            "cancelled"
        };
        let mut context = Context::new();
        context.insert("outcome".to_string(), outcome.to_string());
        self.record(
            Severity::Error,
            format!("{} {outcome} after {}", self.operation, format_elapsed(elapsed)),
            context,
            elapsed,
        );
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}ms", elapsed.as_secs_f64() * 1000.0)
}

fn completed(operation: &str) -> String {
    format!("{operation} completed")
}

fn failure_context(error: &impl Display) -> Context {
    let mut context = Context::new();
    context.insert("outcome".to_string(), "failed".to_string());
    context.insert("error_description".to_string(), error.to_string());
    context
}

impl DiagnosticLogger {
    /// Runs `work`, records its duration at info severity and returns its result.
    #[track_caller]
    pub fn measure<T>(&self, operation: &str, work: impl FnOnce() -> T) -> T {
        let guard = TimingGuard::start(
            self,
            operation,
            SourceLocation::from_location(Location::caller()),
        );
        let output = work();
        guard.finish(Severity::Info, completed(operation), Context::new());
        output
    }

    /// Like [`measure`](Self::measure) for fallible work. A failure is
    /// recorded at error severity with the elapsed time, then returned to the
    /// caller unchanged.
    #[track_caller]
    pub fn try_measure<T, E: Display>(
        &self,
        operation: &str,
        work: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let guard = TimingGuard::start(
            self,
            operation,
            SourceLocation::from_location(Location::caller()),
        );
        let result = work();
        match &result {
            Ok(_) => {
                guard.finish(Severity::Info, completed(operation), Context::new());
            }
            Err(e) => {
                guard.finish(
                    Severity::Error,
                    format!("{operation} failed: {e}"),
                    failure_context(e),
                );
            }
        }
        result
    }

    /// Async form of [`measure`](Self::measure). Timing starts when the
    /// returned future is first polled; the wrapper only suspends inside `work`.
    #[track_caller]
    pub fn measure_async<'a, F>(
        &'a self,
        operation: &'a str,
        work: F,
    ) -> impl Future<Output = F::Output> + 'a
    where
        F: Future + 'a,
    {
        let source = SourceLocation::from_location(Location::caller());
        async move {
            let guard = TimingGuard::start(self, operation, source);
            let output = work.await;
            guard.finish(Severity::Info, completed(operation), Context::new());
            output
        }
    }

    /// Async form of [`try_measure`](Self::try_measure).
    #[track_caller]
    pub fn try_measure_async<'a, T, E, F>(
        &'a self,
        operation: &'a str,
        work: F,
    ) -> impl Future<Output = Result<T, E>> + 'a
    where
        F: Future<Output = Result<T, E>> + 'a,
        E: Display,
    {
        let source = SourceLocation::from_location(Location::caller());
        async move {
            let guard = TimingGuard::start(self, operation, source);
            let result = work.await;
            match &result {
                Ok(_) => {
                    guard.finish(Severity::Info, completed(operation), Context::new());
                }
                Err(e) => {
                    guard.finish(
                        Severity::Error,
                        format!("{operation} failed: {e}"),
                        failure_context(e),
                    );
                }
            }
            result
        }
    }

    /// Non-wrapping form for callers that already measured the work.
    #[track_caller]
    pub fn log_with_performance(
        &self,
        severity: Severity,
        operation: &str,
        message: impl Into<String>,
        execution_time: Duration,
        context: Context,
    ) {
        self.log_performance_metrics(
            severity,
            operation,
            message,
            PerformanceMetrics::from_elapsed(execution_time),
            context,
        );
    }

    /// Logs caller-built metrics, e.g. with a memory delta attached.
    #[track_caller]
    pub fn log_performance_metrics(
        &self,
        severity: Severity,
        operation: &str,
        message: impl Into<String>,
        metrics: PerformanceMetrics,
        context: Context,
    ) {
        self.log(
            severity,
            operation,
            message,
            context,
            Some(Attachment::Performance(metrics)),
        );
    }
}
