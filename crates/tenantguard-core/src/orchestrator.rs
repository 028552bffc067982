//! Evaluation orchestrator: runs the control catalog against one
//! connector context and assembles the Run artifact.
//!
//! Execution is strictly sequential. One evaluator's failure never blocks
//! the next (evaluators fold their own failures into `Manual`; the
//! orchestrator adds a bounded per-call timeout on top), and result order
//! always matches registry order — a documented invariant that downstream
//! diffing and rendering rely on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::checks::{registry, DEFAULT_SAMPLE_SIZE};
use crate::connector::ConnectorContext;
use crate::domain::{CheckResult, Run};
use crate::registry::ControlEvaluator;

/// Default bound on one backend call. Expiry degrades that control to
/// `Manual` instead of stalling the whole run.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(45);

/// Orchestration knobs for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Per-evaluator timeout covering its backend calls.
    pub backend_timeout: Duration,

    /// Sample size for sample-based controls.
    pub sample_size: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

/// Runs the ordered evaluator list and produces one Run.
pub struct Orchestrator {
    evaluators: Vec<Box<dyn ControlEvaluator>>,
    settings: RunSettings,
}

impl Orchestrator {
    /// Orchestrator over the standard control catalog.
    pub fn new(settings: RunSettings) -> Self {
        let evaluators = registry(settings.sample_size);
        Self {
            evaluators,
            settings,
        }
    }

    /// Orchestrator over an explicit evaluator list (tests, subsets).
    pub fn with_evaluators(
        evaluators: Vec<Box<dyn ControlEvaluator>>,
        settings: RunSettings,
    ) -> Self {
        Self {
            evaluators,
            settings,
        }
    }

    /// Evaluate every control sequentially and assemble the Run.
    ///
    /// The returned Run lists every registered control exactly once, in
    /// registry order, each with one of the four statuses.
    pub async fn run(&self, ctx: &ConnectorContext) -> Run {
        let never = AtomicBool::new(false);
        self.run_cancellable(ctx, &never).await
    }

    /// Like [`run`](Self::run), checking `cancel` before starting each
    /// evaluator. An in-flight backend call is never forcibly interrupted;
    /// it finishes or times out. A cancelled run is partial and must not
    /// be persisted as a completed artifact.
    pub async fn run_cancellable(&self, ctx: &ConnectorContext, cancel: &AtomicBool) -> Run {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(run_id = %run_id, controls = self.evaluators.len(), "starting evaluation run");

        let mut results = Vec::with_capacity(self.evaluators.len());

        for evaluator in &self.evaluators {
            if cancel.load(Ordering::SeqCst) {
                warn!(
                    run_id = %run_id,
                    completed = results.len(),
                    "run cancelled before next evaluator"
                );
                break;
            }

            let control = evaluator.control();
            let result = match tokio::time::timeout(
                self.settings.backend_timeout,
                evaluator.evaluate(ctx),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => {
                    warn!(control = %control.id, "evaluator timed out");
                    CheckResult::manual(
                        control,
                        format!(
                            "Determinable within {}s backend timeout",
                            self.settings.backend_timeout.as_secs()
                        ),
                        format!(
                            "backend call exceeded {}s timeout",
                            self.settings.backend_timeout.as_secs()
                        ),
                    )
                }
            };

            info!(control = %control.id, status = %result.status, "control evaluated");
            results.push(result);
        }

        info!(run_id = %run_id, results = results.len(), "evaluation run finished");

        Run {
            run_id,
            started_at,
            connections: ctx.status_map().clone(),
            results,
        }
    }
}
