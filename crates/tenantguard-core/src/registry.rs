//! Control evaluator contract.
//!
//! Every control in the catalog is backed by one [`ControlEvaluator`].
//! The contract is strict: `evaluate` never raises. An evaluator runs its
//! fallible inner check and folds any failure into a `Manual` (or `Error`)
//! result at its own boundary, so one broken backend object can never take
//! down the rest of a run.

use async_trait::async_trait;

use crate::connector::{BackendError, ConnectorContext};
use crate::domain::{CheckResult, Control};

/// The logic unit implementing one control's predicate against live
/// configuration. Polymorphic over the control it checks.
#[async_trait]
pub trait ControlEvaluator: Send + Sync {
    /// The static control this evaluator checks.
    fn control(&self) -> &Control;

    /// Evaluate the control against the current connector state.
    ///
    /// Never raises: connector absence, missing fields, or permission
    /// problems come back as a `Manual` result whose evidence holds the
    /// failure text.
    async fn evaluate(&self, ctx: &ConnectorContext) -> CheckResult;
}

/// Fold a backend failure into the neutral `Manual` result.
///
/// Used by every evaluator as the single degradation point: the predicate
/// could not be evaluated, which is communicated as a value, not an
/// exception.
pub(crate) fn degrade(control: &Control, expected: &str, err: BackendError) -> CheckResult {
    CheckResult::manual(control, expected, err.to_string())
}
