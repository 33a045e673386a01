//! Test driver — services inbound commands while a scripted test runs
//!
//! The runner sends `RunTest` to the target and then acts as the target's
//! hands and eyes: every UI command the target issues while executing the
//! script is dispatched to a collaborator here and acknowledged back. The
//! whole exchange runs under an explicit outer deadline, because the
//! messaging core itself will happily wait forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use uiharness_communicator::{Action, Communicator, Invocation};

use crate::collaborators::{PurchaseController, SnapshotSink, UiAutomator};
use crate::error::{Error, Result};

/// How one scripted test ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Skipped { message: String },
    Failed { message: String },
}

/// What a dispatched action means for the running test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Handled and acknowledged; keep servicing
    Handled,
    /// The target asked to skip the current test
    Skip { message: String },
    /// The target reported the current test as failed
    Fail { message: String },
}

/// Runner-side driver owning the collaborator seams
pub struct TestDriver<'a> {
    communicator: &'a Communicator,
    snapshots: Arc<dyn SnapshotSink>,
    ui: Arc<dyn UiAutomator>,
    purchases: Arc<dyn PurchaseController>,
}

impl<'a> TestDriver<'a> {
    pub fn new(
        communicator: &'a Communicator,
        snapshots: Arc<dyn SnapshotSink>,
        ui: Arc<dyn UiAutomator>,
        purchases: Arc<dyn PurchaseController>,
    ) -> Self {
        Self {
            communicator,
            snapshots,
            ui,
            purchases,
        }
    }

    /// Run scripted test `number` on the target, servicing its commands
    /// until the target acknowledges the whole test or the deadline
    /// expires.
    pub async fn perform_test(
        &self,
        number: u32,
        deadline: Duration,
    ) -> Result<TestOutcome> {
        // Subscribe before sending so no early command is missed.
        let mut inbound = self.communicator.subscribe();

        info!("Instructing target to start test #{number}");
        let run = self.communicator.send(Invocation::RunTest { number });
        tokio::pin!(run);

        let serviced = tokio::time::timeout(deadline, async {
            loop {
                tokio::select! {
                    acknowledged = &mut run => {
                        acknowledged?;
                        return Ok(TestOutcome::Passed);
                    }
                    action = inbound.recv() => match action {
                        Ok(action) => match self.dispatch(action)? {
                            Disposition::Handled => {}
                            Disposition::Skip { message } => {
                                return Ok(TestOutcome::Skipped { message });
                            }
                            Disposition::Fail { message } => {
                                return Ok(TestOutcome::Failed { message });
                            }
                        },
                        Err(RecvError::Lagged(missed)) => {
                            warn!("Driver lagged behind by {missed} inbound action(s)");
                        }
                        Err(RecvError::Closed) => return Err(Error::StreamClosed),
                    }
                }
            }
        })
        .await;

        match serviced {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::Deadline(deadline)),
        }
    }

    /// Route one inbound action to its collaborator and acknowledge it.
    ///
    /// The acknowledgment goes out even when the collaborator fails:
    /// completion means "received and processed", not "succeeded", and the
    /// target must not be left hanging on a failed assertion.
    pub fn dispatch(&self, action: Action) -> Result<Disposition> {
        let outcome = self.handle(&action.invocation);
        self.communicator.completed(action)?;

        match outcome {
            Ok(disposition) => Ok(disposition),
            Err(Error::Collaborator(message)) => Ok(Disposition::Fail { message }),
            Err(err) => Err(err),
        }
    }

    fn handle(&self, invocation: &Invocation) -> Result<Disposition> {
        match invocation {
            Invocation::Assert {
                test_name,
                precision,
                capture_area,
            } => self
                .snapshots
                .assert_image(test_name, *precision, *capture_area)
                .map(|_| Disposition::Handled),

            Invocation::AssertValue { test_name, value } => self
                .snapshots
                .assert_value(test_name, value)
                .map(|_| Disposition::Handled),

            Invocation::Touch { point } => {
                self.ui.touch(*point).map(|_| Disposition::Handled)
            }
            Invocation::TypeText { text } => {
                self.ui.type_text(text).map(|_| Disposition::Handled)
            }
            Invocation::SwipeDown => self.ui.swipe_down().map(|_| Disposition::Handled),
            Invocation::Springboard => {
                self.ui.springboard().map(|_| Disposition::Handled)
            }
            Invocation::RelaunchApp => self.ui.relaunch().map(|_| Disposition::Handled),

            Invocation::ActivateSubscription { product_identifier } => self
                .purchases
                .activate_subscription(product_identifier)
                .map(|_| Disposition::Handled),
            Invocation::ExpireSubscription { product_identifier } => self
                .purchases
                .expire_subscription(product_identifier)
                .map(|_| Disposition::Handled),
            Invocation::FailTransactions => self
                .purchases
                .fail_transactions()
                .map(|_| Disposition::Handled),

            Invocation::Skip { message } => Ok(Disposition::Skip {
                message: message.clone(),
            }),
            Invocation::Fail { message } => Ok(Disposition::Fail {
                message: message.clone(),
            }),

            Invocation::Log { message } => {
                info!("[target] {message}");
                Ok(Disposition::Handled)
            }

            // The runner never receives these; completions are consumed by
            // the communicator before fan-out and RunTest flows the other
            // way. Acknowledge and move on.
            Invocation::RunTest { number } => {
                debug!("Ignoring runner-bound RunTest #{number}");
                Ok(Disposition::Handled)
            }
            Invocation::Completed { .. } => {
                debug!("Ignoring Completed action on the notification channel");
                Ok(Disposition::Handled)
            }
        }
    }
}
