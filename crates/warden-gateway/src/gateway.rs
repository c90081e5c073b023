//! Decision gateway - the single entry point for gating a request.
//!
//! # Decision Flow
//!
//! 1. **Policy** (deterministic checks)
//!    - Any violation -> BLOCKED
//!    - Classification needs a human -> PENDING, reviewer is not called
//! 2. **Risk review** (only when enabled for the resource)
//!    - Timeout, cancellation, or a bad answer -> configured fallback
//!    - Advisory mode -> verdict recorded, outcome ALLOW
//! 3. **Approval** (resolved REQUIRE_APPROVAL) -> PENDING with the verdict
//! 4. **Dry run** turns ALLOW into `DryRun`
//! 5. **Audit** - exactly one record per decision
//!
//! The resource configuration is read once per decision, so a concurrent
//! update only affects decisions that start after it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use warden_approval::{
    ApprovalRecord, ApprovalStore, ExpirySweeper, HumanDecision, PolicyCheck, PolicyEngine,
    PolicyResult, RateLimiter,
};
use warden_audit::{
    ApprovalOutcome, AuditLog, AuditRecord, ExecutionResult, PolicyOutcome, ReviewOutcome,
    StageLatency,
};
use warden_config::{ConfigStore, GatewayConfig, ResourceConfig, ReviewMode};
use warden_core::{
    ApprovalId, Clock, InvocationDraft, InvocationRequest, Outcome, ResourceId, RiskDecision,
    SystemClock, check_upstream_host,
};
use warden_review::{Assessment, HttpRiskReviewer, ReviewError, ReviewGateway, RiskReviewer};
use warden_telemetry::DecisionContext;

use crate::error::{GatewayError, GatewayResult};
use crate::executor::{UpstreamCall, UpstreamExecutor};
use crate::verdict::FinalVerdict;

/// Reason attached to an ALLOW that needed no review.
const POLICY_PASSED: &str = "policy checks passed";

/// Reason attached when a dry run skips the upstream call.
const DRY_RUN_REASON: &str = "dry run: upstream call skipped";

/// Result of replaying an approved request.
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    /// The verdict recorded for the replay: ALLOW, or BLOCKED when the
    /// resource is now disabled or fails the domain lock.
    pub verdict: FinalVerdict,
    /// What the upstream executor did.
    pub execution: ExecutionResult,
}

/// Output of the stages after policy, before auditing.
struct StageOutcome {
    outcome: Outcome,
    reasons: Vec<String>,
    review: Option<ReviewOutcome>,
    approval: Option<ApprovalRecord>,
    review_us: Option<u64>,
    approval_us: Option<u64>,
}

impl StageOutcome {
    fn new(outcome: Outcome, reasons: Vec<String>) -> Self {
        Self {
            outcome,
            reasons,
            review: None,
            approval: None,
            review_us: None,
            approval_us: None,
        }
    }
}

/// Composes policy, risk review, approvals, and audit into final verdicts.
pub struct DecisionGateway {
    config: Arc<ConfigStore>,
    policy: PolicyEngine,
    approvals: Arc<ApprovalStore>,
    audit: AuditLog,
    clock: Arc<dyn Clock>,
    default_reviewer: Option<ReviewGateway>,
    reviewers: HashMap<ResourceId, ReviewGateway>,
    executor: Option<Arc<dyn UpstreamExecutor>>,
}

impl std::fmt::Debug for DecisionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionGateway")
            .field("resources", &self.config.len())
            .field("pending", &self.approvals.len())
            .field("default_reviewer", &self.default_reviewer)
            .field("reviewers", &self.reviewers.len())
            .field("executor", &self.executor.is_some())
            .finish_non_exhaustive()
    }
}

impl DecisionGateway {
    /// Create a gateway over the given stores.
    ///
    /// Uses the system clock, no reviewer, and no executor until configured
    /// with the `with_*` builders.
    #[must_use]
    pub fn new(config: Arc<ConfigStore>, approvals: Arc<ApprovalStore>, audit: AuditLog) -> Self {
        Self {
            config,
            policy: PolicyEngine::new(Arc::new(RateLimiter::new())),
            approvals,
            audit,
            clock: Arc::new(SystemClock),
            default_reviewer: None,
            reviewers: HashMap::new(),
            executor: None,
        }
    }

    /// Build a gateway from a loaded configuration file.
    ///
    /// Resources whose review section names an `endpoint` get an
    /// [`HttpRiskReviewer`] for it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConfig`] if the configuration does not
    /// validate or a reviewer endpoint is unusable.
    pub fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        let store = Arc::new(ConfigStore::from_config(config)?);
        let approvals = Arc::new(ApprovalStore::new(config.approvals.expiry()));
        let mut gateway = Self::new(store, approvals, AuditLog::in_memory());

        for resource in &config.resources {
            if let Some(endpoint) = &resource.review.endpoint {
                let reviewer = HttpRiskReviewer::new(endpoint.as_str()).map_err(|e| {
                    GatewayError::InvalidConfig(warden_config::ConfigError::ValidationError {
                        field: format!("resources.{}.review.endpoint", resource.id),
                        message: e.to_string(),
                    })
                })?;
                gateway = gateway.with_resource_reviewer(resource.id.clone(), Arc::new(reviewer));
            }
        }
        Ok(gateway)
    }

    /// Use a different time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share a rate limiter (e.g. with an [`ExpirySweeper`]).
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.policy = PolicyEngine::new(limiter);
        self
    }

    /// Reviewer used by resources without a dedicated one.
    #[must_use]
    pub fn with_reviewer(mut self, reviewer: Arc<dyn RiskReviewer>) -> Self {
        self.default_reviewer = Some(ReviewGateway::new(reviewer));
        self
    }

    /// Reviewer for one resource.
    #[must_use]
    pub fn with_resource_reviewer(
        mut self,
        resource: impl Into<ResourceId>,
        reviewer: Arc<dyn RiskReviewer>,
    ) -> Self {
        self.reviewers
            .insert(resource.into(), ReviewGateway::new(reviewer));
        self
    }

    /// Executor for allowed and replayed requests.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn UpstreamExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// The configuration store.
    #[must_use]
    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// The approval store.
    #[must_use]
    pub fn approvals(&self) -> &Arc<ApprovalStore> {
        &self.approvals
    }

    /// The audit log.
    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Validate and publish a resource configuration. Returns its version.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidConfig`] if validation fails; the
    /// previous configuration stays in effect.
    pub fn update_resource(&self, resource: ResourceConfig) -> GatewayResult<u64> {
        Ok(self.config.upsert(resource)?)
    }

    // ------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------

    /// Validate an inbound draft and decide it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedRequest`] for an invalid draft, and
    /// otherwise whatever [`decide`](Self::decide) returns.
    pub async fn decide_invocation(
        &self,
        draft: InvocationDraft,
        cancel: &CancellationToken,
    ) -> GatewayResult<(InvocationRequest, FinalVerdict)> {
        let request = draft.validate()?;
        let verdict = self.decide(&request, cancel).await?;
        Ok((request, verdict))
    }

    /// Decide one request.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownResource`] if the resource has no
    /// configuration and [`GatewayError::Internal`] if the audit record
    /// cannot be written. Neither ever results in execution.
    pub async fn decide(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> GatewayResult<FinalVerdict> {
        let ctx = DecisionContext::new(
            request.resource_id().as_str(),
            request.operation_id(),
            request.rate_limit_key(),
        );
        let span = ctx.span();
        self.run_pipeline(request, cancel)
            .instrument(span)
            .await
    }

    async fn run_pipeline(
        &self,
        request: &InvocationRequest,
        cancel: &CancellationToken,
    ) -> GatewayResult<FinalVerdict> {
        let started = Instant::now();
        let now = self.clock.now();

        let resource = self
            .config
            .snapshot(request.resource_id())
            .ok_or_else(|| GatewayError::UnknownResource(request.resource_id().clone()))?;

        let policy = self.policy.evaluate(request, &resource.policy, now);
        let policy_us = StageLatency::micros(started.elapsed());
        let policy_outcome = policy_outcome(&policy, resource.policy.version);
        debug!(
            allowed = policy.allowed,
            requires_approval = policy.requires_approval,
            violations = policy.violations.len(),
            "policy evaluated"
        );

        let mut stage = if !policy.allowed {
            StageOutcome::new(Outcome::Blocked, policy.violation_messages())
        } else if policy.requires_approval {
            let reason = policy
                .approval_reason
                .clone()
                .unwrap_or_else(|| "operation requires approval".to_string());
            self.hold_for_approval(request, None, vec![reason])
        } else if !resource.review.enabled {
            StageOutcome::new(Outcome::Allow, vec![POLICY_PASSED.to_string()])
        } else {
            self.review_stage(request, &resource, cancel).await
        };

        if stage.outcome == Outcome::Allow && resource.policy.dry_run {
            stage.outcome = Outcome::DryRun;
            stage.reasons.push(DRY_RUN_REASON.to_string());
        }

        let approval_id = stage.approval.as_ref().map(|a| a.id);
        let mut record =
            AuditRecord::new(request, policy_outcome, stage.outcome, stage.reasons.clone(), now)
                .with_base_url(resource.policy.base_url.as_str())
                .with_latency(StageLatency {
                    policy_us,
                    review_us: stage.review_us,
                    approval_us: stage.approval_us,
                    total_us: StageLatency::micros(started.elapsed()),
                });
        if let Some(review) = stage.review {
            record = record.with_review(review);
        }
        if let Some(approval) = &stage.approval {
            record = record.with_approval(ApprovalOutcome {
                approval_id: approval.id,
                expires_at: approval.expires_at,
            });
        }

        self.audit
            .record(&record)
            .map_err(|e| GatewayError::Internal(format!("failed to write audit record: {e}")))?;

        Ok(FinalVerdict {
            outcome: stage.outcome,
            reasons: stage.reasons,
            approval_id,
            audit: record,
        })
    }

    async fn review_stage(
        &self,
        request: &InvocationRequest,
        resource: &ResourceConfig,
        cancel: &CancellationToken,
    ) -> StageOutcome {
        let config = &resource.review;
        let assessment = match self.reviewer_for(&resource.id) {
            Some(gateway) => gateway.assess(request, config, cancel).await,
            None => {
                let cause = ReviewError::Transport("no reviewer configured".to_string());
                warn!(resource = %resource.id, "review enabled without a reviewer, applying fallback");
                Assessment {
                    verdict: warden_review::fallback_verdict(config.fallback, &cause),
                    resolved: config.fallback,
                    fallback_cause: Some(cause),
                    elapsed: Duration::ZERO,
                }
            },
        };

        let advisory = config.mode == ReviewMode::Advisory;
        let review = ReviewOutcome {
            verdict: assessment.verdict.clone(),
            resolved: assessment.resolved,
            fallback_used: assessment.fallback_used(),
            advisory,
        };
        let review_us = Some(StageLatency::micros(assessment.elapsed));

        let mut stage = if advisory {
            StageOutcome::new(
                Outcome::Allow,
                vec![
                    POLICY_PASSED.to_string(),
                    format!("advisory review: {}", assessment.verdict),
                ],
            )
        } else {
            match assessment.resolved {
                RiskDecision::Allow => {
                    StageOutcome::new(Outcome::Allow, assessment.verdict.reasons.clone())
                },
                RiskDecision::Block => {
                    StageOutcome::new(Outcome::Blocked, assessment.verdict.reasons.clone())
                },
                RiskDecision::RequireApproval => {
                    let reasons = assessment.verdict.reasons.clone();
                    self.hold_for_approval(request, Some(assessment.verdict), reasons)
                },
            }
        };
        stage.review = Some(review);
        stage.review_us = review_us;
        stage
    }

    fn hold_for_approval(
        &self,
        request: &InvocationRequest,
        verdict: Option<warden_core::RiskVerdict>,
        reasons: Vec<String>,
    ) -> StageOutcome {
        let started = Instant::now();
        let record = self
            .approvals
            .create(request.clone(), verdict, self.clock.now());
        let mut stage = StageOutcome::new(Outcome::Pending, reasons);
        stage.approval = Some(record);
        stage.approval_us = Some(StageLatency::micros(started.elapsed()));
        stage
    }

    fn reviewer_for(&self, resource: &ResourceId) -> Option<&ReviewGateway> {
        self.reviewers
            .get(resource)
            .or(self.default_reviewer.as_ref())
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    /// Send an allowed request upstream and record what happened.
    ///
    /// The stored audit record is authoritative: its outcome decides whether
    /// the executor runs and its base URL, the one the domain lock checked,
    /// is where the call goes. A later configuration change never redirects
    /// an earlier decision. Only ALLOW reaches the executor; every other
    /// outcome is recorded as skipped.
    ///
    /// Execution is claimed in the audit log before the executor runs, so
    /// concurrent calls for the same verdict reach the upstream at most once.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the verdict has no stored
    /// record, `request` is not the request it was made for, or the verdict
    /// was already executed.
    pub async fn execute(
        &self,
        verdict: &FinalVerdict,
        request: &InvocationRequest,
    ) -> GatewayResult<ExecutionResult> {
        let id = verdict.audit.id;
        let stored = self
            .audit
            .get(&id)
            .map_err(|e| GatewayError::Internal(e.to_string()))?
            .ok_or_else(|| GatewayError::Internal(format!("no audit record {id}")))?;

        if stored.resource_id != *request.resource_id()
            || stored.operation_id != request.operation_id()
            || stored.path != request.path()
            || stored.verb != request.verb()
        {
            return Err(GatewayError::Internal(format!(
                "verdict {id} was not made for this request"
            )));
        }

        self.audit
            .claim_execution(&id)
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        let result = if stored.outcome.executes() {
            self.call_upstream(&stored.base_url, request).await
        } else {
            ExecutionResult::Skipped {
                reason: format!("outcome was {}", stored.outcome),
            }
        };

        self.audit
            .attach_execution(&id, result.clone(), self.clock.now())
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(result)
    }

    async fn call_upstream(&self, base_url: &str, request: &InvocationRequest) -> ExecutionResult {
        let Some(executor) = &self.executor else {
            return ExecutionResult::Skipped {
                reason: "no upstream executor configured".to_string(),
            };
        };
        if let Err(rejection) = check_upstream_host(base_url) {
            warn!(resource = %request.resource_id(), %rejection, "upstream refused by domain lock");
            return ExecutionResult::Skipped {
                reason: format!("domain lock: {rejection}"),
            };
        }

        let call = UpstreamCall::new(base_url, request);
        match executor.execute(&call).await {
            Ok(summary) => {
                info!(resource = %request.resource_id(), path = request.path(), "upstream call executed");
                ExecutionResult::Executed { summary }
            },
            Err(e) => {
                warn!(resource = %request.resource_id(), error = %e, "upstream call failed");
                ExecutionResult::Failed {
                    error: e.to_string(),
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Human decisions
    // ------------------------------------------------------------------

    /// Requests waiting for a human, oldest first.
    #[must_use]
    pub fn list_pending(&self) -> Vec<ApprovalRecord> {
        self.approvals.list_pending()
    }

    /// Approve or reject a pending request.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Approval`] with `NotFound`, `Conflict` (already
    /// decided or expired), or `Expired` (past expiry, not yet swept).
    pub fn decide_approval(
        &self,
        id: &ApprovalId,
        approver: &str,
        decision: HumanDecision,
        note: Option<String>,
    ) -> GatewayResult<ApprovalRecord> {
        Ok(self
            .approvals
            .decide(id, approver, decision, note, self.clock.now())?)
    }

    /// Replay an approved request with its exact stored arguments.
    ///
    /// Review is not run again, and neither is the rate limit. The enabled
    /// flag and the domain lock are checked against the current
    /// configuration; if either fails the replay is audited as BLOCKED and
    /// nothing is sent. Otherwise it is audited as its own ALLOW record
    /// carrying the approval, then executed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Approval`] unless the record is APPROVED and
    /// has not been replayed, and [`GatewayError::UnknownResource`] if the
    /// resource was removed in the meantime.
    pub async fn replay_approved(&self, id: &ApprovalId) -> GatewayResult<Replay> {
        let now = self.clock.now();
        let approval = self.approvals.claim_replay(id, now)?;
        let request = &approval.request;

        let resource = self
            .config
            .snapshot(request.resource_id())
            .ok_or_else(|| GatewayError::UnknownResource(request.resource_id().clone()))?;

        let mut evaluated = vec![PolicyCheck::Enabled.as_str().to_string()];
        let mut violations = Vec::new();
        if resource.policy.enabled {
            evaluated.push(PolicyCheck::DomainLock.as_str().to_string());
            if let Err(rejection) = check_upstream_host(&resource.policy.base_url) {
                violations.push(rejection.to_string());
            }
        } else {
            violations.push(format!("resource '{}' is disabled", request.resource_id()));
        }

        let (outcome, reasons) = if violations.is_empty() {
            let approver = approval.approver.as_deref().unwrap_or("unknown");
            let mut reasons = vec![format!("approved by {approver}")];
            if let Some(note) = &approval.note {
                reasons.push(note.clone());
            }
            (Outcome::Allow, reasons)
        } else {
            warn!(approval_id = %approval.id, ?violations, "approved replay blocked");
            (Outcome::Blocked, violations.clone())
        };

        let policy = PolicyOutcome {
            allowed: violations.is_empty(),
            requires_approval: true,
            violations,
            evaluated,
            config_version: resource.policy.version,
        };
        let mut record = AuditRecord::new(request, policy, outcome, reasons.clone(), now)
            .with_base_url(resource.policy.base_url.as_str())
            .with_approval(ApprovalOutcome {
                approval_id: approval.id,
                expires_at: approval.expires_at,
            });
        if let Some(verdict) = &approval.verdict {
            record = record.with_review(ReviewOutcome {
                verdict: verdict.clone(),
                resolved: RiskDecision::RequireApproval,
                fallback_used: false,
                advisory: false,
            });
        }
        self.audit
            .record(&record)
            .map_err(|e| GatewayError::Internal(format!("failed to write audit record: {e}")))?;

        let verdict = FinalVerdict {
            outcome,
            reasons,
            approval_id: Some(approval.id),
            audit: record,
        };
        info!(approval_id = %approval.id, %outcome, "replaying approved request");
        let execution = self.execute(&verdict, request).await?;
        Ok(Replay { verdict, execution })
    }

    /// Expire overdue approvals now. Returns the ids that expired.
    pub fn sweep_expired(&self) -> Vec<ApprovalId> {
        self.approvals.sweep(self.clock.now())
    }

    /// A background sweeper over this gateway's approvals and rate windows.
    #[must_use]
    pub fn expiry_sweeper(&self, interval: Duration) -> ExpirySweeper {
        ExpirySweeper::new(Arc::clone(&self.approvals), Arc::clone(&self.clock), interval)
            .with_rate_limiter(Arc::clone(self.policy.rate_limiter()))
    }
}

fn policy_outcome(policy: &PolicyResult, config_version: u64) -> PolicyOutcome {
    PolicyOutcome {
        allowed: policy.allowed,
        requires_approval: policy.requires_approval,
        violations: policy.violation_messages(),
        evaluated: policy
            .evaluated
            .iter()
            .map(|check| check.as_str().to_string())
            .collect(),
        config_version,
    }
}
