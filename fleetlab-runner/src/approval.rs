//! Promotion approval workflow — the terminal human-in-the-loop checkpoint
//! before a PROMOTE decision becomes an operational change.
//!
//! A candidate accumulates distinct normalized signer identities
//! (trimmed, lower-cased emails). If an approver allow-list is configured,
//! only listed signers count toward the quorum. Approval fires at or above
//! the threshold; a veto rejects; clearing a candidate resets it to
//! PENDING.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workflow state for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Quorum policy: who may sign, and how many distinct signers approve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Allow-list of approver emails (normalized). Empty means any signer
    /// counts.
    pub approvers: Vec<String>,
    /// Distinct qualifying signers required. Default 2.
    pub threshold: usize,
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            approvers: Vec::new(),
            threshold: 2,
        }
    }
}

impl ApprovalPolicy {
    pub fn with_approvers(emails: &[&str], threshold: usize) -> Self {
        Self {
            approvers: emails.iter().map(|e| normalize(e)).collect(),
            threshold,
        }
    }
}

/// Per-candidate approval record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub agent: String,
    /// Distinct normalized signer emails, in signing order.
    pub signers: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vetoed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub veto_reason: Option<String>,
}

/// Persisted approval state: candidate name → record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApprovalBook {
    #[serde(default)]
    pub candidates: BTreeMap<String, ApprovalRecord>,
}

impl ApprovalBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signature. Blank emails are ignored; duplicates (after
    /// normalization) are deduplicated; signers outside a configured
    /// allow-list are rejected silently, as the original workflow does.
    pub fn sign(&mut self, agent: &str, email: &str, policy: &ApprovalPolicy, now: DateTime<Utc>) {
        let email = normalize(email);
        if email.is_empty() {
            return;
        }
        if !policy.approvers.is_empty() && !policy.approvers.contains(&email) {
            return;
        }

        let record = self
            .candidates
            .entry(agent.to_string())
            .or_insert_with(|| ApprovalRecord {
                agent: agent.to_string(),
                signers: Vec::new(),
                created_at: now,
                updated_at: now,
                vetoed_by: None,
                veto_reason: None,
            });
        if !record.signers.contains(&email) {
            record.signers.push(email);
        }
        record.updated_at = now;
    }

    /// Veto a candidate: records who and why, and pins status to REJECTED.
    pub fn veto(&mut self, agent: &str, vetoer: &str, reason: &str, now: DateTime<Utc>) {
        let record = self
            .candidates
            .entry(agent.to_string())
            .or_insert_with(|| ApprovalRecord {
                agent: agent.to_string(),
                signers: Vec::new(),
                created_at: now,
                updated_at: now,
                vetoed_by: None,
                veto_reason: None,
            });
        record.vetoed_by = Some(normalize(vetoer));
        record.veto_reason = Some(reason.to_string());
        record.updated_at = now;
    }

    /// Drop a candidate entirely, resetting it to PENDING.
    pub fn clear(&mut self, agent: &str) {
        self.candidates.remove(agent);
    }

    /// Signers that count toward the quorum under `policy`.
    pub fn qualifying_signers(&self, agent: &str, policy: &ApprovalPolicy) -> Vec<String> {
        let record = match self.candidates.get(agent) {
            Some(r) => r,
            None => return Vec::new(),
        };
        record
            .signers
            .iter()
            .filter(|s| policy.approvers.is_empty() || policy.approvers.contains(s))
            .cloned()
            .collect()
    }

    /// Current workflow status for a candidate.
    pub fn status(&self, agent: &str, policy: &ApprovalPolicy) -> ApprovalStatus {
        if let Some(record) = self.candidates.get(agent) {
            if record.vetoed_by.is_some() {
                return ApprovalStatus::Rejected;
            }
        }
        if self.qualifying_signers(agent, policy).len() >= policy.threshold {
            ApprovalStatus::Approved
        } else {
            ApprovalStatus::Pending
        }
    }

    /// True once the quorum is met and no veto stands.
    pub fn is_approved(&self, agent: &str, policy: &ApprovalPolicy) -> bool {
        self.status(agent, policy) == ApprovalStatus::Approved
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
