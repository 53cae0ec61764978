//! # Scenario Replay
//!
//! Runs a JSON scenario against a fresh vault, one call per step, and emits
//! one JSON line per step. A scenario looks like:
//!
//! ```json
//! {
//!   "steps": [
//!     { "call": { "method": "depositFunds",
//!                 "params": { "caller": "ST1USER", "challenge_id": 1, "amount": 500 } },
//!       "expect": { "ok": null } },
//!     { "at": 100,
//!       "call": { "method": "withdrawOnCompletion",
//!                 "params": { "caller": "ST1USER", "challenge_id": 1 } },
//!       "expect": { "ok": 100 } }
//!   ]
//! }
//! ```
//!
//! `at` moves the clock forward before the call. `expect` is optional and is
//! either `{"ok": <value>}` or `{"err": <code>}`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use pledge_contracts::VaultSettings;

use crate::calls::VaultCall;
use crate::host::VaultHost;

/// A parsed scenario file.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Overrides the role identities from the node config.
    #[serde(default)]
    pub vault: Option<VaultSettings>,
    pub steps: Vec<Step>,
}

/// One call in a scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Block height to advance to before the call.
    #[serde(default)]
    pub at: Option<u64>,
    pub call: VaultCall,
    #[serde(default)]
    pub expect: Option<Expectation>,
}

/// Expected outcome of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    Ok(serde_json::Value),
    Err(u32),
}

/// Output line for a single step.
#[derive(Debug, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub height: u64,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
    /// `None` when the step carried no expectation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct StepError {
    pub code: u32,
    pub message: String,
}

/// Totals over a finished replay.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub steps: usize,
    /// Indices of steps whose outcome differed from `expect`.
    pub mismatches: Vec<usize>,
}

impl Scenario {
    /// Reads a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid scenario {}", path.display()))
    }
}

/// Runs every step of `scenario` on `host`, writing one JSON line per step
/// to `out`.
///
/// Vault errors are step outcomes, not replay failures. Only a backwards
/// clock move or an I/O error aborts the run.
pub fn run(host: &VaultHost, scenario: &Scenario, out: &mut impl Write) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();

    for (index, step) in scenario.steps.iter().enumerate() {
        if let Some(height) = step.at {
            host.advance_to(height)
                .with_context(|| format!("step {index}"))?;
        }

        let method = step.call.method();
        let (result, error) = match host.execute(step.call.clone()) {
            Ok(output) => (Some(serde_json::to_value(output)?), None),
            Err(err) => (
                None,
                Some(StepError {
                    code: err.code(),
                    message: err.to_string(),
                }),
            ),
        };

        let matched = step.expect.as_ref().map(|expect| match (expect, &result, &error) {
            (Expectation::Ok(want), Some(got), None) => want == got,
            (Expectation::Err(want), None, Some(got)) => *want == got.code,
            _ => false,
        });
        if matched == Some(false) {
            tracing::warn!(step = index, method, "outcome differs from expectation");
            report.mismatches.push(index);
        }

        let record = StepRecord {
            step: index,
            height: host.block_height(),
            method,
            result,
            error,
            matched,
        };
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
        report.steps += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pledge_contracts::SavingsVault;
    use serde_json::json;

    fn fresh_host() -> VaultHost {
        VaultHost::new(
            SavingsVault::new(VaultSettings::new("ST1AUTH", "ST1GOV", "ST1REWARDS")),
            0,
        )
    }

    fn configure_step() -> serde_json::Value {
        json!({
            "call": { "method": "configureChallenge", "params": {
                "caller": "ST1AUTH", "challenge_id": 1,
                "min_deposit": 100, "max_deposit": 1000,
                "penalty_rate": 10, "reward_rate": 20, "lock_duration": 30,
                "start_time": 0, "end_time": 100
            }},
            "expect": { "ok": null }
        })
    }

    #[test]
    fn completion_scenario_matches() {
        let scenario: Scenario = serde_json::from_value(json!({
            "steps": [
                configure_step(),
                { "call": { "method": "depositFunds",
                            "params": { "caller": "ST1USER", "challenge_id": 1, "amount": 500 } },
                  "expect": { "ok": null } },
                { "at": 100,
                  "call": { "method": "withdrawOnCompletion",
                            "params": { "caller": "ST1USER", "challenge_id": 1 } },
                  "expect": { "ok": 100 } },
                { "call": { "method": "claimReward",
                            "params": { "caller": "ST1USER", "challenge_id": 1 } },
                  "expect": { "ok": 100 } },
                { "call": { "method": "claimReward",
                            "params": { "caller": "ST1USER", "challenge_id": 1 } },
                  "expect": { "err": 129 } },
                { "call": { "method": "checkDepositStatus",
                            "params": { "challenge_id": 1, "user": "ST1USER" } },
                  "expect": { "ok": "completed" } }
            ]
        }))
        .unwrap();

        let host = fresh_host();
        let mut out = Vec::new();
        let report = run(&host, &scenario, &mut out).unwrap();

        assert_eq!(report.steps, 6);
        assert!(report.mismatches.is_empty(), "{:?}", report.mismatches);

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[2]["height"], 100);
        assert_eq!(lines[4]["error"]["code"], 129);
        assert_eq!(lines[4]["matched"], true);
    }

    #[test]
    fn mismatch_is_reported() {
        let scenario: Scenario = serde_json::from_value(json!({
            "steps": [
                configure_step(),
                { "call": { "method": "depositFunds",
                            "params": { "caller": "ST1USER", "challenge_id": 1, "amount": 50 } },
                  "expect": { "ok": null } },
                { "call": { "method": "getVaultBalance",
                            "params": { "challenge_id": 1, "user": "ST1USER" } } }
            ]
        }))
        .unwrap();

        let mut out = Vec::new();
        let report = run(&fresh_host(), &scenario, &mut out).unwrap();
        assert_eq!(report.steps, 3);
        assert_eq!(report.mismatches, vec![1]);
    }

    #[test]
    fn backwards_clock_aborts() {
        let scenario: Scenario = serde_json::from_value(json!({
            "steps": [
                { "at": 10, "call": { "method": "getVaultBalance",
                                      "params": { "challenge_id": 1, "user": "u" } } },
                { "at": 5, "call": { "method": "getVaultBalance",
                                     "params": { "challenge_id": 1, "user": "u" } } }
            ]
        }))
        .unwrap();

        let mut out = Vec::new();
        assert!(run(&fresh_host(), &scenario, &mut out).is_err());
    }

    #[test]
    fn bundled_scenarios_pass() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let scenario = Scenario::load(&path).unwrap();
            let settings = scenario
                .vault
                .clone()
                .unwrap_or_else(|| crate::config::NodeConfig::devnet().vault);
            let host = VaultHost::new(SavingsVault::new(settings), 0);
            let report = run(&host, &scenario, &mut std::io::sink()).unwrap();
            assert!(
                report.mismatches.is_empty(),
                "{} mismatched at {:?}",
                path.display(),
                report.mismatches
            );
        }
    }
}
