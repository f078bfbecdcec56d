//! Command implementations.
//!
//! Each command returns `Ok(true)` on success, `Ok(false)` when the
//! configuration was refused, and `Err` for operational failures.

use crate::SourceArgs;
use anyhow::{bail, Context, Result};
use pathway_config::{
    Acknowledgement, Address, ApplyMode, ApplyOptions, ApplyReport, ApplyResult, ConfigurationSet,
    EndpointId, EndpointRegistry, HardhatDeploymentProvider,
    InMemoryEndpointConfig, LiveState, NetworkTable, PathwayConfigApi, PathwayConfigService,
    PathwayError, PathwayKey, ReconcilerConfig, ValidationOutcome, WiringFile,
};
use pathway_telemetry::{log_event, log_pathway_event};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Parse `EID=ADDRESS`.
pub fn parse_endpoint(s: &str) -> Result<(EndpointId, Address), String> {
    let (eid, address) = s
        .split_once('=')
        .ok_or_else(|| format!("expected EID=ADDRESS, got {s:?}"))?;
    let eid = eid
        .trim()
        .parse::<u32>()
        .map_err(|e| format!("invalid endpoint id {eid:?}: {e}"))?;
    let address = address
        .trim()
        .parse::<Address>()
        .map_err(|e| e.to_string())?;
    Ok((EndpointId(eid), address))
}

/// Loaded inputs shared by every command.
struct Inputs {
    registry: EndpointRegistry,
    wiring: WiringFile,
    target: ConfigurationSet,
    live: LiveState,
}

fn registry(source: &SourceArgs) -> Result<EndpointRegistry> {
    let mut registry = match &source.deployments {
        Some(dir) => {
            let provider = HardhatDeploymentProvider::new(dir, &source.contract);
            EndpointRegistry::from_provider(&provider)
                .with_context(|| format!("Failed to read deployments from {}", dir.display()))?
        }
        None => EndpointRegistry::new(),
    };
    for (id, address) in &source.endpoints {
        registry.register(*id, *address)?;
    }
    if registry.is_empty() {
        bail!("No endpoints registered: pass --deployments or --endpoint");
    }
    Ok(registry)
}

fn load(source: &SourceArgs) -> Result<Inputs> {
    let registry = registry(source)?;
    let wiring = WiringFile::read(&source.config)
        .with_context(|| format!("Failed to read {}", source.config.display()))?;
    let target = wiring
        .configuration_set(&registry)
        .with_context(|| format!("Invalid configuration in {}", source.config.display()))?;

    let live = match &source.live {
        Some(path) if path.exists() => WiringFile::read(path)
            .and_then(|file| file.live_state(&registry))
            .with_context(|| format!("Failed to load live snapshot {}", path.display()))?,
        _ => LiveState::new(),
    };

    Ok(Inputs {
        registry,
        wiring,
        target,
        live,
    })
}

fn service(
    inputs: &Inputs,
    config: &ReconcilerConfig,
) -> (
    Arc<InMemoryEndpointConfig>,
    PathwayConfigService<InMemoryEndpointConfig, InMemoryEndpointConfig>,
) {
    let endpoint = Arc::new(InMemoryEndpointConfig::with_live(
        inputs.registry.clone(),
        &inputs.live,
    ));
    let service = PathwayConfigService::new(Arc::clone(&endpoint), Arc::clone(&endpoint), config.clone());
    (endpoint, service)
}

fn describe_outcome(outcome: &ValidationOutcome) -> String {
    match outcome {
        ValidationOutcome::Accepted => "accepted".to_string(),
        ValidationOutcome::AcceptedWithWarnings(advisories) => {
            let notes: Vec<String> = advisories.iter().map(ToString::to_string).collect();
            format!("accepted with warnings: {}", notes.join("; "))
        }
        ValidationOutcome::Rejected(rejection) => format!("REJECTED: {rejection}"),
    }
}

fn describe_result(result: &ApplyResult) -> String {
    match result {
        ApplyResult::Applied => "applied".to_string(),
        ApplyResult::Skipped => "skipped".to_string(),
        ApplyResult::Failed(failure) => format!("FAILED: {failure}"),
    }
}

fn print_results(results: &BTreeMap<PathwayKey, ApplyResult>) {
    for (key, result) in results {
        println!("  {key}: {}", describe_result(result));
    }
}

/// `validate`
pub fn validate(source: &SourceArgs, config: &ReconcilerConfig) -> Result<bool> {
    let inputs = load(source)?;
    let (_, service) = service(&inputs, config);
    let report = service.validate(&inputs.live, &inputs.target);

    println!(
        "{} pathway(s) in target, {} to create or update",
        inputs.target.len(),
        report.len()
    );
    for (key, outcome) in report.iter() {
        println!("  {key}: {}", describe_outcome(outcome));
    }
    log_event!(
        info,
        "validate",
        "Validation finished",
        pathways = report.len(),
        advisories = report.advisories().len()
    );
    Ok(report.is_clean())
}

/// `diff`
pub fn diff(source: &SourceArgs, config: &ReconcilerConfig) -> Result<bool> {
    let inputs = load(source)?;
    let (_, service) = service(&inputs, config);
    let diff = service.diff(&inputs.live, &inputs.target);

    for target in &diff.creates {
        println!("+ {}", target.key());
    }
    for update in &diff.updates {
        let instruction = pathway_config::update_instruction(&update.live, &update.target);
        let phases: Vec<String> = instruction
            .updates()
            .iter()
            .map(|u| format!("{:?}", u.phase()))
            .collect();
        println!("~ {} [{}]", update.target.key(), phases.join(", "));
    }
    for key in &diff.unchanged {
        println!("= {key}");
    }
    for key in &diff.untracked {
        println!("? {key} (live only, left untouched)");
    }
    if diff.is_empty() {
        println!("No changes.");
    }
    log_event!(info, "diff", "Diff computed", changes = diff.change_count());
    Ok(true)
}

/// Apply flags after defaults are resolved.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub mode: ApplyMode,
    pub ack_all: bool,
    pub ack: Vec<PathwayKey>,
    pub timeout_secs: Option<u64>,
}

impl ApplyRequest {
    fn options(&self) -> ApplyOptions {
        let acknowledgement = if self.ack_all {
            Acknowledgement::All
        } else if self.ack.is_empty() {
            Acknowledgement::None
        } else {
            Acknowledgement::Pathways(self.ack.iter().copied().collect())
        };
        let mut options = ApplyOptions::default()
            .with_mode(self.mode)
            .with_acknowledgement(acknowledgement);
        if let Some(secs) = self.timeout_secs {
            options = options.with_timeout(Duration::from_secs(secs));
        }
        options
    }
}

/// `apply`
pub async fn apply(
    source: &SourceArgs,
    config: &ReconcilerConfig,
    request: ApplyRequest,
) -> Result<bool> {
    let Some(live_path) = &source.live else {
        bail!("apply needs --live to know where to write the resulting snapshot");
    };
    let inputs = load(source)?;
    let (endpoint, service) = service(&inputs, config);

    let outcome = service.reconcile(&inputs.target, request.options()).await;

    let mut snapshot = WiringFile::from_live(&endpoint.snapshot());
    snapshot.contracts = inputs.wiring.contracts.clone();
    snapshot
        .write(live_path)
        .with_context(|| format!("Failed to write snapshot {}", live_path.display()))?;

    match outcome {
        Ok(report) => {
            print_report(&report);
            Ok(true)
        }
        Err(err @ (PathwayError::BatchRejected { .. } | PathwayError::PartialApplyFailure { .. })) => {
            println!("{err}");
            if let Some(results) = err.results() {
                print_results(results);
                for (key, result) in results.iter().filter(|(_, r)| r.is_failed()) {
                    log_pathway_event!(warn, "apply", "Pathway not applied", key, result = %describe_result(result));
                }
            }
            if err.requires_rediff() {
                println!("Some pathways timed out; run diff again before trusting the snapshot.");
            }
            Ok(false)
        }
        Err(err) => Err(err).context("Apply failed"),
    }
}

fn print_report(report: &ApplyReport) {
    println!(
        "Applied {}, skipped {}, failed {}",
        report.applied().len(),
        report.skipped().len(),
        report.failed().len()
    );
    print_results(&report.results);
}

/// `networks`
pub fn networks() -> Result<bool> {
    for (name, id) in NetworkTable::known().iter() {
        let kind = if id.is_testnet() { "testnet" } else { "mainnet" };
        println!("{name:<20} {:<8} {kind}", id.to_string());
    }
    Ok(true)
}
