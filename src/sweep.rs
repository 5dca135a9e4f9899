use crate::cli::Cli;
use crate::discovery::{self, SERVICE_TYPE_FRAGMENTS};
use crate::soap::SoapClient;
use crate::timeparse::parse_last_activity;
use crate::types::{ConnectionRecord, KillCandidate, ServiceDescriptor, SweepSummary};
use crate::xmlutils::{collect_connection_records, find_text};
use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::*;
use serde_json::json;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::debug;
use xmltree::Element;

/// Listing actions tried in order; none of them is standardized, so every
/// result is accumulated and failures are skipped.
pub const LIST_ACTIONS: &[&str] = &[
    "GetActiveConnections",
    "GetGenericConnections",
    "GetConnectionList",
    "GetActivePortMappings",
];

/// Termination actions tried in order until one succeeds.
pub const CLOSE_ACTIONS: &[&str] = &[
    "DeleteConnection",
    "CloseConnection",
    "ForceCloseConnection",
    "DestroyConnection",
];

/// Child element names that mark an XML node as a connection entry.
pub const HINT_KEYS: &[&str] = &[
    "RemoteHost",
    "RemotePort",
    "Port",
    "Protocol",
    "BytesSent",
    "BytesReceived",
    "LastActivity",
    "LastActive",
    "LastSeen",
    "ConnectionID",
    "Id",
    "ID",
    "State",
];

pub fn write_json_file(path: &str, value: &serde_json::Value) -> Result<()> {
    let f = File::create(path)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer_pretty(&mut w, value)?;
    w.flush()?;
    Ok(())
}

/// One full sweep: discover, list, filter, terminate, summarize.
pub async fn run(cli: Cli) -> Result<()> {
    // Safety validation
    if cli.threshold_secs <= 0 {
        anyhow::bail!("--threshold-secs must be greater than zero");
    }
    if cli.timeout_ms == 0 || cli.timeout_ms > 120_000 {
        anyhow::bail!("--timeout-ms must be between 1 and 120000");
    }

    let client = SoapClient::new(
        &cli.host,
        &cli.username,
        &cli.password,
        cli.timeout_ms,
        cli.insecure,
    )?;

    let root = discovery::fetch_device_description(&client).await?;

    let svc = match discovery::locate_service(&root, SERVICE_TYPE_FRAGMENTS) {
        Some(svc) => svc,
        None => {
            eprintln!(
                "{}",
                "No compatible service found. Declared services (excerpt):".red()
            );
            for service_type in discovery::list_service_types(&root).iter().take(40) {
                eprintln!("  {}", service_type);
            }
            anyhow::bail!("no compatible connection service on this device");
        }
    };
    println!("Using service: {}", svc.service_type.bold());

    let records = list_connections(&client, &svc).await;
    if records.is_empty() {
        report_port_mapping_count(&client, &svc).await;
        println!("No active connections found or the firmware does not expose a list.");
        return Ok(());
    }
    let records = dedup_records(records);
    println!("Retrieved {} connection record(s)", records.len());

    let now = Utc::now().timestamp();
    let candidates = filter_candidates(&records, now, cli.threshold_secs);
    if candidates.is_empty() {
        println!(
            "No connections idle longer than {}s.",
            cli.threshold_secs
        );
        return Ok(());
    }

    let dry_run = !cli.live;
    println!(
        "{}",
        format!(
            "Connections to terminate: {} (dry_run={})",
            candidates.len(),
            dry_run
        )
        .bold()
    );

    let mut terminated = 0usize;
    let mut failed = 0usize;
    let mut reports: Vec<serde_json::Value> = Vec::new();

    for cand in &candidates {
        let remote = cand.record.remote_host().unwrap_or("");
        let port = cand.record.remote_port().unwrap_or("");
        let connid = cand.record.connection_id().unwrap_or("-");
        println!(
            "- {} {} connid={} last={} age={}s",
            remote.cyan(),
            port,
            connid,
            format_epoch(cand.last_seen),
            cand.age_secs
        );

        let outcome = if dry_run {
            ("dry-run", None)
        } else {
            match terminate(&client, &svc, cand).await {
                Some(action) => {
                    terminated += 1;
                    println!("  {} via {}", "terminated".green(), action);
                    ("terminated", Some(action))
                }
                None => {
                    failed += 1;
                    eprintln!(
                        "  {}",
                        "could not terminate: no close action succeeded".red()
                    );
                    ("failed", None)
                }
            }
        };

        reports.push(json!({
            "remote": remote,
            "port": port,
            "connection_id": cand.record.connection_id(),
            "last_seen": cand.last_seen,
            "age_secs": cand.age_secs,
            "outcome": outcome.0,
            "action": outcome.1,
        }));
    }

    let summary = SweepSummary {
        service_type: svc.service_type.clone(),
        records: records.len(),
        candidates: candidates.len(),
        terminated,
        failed,
        dry_run,
    };

    println!();
    println!("{}", "Sweep summary".bold().underline());
    println!("  Records:    {}", summary.records);
    println!("  Candidates: {}", summary.candidates);
    if dry_run {
        println!("  Mode:       dry run (nothing terminated)");
    } else {
        println!("  Terminated: {}", summary.terminated);
        println!("  Failed:     {}", summary.failed);
    }

    if !cli.json_out.is_empty() {
        let out = json!({
            "service": svc,
            "candidates": reports,
            "summary": summary,
        });
        if let Err(e) = write_json_file(&cli.json_out, &out) {
            eprintln!("Failed to write JSON file {}: {}", &cli.json_out, e);
        } else {
            eprintln!("Wrote JSON output to {}", &cli.json_out);
        }
    }

    Ok(())
}

/// Try every listing action and accumulate whatever records come back.
/// Unsupported actions and unparseable responses are skipped, never fatal.
pub async fn list_connections(client: &SoapClient, svc: &ServiceDescriptor) -> Vec<ConnectionRecord> {
    let mut records = Vec::new();
    for &action in LIST_ACTIONS {
        let body = match client
            .call_action(&svc.control_url, &svc.service_type, action, &[])
            .await
        {
            Ok(body) => body,
            Err(e) => {
                debug!(action, error = %e, "listing action not supported");
                continue;
            }
        };
        let doc = match Element::parse(body.as_bytes()) {
            Ok(doc) => doc,
            Err(e) => {
                debug!(action, error = %e, "unparseable listing response");
                continue;
            }
        };
        let found = collect_connection_records(&doc, HINT_KEYS);
        debug!(action, count = found.len(), "listing action answered");
        records.extend(found);
    }
    records
}

/// Collapse records with identical field maps, keeping first occurrence order.
pub fn dedup_records(records: Vec<ConnectionRecord>) -> Vec<ConnectionRecord> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for record in records {
        if seen.insert(record.fields.clone()) {
            out.push(record);
        }
    }
    out
}

/// Select records idle at least `threshold_secs` as of `now`.
/// Records without a parseable last-activity value are skipped.
pub fn filter_candidates(
    records: &[ConnectionRecord],
    now: i64,
    threshold_secs: i64,
) -> Vec<KillCandidate> {
    let mut out = Vec::new();
    for record in records {
        let Some(raw) = record.last_activity() else {
            continue;
        };
        let Some(last_seen) = parse_last_activity(raw) else {
            debug!(value = raw, "skipping record with unparseable timestamp");
            continue;
        };
        let age_secs = now - last_seen;
        if age_secs >= threshold_secs {
            out.push(KillCandidate {
                record: record.clone(),
                last_seen,
                age_secs,
            });
        }
    }
    out
}

/// Arguments identifying a connection to a close action: the connection id
/// when the record has one, else whatever remote host/port is available.
pub fn termination_args(record: &ConnectionRecord) -> Vec<(String, String)> {
    if let Some(id) = record.connection_id() {
        return vec![("ConnectionID".to_string(), id.to_string())];
    }
    let mut args = Vec::new();
    if let Some(remote) = record.remote_host() {
        args.push(("RemoteHost".to_string(), remote.to_string()));
    }
    if let Some(port) = record.remote_port() {
        args.push(("RemotePort".to_string(), port.to_string()));
    }
    args
}

/// Try close actions in declared order; returns the first one that succeeds.
pub async fn terminate(
    client: &SoapClient,
    svc: &ServiceDescriptor,
    cand: &KillCandidate,
) -> Option<&'static str> {
    let args = termination_args(&cand.record);
    for &action in CLOSE_ACTIONS {
        match client
            .call_action(&svc.control_url, &svc.service_type, action, &args)
            .await
        {
            Ok(_) => return Some(action),
            Err(e) => {
                debug!(action, error = %e, "close action failed");
            }
        }
    }
    None
}

/// Best-effort informational fallback when no connections were retrievable.
async fn report_port_mapping_count(client: &SoapClient, svc: &ServiceDescriptor) {
    let Ok(body) = client
        .call_action(
            &svc.control_url,
            &svc.service_type,
            "GetPortMappingNumberOfEntries",
            &[],
        )
        .await
    else {
        return;
    };
    let Ok(doc) = Element::parse(body.as_bytes()) else {
        return;
    };
    if let Some(n) = find_text(&doc, "NewPortMappingNumberOfEntries")
        .and_then(|s| s.parse::<u64>().ok())
    {
        println!("Port mapping entries: {}", n);
    }
}

fn format_epoch(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
