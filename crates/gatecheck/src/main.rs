//! `gatecheck` - CLI for QR-code check-in
//!
//! This binary decodes QR payloads from images or a watched spool directory
//! and verifies the scanned identifiers against a remote spreadsheet roster.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use gatecheck::checkin::{check_in, check_in_dry_run, CheckinOutcome};
use gatecheck::cli::{
    Cli, Command, ConfigCommand, HistoryCommand, LookupCommand, ScanCommand, StatusCommand,
    WatchCommand,
};
use gatecheck::payload::{hash_payload, ScanPayload};
use gatecheck::roster::Roster;
use gatecheck::source::FrameSource;
use gatecheck::{
    decode, init_logging, Config, DirectoryWatchSource, Error, History, ScanRecord, SheetClient,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Execute the command
    match cli.command {
        Command::Scan(scan_cmd) => handle_scan(&config, &scan_cmd),
        Command::Watch(watch_cmd) => handle_watch(&config, &watch_cmd),
        Command::Lookup(lookup_cmd) => handle_lookup(&config, &lookup_cmd),
        Command::History(history_cmd) => handle_history(&config, &history_cmd),
        Command::Status(status_cmd) => handle_status(&config, &status_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

/// Open the scan history and apply the configured retention.
fn open_history(config: &Config) -> anyhow::Result<History> {
    let history = History::open(config.database_path())?;
    if let Some(max_age) = config.max_age() {
        history.prune_older_than(max_age)?;
    }
    if config.history.max_records > 0 {
        history.prune_keep_recent(config.history.max_records)?;
    }
    Ok(history)
}

/// Parse one raw payload, run the check, and record the attempt.
///
/// Malformed payloads are recorded before the error is returned so the
/// history reflects every scan attempt, not just the well-formed ones.
fn process_raw_payload(
    roster: &mut dyn Roster,
    history: &History,
    source: &str,
    raw: &str,
    pattern: Option<&Regex>,
    dry_run: bool,
) -> gatecheck::Result<CheckinOutcome> {
    match ScanPayload::parse_matching(raw, pattern) {
        Ok(payload) => {
            let outcome = if dry_run {
                check_in_dry_run(roster, &payload)?
            } else {
                check_in(roster, &payload)?
            };
            history.insert(&ScanRecord::new(
                source,
                Some(payload.content_hash()),
                Some(payload.id().to_string()),
                outcome.label(),
                outcome.to_string(),
            ))?;
            Ok(outcome)
        }
        Err(err) => {
            history.insert(&ScanRecord::new(
                source,
                Some(hash_payload(raw)),
                None,
                "invalid_payload",
                err.to_string(),
            ))?;
            Err(err)
        }
    }
}

fn handle_scan(config: &Config, cmd: &ScanCommand) -> anyhow::Result<()> {
    config.validate_remote()?;
    let pattern = config.id_regex()?;
    let history = open_history(config)?;
    let mut client = SheetClient::connect(&config.sheet)?;

    let source = format!("scan:{}", cmd.image.display());
    let payloads = match decode::decode_image(&cmd.image) {
        Ok(payloads) => payloads,
        Err(err) => {
            if err.is_no_code_found() {
                history.insert(&ScanRecord::new(
                    source.as_str(),
                    None,
                    None,
                    "no_code",
                    err.to_string(),
                ))?;
            }
            return Err(err.into());
        }
    };

    let mut outcomes = Vec::new();
    for raw in &payloads {
        let outcome =
            process_raw_payload(&mut client, &history, &source, raw, pattern.as_ref(), cmd.dry_run)?;
        outcomes.push(outcome);
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for outcome in &outcomes {
            if cmd.dry_run && outcome.is_mutation() {
                println!("[dry-run] {outcome}");
            } else {
                println!("{outcome}");
            }
        }
    }
    Ok(())
}

fn handle_watch(config: &Config, cmd: &WatchCommand) -> anyhow::Result<()> {
    config.validate_remote()?;
    let pattern = config.id_regex()?;
    let history = open_history(config)?;
    let mut client = SheetClient::connect(&config.sheet)?;

    let dir = cmd.dir.clone().unwrap_or_else(|| config.spool_dir());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create spool directory {}", dir.display()))?;

    let interval = cmd
        .interval_ms
        .map_or_else(|| config.poll_interval(), Duration::from_millis);
    let mut source = DirectoryWatchSource::new(&dir, interval, config.watch.extensions.clone());
    let handle = source.handle();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let (tx, mut rx) = mpsc::channel(16);
        let source_task = tokio::spawn(async move { source.run(tx).await });

        println!("Watching {} (Ctrl-C to stop)", dir.display());

        let dedup_window = config.dedup_window();
        let result = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("Stopping watch...");
                    break Ok(());
                }
                frame = rx.recv() => {
                    let Some(frame) = frame else { break Ok(()) };
                    if let Err(err) = process_frame(
                        &mut client,
                        &history,
                        &frame.path,
                        pattern.as_ref(),
                        dedup_window,
                    ) {
                        break Err(err);
                    }
                }
            }
        };

        handle.stop();
        rx.close();
        match source_task.await {
            Ok(source_result) => source_result?,
            Err(join_err) => return Err(anyhow::anyhow!("frame source task failed: {join_err}")),
        }
        result
    })
}

/// Decode one watched frame and run the check for each new payload.
///
/// A code held in front of the source shows up in many consecutive frames, so
/// payloads whose hash was already recorded inside the dedup window are
/// skipped. The history backs the window, which makes it survive restarts.
///
/// Frames without a decodable code and malformed payloads keep the watch
/// alive; roster errors end it, matching the halt-on-failure behavior of a
/// single scan.
fn process_frame(
    roster: &mut dyn Roster,
    history: &History,
    frame_path: &std::path::Path,
    pattern: Option<&Regex>,
    dedup_window: Option<Duration>,
) -> anyhow::Result<()> {
    let source = format!("watch:{}", frame_path.display());
    let payloads = match decode::decode_image(frame_path) {
        Ok(payloads) => payloads,
        Err(err) if err.is_no_code_found() => {
            debug!("{}", err);
            return Ok(());
        }
        Err(err) => {
            warn!("Skipping frame: {}", err);
            return Ok(());
        }
    };

    for raw in &payloads {
        if let Some(window) = dedup_window {
            if history.seen_hash_within(&hash_payload(raw), window)? {
                debug!("Skipping already-handled payload from {}", source);
                continue;
            }
        }
        match process_raw_payload(roster, history, &source, raw, pattern, false) {
            Ok(outcome) => println!("{outcome}"),
            Err(Error::PayloadFormat { .. }) => {
                // Bad code in front of the camera; keep watching
                eprintln!("rejected payload from {source}");
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_lookup(config: &Config, cmd: &LookupCommand) -> anyhow::Result<()> {
    config.validate_remote()?;
    let mut client = SheetClient::connect(&config.sheet)?;

    match client.find(&cmd.id)? {
        Some(entry) => {
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                println!("ID:       {}", entry.id);
                println!("Name:     {}", entry.name);
                println!("Mobile:   {}", entry.mobile);
                println!(
                    "Verified: {}",
                    if entry.verified { "yes" } else { "no" }
                );
            }
        }
        None => {
            if cmd.json {
                println!("null");
            } else {
                println!("no roster entry for ID '{}'", cmd.id);
            }
        }
    }
    Ok(())
}

fn handle_history(config: &Config, cmd: &HistoryCommand) -> anyhow::Result<()> {
    let history = open_history(config)?;
    let records = match &cmd.outcome {
        Some(outcome) => history.get_by_outcome(outcome, cmd.limit)?,
        None => history.get_recent(cmd.limit)?,
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No scan records.");
        return Ok(());
    }
    for record in &records {
        println!(
            "{}  {:<12}  {:<12}  {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.outcome,
            record.scanned_id.as_deref().unwrap_or("-"),
            record.message,
        );
    }
    Ok(())
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let history = open_history(config)?;
    let stats = history.stats()?;

    let roster_status = match config.validate_remote() {
        Err(err) => format!("not configured: {err}"),
        Ok(()) => match SheetClient::connect(&config.sheet) {
            Err(err) => format!("unavailable: {err}"),
            Ok(mut client) => match client.entries() {
                Ok(entries) => format!("reachable ({} entries)", entries.len()),
                Err(err) => format!("unreachable: {err}"),
            },
        },
    };

    if cmd.json {
        let status = serde_json::json!({
            "spreadsheet_id": config.sheet.spreadsheet_id,
            "worksheet": config.sheet.worksheet,
            "roster": roster_status,
            "history_path": config.database_path(),
            "history": stats,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("gatecheck status");
        println!("----------------");
        println!("Spreadsheet:  {}", config.sheet.spreadsheet_id);
        println!("Worksheet:    {}", config.sheet.worksheet);
        println!("Roster:       {roster_status}");
        println!("History:      {}", config.database_path().display());
        println!("Scans logged: {}", stats.total_records);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Sheet]");
                println!("  Endpoint:        {}", config.sheet.endpoint);
                println!("  Spreadsheet id:  {}", config.sheet.spreadsheet_id);
                println!("  Worksheet:       {}", config.sheet.worksheet);
                println!("  Token env var:   {}", config.sheet.token_env);
                println!(
                    "  ID pattern:      {}",
                    config.sheet.id_pattern.as_deref().unwrap_or("(none)")
                );
                println!();
                println!("[Watch]");
                println!("  Spool dir:       {}", config.spool_dir().display());
                println!("  Poll interval:   {} ms", config.watch.poll_interval_ms);
                println!("  Extensions:      {}", config.watch.extensions.join(", "));
                println!(
                    "  Dedup window:    {}",
                    match config.watch.dedup_window_secs {
                        0 => "disabled".to_string(),
                        secs => format!("{secs} s"),
                    }
                );
                println!();
                println!("[History]");
                println!("  Database path:   {}", config.database_path().display());
                println!("  Max records:     {}", config.history.max_records);
                println!("  Max age (days):  {}", config.history.max_age_days);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
