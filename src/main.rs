use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use assertables::assert_le;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use log::info;
use owo_colors::OwoColorize;
use trackmap::{
    CheckerConfig, CurveType, MapIssue, Severity, SpatialIndex, TrackMap, ValidateOptions,
    load, make_start_state, next_road, parse_file, resolve_track_path, road_at, try_move, validate,
    write_tsm,
};

#[derive(Parser)]
#[command(name = "trackmap", about = "Track map checker and inspector")]
struct Cli {
    /// TOML config with the tracks root and policy toggles.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory bare track names resolve against (overrides the config).
    #[arg(long)]
    tracks_root: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parses and validates a track, printing every issue found.
    Check {
        /// Track name (resolved in the tracks root) or a path to a file.
        track: String,
        /// Treat unreachable cells as errors.
        #[arg(long)]
        strict: bool,
        /// Also write the issues to a timestamped report file.
        #[arg(long)]
        report: bool,
    },
    /// Prints a summary of a track's grid and entities.
    Info { track: String },
    /// Rewrites a track through the canonical writer.
    Fmt {
        track: String,
        /// Destination file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Drives the movement automaton from the start pose and prints each
    /// tick's road view.
    Route {
        track: String,
        /// Meters to advance per tick.
        #[arg(long, default_value_t = 5.0)]
        step: f64,
        /// Maximum number of ticks to simulate.
        #[arg(long, default_value_t = 32)]
        ticks: u32,
    },
}

fn parse_or_readline() -> anyhow::Result<Cli> {
    // Args were provided (try to parse, exit on fail)
    if std::env::args_os().len() > 1 {
        return Ok(Cli::parse());
    }

    let mut cmd = Cli::command().no_binary_name(true);

    println!("No CLI arguments were provided");
    println!("Specify arguments via stdin:");
    println!("{}", cmd.render_long_help());

    std::io::stdout().flush().context("could not write to stdout")?;
    let mut buffer = String::new();
    std::io::stdin().read_line(&mut buffer).context("could not read stdin")?;

    let args = shlex::split(buffer.trim()).context("invalid quoting")?;
    let matches = cmd.try_get_matches_from(args).context("failed to parse args")?;

    Cli::from_arg_matches(&matches).context("failed to parse args")
}

fn main() -> anyhow::Result<ExitCode> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args = parse_or_readline()?;
    let config = match &args.config {
        Some(path) => CheckerConfig::load(path)?,
        None => CheckerConfig::default(),
    };
    let tracks_root = args.tracks_root.clone().unwrap_or_else(|| config.tracks_root());

    match args.cmd {
        Command::Check { track, strict, report } => {
            let mut options = config.validate_options();
            options.unreachable_is_error |= strict;
            check(&resolve_track_path(&tracks_root, &track), &options, report)
        }
        Command::Info { track } => {
            info_cmd(&resolve_track_path(&tracks_root, &track), &config.validate_options())
        }
        Command::Fmt { track, output } => {
            fmt_cmd(&resolve_track_path(&tracks_root, &track), output.as_deref())
        }
        Command::Route { track, step, ticks } => {
            route(&resolve_track_path(&tracks_root, &track), &config.validate_options(), step, ticks)
        }
    }
}

fn load_or_fail(
    path: &Path,
    options: &ValidateOptions,
) -> anyhow::Result<Result<(TrackMap, Vec<MapIssue>), ExitCode>> {
    match load(path, options) {
        Ok(loaded) => Ok(Ok(loaded)),
        Err(err) => {
            eprintln!("{}: {err:#}", "error".red().bold());
            Ok(Err(ExitCode::FAILURE))
        }
    }
}

fn check(path: &Path, options: &ValidateOptions, report: bool) -> anyhow::Result<ExitCode> {
    let (map, issues) = match load_or_fail(path, options)? {
        Ok(loaded) => loaded,
        Err(code) => return Ok(code),
    };

    for issue in &issues {
        print_issue(issue);
    }

    let errors = issues.iter().filter(|i| i.is_error()).count();
    let warnings = issues.len() - errors;
    println!(
        "{}: {} cells, {} errors, {} warnings",
        if map.metadata().name.is_empty() { path.display().to_string() } else { map.metadata().name.clone() },
        map.cells().len(),
        errors,
        warnings
    );

    if report {
        let run_timestamp = chrono::Local::now().format("%y%m%d_%H%M%S");
        let report_path = format!("{run_timestamp}_issues.log");
        info!("Writing issue report to {report_path}");
        let mut file = File::create(&report_path)?;
        for issue in &issues {
            writeln!(file, "{issue}")?;
        }
    }

    Ok(if errors == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn info_cmd(path: &Path, options: &ValidateOptions) -> anyhow::Result<ExitCode> {
    let outcome = match parse_file(path) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}: {err:#}", "error".red().bold());
            return Ok(ExitCode::FAILURE);
        }
    };
    let map = outcome.map;
    let result = validate(&map, options);

    let summary = map.summary();
    println!("name:       {}", summary.name);
    println!("start:      {} heading {}", summary.start.cell, summary.start.heading);
    println!("cell size:  {} m", map.cell_size_m());
    match summary.cell_bounds {
        Some((min, max)) => println!("cells:      {} in {min}..{max}", summary.cell_count),
        None => println!("cells:      0"),
    }
    println!("shapes:     {}", summary.shape_count);
    println!("sectors:    {}", summary.sector_count);
    println!("areas:      {}", summary.area_count);
    println!("portals:    {}", summary.portal_count);
    println!("links:      {}", summary.link_count);
    println!("paths:      {}", summary.path_count);
    println!("beacons:    {}", summary.beacon_count);
    println!("markers:    {}", summary.marker_count);
    println!("approaches: {}", summary.approach_count);

    if !outcome.issues.is_empty() {
        println!("parse issues: {}", outcome.issues.len());
    }
    let mut stats: Vec<_> = result.issue_stats().into_iter().collect();
    stats.sort_by_key(|&(kind, _)| format!("{kind}"));
    for (kind, count) in stats {
        println!("issues ({kind}): {count}");
    }

    let has_errors =
        outcome.issues.iter().any(MapIssue::is_error) || !result.is_valid();
    Ok(if has_errors { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn fmt_cmd(path: &Path, output: Option<&Path>) -> anyhow::Result<ExitCode> {
    let outcome = match parse_file(path) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}: {err:#}", "error".red().bold());
            return Ok(ExitCode::FAILURE);
        }
    };
    if outcome.issues.iter().any(MapIssue::is_error) {
        for issue in outcome.issues.iter().filter(|i| i.is_error()) {
            print_issue(issue);
        }
        eprintln!("{}: refusing to rewrite a track that did not parse cleanly", "error".red().bold());
        return Ok(ExitCode::FAILURE);
    }

    let canonical = write_tsm(&outcome.map);
    match output {
        Some(out_path) => std::fs::write(out_path, canonical)
            .with_context(|| format!("failed to write {}", out_path.display()))?,
        None => print!("{canonical}"),
    }
    Ok(ExitCode::SUCCESS)
}

fn route(path: &Path, options: &ValidateOptions, step: f64, ticks: u32) -> anyhow::Result<ExitCode> {
    let (map, issues) = match load_or_fail(path, options)? {
        Ok(loaded) => loaded,
        Err(code) => return Ok(code),
    };
    if issues.iter().any(MapIssue::is_error) {
        eprintln!("{}: track has structural errors, refusing to drive it", "error".red().bold());
        for issue in issues.iter().filter(|i| i.is_error()) {
            print_issue(issue);
        }
        return Ok(ExitCode::FAILURE);
    }

    let index = SpatialIndex::build(&map);
    let mut state = make_start_state(&map);
    // Each beacon announces once per drive
    let mut announced = std::collections::HashSet::new();

    for tick in 0..ticks {
        let heading = state.heading;
        let outcome = try_move(&index, &mut state, step, heading);
        assert_le!(state.pending_m, map.cell_size_m());

        let road = &outcome.road;
        let bend = match road.curve_type {
            CurveType::Straight => "straight",
            CurveType::Left => "left",
            CurveType::Right => "right",
        };
        println!(
            "tick {tick:>3}: cell {} {} width {:.1} m {} {}{}",
            state.cell,
            state.heading,
            road.width_m(),
            bend,
            road.surface,
            if road.is_safe_zone { " [safe]" } else { "" },
        );
        if let Some(upcoming) = next_road(&index, &state, trackmap::DEFAULT_LOOKAHEAD_M) {
            let ahead = match upcoming.curve_type {
                CurveType::Straight => "straightens",
                CurveType::Left => "bends left",
                CurveType::Right => "bends right",
            };
            println!("          road {ahead} ahead");
        }
        for beacon in index.active_beacons(state.position, state.heading_deg) {
            if announced.insert(beacon.id.to_ascii_lowercase()) {
                let cue = beacon.name.as_deref().unwrap_or(&beacon.id);
                println!("          beacon: {cue}");
            }
        }

        if outcome.boundary_hit {
            println!("boundary hit after {:.1} m", state.distance_m);
            break;
        }
    }

    let final_road = road_at(&index, &state);
    println!(
        "stopped at {} after {:.1} m (surface {}, {})",
        state.cell,
        state.distance_m,
        final_road.surface,
        if final_road.is_out_of_bounds { "out of bounds" } else { "in bounds" }
    );
    Ok(ExitCode::SUCCESS)
}

fn print_issue(issue: &MapIssue) {
    let severity = match issue.severity {
        Severity::Error => issue.severity.to_string().red().bold().to_string(),
        Severity::Warning => issue.severity.to_string().yellow().to_string(),
    };
    match issue.line {
        Some(line) => println!("line {line}: {severity} ({}): {}", issue.kind, issue.message),
        None => println!("{severity} ({}): {}", issue.kind, issue.message),
    }
}
