use balboa_spa::crc::crc8;
use balboa_spa::frame::{encode_frame, format_frame};
use balboa_spa::telegrams::status::UNKNOWN_MODE;
use balboa_spa::telegrams::{SpaConfig, SpaFaultLog, SpaFilterSettings, SpaState};
use balboa_spa::{EngineConfig, EngineStats, MemoryTransport, SpaEngine};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use colored::*;
use serde::Serialize;
use std::path::Path;

const DEFAULT_TICK_MS: &str = "50";

#[derive(Serialize)]
struct ReplayReport<'a> {
    ticks: u64,
    address: u8,
    communicating: bool,
    config: SpaConfig,
    state: &'a SpaState,
    fault_log: &'a SpaFaultLog,
    filter_settings: &'a SpaFilterSettings,
    stats: &'a EngineStats,
    #[serde(with = "serde_bytes")]
    outbound: &'a [u8],
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("balboa")
        .version("0.1.0")
        .author("Spa Systems Engineering Team")
        .about("Offline tooling for the Balboa spa RS-485 bus")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table"])
                .default_value("table")
                .global(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log engine activity to stderr")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("replay")
                .about("Feed a captured byte stream through the engine and show the decoded spa")
                .long_about(
                    "Each non-empty line of the capture is delivered in its own poll tick. \
                     Bytes are hex, separated by whitespace or commas; '#' starts a comment.",
                )
                .arg(
                    Arg::with_name("capture")
                        .help("Capture file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::with_name("tick")
                        .long("tick")
                        .value_name("MS")
                        .help("Simulated time between lines")
                        .takes_value(true)
                        .default_value(DEFAULT_TICK_MS)
                        .validator(|v| match v.parse::<u64>() {
                            Ok(_) => Ok(()),
                            Err(_) => Err("Tick must be a number of milliseconds".into()),
                        }),
                )
                .arg(
                    Arg::with_name("config")
                        .short("c")
                        .long("config")
                        .value_name("FILE")
                        .help("Engine config (JSON)")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("encode")
                .about("Wrap content bytes (destination, source, type, payload) into a wire frame")
                .arg(
                    Arg::with_name("bytes")
                        .help("Content bytes in hex")
                        .required(true)
                        .multiple(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("crc")
                .about("Compute the bus CRC-8 over the given bytes")
                .arg(
                    Arg::with_name("bytes")
                        .help("Bytes in hex")
                        .required(true)
                        .multiple(true),
                ),
        )
        .get_matches();

    let level = if matches.is_present("verbose") {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let format = matches.value_of("format").unwrap_or("table");

    match matches.subcommand() {
        ("replay", Some(sub)) => handle_replay(sub, format),
        ("encode", Some(sub)) => handle_encode(sub, format),
        ("crc", Some(sub)) => handle_crc(sub, format),
        _ => {
            println!("{}", "No command specified. Use --help for usage information.".yellow());
            Ok(())
        }
    }
}

fn handle_replay(matches: &ArgMatches<'_>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let capture_path = matches.value_of("capture").ok_or("capture file required")?;
    let tick_ms: u64 = matches.value_of("tick").unwrap_or(DEFAULT_TICK_MS).parse()?;
    let config = match matches.value_of("config") {
        Some(path) => EngineConfig::load(Path::new(path))?,
        None => EngineConfig::default(),
    };

    let capture = std::fs::read_to_string(capture_path)?;
    let mut engine = SpaEngine::new(MemoryTransport::new(), config);
    let mut now = 0u64;
    let mut ticks = 0u64;

    for (line_number, line) in capture.lines().enumerate() {
        let bytes = parse_hex_line(line).map_err(|e| format!("{}:{}: {}", capture_path, line_number + 1, e))?;
        if bytes.is_empty() {
            continue;
        }

        engine.transport_mut().push_inbound(&bytes);
        engine.update(now)?;
        now += tick_ms;
        ticks += 1;
    }

    let outbound = engine.transport().get_outbound().to_vec();
    let report = ReplayReport {
        ticks,
        address: engine.get_address(),
        communicating: engine.is_communicating(),
        config: engine.get_current_config(),
        state: engine.get_current_state(),
        fault_log: engine.get_fault_log(),
        filter_settings: engine.get_filter_settings(),
        stats: engine.get_stats(),
        outbound: &outbound,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_replay_table(&report),
    }
    Ok(())
}

fn print_replay_table(report: &ReplayReport<'_>) {
    println!("{}", "Replay summary".bright_blue().bold());
    println!("{} {}", "Ticks:".bright_white(), report.ticks);
    let link = if report.communicating {
        format!("address 0x{:02X}", report.address).bright_green()
    } else {
        "not communicating".bright_red()
    };
    println!("{} {}", "Link:".bright_white(), link);

    let state = report.state;
    println!();
    println!("{}", "State".bright_blue().bold());
    println!("  {:<14} {}", "Current temp:", fmt_temp(state.current_temp));
    println!("  {:<14} {}", "Target temp:", fmt_temp(state.target_temp));
    println!("  {:<14} {:02}:{:02}", "Clock:", state.hour, state.minutes);
    println!("  {:<14} {}", "Rest mode:", fmt_mode(state.rest_mode));
    println!("  {:<14} {}", "Heating:", fmt_mode(state.heat_state));
    println!("  {:<14} {}", "High range:", fmt_flag(state.highrange));
    println!(
        "  {:<14} {} {} {}",
        "Jets:",
        fmt_flag(state.jet1),
        fmt_flag(state.jet2),
        fmt_flag(state.jet3)
    );
    println!("  {:<14} {}", "Blower:", fmt_flag(state.blower));
    println!("  {:<14} {}", "Circulation:", fmt_flag(state.circulation));
    println!("  {:<14} {} {}", "Lights:", fmt_flag(state.light), fmt_flag(state.light2));

    let config = &report.config;
    println!();
    println!("{}", "Configuration".bright_blue().bold());
    println!("  {:<14} {:?}", "Scale:", config.temp_scale);
    println!(
        "  {:<14} {} {} {} {} {} {}",
        "Pumps:", config.pump1, config.pump2, config.pump3, config.pump4, config.pump5, config.pump6
    );
    println!("  {:<14} {} {}", "Lights:", fmt_flag(config.light1), fmt_flag(config.light2));
    println!("  {:<14} {}", "Blower:", fmt_flag(config.blower));

    let fault = report.fault_log;
    println!();
    println!("{}", "Fault log".bright_blue().bold());
    println!(
        "  {:<14} {} ({} of {})",
        "Latest:",
        format!("{} {}", fault.fault_code, fault.message).yellow(),
        fault.current_entry,
        fault.total_entries
    );
    println!("  {:<14} {} days ago at {:02}:{:02}", "When:", fault.days_ago, fault.hour, fault.minutes);

    let filters = report.filter_settings;
    println!();
    println!("{}", "Filter cycles".bright_blue().bold());
    println!("  {:<14} {}", "Filter 1:", filters.filter1);
    if filters.filter2_enabled {
        println!("  {:<14} {}", "Filter 2:", filters.filter2);
    } else {
        println!("  {:<14} {}", "Filter 2:", "disabled".dimmed());
    }

    let stats = report.stats;
    println!();
    println!("{}", "Statistics".bright_blue().bold());
    println!("  {:<14} {}", "Bytes:", stats.bytes_received);
    println!("  {:<14} {}", "Frames:", stats.frames_accepted);
    println!("  {:<14} {}", "CRC rejects:", stats.crc_rejects);
    println!("  {:<14} {}", "Framing:", stats.framing_rejects);
    println!("  {:<14} {}", "Sent:", stats.frames_sent);
    if !report.outbound.is_empty() {
        println!("  {:<14} {}", "Outbound:", format_frame(report.outbound).as_str().dimmed());
    }
}

fn handle_encode(matches: &ArgMatches<'_>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let content = collect_hex_args(matches)?;
    let wire = encode_frame(&content)?;

    match format {
        "json" => println!("{}", serde_json::json!({ "frame": wire.as_slice() })),
        _ => println!("{}", format_frame(&wire).as_str().bright_green()),
    }
    Ok(())
}

fn handle_crc(matches: &ArgMatches<'_>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = collect_hex_args(matches)?;
    let crc = crc8(&bytes);

    match format {
        "json" => println!("{}", serde_json::json!({ "crc": crc })),
        _ => println!("{} {}", "CRC-8:".bright_white(), format!("0x{:02X}", crc).bright_green()),
    }
    Ok(())
}

fn collect_hex_args(matches: &ArgMatches<'_>) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let joined = matches
        .values_of("bytes")
        .map(|values| values.collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    Ok(parse_hex_line(&joined)?)
}

/// Parses "7E 05 0x0A,FF" or "7E050A"; everything after '#' is ignored.
fn parse_hex_line(line: &str) -> Result<Vec<u8>, String> {
    let line = line.split('#').next().unwrap_or("");
    let mut bytes = Vec::new();

    for token in line.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()) {
        let digits = token.trim_start_matches("0x").trim_start_matches("0X");
        if digits.is_empty() || digits.len() % 2 != 0 {
            return Err(format!("'{}' is not a whole number of hex bytes", token));
        }
        for pair in digits.as_bytes().chunks(2) {
            let pair = std::str::from_utf8(pair).map_err(|_| format!("'{}' is not hex", token))?;
            let byte = u8::from_str_radix(pair, 16).map_err(|_| format!("'{}' is not hex", token))?;
            bytes.push(byte);
        }
    }
    Ok(bytes)
}

fn fmt_temp(value: Option<f32>) -> ColoredString {
    match value {
        Some(degrees) => format!("{:.1}", degrees).bright_cyan(),
        None => "--".dimmed(),
    }
}

fn fmt_mode(value: u8) -> ColoredString {
    match value {
        UNKNOWN_MODE => "unknown".dimmed(),
        0 => "off".normal(),
        other => format!("on ({})", other).bright_green(),
    }
}

fn fmt_flag(on: bool) -> ColoredString {
    if on {
        "on".bright_green()
    } else {
        "off".normal()
    }
}
