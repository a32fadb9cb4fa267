use clap::{App, Arg, ArgMatches, SubCommand};
use colored::*;
use orionsim::protocol::{
    QueryResponse, Request, RequestKind, ResponseStatus, ServerMessage, SubsystemKey,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "8081";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("orionsim")
        .version("0.1.0")
        .author("Space Systems Engineering Team")
        .about("🚀 Mission control console for the Orion telemetry simulator")
        .arg(
            Arg::with_name("host")
                .short("h")
                .long("host")
                .value_name("HOST")
                .help("Telemetry server host address")
                .takes_value(true)
                .default_value(DEFAULT_HOST)
                .global(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("Telemetry server port")
                .takes_value(true)
                .default_value(DEFAULT_PORT)
                .global(true),
        )
        .arg(
            Arg::with_name("format")
                .short("f")
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .takes_value(true)
                .possible_values(&["json", "table", "compact"])
                .default_value("table")
                .global(true),
        )
        .subcommand(
            SubCommand::with_name("monitor")
                .about("📈 Monitor the live telemetry stream")
                .arg(
                    Arg::with_name("count")
                        .short("n")
                        .long("count")
                        .value_name("SNAPSHOTS")
                        .help("Stop after this many snapshots (default: infinite)")
                        .takes_value(true),
                ),
        )
        .subcommand(SubCommand::with_name("snapshot").about("📦 Fetch the current full snapshot"))
        .subcommand(
            SubCommand::with_name("system")
                .about("🔎 Fetch one subsystem section of the current snapshot")
                .arg(
                    Arg::with_name("name")
                        .help("Subsystem name")
                        .required(true)
                        .possible_values(&[
                            "spacecraft",
                            "crew",
                            "eclss",
                            "power",
                            "propulsion",
                            "communications",
                            "timeline",
                        ]),
                ),
        )
        .subcommand(
            SubCommand::with_name("crew")
                .about("🧑‍🚀 Fetch one crew member's health data")
                .arg(
                    Arg::with_name("index")
                        .help("Crew member index (0-3)")
                        .required(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("alerts")
                .about("🚨 List alerts")
                .arg(
                    Arg::with_name("all")
                        .long("all")
                        .help("Include acknowledged alerts"),
                ),
        )
        .subcommand(
            SubCommand::with_name("ack")
                .about("✅ Acknowledge an alert by id")
                .arg(Arg::with_name("id").help("Alert id").required(true)),
        )
        .subcommand(SubCommand::with_name("health").about("🩺 Server liveness report"))
        .get_matches();

    let host = matches.value_of("host").unwrap().to_string();
    let port: u16 = matches.value_of("port").unwrap().parse()?;
    let format = matches.value_of("format").unwrap().to_string();

    match matches.subcommand() {
        ("monitor", Some(sub)) => handle_monitor(sub, &host, port, &format).await?,
        ("snapshot", _) => {
            let response = send_request(&host, port, RequestKind::GetSnapshot).await?;
            print_payload("Snapshot", &response, &format);
        }
        ("system", Some(sub)) => {
            let system = match sub.value_of("name").unwrap() {
                "spacecraft" => SubsystemKey::Spacecraft,
                "crew" => SubsystemKey::Crew,
                "eclss" => SubsystemKey::Eclss,
                "power" => SubsystemKey::Power,
                "propulsion" => SubsystemKey::Propulsion,
                "communications" => SubsystemKey::Communications,
                _ => SubsystemKey::Timeline,
            };
            let response = send_request(&host, port, RequestKind::GetSubsystem { system }).await?;
            print_payload(sub.value_of("name").unwrap(), &response, &format);
        }
        ("crew", Some(sub)) => {
            let index: usize = sub.value_of("index").unwrap().parse()?;
            let response = send_request(&host, port, RequestKind::GetCrewMember { index }).await?;
            print_payload(&format!("Crew member {index}"), &response, &format);
        }
        ("alerts", Some(sub)) => {
            let active_only = !sub.is_present("all");
            let response =
                send_request(&host, port, RequestKind::GetAlerts { active_only }).await?;
            print_alerts(&response, &format);
        }
        ("ack", Some(sub)) => {
            let id: u64 = sub.value_of("id").unwrap().parse()?;
            let response = send_request(&host, port, RequestKind::AcknowledgeAlert { id }).await?;
            match response.status {
                ResponseStatus::Ok => {
                    println!("{} Alert {} acknowledged", "✅".green(), id.to_string().bright_cyan());
                }
                ResponseStatus::NotFound => {
                    println!(
                        "{} {}",
                        "❌".red(),
                        response
                            .message
                            .unwrap_or_else(|| "alert not found".to_string())
                            .bright_red()
                    );
                }
                _ => print_payload("Acknowledge", &response, &format),
            }
        }
        ("health", _) => {
            let response = send_request(&host, port, RequestKind::Health).await?;
            print_health(&response, &format);
        }
        _ => {
            println!(
                "{}",
                "No command specified. Use --help for usage information.".yellow()
            );
            println!("{}", "Quick start:".bright_green());
            println!("  {} Start the server", "orionsim-server".bright_cyan());
            println!("  {} Watch live telemetry", "orionsim monitor".bright_cyan());
            println!("  {} Check liveness", "orionsim health".bright_cyan());
        }
    }

    Ok(())
}

/// Send one request and wait for its response, skipping any snapshot pushes
/// that arrive on the shared stream in the meantime.
async fn send_request(
    host: &str,
    port: u16,
    kind: RequestKind,
) -> Result<QueryResponse, Box<dyn std::error::Error>> {
    let addr = format!("{host}:{port}");
    let stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(err) => {
            eprintln!(
                "{} Failed to connect to telemetry server at {}",
                "❌".red(),
                addr.bright_white()
            );
            if err.kind() == std::io::ErrorKind::ConnectionRefused {
                eprintln!("{} Server is not running. Start it with:", "💡".yellow());
                eprintln!("   {}", "orionsim-server".bright_cyan());
            }
            return Err(err.into());
        }
    };

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let request = Request { id: 1, kind };
    let mut encoded = serde_json::to_string(&request)?;
    encoded.push('\n');

    let response = tokio::time::timeout(REQUEST_TIMEOUT, async move {
        writer.write_all(encoded.as_bytes()).await?;
        while let Some(line) = lines.next_line().await? {
            if let Ok(ServerMessage::Response(response)) =
                serde_json::from_str::<ServerMessage>(&line)
            {
                if response.id == request.id {
                    return Ok(response);
                }
            }
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "server closed connection",
        ))
    })
    .await
    .map_err(|_| "request timed out")??;

    Ok(response)
}

async fn handle_monitor(
    matches: &ArgMatches<'_>,
    host: &str,
    port: u16,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let limit: Option<u64> = matches.value_of("count").map(|v| v.parse()).transpose()?;

    println!(
        "{}",
        "📡 Monitoring mission telemetry (Press Ctrl+C to stop)..."
            .bright_blue()
            .bold()
    );
    if format == "table" {
        println!(
            "{}",
            "│ MET          │ Phase              │ Alt km     │ Vel km/s │ Batt % │ O2 mmHg │ Alerts │"
                .bright_white()
        );
    }

    let stream = TcpStream::connect((host, port)).await?;
    let (reader, _writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut seen = 0u64;

    while let Some(line) = lines.next_line().await? {
        let snapshot = match serde_json::from_str::<ServerMessage>(&line) {
            Ok(ServerMessage::Snapshot(snapshot)) => snapshot,
            _ => continue,
        };

        match format {
            "json" => println!("{line}"),
            "compact" => {
                let active_alerts = snapshot
                    .alerts
                    .iter()
                    .filter(|alert| !alert.acknowledged)
                    .count();
                let status = if active_alerts > 0 {
                    "ALERT".red()
                } else {
                    "OK".green()
                };
                println!(
                    "[{}] {} | {} | {:.0} km | {:.2} km/s",
                    snapshot.spacecraft.mission_elapsed_time,
                    status,
                    snapshot.timeline.current_phase,
                    snapshot.spacecraft.altitude,
                    velocity_magnitude(&snapshot),
                );
            }
            _ => {
                let battery_avg = snapshot
                    .power
                    .batteries
                    .iter()
                    .map(|battery| battery.state_of_charge)
                    .sum::<f64>()
                    / snapshot.power.batteries.len().max(1) as f64;
                let active_alerts = snapshot
                    .alerts
                    .iter()
                    .filter(|alert| !alert.acknowledged)
                    .count();
                let batt_str = if battery_avg > 40.0 {
                    format!("{battery_avg:>6.1}").green()
                } else {
                    format!("{battery_avg:>6.1}").yellow()
                };
                let alert_str = if active_alerts > 0 {
                    format!("{active_alerts:>6}").bright_red()
                } else {
                    format!("{active_alerts:>6}").bright_green()
                };
                println!(
                    "│ {} │ {:<18} │ {:>10.1} │ {:>8.2} │ {} │ {:>7.1} │ {} │",
                    snapshot.spacecraft.mission_elapsed_time,
                    snapshot.timeline.current_phase,
                    snapshot.spacecraft.altitude,
                    velocity_magnitude(&snapshot),
                    batt_str,
                    snapshot.eclss.oxygen.partial_pressure,
                    alert_str,
                );
            }
        }

        seen += 1;
        if let Some(limit) = limit {
            if seen >= limit {
                break;
            }
        }
    }

    Ok(())
}

fn velocity_magnitude(snapshot: &orionsim::Snapshot) -> f64 {
    let v = &snapshot.spacecraft.velocity;
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

fn print_payload(label: &str, response: &QueryResponse, format: &str) {
    match response.status {
        ResponseStatus::Ok => {
            let payload = response
                .payload
                .clone()
                .unwrap_or(serde_json::Value::Null);
            if format == "compact" {
                println!("{}", "OK".bright_green());
            } else {
                println!("{} {}", "📦".bright_blue(), label.bright_blue().bold());
                match serde_json::to_string_pretty(&payload) {
                    Ok(pretty) => println!("{pretty}"),
                    Err(_) => println!("{payload}"),
                }
            }
        }
        ResponseStatus::NotFound => {
            println!(
                "{} {}",
                "❌".red(),
                response
                    .message
                    .clone()
                    .unwrap_or_else(|| "not found".to_string())
                    .bright_red()
            );
        }
        _ => {
            println!(
                "{} Request failed: {}",
                "⚠️".yellow(),
                response
                    .message
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string())
                    .bright_red()
            );
        }
    }
}

fn print_alerts(response: &QueryResponse, format: &str) {
    if response.status != ResponseStatus::Ok {
        print_payload("Alerts", response, format);
        return;
    }
    if format == "json" {
        print_payload("Alerts", response, format);
        return;
    }

    let alerts: Vec<orionsim::Alert> = response
        .payload
        .clone()
        .and_then(|payload| serde_json::from_value(payload).ok())
        .unwrap_or_default();

    if alerts.is_empty() {
        println!("{} {}", "✅".green(), "No alerts".bright_green());
        return;
    }

    println!("{} {}", "🚨".red(), "Alerts".bright_blue().bold());
    for alert in alerts {
        let severity = format!("{:?}", alert.severity).to_uppercase();
        let severity = match severity.as_str() {
            "CRITICAL" => severity.bright_red().bold(),
            "CAUTION" => severity.yellow(),
            "WARNING" => severity.bright_yellow(),
            _ => severity.bright_white(),
        };
        let ack = if alert.acknowledged { " (ack)" } else { "" };
        println!(
            "  [{}] {} {}/{}: {}{}",
            alert.id,
            severity,
            alert.system.bright_cyan(),
            alert.parameter.bright_cyan(),
            alert.message,
            ack.dimmed(),
        );
    }
}

fn print_health(response: &QueryResponse, format: &str) {
    if response.status != ResponseStatus::Ok || format == "json" {
        print_payload("Health", response, format);
        return;
    }
    let payload = response.payload.clone().unwrap_or(serde_json::Value::Null);
    let status = payload["status"].as_str().unwrap_or("unknown");
    let subscribers = payload["active_subscribers"].as_u64().unwrap_or(0);
    let met = payload["mission_elapsed_time"].as_str().unwrap_or("---");

    println!("{} {}", "🩺".bright_blue(), "Server Health".bright_blue().bold());
    println!(
        "{} {}",
        "Status:".bright_white(),
        if status == "operational" {
            status.bright_green()
        } else {
            status.bright_red()
        }
    );
    println!("{} {}", "Active subscribers:".bright_white(), subscribers);
    println!("{} {}", "Mission elapsed time:".bright_white(), met);
}
