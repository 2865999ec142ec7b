use balboa_spa::telegrams::SpaState;
use balboa_spa::{EngineConfig, SerialTransport, SpaEngine};
use clap::{App, Arg};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::time;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("balboa-monitor")
        .version("0.1.0")
        .author("Spa Systems Engineering Team")
        .about("Joins a live spa bus and prints every state change as JSON")
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("DEVICE")
                .help("Serial device of the RS-485 adapter")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("baud")
                .short("b")
                .long("baud")
                .value_name("BAUD")
                .help("Line speed")
                .takes_value(true)
                .validator(|v| match v.parse::<u32>() {
                    Ok(_) => Ok(()),
                    Err(_) => Err("Baud rate must be a number".into()),
                }),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Engine config (JSON)")
                .takes_value(true),
        )
        .get_matches();

    let port = matches.value_of("port").ok_or("serial port required")?;
    let baud_rate = match matches.value_of("baud") {
        Some(baud) => baud.parse()?,
        None => SerialTransport::DEFAULT_BAUD_RATE,
    };
    let config = match matches.value_of("config") {
        Some(path) => EngineConfig::load(Path::new(path))?,
        None => EngineConfig::default(),
    };

    let transport = SerialTransport::open(port, baud_rate)?;
    info!(port, baud_rate, "serial port open");

    let mut engine = SpaEngine::new(transport, config);
    let poll_interval = Duration::from_millis(engine.get_config().poll_interval_ms);

    let mut last_published: Option<SpaState> = None;
    engine.register_listener(move |state: &SpaState| {
        if last_published.as_ref() == Some(state) {
            return;
        }
        match serde_json::to_string(state) {
            Ok(json) => println!("{}", json),
            Err(e) => warn!("cannot serialize state: {}", e),
        }
        last_published = Some(state.clone());
    });

    let start = Instant::now();
    let mut interval = time::interval(poll_interval);
    let mut was_communicating = false;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = start.elapsed().as_millis() as u64;
                if let Err(e) = engine.update(now) {
                    error!("bus read failed: {}", e);
                }

                let communicating = engine.is_communicating();
                if communicating != was_communicating {
                    if communicating {
                        info!(address = engine.get_address(), "joined the bus");
                    } else {
                        warn!("left the bus");
                    }
                    was_communicating = communicating;
                }
            }
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }

    match serde_json::to_string(engine.get_stats()) {
        Ok(json) => info!(stats = %json, "final statistics"),
        Err(e) => warn!("cannot serialize statistics: {}", e),
    }
    Ok(())
}
