use orionsim::server::{MissionServer, ServerConfig};
use orionsim::sim::{MissionSimulator, SimConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("🚀 Orion Mission Telemetry Server");
    println!("=================================");

    let sim = MissionSimulator::new(SimConfig::default());
    let server = MissionServer::bind(ServerConfig::default(), sim).await?;

    println!("   Mission Clock: ✓");
    println!("   Orbital Propagator: ✓");
    println!("   Subsystem Simulators: ✓");
    println!("   Alert Evaluator: ✓");
    println!("📡 Streaming telemetry on {}", server.local_addr()?);

    server.serve().await?;
    Ok(())
}
