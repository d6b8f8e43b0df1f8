//! Example: print the lowest free TCP port and the processes holding
//! localhost ports.

use wincmd_core::{PortFinder, PortRange, Protocol, SystemRunner};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let finder = PortFinder::new(SystemRunner::new());

    match finder
        .lowest_free_port(Protocol::Tcp, PortRange::default())
        .await
    {
        Ok(port) => println!("Lowest free TCP port: {}", port),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    match finder.localhost_processes_with_ports().await {
        Ok(by_pid) => {
            println!("\n{:<8} {}", "PID", "PORTS");
            println!("{}", "-".repeat(40));
            for (pid, ports) in &by_pid {
                let ports: Vec<String> = ports.iter().map(u16::to_string).collect();
                println!("{:<8} {}", pid, ports.join(", "));
            }
        }
        Err(e) => eprintln!("Error: {}", e),
    }
}
