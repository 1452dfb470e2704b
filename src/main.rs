use skiff::logger::{log, LogSeverity::*};
use skiff::{Auth, Client, ClientConfig, Event, MojangSessionService};
use std::env;

/// Joins an offline-mode server and prints what happens until the server lets go of us.
#[tokio::main]
async fn main() {
    let mut args = env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_owned());
    let port = match args.next().map(|port| port.parse::<u16>()) {
        Some(Ok(port)) => port,
        Some(Err(e)) => {
            log(format!("Invalid port: {}", e), Fatal);
            return;
        }
        None => 25565,
    };
    let name = args.next().unwrap_or_else(|| "skiff".to_owned());

    log(format!("Skiff joining {}:{} as {}", host, port, name), Info);
    let config = ClientConfig {
        auto_respawn: true,
        ..ClientConfig::default()
    };
    let (client, mut events) = match Client::join(
        &host,
        port,
        &Auth::offline(&name),
        &MojangSessionService::new(),
        config,
    )
    .await
    {
        Ok(joined) => joined,
        Err(e) => {
            log(format!("Failed to join: {}", e), Fatal);
            return;
        }
    };

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                Event::Chat { json, .. } => log(format!("Chat: {}", json), Info),
                Event::Death => log("Died".to_owned(), Info),
                Event::Disconnected(reason) => log(format!("Kicked: {}", reason), Warning),
                other => log(format!("{:?}", other), Debug),
            }
        }
    });

    if let Err(e) = client.run().await {
        log(format!("Connection ended: {}", e), Error);
    }
    let _ = printer.await;
}
