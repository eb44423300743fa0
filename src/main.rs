use clap::{Parser, Subcommand};
use dotenv::dotenv;
use flowplay::engine::{
    build_sequence, ChannelSink, LifecycleEvent, PlaybackConfig, PlaybackEvent, Player,
};
use flowplay::studio::loader::GraphLoader;
use flowplay::studio::server::{self, AppState};

use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Playback config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the execution order of a graph
    Sequence {
        /// Path to the graph file (JSON or YAML)
        #[arg(short, long)]
        file: String,
    },
    /// Play a graph to completion, printing each event
    Play {
        /// Path to the graph file (JSON or YAML)
        #[arg(short, long)]
        file: String,

        /// Use debug playback (slower steps)
        #[arg(long)]
        debug: bool,
    },
    /// Serve the playback HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Graph to preload
        #[arg(short, long)]
        file: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> anyhow::Result<PlaybackConfig> {
    let config = match path {
        Some(path) => PlaybackConfig::from_file(path)?,
        None => PlaybackConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn print_event(event: &PlaybackEvent) {
    match event {
        PlaybackEvent::Highlight { node_id: Some(id) } => println!("  -> {}", id),
        PlaybackEvent::Highlight { node_id: None } => {}
        PlaybackEvent::EdgePulse { edge_id, pulsing } => {
            if *pulsing {
                println!("     ~ {}", edge_id);
            }
        }
        PlaybackEvent::Lifecycle { kind } => println!("[{}]", kind),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let loader = GraphLoader::new();

    match args.command {
        Commands::Sequence { file } => {
            let graph = loader.load(&file)?;
            let sequence = build_sequence(&graph);

            if sequence.is_empty() {
                println!("No start node found in {}", file);
                return Ok(());
            }

            for step in sequence.steps() {
                let marker = if step.is_end_node { " (end)" } else { "" };
                println!("{:>3}  {}{}", step.level, step.node_id, marker);
            }
        }
        Commands::Play { file, debug } => {
            let graph = loader.load(&file)?;
            let (sink, mut rx) = ChannelSink::channel();
            let player = Player::new(Arc::new(graph), Arc::new(sink), config)?;

            if debug {
                player.debug();
            } else {
                player.play();
            }

            loop {
                tokio::select! {
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        print_event(&event);
                        if let PlaybackEvent::Lifecycle { kind } = event {
                            if matches!(
                                kind,
                                LifecycleEvent::NoWorkflow
                                    | LifecycleEvent::CompletedFull
                                    | LifecycleEvent::CompletedPartial
                            ) {
                                break;
                            }
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        log::info!("Interrupted, stopping playback");
                        player.restart();
                        break;
                    }
                }
            }

            player.shutdown();
        }
        Commands::Serve { port, file } => {
            let graph = match file {
                Some(file) => loader.load(&file)?,
                None => Default::default(),
            };
            log::info!(
                "Serving with {} nodes, step delay {}ms",
                graph.nodes.len(),
                config.step_delay_ms
            );

            let state = AppState::new(graph, config)?;
            server::serve(port, state).await?;
        }
    }

    Ok(())
}
