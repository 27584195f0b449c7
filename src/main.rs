#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use clap::{Parser, Subcommand};
    use erd_canvas::config::EngineConfig;
    use erd_canvas::diagram::Diagram;
    use erd_canvas::measure::TableMetrics;
    use erd_canvas::store::FileBackend;
    use erd_canvas::svg::SvgRenderer;
    use erd_canvas::topology::SchemaTopology;
    use std::path::{Path, PathBuf};
    use tracing::info;

    /// Lay out and render ER diagrams from a schema topology
    #[derive(Parser, Debug)]
    #[command(name = "erd-canvas")]
    #[command(about = "Lay out and render ER diagrams from a JSON schema topology", long_about = None)]
    pub struct Args {
        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand, Debug)]
    enum Command {
        /// Render the diagram to SVG, applying any stored overrides
        Render {
            #[command(flatten)]
            source: Source,

            /// Output file (default: stdout)
            #[arg(short, long, value_name = "OUTPUT")]
            output: Option<PathBuf>,

            /// Comma-separated tables to leave out
            #[arg(long, value_delimiter = ',')]
            hide: Vec<String>,
        },
        /// Print the computed layout as JSON
        Layout {
            #[command(flatten)]
            source: Source,

            #[arg(long, value_delimiter = ',')]
            hide: Vec<String>,
        },
        /// Print the persistence key of the diagram
        Id {
            #[command(flatten)]
            source: Source,
        },
        /// Drop the stored overrides of the diagram
        Reset {
            #[command(flatten)]
            source: Source,
        },
    }

    #[derive(clap::Args, Debug)]
    struct Source {
        /// Schema topology JSON file
        #[arg(value_name = "TOPOLOGY")]
        topology: PathBuf,

        /// Layout store file
        #[arg(short, long, value_name = "STORE")]
        store: Option<PathBuf>,

        /// Engine config (TOML)
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Diagram title, prefixed to the persistence key
        #[arg(short, long)]
        title: Option<String>,
    }

    impl Source {
        async fn open(&self) -> Result<Diagram<FileBackend>, String> {
            let raw = std::fs::read_to_string(&self.topology)
                .map_err(|e| format!("Failed to read {}: {}", self.topology.display(), e))?;
            let topology = SchemaTopology::from_json(&raw).map_err(|e| e.to_string())?;
            let config = match &self.config {
                Some(path) => EngineConfig::load(path).map_err(|e| e.to_string())?,
                None => EngineConfig::default(),
            };
            let store = self
                .store
                .clone()
                .unwrap_or_else(|| default_store_path(&self.topology));

            let mut diagram = Diagram::new(topology, self.title.clone(), config, FileBackend::new(store));
            diagram.hydrate().await;
            Ok(diagram)
        }
    }

    fn default_store_path(topology: &Path) -> PathBuf {
        topology.with_extension("layout.json")
    }

    pub async fn run(args: Args) -> Result<(), String> {
        match args.command {
            Command::Render { source, output, hide } => {
                let mut diagram = source.open().await?;
                if !hide.is_empty() {
                    diagram.hide_tables(hide);
                }
                let mut scene = diagram.scene();
                // the stored canvas transform belongs to an interactive viewport
                scene.transform = None;
                let renderer = SvgRenderer::new(TableMetrics::from_config(&diagram.config().layout));
                let svg = renderer.render(diagram.topology(), diagram.layout(), &scene);

                match output {
                    Some(path) => {
                        std::fs::write(&path, svg).map_err(|e| format!("Failed to write SVG: {}", e))?;
                        eprintln!("SVG saved to: {}", path.display());
                    }
                    None => print!("{}", svg),
                }
            }
            Command::Layout { source, hide } => {
                let mut diagram = source.open().await?;
                if !hide.is_empty() {
                    diagram.hide_tables(hide);
                }
                let json = serde_json::to_string_pretty(diagram.layout()).map_err(|e| e.to_string())?;
                println!("{}", json);
            }
            Command::Id { source } => {
                let raw = std::fs::read_to_string(&source.topology)
                    .map_err(|e| format!("Failed to read {}: {}", source.topology.display(), e))?;
                let topology = SchemaTopology::from_json(&raw).map_err(|e| e.to_string())?;
                println!("{}", erd_canvas::store::diagram_id(&topology, source.title.as_deref()));
            }
            Command::Reset { source } => {
                let mut diagram = source.open().await?;
                diagram.reset_layout();
                if diagram.flush().await {
                    info!(diagram = diagram.diagram_id(), "stored layout cleared");
                }
            }
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), String> {
    use clap::Parser;

    erd_canvas::init_tracing();
    cli::run(cli::Args::parse()).await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
