use sessionstore_config::TracingConfig;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{Layer, Registry, fmt};

type BoxedLayer = Box<dyn Layer<Registry> + Sync + Send>;

pub struct Tracing;

impl Tracing {
    /// Installs the global subscriber.
    ///
    /// Log lines go to stderr so they never mix with data the CLI prints on stdout.
    /// `ansi` is off when the CLI runs with `--no-color`.
    pub fn init(config: &TracingConfig, ansi: bool) {
        let env_filter = init_env_layer(config);

        tracing_subscriber::registry()
            .with(output_layers(config, ansi))
            .with(env_filter)
            .with(ErrorLayer::default())
            .init();
    }
}

fn output_layers(config: &TracingConfig, ansi: bool) -> Vec<BoxedLayer> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.enable {
        let stderr_layer = fmt::Layer::default()
            .with_ansi(ansi)
            .with_writer(std::io::stderr)
            .compact()
            .boxed();
        layers.push(stderr_layer);
    }

    layers
}

fn init_env_layer(config: &TracingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| config.env_filter.clone().into())
}
