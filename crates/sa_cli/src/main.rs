use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sa_core::{classify, AdcTokenSource, SentimentAnalyzer, TokenSource};
use sa_web::logging::{init_logging, DEFAULT_LOG_LEVEL};
use sa_web::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Sentiment analysis archive service", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    model: ModelArgs,
    #[command(flatten)]
    server: ServeArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone)]
struct ModelArgs {
    #[arg(long, global = true, env = "SA_MODEL", default_value = "google", help = "Sentiment model: google (default), dummy")]
    model: String,
    #[arg(long, global = true, env = "LANGUAGE_API_URL")]
    language_api_url: Option<String>,
    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, global = true, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    #[arg(long, global = true, env = "SA_HOST", default_value = "127.0.0.1")]
    host: String,
    #[arg(long, global = true, env = "SA_PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, global = true, env = "SA_STORAGE", default_value = "datastore", help = "Storage backend: datastore (default), memory")]
    storage: String,
    #[arg(long, global = true, env = "GOOGLE_CLOUD_PROJECT")]
    project_id: Option<String>,
    #[arg(long, global = true, env = "DATASTORE_NAMESPACE")]
    namespace: Option<String>,
    /// Datastore service root or emulator `host:port`.
    #[arg(long, global = true, env = "DATASTORE_EMULATOR_HOST")]
    datastore_url: Option<String>,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            storage: "datastore".to_string(),
            project_id: None,
            namespace: None,
            datastore_url: None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Analyze a single document and print the result
    Analyze {
        /// Content reference, e.g. gs://bucket/file.txt
        #[arg(required_unless_present = "text")]
        uri: Option<String>,
        #[arg(long, default_value = sa_core::DEFAULT_LANGUAGE_CODE)]
        language_code: String,
        /// Analyze this text directly instead of a reference
        #[arg(long, conflicts_with = "uri")]
        text: Option<String>,
    },
}

impl ModelArgs {
    fn to_config(&self, token_source: Option<Arc<dyn TokenSource>>) -> sa_inference::Config {
        sa_inference::Config {
            model_name: Some(self.model.clone()),
            api_key: self.api_key.clone(),
            access_token: self.access_token.clone(),
            token_source,
            base_url: self.language_api_url.clone(),
        }
    }

    /// The Google model needs minted tokens when it has neither a key nor a token.
    fn needs_credentials(&self) -> bool {
        self.model.eq_ignore_ascii_case("google")
            && self.api_key.is_none()
            && self.access_token.is_none()
    }
}

impl ServeArgs {
    fn to_storage_config(
        &self,
        access_token: Option<String>,
        token_source: Option<Arc<dyn TokenSource>>,
    ) -> sa_storage::StorageConfig {
        // Emulator connections are unauthenticated.
        let (access_token, token_source) = if self.uses_emulator() {
            (None, None)
        } else {
            (access_token, token_source)
        };
        sa_storage::StorageConfig {
            backend: Some(self.storage.clone()),
            project_id: self.project_id.clone(),
            namespace: self.namespace.clone(),
            access_token,
            token_source,
            base_url: self.datastore_url.clone(),
        }
    }

    fn uses_emulator(&self) -> bool {
        self.datastore_url.is_some()
    }

    fn needs_credentials(&self, access_token: Option<&str>) -> bool {
        self.storage.eq_ignore_ascii_case("datastore")
            && !self.uses_emulator()
            && access_token.is_none()
    }

    fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

/// Application Default Credentials, loaded only when some client has nothing else.
async fn default_credentials(needed: bool) -> anyhow::Result<Option<Arc<dyn TokenSource>>> {
    if !needed {
        return Ok(None);
    }
    let source = AdcTokenSource::from_environment()
        .await
        .context("no API key or access token given and Application Default Credentials are unavailable")?;
    info!("🔑 Using Application Default Credentials");
    let source: Arc<dyn TokenSource> = Arc::new(source);
    Ok(Some(source))
}

async fn serve(model: &ModelArgs, args: ServeArgs) -> anyhow::Result<()> {
    let needed = model.needs_credentials() || args.needs_credentials(model.access_token.as_deref());
    let credentials = default_credentials(needed).await?;

    let analyzer = sa_inference::create_model(&model.to_config(credentials.clone())).await?;
    info!("🧠 Sentiment model initialized (using {})", analyzer.name());

    let storage_config = args.to_storage_config(model.access_token.clone(), credentials);
    let store = sa_storage::create_storage(&storage_config).await?;
    info!("💾 Storage initialized (using {})", store.name());

    sa_web::serve(args.addr()?, AppState::new(analyzer, store)).await?;
    Ok(())
}

async fn analyze(
    analyzer: Arc<dyn SentimentAnalyzer>,
    uri: Option<String>,
    language_code: &str,
    text: Option<String>,
) -> anyhow::Result<()> {
    let result = match (text, uri) {
        (Some(text), _) => analyzer.analyze_inline(&text).await?,
        (None, Some(uri)) => analyzer.analyze(&uri, language_code).await?,
        (None, None) => anyhow::bail!("either a uri or --text is required"),
    };

    let output = serde_json::json!({
        "source": result.source,
        "score": result.score,
        "magnitude": result.magnitude,
        "sentiment": classify(result.score),
        "sentences": result.sentences,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging(DEFAULT_LOG_LEVEL);
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&cli.model, cli.server).await,
        Commands::Analyze { uri, language_code, text } => {
            let credentials = default_credentials(cli.model.needs_credentials()).await?;
            let analyzer = sa_inference::create_model(&cli.model.to_config(credentials)).await?;
            analyze(analyzer, uri, &language_code, text).await
        }
    }
}
