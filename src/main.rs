use replybot::app::App;
use replybot::cli::{Cli, Commands, ConfigAction, CorpusAction};
use replybot::config::{Config, ConfigValidator};
use replybot::corpus::{
    load_corpus, store_from_config, Category, CorpusFile, GreetingRow, QuestionRow,
};
use replybot::error::{ReplybotError, Result};
use replybot::resolver::ResolvedReply;
use replybot::server::Server;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve => {
            cmd_serve(cli.config, cli.profile)?;
        }
        Commands::Ask {
            utterance,
            no_generate,
            json,
        } => {
            cmd_ask(cli.config, cli.profile, &utterance, no_generate, json)?;
        }
        Commands::Corpus { action } => {
            cmd_corpus(cli.config, cli.profile, action)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "replybot=debug" } else { "replybot=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| ReplybotError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}

fn cmd_serve(config_path: Option<PathBuf>, profile: Option<String>) -> Result<()> {
    let config = load_config(config_path, profile)?;
    tracing::info!("Configuration loaded successfully");

    runtime()?.block_on(async {
        let app = App::build(&config).await?;
        Server::new(config, app).run().await
    })
}

fn cmd_ask(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    utterance: &str,
    no_generate: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path, profile)?;

    runtime()?.block_on(async {
        let app = App::build(&config).await?;

        if no_generate {
            let resolved = app.resolver().resolve(utterance).await?;
            if json {
                println!("{}", to_json(&resolved, "Failed to serialize resolution")?);
                return Ok(());
            }
            match resolved {
                ResolvedReply::Corpus {
                    reply,
                    matched,
                    category,
                    score,
                } => {
                    println!("{}", reply);
                    println!("  matched {} \"{}\" (score {:.3})", category, matched, score);
                }
                ResolvedReply::Fallback { best_score, .. } => {
                    println!("No confident match, the generation model would answer");
                    if let Some(score) = best_score {
                        println!("  best score {:.3}", score);
                    }
                }
            }
            return Ok(());
        }

        let reply = app.responder().respond(utterance).await?;
        if json {
            println!("{}", to_json(&reply, "Failed to serialize reply")?);
        } else {
            println!("{}", reply.text);
        }
        Ok(())
    })
}

fn cmd_corpus(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: CorpusAction,
) -> Result<()> {
    let config = load_config(config_path, profile)?;

    match action {
        CorpusAction::Show { json } => runtime()?.block_on(async {
            let store = store_from_config(&config.corpus)?;
            let corpus = load_corpus(store.as_ref()).await?;

            if json {
                println!("{}", to_json(corpus.entries(), "Failed to serialize corpus")?);
                return Ok(());
            }

            println!("Corpus ({})", store.name());
            println!("==========");
            println!(
                "{} greetings, {} questions",
                corpus.count(Category::Greeting),
                corpus.count(Category::Question)
            );
            for entry in corpus.entries() {
                println!("  [{}] {} => {}", entry.category, entry.text, entry.reply);
            }
            Ok(())
        }),
    }
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, profile)?;
            println!("{}", to_json(&config, "Failed to serialize config")?);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = match profile {
                Some(profile) => Config::load_with_profile(&path, &profile)?,
                None => Config::load(&path)?,
            };
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(config_dir).map_err(|e| ReplybotError::Io {
                source: e,
                context: format!("Failed to create config directory: {:?}", config_dir),
            })?;

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());

            let corpus_path = config_dir.join("corpus.toml");
            if force || !corpus_path.exists() {
                write_sample_corpus(&corpus_path)?;
                println!("✓ Sample corpus written to: {}", corpus_path.display());
                println!("  Set corpus.source = \"file\" to use it instead of Neo4j");
            }
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'replybot config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    match profile {
        Some(profile) => Config::load_with_profile(&path, &profile),
        None => Config::load(&path),
    }
}

fn write_sample_corpus(path: &Path) -> Result<()> {
    let sample = CorpusFile {
        greeting: vec![
            GreetingRow {
                phrase: "hello".to_string(),
                reply: "Hi there!".to_string(),
            },
            GreetingRow {
                phrase: "good morning".to_string(),
                reply: "Good morning! How can I help?".to_string(),
            },
        ],
        question: vec![QuestionRow {
            question: "what are your opening hours".to_string(),
            answer: "We are open 9am to 5pm, Monday to Friday.".to_string(),
        }],
    };

    let content = toml::to_string_pretty(&sample)?;
    std::fs::write(path, content).map_err(|e| ReplybotError::Io {
        source: e,
        context: format!("Failed to write sample corpus: {:?}", path),
    })
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, context: &str) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| ReplybotError::Json {
        source: e,
        context: context.to_string(),
    })
}
