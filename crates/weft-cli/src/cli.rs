use std::io::{IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use clap::Args;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use weft_ai::{AbortController, ChatOptions, StreamEvent};
use weft_core::{
    ChatRequest, DirPatternStore, FileSessionStore, Orchestrator, PatternResolver, PatternStoreRef,
};

use crate::config::Config;

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Args, Debug, Clone, Default)]
pub struct ChatArgs {
    /// Pattern whose text becomes the system prompt.
    #[arg(short = 'p', long)]
    pub pattern: Option<String>,
    /// Context document prepended ahead of the pattern.
    #[arg(short = 'C', long)]
    pub context: Option<String>,
    /// Named session to continue and persist.
    #[arg(short = 'S', long)]
    pub session: Option<String>,
    /// Reasoning strategy appended after the pattern.
    #[arg(long)]
    pub strategy: Option<String>,
    /// Force replies into this language.
    #[arg(short = 'g', long)]
    pub language: Option<String>,
    #[arg(long)]
    pub vendor: Option<String>,
    #[arg(short = 'm', long)]
    pub model: Option<String>,
    /// Print chunks as they arrive instead of waiting for the reply.
    #[arg(short = 's', long)]
    pub stream: bool,
    /// Merge system and user text into a single user message.
    #[arg(short = 'r', long)]
    pub raw: bool,
    #[arg(short = 't', long)]
    pub temperature: Option<f64>,
    #[arg(long)]
    pub max_tokens: Option<u32>,
    /// Strip <think> blocks from the reply.
    #[arg(long)]
    pub suppress_thinking: bool,
    /// Template variable, repeatable as --var name=value.
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub variables: Vec<String>,
    #[arg(long)]
    pub list_patterns: bool,
    #[arg(long)]
    pub list_models: bool,
    #[arg(long)]
    pub list_sessions: bool,
    /// Input text; read from stdin when omitted.
    #[arg(trailing_var_arg = true)]
    pub input: Vec<String>,
}

pub async fn run_chat(args: ChatArgs, conf_dir: Option<PathBuf>) -> Result<(), String> {
    let config = Config::load(conf_dir.as_deref())?;
    init_tracing(&config);
    tracing::debug!(
        home = %config.home.display(),
        vendors = config.file.vendors.len(),
        "configuration loaded"
    );

    let engine = build_engine(&config);

    if args.list_patterns {
        for name in engine.patterns().list() {
            println!("{name}");
        }
        return Ok(());
    }
    if args.list_sessions {
        if let Some(sessions) = engine.sessions() {
            for name in sessions.list() {
                println!("{name}");
            }
        }
        return Ok(());
    }
    if args.list_models {
        return list_models(&engine).await;
    }

    let input = read_input(&args)?;
    let request = build_request(&args, input)?;

    let controller = AbortController::new();
    let signal = Some(controller.signal());
    spawn_ctrl_c_listener(controller);

    if args.stream {
        let streaming = engine
            .run_stream(&request, signal)
            .await
            .map_err(|error| error.to_string())?;
        let mut stdout = std::io::stdout();
        while let Some(event) = streaming.events.next().await {
            if let StreamEvent::Chunk(chunk) = event {
                print!("{}", chunk.text);
                let _ = stdout.flush();
            }
        }
        streaming
            .finish()
            .await
            .map_err(|error| error.to_string())?;
        println!();
    } else {
        let turn = engine
            .run(&request, signal)
            .await
            .map_err(|error| error.to_string())?;
        println!("{}", turn.reply.content);
    }
    Ok(())
}

fn build_engine(config: &Config) -> Orchestrator {
    let defaults: PatternStoreRef = Arc::new(DirPatternStore::new(config.patterns_dir()));
    let mut patterns = PatternResolver::new(defaults);
    if let Some(custom) = config.custom_patterns_dir() {
        patterns = patterns.with_custom(Arc::new(DirPatternStore::new(custom)));
    }

    Orchestrator::new(patterns, config.build_vendor_registry())
        .with_contexts(Arc::new(DirPatternStore::new(config.contexts_dir())))
        .with_strategies(Arc::new(DirPatternStore::new(config.strategies_dir())))
        .with_sessions(Arc::new(FileSessionStore::new(config.sessions_dir())))
}

async fn list_models(engine: &Orchestrator) -> Result<(), String> {
    let mut listed = false;
    for descriptor in engine.vendors().configured_descriptors() {
        for model in &descriptor.models {
            println!("{}/{model}", descriptor.name);
            listed = true;
        }
    }
    if !listed {
        for discovered in engine.vendors().discover_models().await {
            for model in &discovered.models {
                println!("{}/{model}", discovered.vendor);
            }
        }
    }
    Ok(())
}

fn read_input(args: &ChatArgs) -> Result<String, String> {
    if !args.input.is_empty() {
        return Ok(args.input.join(" "));
    }
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err("no input: pass text as arguments or pipe it on stdin".to_string());
    }
    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .map_err(|error| format!("read stdin failed: {error}"))?;
    let trimmed = buffer.trim_end().to_string();
    if trimmed.is_empty() {
        return Err("no input: stdin was empty".to_string());
    }
    Ok(trimmed)
}

fn build_request(args: &ChatArgs, input: String) -> Result<ChatRequest, String> {
    let mut request = ChatRequest::new(input).with_options(ChatOptions {
        temperature: args.temperature,
        max_tokens: args.max_tokens,
        suppress_thinking: args.suppress_thinking,
        ..ChatOptions::default()
    });
    request.pattern.clone_from(&args.pattern);
    request.context.clone_from(&args.context);
    request.session.clone_from(&args.session);
    request.strategy.clone_from(&args.strategy);
    request.language.clone_from(&args.language);
    request.vendor.clone_from(&args.vendor);
    request.model.clone_from(&args.model);
    request.stream = args.stream;
    request.raw = args.raw;

    for pair in &args.variables {
        let Some((name, value)) = pair.split_once('=') else {
            return Err(format!("invalid --var '{pair}': expected name=value"));
        };
        request.variables.insert(name.to_string(), value.to_string());
    }
    Ok(request)
}

fn spawn_ctrl_c_listener(controller: AbortController) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            controller.abort();
        }
    });
}

fn init_tracing(config: &Config) {
    static TRACE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

    let log_dir = config.log_dir();
    if let Err(error) = std::fs::create_dir_all(&log_dir) {
        eprintln!("warning: failed to create log directory: {error}");
        return;
    }
    let file_writer = tracing_appender::rolling::daily(&log_dir, "weft.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_writer);
    let _ = TRACE_GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);

    if let Err(error) = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
    {
        eprintln!(
            "warning: failed to initialize tracing subscriber for {}: {error}",
            log_dir.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_pairs_parse_into_request_variables() {
        let args = ChatArgs {
            variables: vec!["target=lib.rs".to_string(), "tone=dry".to_string()],
            ..ChatArgs::default()
        };
        let request = build_request(&args, "go".to_string()).unwrap();
        assert_eq!(request.variables.get("target").map(String::as_str), Some("lib.rs"));
        assert_eq!(request.variables.get("tone").map(String::as_str), Some("dry"));
    }

    #[test]
    fn malformed_var_pair_is_rejected() {
        let args = ChatArgs {
            variables: vec!["novalue".to_string()],
            ..ChatArgs::default()
        };
        assert!(build_request(&args, "go".to_string()).is_err());
    }

    #[test]
    fn argument_words_join_into_one_input() {
        let args = ChatArgs {
            input: vec!["summarize".to_string(), "this".to_string()],
            ..ChatArgs::default()
        };
        assert_eq!(read_input(&args).unwrap(), "summarize this");
    }

    #[test]
    fn flags_carry_through_to_the_request() {
        let args = ChatArgs {
            pattern: Some("summarize".to_string()),
            raw: true,
            temperature: Some(0.2),
            ..ChatArgs::default()
        };
        let request = build_request(&args, "hi".to_string()).unwrap();
        assert_eq!(request.pattern.as_deref(), Some("summarize"));
        assert!(request.raw);
        assert_eq!(request.options.temperature, Some(0.2));
    }
}
