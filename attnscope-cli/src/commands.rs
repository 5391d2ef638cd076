//! CLI subcommand handlers.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use attnscope_core::config::write_default_config;
use attnscope_core::gateway::{GatewayState, run_gateway};
use attnscope_core::render::{format_percent, standalone_page, token_views};
use attnscope_core::{
    AggregationMode, AnalysisResult, Analyzer, AttnScopeConfig, Visualization, load_config,
};
use attnscope_ml::{AttentionPipeline, ModelHandle};

use crate::{Commands, ConfigAction};

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace),
        Commands::Analyze {
            text,
            mode,
            top_k,
            json,
        } => {
            let config = load(workspace)?;
            let top_k = top_k.unwrap_or(config.analysis.top_k);
            let result = analyze(&config, text, mode, top_k).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", format_analysis(&result, config.render.bar_width));
            }
            Ok(())
        }
        Commands::Render { text, mode, output } => {
            let config = load(workspace)?;
            let top_k = config.analysis.top_k;
            let result = analyze(&config, text.clone(), mode, top_k).await?;
            let viz = Visualization::build(&result, &config.render);
            std::fs::write(&output, standalone_page(&text, &viz))
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Visualization saved to: {}", output.display());
            Ok(())
        }
        Commands::Serve {
            host,
            port,
            preload,
        } => {
            let mut config = load(workspace)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config, preload).await
        }
    }
}

fn load(workspace: &Path) -> anyhow::Result<AttnScopeConfig> {
    let config = load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    config.validate()?;
    Ok(config)
}

fn pipeline(config: &AttnScopeConfig) -> AttentionPipeline {
    let handle = ModelHandle::new(config.model.clone(), config.analysis.add_special_tokens);
    AttentionPipeline::new(Arc::new(handle), config.analysis.clone())
}

/// Run one analysis off the async runtime; loading and the forward pass block.
async fn analyze(
    config: &AttnScopeConfig,
    text: String,
    mode: Option<AggregationMode>,
    top_k: usize,
) -> anyhow::Result<AnalysisResult> {
    let pipeline = pipeline(config);
    let mode = mode.unwrap_or(config.analysis.mode);
    let result = tokio::task::spawn_blocking(move || pipeline.analyze_with(&text, mode, top_k))
        .await
        .context("analysis task failed")??;
    Ok(result)
}

async fn serve(config: AttnScopeConfig, preload: bool) -> anyhow::Result<()> {
    let pipeline = Arc::new(pipeline(&config));

    if preload {
        let warm = Arc::clone(&pipeline);
        let outcome = tokio::task::spawn_blocking(move || warm.handle().get().map(|_| ()))
            .await
            .context("model preload task failed")?;
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "Model preload failed; will retry on first request");
        }
    }

    let analyzer: Arc<dyn Analyzer> = pipeline;
    let state = GatewayState::new(analyzer, config.render.clone(), &config.server);
    println!(
        "attnscope listening on http://{}:{}",
        config.server.host, config.server.port
    );
    run_gateway(state, &config.server)
        .await
        .context("gateway failed")
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let path = write_default_config(workspace)?;
            println!("Created default configuration at: {}", path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Plain-text report: one row per token, the weight check, then candidates.
pub fn format_analysis(result: &AnalysisResult, bar_width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Tokens: {}  Mode: {}  Model: {}",
        result.token_count(),
        result.mode,
        result.tokenizer_info.model_name
    );
    for view in token_views(&result.tokens, &result.weights, bar_width) {
        let _ = writeln!(
            out,
            "[{:>3}] {:<16} (ID: {:>6})  {:.3}  {}",
            view.index,
            format!("{:?}", view.text),
            view.id,
            view.weight,
            view.bar
        );
    }
    let _ = writeln!(out, "Weight sum: {:.3}", result.weight_sum());

    if let Some(prediction) = &result.prediction {
        let _ = writeln!(
            out,
            "\nPredicted next token: {:?} ({})",
            prediction.token,
            format_percent(prediction.probability)
        );
        for c in &prediction.top_candidates {
            let _ = writeln!(
                out,
                "  {:>2}. {:<16} {:>6}  (ID: {})",
                c.rank,
                format!("{:?}", c.token),
                format_percent(c.probability),
                c.token_id
            );
        }
    }
    out
}
