//! Subcommand handlers.

use crate::{Commands, ConfigAction, MarketArgs, ScoreArgs};
use ideascope_core::config::{AppConfig, config_exists, load_config};
use ideascope_core::lookup::{Searcher, create_lookup};
use ideascope_core::providers::create_provider;
use ideascope_core::{AnalysisRequest, Brain, IdeaScorer, MarketAnalyzer, MarketRequest};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;
use tracing::debug;

pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    model: Option<&str>,
) -> anyhow::Result<()> {
    match command {
        Commands::Score(args) => {
            let request = analysis_request(args)?;
            let config = resolve_config(workspace, model)?;
            let (brain, searcher) = gateways(&config)?;
            let scorer = IdeaScorer::new(brain, searcher, &config)?;
            let report = scorer.score_idea(&request).await?;
            print_json(&report)
        }
        Commands::Market(args) => {
            let request = market_request(args)?;
            let config = resolve_config(workspace, model)?;
            let (brain, searcher) = gateways(&config)?;
            let analyzer = MarketAnalyzer::new(brain, searcher, &config);
            let report = analyzer.analyze_market(&request).await?;
            print_json(&report)
        }
        Commands::Config { action } => handle_config(action, workspace),
    }
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".ideascope");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&AppConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(workspace), None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            if !config_exists(Some(workspace)) {
                eprintln!("No configuration file found; showing defaults.");
            }
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Load, override and validate the configuration.
fn resolve_config(workspace: &Path, model: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut config = load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    if let Some(model) = model {
        config.llm.model = model.to_string();
    }
    config.validate()?;
    debug!(
        provider = config.llm.provider.as_str(),
        model = config.llm.model.as_str(),
        "Configuration loaded"
    );
    Ok(config)
}

fn gateways(config: &AppConfig) -> anyhow::Result<(Brain, Searcher)> {
    let provider = create_provider(&config.llm)?;
    let brain = Brain::new(provider, config.llm.timeout()).with_temperature(config.llm.temperature);
    let searcher = Searcher::new(create_lookup(&config.lookup)?, config.lookup.timeout());
    Ok((brain, searcher))
}

fn analysis_request(args: ScoreArgs) -> anyhow::Result<AnalysisRequest> {
    if let Some(path) = &args.input {
        return read_input(path);
    }
    let mut request = AnalysisRequest::new(args.idea.unwrap_or_default()).with_keywords(args.keywords);
    request.industry = args.industry;
    Ok(request)
}

fn market_request(args: MarketArgs) -> anyhow::Result<MarketRequest> {
    let mut request: MarketRequest = match &args.input {
        Some(path) => read_input(path)?,
        None => MarketRequest::default(),
    };
    // Flags fill in or override fields from the input file.
    let overrides = [
        (&mut request.startup_idea, args.idea),
        (&mut request.ideal_customer, args.customer),
        (&mut request.problem_solving, args.problem),
        (&mut request.industry, args.industry),
    ];
    for (field, value) in overrides {
        if let Some(value) = value {
            *field = value;
        }
    }
    if args.competitors.is_some() {
        request.known_competitors = args.competitors;
    }
    if args.unique_value.is_some() {
        request.unique_value = args.unique_value;
    }
    if args.business_model.is_some() {
        request.business_model = args.business_model;
    }
    if args.regions.is_some() {
        request.geographic_regions = args.regions;
    }
    Ok(request)
}

/// Parse a JSON request from a file, or from stdin when the path is `-`.
fn read_input<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?
    };
    serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Invalid request JSON in {}: {}", path.display(), e))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_config_init_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        handle_config(ConfigAction::Init, dir.path()).unwrap();

        let config_path = dir.path().join(".ideascope").join("config.toml");
        assert!(config_path.exists());
        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[llm]"));
        assert!(content.contains("[market.policies]"));
    }

    #[test]
    fn test_config_init_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(".ideascope");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.toml"), "[llm]\nmodel = \"custom\"\n").unwrap();

        handle_config(ConfigAction::Init, dir.path()).unwrap();
        let content = std::fs::read_to_string(config_dir.join("config.toml")).unwrap();
        assert_eq!(content, "[llm]\nmodel = \"custom\"\n");
    }

    #[test]
    fn test_config_init_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        handle_config(ConfigAction::Init, dir.path()).unwrap();
        let config = resolve_config(dir.path(), Some("claude-3-5-haiku-20241022")).unwrap();
        assert_eq!(config.llm.model, "claude-3-5-haiku-20241022");
        assert_eq!(config.lookup.max_web_searches, 3);
    }

    #[test]
    fn test_config_show_without_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(handle_config(ConfigAction::Show, dir.path()).is_ok());
    }

    #[test]
    fn test_score_request_from_flags() {
        let request = analysis_request(ScoreArgs {
            idea: Some("Solar kiosks".into()),
            keywords: vec!["solar".into()],
            industry: Some("Energy".into()),
            input: None,
        })
        .unwrap();
        assert_eq!(
            request,
            AnalysisRequest::new("Solar kiosks")
                .with_keywords(["solar"])
                .with_industry("Energy")
        );
    }

    #[test]
    fn test_score_request_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("req.json");
        std::fs::write(
            &path,
            r#"{"idea_description": "Drone pollination", "keywords": ["drones"]}"#,
        )
        .unwrap();

        let request = analysis_request(ScoreArgs {
            input: Some(path),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.idea_description, "Drone pollination");
        assert_eq!(request.keywords, vec!["drones"]);
        assert!(request.industry.is_none());
    }

    #[test]
    fn test_market_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("market.json");
        std::fs::write(
            &path,
            r#"{"startup_idea": "A", "ideal_customer": "B", "problem_solving": "C", "industry": "D", "geographic_regions": "EU"}"#,
        )
        .unwrap();

        let request = market_request(MarketArgs {
            industry: Some("Fintech".into()),
            regions: Some("US".into()),
            input: Some(path),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(request.startup_idea, "A");
        assert_eq!(request.industry, "Fintech");
        assert_eq!(request.geographic_regions.as_deref(), Some("US"));
        assert!(request.known_competitors.is_none());
    }

    #[test]
    fn test_read_input_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        let err = read_input::<AnalysisRequest>(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid request JSON"));

        let missing: anyhow::Result<AnalysisRequest> = read_input(&PathBuf::from("/nonexistent/req.json"));
        assert!(missing.is_err());
    }
}
