//! The `tabula cross-check` command: several models over one folder, then compare.

use super::extract::{run_agent, RunOptions};
use clap::Args;
use std::path::PathBuf;
use tabula_core::{compare_files, Config, ProviderKind};

/// A `provider:model` pair from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSpec {
    pub provider: ProviderKind,
    pub model: String,
}

/// Parse `provider:model`. Only the first `:` separates, so Bedrock ids
/// such as `anthropic.claude-3-5-sonnet-20240620-v1:0` survive intact.
pub fn parse_agent_spec(s: &str) -> Result<AgentSpec, String> {
    let (provider, model) = s
        .split_once(':')
        .ok_or_else(|| format!("expected provider:model, got '{s}'"))?;
    let provider: ProviderKind = provider.parse().map_err(|e| format!("{e}"))?;
    let model = model.trim();
    if model.is_empty() {
        return Err(format!("missing model name in '{s}'"));
    }
    Ok(AgentSpec {
        provider,
        model: model.to_string(),
    })
}

/// Arguments for the `cross-check` command.
#[derive(Args, Debug)]
pub struct CrossCheckArgs {
    /// Folder of table screenshots
    #[arg(required = true)]
    pub folder: PathBuf,

    /// Agent to run, as provider:model (repeat for each model; the first is the reference)
    #[arg(short, long = "agent", required = true, value_parser = parse_agent_spec)]
    pub agents: Vec<AgentSpec>,

    #[command(flatten)]
    pub run: RunOptions,
}

/// Execute the cross-check command.
///
/// Agents run one after another. A failed agent run aborts before comparing.
pub async fn execute(args: CrossCheckArgs, config: &Config) -> anyhow::Result<()> {
    let mut outputs = Vec::with_capacity(args.agents.len());

    for spec in &args.agents {
        let run = run_agent(
            spec.provider.as_str(),
            &spec.model,
            &args.folder,
            None,
            &args.run,
            config,
        )
        .await?;
        eprintln!(
            "  {}:{} -> {} ({} error entries)",
            spec.provider,
            spec.model,
            run.output.display(),
            run.result.error_count()
        );
        outputs.push(run.output);
    }

    let outcome = compare_files(&outputs).await;
    println!("{}", outcome.label());
    if let tabula_core::ComparisonOutcome::Failed(failure) = &outcome {
        eprintln!("{failure}");
        anyhow::bail!("Model outputs disagree");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_agent_spec() {
        assert_eq!(
            parse_agent_spec("openai:gpt-4o").unwrap(),
            AgentSpec {
                provider: ProviderKind::OpenAi,
                model: "gpt-4o".to_string()
            }
        );
        let bedrock = parse_agent_spec("bedrock:anthropic.claude-3-5-sonnet-20240620-v1:0").unwrap();
        assert_eq!(bedrock.provider, ProviderKind::Bedrock);
        assert_eq!(bedrock.model, "anthropic.claude-3-5-sonnet-20240620-v1:0");
    }

    #[test]
    fn test_parse_agent_spec_errors() {
        assert!(parse_agent_spec("gpt-4o").unwrap_err().contains("provider:model"));
        assert!(parse_agent_spec("mistral:large")
            .unwrap_err()
            .contains("Unsupported provider"));
        assert!(parse_agent_spec("google:").unwrap_err().contains("missing model"));
    }
}
