//! `parley check` -- verify both credentials against the live services.

use std::io::Write;

use console::style;

use parley_core::llm::provider::LlmProvider;
use parley_infra::llm::{create_provider, test_provider_connection};
use parley_infra::secret::Secrets;
use parley_infra::telegram::TelegramChannel;
use parley_types::config::ProxyConfig;

/// Result of one connectivity probe.
struct Probe {
    target: &'static str,
    detail: String,
    outcome: Result<String, String>,
}

pub async fn check(config: &ProxyConfig, secrets: &Secrets, json: bool) -> anyhow::Result<()> {
    let telegram = Probe {
        target: "telegram",
        detail: "getMe".to_string(),
        outcome: probe_telegram(secrets, json).await,
    };
    let model = Probe {
        target: "model",
        detail: format!("{} ({})", config.model.provider, config.model.name),
        outcome: probe_model(config, secrets, json).await,
    };
    let probes = [telegram, model];

    if json {
        let report: Vec<serde_json::Value> = probes
            .iter()
            .map(|p| match &p.outcome {
                Ok(info) => serde_json::json!({
                    "target": p.target,
                    "detail": p.detail,
                    "ok": true,
                    "info": info,
                }),
                Err(e) => serde_json::json!({
                    "target": p.target,
                    "detail": p.detail,
                    "ok": false,
                    "error": e,
                }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let failed = probes.iter().filter(|p| p.outcome.is_err()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} checks failed", probes.len());
    }
    Ok(())
}

async fn probe_telegram(secrets: &Secrets, json: bool) -> Result<String, String> {
    if !json {
        print!("  Checking {}... ", style("Telegram bot token").cyan());
        let _ = std::io::stdout().flush();
    }

    let outcome = async {
        let channel = TelegramChannel::new(secrets.telegram_token.clone())?;
        let me = channel.get_me().await?;
        Ok::<_, parley_types::error::ChannelError>(match &me.username {
            Some(username) => format!("@{username}"),
            None => me.display_name(),
        })
    }
    .await
    .map_err(|e| e.to_string());

    if !json {
        report_line(&outcome);
    }
    outcome
}

async fn probe_model(config: &ProxyConfig, secrets: &Secrets, json: bool) -> Result<String, String> {
    if !json {
        print!(
            "  Checking {} ({})... ",
            style(config.model.provider).cyan(),
            config.model.name
        );
        let _ = std::io::stdout().flush();
    }

    let outcome = async {
        let provider = create_provider(&config.model, &secrets.model_api_key)?;
        test_provider_connection(&provider).await?;
        Ok::<_, parley_types::llm::LlmError>(provider.model().to_string())
    }
    .await
    .map_err(|e| e.to_string());

    if !json {
        report_line(&outcome);
    }
    outcome
}

fn report_line(outcome: &Result<String, String>) {
    match outcome {
        Ok(info) => println!("{} {}", style("✓").green().bold(), style(info).dim()),
        Err(e) => {
            println!("{}", style("✗").red().bold());
            eprintln!("    {} {}", style("!").red().bold(), e);
        }
    }
}
