//! Terminal conversation (`masforge chat`)

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use masforge_core::session::{SessionContext, SessionOrchestrator, TurnPhase};
use masforge_core::skills::{LlmSpecOracle, ScriptedOracle, SpecOracle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::config::PersistedConfig;

#[derive(Debug, PartialEq, Eq)]
enum ChatCommand {
    Quit,
    Summary,
    Graph,
    Json,
    Say(String),
}

impl ChatCommand {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "/quit" | "/exit" => ChatCommand::Quit,
            "/summary" => ChatCommand::Summary,
            "/graph" => ChatCommand::Graph,
            "/json" => ChatCommand::Json,
            other => ChatCommand::Say(other.to_string()),
        }
    }
}

/// Run an interactive session on stdin/stdout
pub async fn run(script: Option<&Path>, config: &PersistedConfig) -> anyhow::Result<()> {
    let oracle: Arc<dyn SpecOracle> = match script {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading oracle script {}", path.display()))?;
            Arc::new(ScriptedOracle::from_lines(&text))
        }
        None => Arc::new(LlmSpecOracle::new(config.model_config()?)),
    };
    tracing::info!(oracle = oracle.name(), "Starting chat session");

    let orchestrator = SessionOrchestrator::new(oracle).with_config(config.orchestrator_config());
    let mut ctx = SessionContext::new();

    println!("Describe the multi-agent system you want to build.");
    println!("Commands: /summary, /graph, /json, /quit");

    let stdin = BufReader::new(tokio::io::stdin());
    converse(&orchestrator, &mut ctx, stdin, &mut std::io::stdout()).await
}

async fn converse<R, W>(
    orchestrator: &SessionOrchestrator,
    ctx: &mut SessionContext,
    input: R,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match ChatCommand::parse(&line) {
            ChatCommand::Quit => break,
            ChatCommand::Summary => writeln!(out, "{}", ctx.summary())?,
            ChatCommand::Graph => writeln!(out, "{}", ctx.graph.to_mermaid())?,
            ChatCommand::Json => {
                writeln!(out, "{}", serde_json::to_string_pretty(&ctx.specification)?)?
            }
            ChatCommand::Say(message) => {
                let turn = orchestrator.process_turn(ctx, &message).await;
                writeln!(out, "{}\n", turn.reply)?;
                // summarizing replies already end with the digest
                if turn.phase == TurnPhase::Collecting {
                    writeln!(out, "{}", turn.summary)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ChatCommand::parse(" /quit "), ChatCommand::Quit);
        assert_eq!(ChatCommand::parse("/graph"), ChatCommand::Graph);
        assert_eq!(
            ChatCommand::parse("add a critic"),
            ChatCommand::Say("add a critic".to_string())
        );
    }

    #[tokio::test]
    async fn test_scripted_conversation() {
        let script = r#"
# first turn
{"updated_fields": {"task": "Blog pipeline", "agents": ["Writer", "Editor"]}, "reply": "Writer and editor added."}
"#;
        let orchestrator = SessionOrchestrator::new(Arc::new(ScriptedOracle::from_lines(script)));
        let mut ctx = SessionContext::new();
        let input: &[u8] = b"we need a blog pipeline\n/json\n/quit\nnever processed\n";
        let mut out = Vec::new();

        converse(&orchestrator, &mut ctx, input, &mut out).await.unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Writer and editor added."));
        assert!(printed.contains("# Multi-Agent System Specification"));
        assert!(printed.contains("## Open questions"));
        assert!(printed.contains("\"Blog pipeline\""));
        assert_eq!(ctx.turns, 1);
    }
}
