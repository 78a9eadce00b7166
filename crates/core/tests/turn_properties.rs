//! End-to-end properties of the specification engine: idempotent merge,
//! monotonic growth, referential integrity, deterministic projection and
//! failure containment, driven through scripted oracles.

use masforge_core::error::ExtractionError;
use masforge_core::graph::project;
use masforge_core::session::{SessionContext, SessionOrchestrator, TurnPhase};
use masforge_core::skills::{OracleResponse, ScriptedOracle, ScriptedReply};
use masforge_core::state::{
    check, merge, AgentSpec, CommunicationStyle, IssueCategory, SpecDocument, SpecPatch,
    TopologyPattern,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

fn reply(fields: serde_json::Value, text: &str) -> ScriptedReply {
    ScriptedReply::Response(OracleResponse::new(fields, text))
}

fn agent_names(doc: &SpecDocument) -> Vec<String> {
    doc.agents.iter().map(|a| a.name.clone()).collect()
}

#[test]
fn test_customer_service_first_turn() {
    let oracle = Arc::new(ScriptedOracle::new([reply(
        json!({
            "task": "Customer service system",
            "agents": [
                {"name": "Manager", "description": "Routes incoming requests"},
                {"name": "Billing Specialist"},
                {"name": "Shipping Specialist"},
                {"name": "Returns Specialist"}
            ]
        }),
        "A manager with three specialists, got it.",
    )]));
    let orchestrator = SessionOrchestrator::new(oracle.clone());
    let mut ctx = SessionContext::new();

    let result = tokio_test::block_on(orchestrator.process_turn(
        &mut ctx,
        "Build a customer service system with a manager and three specialist agents",
    ));

    assert_eq!(result.specification.agents.len(), 4);
    assert!(result.specification.agents[0].name.to_lowercase().contains("manager"));
    assert_eq!(
        result
            .specification
            .agents
            .iter()
            .filter(|a| a.name.contains("Specialist"))
            .count(),
        3
    );
    let categories: Vec<IssueCategory> = result.issues.iter().map(|i| i.category).collect();
    assert!(categories.contains(&IssueCategory::MissingTopology));
    assert!(categories.contains(&IssueCategory::MissingCommunication));
    assert_eq!(result.phase, TurnPhase::Collecting);

    let request = &oracle.requests()[0];
    assert!(request.specification.is_empty());
    assert!(request.history.is_empty());
}

#[test]
fn test_partial_agent_patch_keeps_unmentioned_agents() {
    let doc = SpecDocument {
        agents: vec![
            AgentSpec::new("A").with_description("collects data"),
            AgentSpec::new("B").with_description("analyses"),
        ],
        topology: Some(TopologyPattern::Star),
        ..SpecDocument::default()
    };
    let patch = SpecPatch::from_untrusted(&json!({
        "agents": [
            {"name": "B", "description": "analyses and reports"},
            {"name": "C", "description": "publishes"}
        ]
    }))
    .patch;

    let result = merge(&doc, &patch).document;
    assert_eq!(agent_names(&result), vec!["A", "B", "C"]);
    assert_eq!(result.agents[0], doc.agents[0]);
    assert_eq!(
        result.agents[1].description.as_deref(),
        Some("analyses and reports")
    );
    assert_eq!(result.topology, Some(TopologyPattern::Star));
}

#[test]
fn test_complete_document_has_no_issues_and_summarizes() {
    let doc = SpecDocument {
        agents: vec![
            AgentSpec::new("Collector"),
            AgentSpec::new("Analyst"),
            AgentSpec::new("Reporter"),
        ],
        topology: Some(TopologyPattern::Pipeline),
        communication: Some(CommunicationStyle::Direct),
        constraints: BTreeMap::from([("deadline".to_string(), json!("daily"))]),
        ..SpecDocument::default()
    };
    let issues = check(&doc);
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    assert_eq!(TurnPhase::from_issues(&issues), TurnPhase::Summarizing);
}

#[test]
fn test_same_patch_twice_equals_once() {
    let patch = SpecPatch::from_untrusted(&json!({
        "task": "Trading desk",
        "agents": [
            {"name": "Analyst", "tools": ["market_feed"], "communicates_with": ["Trader"]},
            {"name": "Trader", "tools": "broker_api"}
        ],
        "communication": "direct messages",
        "constraints": {"risk": {"max_drawdown": "5%"}, "latency": "100ms"}
    }))
    .patch;

    let once = merge(&SpecDocument::default(), &patch).document;
    let twice = merge(&once, &patch).document;
    assert_eq!(once, twice);
}

#[test]
fn test_additive_turns_never_shrink_agents_or_tools() {
    let patches = [
        json!({"agents": ["Scout"], "tools": ["map"]}),
        json!({"agents": [{"name": "Medic", "tools": ["first_aid"]}]}),
        json!({"agents": [], "tools": []}),
        json!({"task": "Expedition", "agents": [{"name": "scout", "description": "leads the way"}]}),
        json!({"topology": "chain"}),
    ];

    let mut doc = SpecDocument::default();
    let mut previous_agents = 0;
    let mut previous_tools = 0;
    for raw in &patches {
        let patch = SpecPatch::from_untrusted(raw).patch;
        doc = merge(&doc, &patch).document;
        assert!(doc.agents.len() >= previous_agents);
        assert!(doc.tools.len() >= previous_tools);
        previous_agents = doc.agents.len();
        previous_tools = doc.tools.len();
    }
    assert_eq!(agent_names(&doc), vec!["Scout", "Medic"]);
    assert_eq!(doc.tools, vec!["map".to_string(), "first_aid".to_string()]);
}

#[test]
fn test_every_referenced_tool_is_declared_after_merge() {
    let patches = [
        json!({"agents": [{"name": "Coder", "tools": ["git", "compiler"]}]}),
        json!({"agents": [{"name": "Reviewer", "uses_tools": "git, linter"}], "tools": ["ci"]}),
    ];
    let mut doc = SpecDocument::default();
    for raw in &patches {
        doc = merge(&doc, &SpecPatch::from_untrusted(raw).patch).document;
        for agent in &doc.agents {
            for tool in &agent.tools {
                assert!(doc.has_tool(tool), "{} missing from tools", tool);
            }
        }
        assert!(doc.invariant_violations().is_empty());
    }
}

#[test]
fn test_projection_is_repeatable() {
    let doc = SpecDocument {
        agents: vec![
            AgentSpec::new("Supervisor").with_tools(["dashboard"]),
            AgentSpec::new("Worker A"),
            AgentSpec::new("Worker B").with_tools(["dashboard", "queue"]),
        ],
        tools: vec!["dashboard".to_string(), "queue".to_string()],
        topology: Some(TopologyPattern::Hierarchical),
        ..SpecDocument::default()
    };
    let first = project(&doc);
    let second = project(&doc);
    assert_eq!(first.nodes, second.nodes);
    assert_eq!(first.edges, second.edges);
    assert_eq!(first.to_mermaid(), second.to_mermaid());
}

#[tokio::test]
async fn test_failed_turn_returns_pre_turn_state() {
    let oracle = Arc::new(ScriptedOracle::new([
        reply(
            json!({
                "task": "Newsroom",
                "agents": [{"name": "Editor", "communicates_with": ["Reporter"]}, "Reporter"],
                "tools": ["cms"]
            }),
            "Noted.",
        ),
        ScriptedReply::Raw("this is not json".to_string()),
        ScriptedReply::Fail(ExtractionError::Backend("503".to_string())),
    ]));
    let orchestrator = SessionOrchestrator::new(oracle);
    let mut ctx = SessionContext::new();
    orchestrator.process_turn(&mut ctx, "a newsroom").await;

    let spec_before = ctx.specification.clone();
    let graph_before = ctx.graph.clone();

    for message in ["add a photographer", "and a fact checker"] {
        let result = orchestrator.process_turn(&mut ctx, message).await;
        assert!(result.extraction_failed);
        assert_eq!(result.specification, spec_before);
        assert_eq!(result.graph, graph_before);
    }
    assert_eq!(ctx.specification, spec_before);
    assert_eq!(ctx.graph, graph_before);
    assert_eq!(ctx.turns, 3);
}

#[tokio::test]
async fn test_correction_reopens_collecting() {
    let oracle = Arc::new(ScriptedOracle::new([
        reply(
            json!({
                "task": "Ops",
                "agents": ["Pager", "Fixer"],
                "communication": "direct",
                "topology": "pipeline",
                "constraints": {"sla": "15m"}
            }),
            "Done.",
        ),
        reply(json!({"tools": ["status_page"]}), "Added a status page."),
    ]));
    let orchestrator = SessionOrchestrator::new(oracle);
    let mut ctx = SessionContext::new();

    let first = orchestrator.process_turn(&mut ctx, "ops team").await;
    assert_eq!(first.phase, TurnPhase::Summarizing);

    let second = orchestrator.process_turn(&mut ctx, "also a status page").await;
    assert_eq!(second.phase, TurnPhase::Collecting);
    assert_eq!(second.issues[0].category, IssueCategory::UnconstrainedTool);
    assert!(second.reply.ends_with("Which agent should use the status_page tool?"));
}

#[tokio::test]
async fn test_concurrent_sessions_stay_isolated() {
    let (tx, mut rx) = masforge_core::session::event_channel();
    let research = SessionOrchestrator::new(Arc::new(ScriptedOracle::new([reply(
        json!({"task": "Research", "agents": ["Searcher", "Summarizer"], "tools": ["web"]}),
        "Research team noted.",
    )])))
    .with_event_channel(tx.clone());
    let trading = SessionOrchestrator::new(Arc::new(ScriptedOracle::new([reply(
        json!({"task": "Trading", "agents": ["Quant"], "constraints": {"risk": "low"}}),
        "Trading desk noted.",
    )])))
    .with_event_channel(tx);

    let mut first = SessionContext::new();
    let mut second = SessionContext::new();
    let (a, b) = tokio::join!(
        research.process_turn(&mut first, "a research team"),
        trading.process_turn(&mut second, "a trading desk"),
    );

    assert_eq!(agent_names(&a.specification), vec!["Searcher", "Summarizer"]);
    assert_eq!(agent_names(&b.specification), vec!["Quant"]);
    assert_eq!(first.specification, a.specification);
    assert_eq!(second.specification, b.specification);
    assert!(second.specification.tools.is_empty());
    assert!(first.specification.constraints.is_empty());
    assert!(first.history.iter().all(|m| !m.content.contains("trading")));
    assert!(second.history.iter().all(|m| !m.content.contains("research")));

    let mut seen = std::collections::HashSet::new();
    while let Ok(event) = rx.try_recv() {
        assert!(event.session_id == first.id || event.session_id == second.id);
        seen.insert(event.session_id);
    }
    assert_eq!(seen.len(), 2);
}
