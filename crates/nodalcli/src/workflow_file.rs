// crates/nodalcli/src/workflow_file.rs

use anyhow::{Context, Result};
use nodalcore::{Node, Value, Workflow};
use serde::Deserialize;
use std::path::Path;

/// Accepted workflow file shapes
#[derive(Deserialize)]
#[serde(untagged)]
enum WorkflowFile {
    Many(Vec<Workflow>),
    One(Workflow),
    Nodes(Vec<Node>),
}

/// Parse one workflow, an array of workflows, or a bare node array
pub fn parse_workflows(json: &str) -> Result<Vec<Workflow>> {
    let file: WorkflowFile =
        serde_json::from_str(json).context("Expected a workflow, an array of workflows or an array of nodes")?;
    Ok(match file {
        WorkflowFile::Many(workflows) => workflows,
        WorkflowFile::One(workflow) => vec![workflow],
        WorkflowFile::Nodes(nodes) => vec![Workflow::from(nodes)],
    })
}

pub fn load_workflows(path: &Path) -> Result<Vec<Workflow>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_workflows(&json).with_context(|| format!("Invalid workflow file {}", path.display()))
}

/// Every node in the workflows, including node lists nested in parameters
/// (`then`, `else`, `do`), labelled with its location
pub fn all_nodes(workflows: &[Workflow]) -> Vec<(String, Node)> {
    let mut found = Vec::new();
    for (index, workflow) in workflows.iter().enumerate() {
        collect_nodes(&workflow.nodes, &format!("workflow[{}]", index), &mut found);
    }
    found
}

fn collect_nodes(nodes: &[Node], location: &str, found: &mut Vec<(String, Node)>) {
    for (index, node) in nodes.iter().enumerate() {
        let here = format!("{}.nodes[{}]", location, index);
        for (key, value) in node.parameters.iter() {
            if let Some(nested) = as_node_list(value) {
                collect_nodes(&nested, &format!("{}.{}", here, key), found);
            }
        }
        found.push((here, node.clone()));
    }
}

fn as_node_list(value: &Value) -> Option<Vec<Node>> {
    let items = value.as_array()?;
    if items.is_empty() {
        return None;
    }
    serde_json::from_value(serde_json::Value::from(value.clone())).ok()
}

/// The Telegram inbox example
pub fn example_workflow() -> Result<Workflow> {
    let workflow = serde_json::json!({
        "name": "Telegram auto-reply",
        "nodes": [
            {
                "name": "Check Telegram for messages",
                "entity": "Telegram",
                "method": "get_messages",
                "parameters": { "chatId": "12345" }
            },
            {
                "name": "Loop over each message",
                "entity": "Loop",
                "method": "foreach",
                "parameters": {
                    "iterator": { "node": 0, "path": ["messages"] },
                    "of": "message",
                    "do": [
                        {
                            "name": "Determine if Telegram message is voice or text",
                            "entity": "Logic",
                            "method": "if",
                            "parameters": {
                                "left_operand": { "ref": { "node": 0, "path": ["messages", 0, "type"] } },
                                "right_operand": "text",
                                "operator": "EQUAL",
                                "then": [
                                    {
                                        "name": "Send text response",
                                        "entity": "Telegram",
                                        "method": "send_message",
                                        "parameters": { "chatId": "12345", "text": "I got your text message!" }
                                    }
                                ],
                                "else": [
                                    {
                                        "name": "Send voice response",
                                        "entity": "Telegram",
                                        "method": "send_message",
                                        "parameters": { "chatId": "12345", "text": "I got your voice message!" }
                                    }
                                ]
                            }
                        }
                    ]
                }
            }
        ]
    });
    Ok(serde_json::from_value(workflow)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shapes() {
        let node = r#"{ "name": "n", "entity": "Debug", "method": "log" }"#;

        let bare = parse_workflows(&format!("[{}]", node)).unwrap();
        assert_eq!(bare.len(), 1);
        assert_eq!(bare[0].nodes[0].entity, "Debug");

        let one = parse_workflows(&format!(r#"{{ "name": "w", "nodes": [{}] }}"#, node)).unwrap();
        assert_eq!(one[0].label(), "w");

        let many =
            parse_workflows(&format!(r#"[{{ "nodes": [{}] }}, {{ "nodes": [] }}]"#, node)).unwrap();
        assert_eq!(many.len(), 2);

        assert!(parse_workflows(r#"{ "nodes": 3 }"#).is_err());
    }

    #[test]
    fn test_all_nodes_walks_nested_lists() {
        let workflow = example_workflow().unwrap();
        let nodes = all_nodes(&[workflow]);
        let locations: Vec<&str> = nodes.iter().map(|(at, _)| at.as_str()).collect();

        assert_eq!(nodes.len(), 5);
        assert!(locations.contains(&"workflow[0].nodes[0]"));
        assert!(locations.contains(&"workflow[0].nodes[1].do.nodes[0].then.nodes[0]"));
        assert!(locations.contains(&"workflow[0].nodes[1].do.nodes[0].else.nodes[0]"));
    }
}
