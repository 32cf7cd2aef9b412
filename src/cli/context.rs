//! Show the metadata of a resource type.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::client::Client;
use crate::metadata::{Dialect, MetadataCapability, Operation, ResourceMetadata};

/// Output format of the `context` command.
#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human readable summary
    Text,
    /// The parsed metadata as JSON
    Json,
}

#[derive(Args)]
pub struct ContextCommand {
    /// Model identifier (`um.user`, `mm3:my.bicycle`) or metadata URL
    #[arg(value_name = "MODEL")]
    id: String,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ContextCommand {
    pub async fn execute(self, client: &Client) -> Result<()> {
        let metadata = client.context(&self.id).await?;
        match self.format {
            OutputFormat::Text => print!("{}", render_text(&metadata)),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&*metadata)?),
        }
        Ok(())
    }
}

fn scoped<'a>(scope: &str, actions: &'a BTreeMap<String, Operation>) -> Vec<(String, &'a Operation)> {
    actions.iter().map(|(name, operation)| (format!("{scope}{name}"), operation)).collect()
}

fn operations(metadata: &ResourceMetadata) -> Vec<(String, &Operation)> {
    match metadata {
        ResourceMetadata::Linked(linked) => {
            let mut all = scoped("member.", &linked.member_actions);
            all.extend(scoped("collection.", &linked.collection_actions));
            all
        }
        ResourceMetadata::Schema(schema) => scoped("", &schema.actions),
    }
}

fn render_text(metadata: &ResourceMetadata) -> String {
    let mut out = String::new();
    let dialect = match metadata.dialect() {
        Dialect::Linked => "linked",
        Dialect::Schema => "schema",
    };
    let _ = writeln!(out, "{} ({dialect})", metadata.url().bold());

    let _ = writeln!(out, "\n{}", "Associations:".cyan());
    if metadata.associations().is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (name, association) in metadata.associations() {
        let arity = if association.many { "many" } else { "one" };
        let _ = writeln!(out, "  {name} -> {} [{arity}]", association.target);
    }

    let _ = writeln!(out, "\n{}", "Operations:".cyan());
    for (name, operation) in operations(metadata) {
        let _ = writeln!(out, "  {name}: {} {}", operation.http_method(), operation.template);
    }
    out
}
