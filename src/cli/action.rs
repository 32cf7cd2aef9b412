//! Invoke an operation and resolve a selection on its result.

use anyhow::{Context, Result, bail};
use clap::Args;
use serde_json::{Value, json};
use std::collections::BTreeMap;

use crate::client::{ActionOptions, Client};
use crate::network::CallResult;

#[derive(Args)]
pub struct ActionCommand {
    /// Model identifier (`um.user`, `mm3:my.bicycle`) or metadata URL
    #[arg(value_name = "MODEL")]
    model: String,

    /// Operation name, e.g. `get`, `query`, `member.get`
    #[arg(value_name = "OPERATION")]
    operation: String,

    /// Selection to resolve, e.g. 'id, organization { name }'
    #[arg(short, long)]
    schema: Option<String>,

    /// Parameter as NAME=VALUE; VALUE is parsed as JSON when possible
    #[arg(short, long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,

    /// Extra header as NAME=VALUE
    #[arg(long = "header", value_name = "NAME=VALUE")]
    headers: Vec<String>,

    /// Request body as JSON
    #[arg(short, long)]
    body: Option<String>,

    /// Print the response without resolving associations
    #[arg(long)]
    raw: bool,

    /// Fetch every page of paginated responses
    #[arg(long)]
    unfurl: bool,
}

impl ActionCommand {
    pub async fn execute(self, client: &Client) -> Result<()> {
        let model = self.model.clone();
        let operation = self.operation.clone();
        let options = self.into_options()?;

        let result = client.action(&model, &operation, options).await?;
        println!("{}", serde_json::to_string_pretty(&render(&result))?);
        Ok(())
    }

    fn into_options(self) -> Result<ActionOptions> {
        let params = self
            .params
            .iter()
            .map(|param| split_pair(param).map(|(name, value)| (name, parse_value(&value))))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let headers = self.headers.iter().map(String::as_str).map(split_pair).collect::<Result<BTreeMap<_, _>>>()?;
        let body = self
            .body
            .as_deref()
            .map(serde_json::from_str::<Value>)
            .transpose()
            .context("Failed to parse --body as JSON")?;

        Ok(ActionOptions {
            params,
            body,
            headers,
            schema: self.schema,
            raw: self.raw,
            unfurl: self.unfurl,
        })
    }
}

fn split_pair(input: &str) -> Result<(String, String)> {
    match input.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
        _ => bail!("Expected NAME=VALUE, got '{input}'"),
    }
}

/// `42` and `[1,2]` become JSON, anything else stays a string.
fn parse_value(value: &str) -> Value {
    serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

/// A single object for single-object responses, else the object list with pagination.
fn render(result: &CallResult) -> Value {
    match (result.objects.as_slice(), &result.pagination) {
        ([object], None) => Value::Object(object.clone()),
        (objects, pagination) => {
            let mut rendered = json!({ "objects": objects });
            if let Some(pagination) = pagination {
                rendered["pagination"] = json!(pagination);
            }
            if let Some(aggregations) = &result.aggregations {
                rendered["aggregations"] = aggregations.clone();
            }
            rendered
        }
    }
}
