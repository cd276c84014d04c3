//! Call command - one authenticated request against the API.

use anyhow::{Context as _, Result};
use clap::Args;
use forge_client::{ApiRequest, Method};
use serde_json::Value;

use super::{Context, user_error};

/// Arguments for the call command.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    #[arg(value_parser = parse_method)]
    pub method: Method,

    /// Path relative to the API base URL (e.g. work-orders/12/)
    pub path: String,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query", value_parser = parse_key_val)]
    pub query: Vec<(String, String)>,
}

/// Run the call command.
pub async fn run(args: CallArgs, ctx: &Context) -> Result<()> {
    let body: Option<Value> = args
        .data
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .context("--data is not valid JSON")?;

    let mut request = ApiRequest::new(args.method, args.path);
    request.body = body;
    for (key, value) in args.query {
        request = request.with_query(key, value);
    }

    let session = ctx.session()?;
    let response = session.execute(request).await.map_err(user_error)?;

    if ctx.json_output {
        println!("{}", serde_json::to_string(&response)?);
    } else if response.is_null() {
        println!("(no content)");
    } else {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }
    Ok(())
}

fn parse_method(s: &str) -> Result<Method, String> {
    match s.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        other => Err(format!("unsupported method '{}'", other)),
    }
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
