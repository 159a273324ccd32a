// Evaluate a single request against the configured guard

use anyhow::Result;
use campus_guards::{GuardConfig, GuardEvaluation, GuardRequest, BEARER_PREFIX};
use clap::Args;
use serde_json::json;
use tracing::info;

/// Exit status reported when the guard denies the request.
pub const DENIED_EXIT_CODE: u8 = 2;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Request path
    #[arg(long)]
    pub path: String,

    /// Raw Authorization header value
    #[arg(long, conflicts_with = "token")]
    pub authorization: Option<String>,

    /// Bare token, sent as `Bearer <token>`
    #[arg(long)]
    pub token: Option<String>,

    /// Branch selector header value
    #[arg(long)]
    pub branch: Option<String>,
}

impl CheckArgs {
    fn authorization_header(&self) -> Option<String> {
        self.authorization
            .clone()
            .or_else(|| self.token.as_ref().map(|token| format!("{BEARER_PREFIX}{token}")))
    }
}

pub fn evaluate(args: &CheckArgs, config: &GuardConfig) -> Result<GuardEvaluation> {
    let guard = config.build_guard()?;
    let authorization = args.authorization_header();

    let mut request = GuardRequest::new(&args.path);
    if let Some(authorization) = authorization.as_deref() {
        request = request.with_authorization(authorization);
    }
    if let Some(branch) = args.branch.as_deref() {
        request = request.with_branch_selector(branch);
    }

    Ok(guard.evaluate(&request))
}

/// Print the evaluation as JSON. Returns whether the request was allowed.
pub fn run(args: &CheckArgs, config: &GuardConfig) -> Result<bool> {
    let evaluation = evaluate(args, config)?;
    let allowed = evaluation.decision.is_allowed();
    info!(path = %args.path, allowed, "request evaluated");

    let output = json!({
        "path": args.path,
        "allowed": allowed,
        "evaluation": evaluation,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(allowed)
}
