// Decode a bearer token with the configured claims provider

use anyhow::{Context, Result};
use campus_guards::{CallerClaims, GuardConfig, BEARER_PREFIX};
use clap::Args;

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Token, with or without the `Bearer ` prefix
    #[arg(long)]
    pub token: String,
}

pub fn decode(args: &DecodeArgs, config: &GuardConfig) -> Result<CallerClaims> {
    let provider = config.claims_provider()?;
    let authorization = if args.token.starts_with(BEARER_PREFIX) {
        args.token.clone()
    } else {
        format!("{BEARER_PREFIX}{}", args.token)
    };
    provider
        .resolve(Some(&authorization), &config.claim_fields())
        .context("token could not be decoded")
}

pub fn run(args: &DecodeArgs, config: &GuardConfig) -> Result<()> {
    let claims = decode(args, config)?;
    println!("{}", serde_json::to_string_pretty(&claims)?);
    Ok(())
}
