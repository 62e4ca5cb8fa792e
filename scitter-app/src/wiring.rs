//! Turns a loaded [`ScitterConfig`] into a ready [`Scitter`] client.
use anyhow::{Context, Result, ensure};
use scitter_api::{Credentials, Endpoints, Scitter};
use scitter_config::{AccountConfig, EndpointOverrides, ScitterConfig};
use std::time::Duration;

pub fn build_scitter(cfg: &ScitterConfig) -> Result<Scitter> {
    let credentials = match &cfg.account {
        AccountConfig::Basic { username, password } => {
            ensure!(!username.trim().is_empty(), "account.username is empty");
            Credentials::basic(username, password)
        }
        AccountConfig::Token { token } => {
            ensure!(!token.trim().is_empty(), "account.token is empty");
            Credentials::bearer(token)
        }
    };

    let endpoints = apply_overrides(Endpoints::default(), &cfg.service.endpoints);
    ensure!(
        endpoints.show_status.contains("{id}"),
        "service.endpoints.show_status must contain {{id}}"
    );

    let mut builder = Scitter::builder(credentials).endpoints(endpoints);
    if let Some(base_url) = &cfg.service.base_url {
        builder = builder.base_url(base_url);
    }
    if let Some(secs) = cfg.service.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build().context("building scitter client")
}

fn apply_overrides(mut endpoints: Endpoints, overrides: &EndpointOverrides) -> Endpoints {
    let pairs = [
        (&mut endpoints.verify_credentials, &overrides.verify_credentials),
        (&mut endpoints.friends_timeline, &overrides.friends_timeline),
        (&mut endpoints.user_timeline, &overrides.user_timeline),
        (&mut endpoints.public_timeline, &overrides.public_timeline),
        (&mut endpoints.show_status, &overrides.show_status),
    ];
    for (slot, value) in pairs {
        if let Some(path) = value {
            *slot = path.clone();
        }
    }
    endpoints
}
