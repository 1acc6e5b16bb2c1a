//! Friendlier error replies, worded through the extension's translations.

pub mod responders;

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use log::info;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::extension::ExtensionModule;
use crate::extension::Hook;
use crate::extension::HookArgs;
use crate::extension::HookParam;
use crate::extension::Schema;
use crate::extensions::nice_errors::responders::CooldownResponder;
use crate::extensions::nice_errors::responders::ForbiddenResponder;
use crate::extensions::nice_errors::responders::GenericResponder;
use crate::extensions::nice_errors::responders::NotFoundResponder;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(dead_code)]
pub struct NiceErrorsConfig {
    pub enabled: bool,
}

pub struct NiceErrors;

impl ExtensionModule for NiceErrors {
    fn name(&self) -> &'static str {
        "nice_errors"
    }

    fn default_config(&self) -> Option<Value> {
        Some(json!({ "enabled": true }))
    }

    fn schema(&self) -> Option<Schema> {
        Some(Schema::of::<NiceErrorsConfig>())
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::setup(&[HookParam::Bot, HookParam::Config], setup)]
    }

    fn patch(&self) -> Option<Hook> {
        Some(Hook::patch(patch))
    }
}

/// Routes panics of any task into the log before anything else starts.
fn patch(_args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        log_panics::init();
        info!("Panics are now logged");
        Ok(())
    }
    .boxed()
}

fn setup(mut args: HookArgs<'_>) -> BoxFuture<'_, anyhow::Result<()>> {
    async move {
        let config = Arc::new(args.config()?.clone());
        let setup = args.bot_setup()?;
        setup
            .add_error_responder(CooldownResponder::new(config.clone()))
            .add_error_responder(NotFoundResponder::new(config.clone()))
            .add_error_responder(ForbiddenResponder::new(config.clone()))
            .add_error_responder(GenericResponder::new(config));
        Ok(())
    }
    .boxed()
}
