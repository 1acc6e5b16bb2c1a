//! Lifecycle hooks of extensions.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use futures::future::BoxFuture;

use crate::bot::BotSetup;
use crate::extension::ExtensionConfig;
use crate::web::WebApp;
use crate::web::WebBot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Adds commands and listeners to the gateway bot.
    Setup,
    /// Adds routes to the web app.
    SetupWebserver,
    /// Runs once before the bot and web app start.
    OnStartup,
    /// Runs before any extension is loaded.
    Patch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookParam {
    Bot,
    Config,
    App,
}

impl HookKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::SetupWebserver => "setup_webserver",
            Self::OnStartup => "on_startup",
            Self::Patch => "patch",
        }
    }

    pub fn allowed_params(&self) -> &'static [HookParam] {
        match self {
            Self::Setup => &[HookParam::Bot, HookParam::Config],
            Self::SetupWebserver | Self::OnStartup => {
                &[HookParam::App, HookParam::Bot, HookParam::Config]
            }
            Self::Patch => &[HookParam::Config],
        }
    }

    pub fn max_arity(&self) -> usize {
        self.allowed_params().len()
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The bot a hook receives: the one being set up, or a REST-only handle.
pub enum HookBot<'a> {
    Setup(&'a mut BotSetup),
    Rest(&'a WebBot),
}

/// Arguments of one hook invocation. Only the parameters the hook declared are present.
pub struct HookArgs<'a> {
    bot: Option<HookBot<'a>>,
    config: Option<&'a ExtensionConfig>,
    app: Option<&'a WebApp>,
}

impl<'a> HookArgs<'a> {
    pub fn config(&self) -> anyhow::Result<&'a ExtensionConfig> {
        self.config
            .ok_or_else(|| anyhow!("hook did not declare the `config` parameter"))
    }

    pub fn app(&self) -> anyhow::Result<&'a WebApp> {
        self.app
            .ok_or_else(|| anyhow!("no web app available to this hook"))
    }

    pub fn bot_setup(&mut self) -> anyhow::Result<&mut BotSetup> {
        match &mut self.bot {
            Some(HookBot::Setup(setup)) => Ok(&mut **setup),
            _ => Err(anyhow!("no bot being set up available to this hook")),
        }
    }

    pub fn rest_bot(&self) -> Option<&'a WebBot> {
        match &self.bot {
            Some(HookBot::Rest(bot)) => Some(*bot),
            _ => None,
        }
    }
}

pub type HookFn =
    Arc<dyn for<'a> Fn(HookArgs<'a>) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync>;

/// A lifecycle hook with its declared parameters.
#[derive(Clone)]
pub struct Hook {
    kind: HookKind,
    params: Vec<HookParam>,
    func: HookFn,
}

/// Everything a runtime can offer a hook.
pub struct HookRuntime<'a> {
    pub bot: Option<HookBot<'a>>,
    pub config: &'a ExtensionConfig,
    pub app: Option<&'a WebApp>,
}

impl Hook {
    pub fn new<F>(kind: HookKind, params: &[HookParam], func: F) -> Self
    where
        F: for<'a> Fn(HookArgs<'a>) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        Self {
            kind,
            params: params.to_vec(),
            func: Arc::new(func),
        }
    }

    pub fn setup<F>(params: &[HookParam], func: F) -> Self
    where
        F: for<'a> Fn(HookArgs<'a>) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        Self::new(HookKind::Setup, params, func)
    }

    pub fn setup_webserver<F>(params: &[HookParam], func: F) -> Self
    where
        F: for<'a> Fn(HookArgs<'a>) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        Self::new(HookKind::SetupWebserver, params, func)
    }

    pub fn on_startup<F>(params: &[HookParam], func: F) -> Self
    where
        F: for<'a> Fn(HookArgs<'a>) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        Self::new(HookKind::OnStartup, params, func)
    }

    pub fn patch<F>(func: F) -> Self
    where
        F: for<'a> Fn(HookArgs<'a>) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync + 'static,
    {
        Self::new(HookKind::Patch, &[HookParam::Config], func)
    }

    pub fn kind(&self) -> HookKind {
        self.kind
    }

    pub fn params(&self) -> &[HookParam] {
        &self.params
    }

    /// Checks the declared parameters against what the hook kind accepts.
    pub fn validate(&self) -> Result<(), String> {
        if self.params.len() > self.kind.max_arity() {
            return Err(format!(
                "{} hook takes {} parameters, at most {} are allowed",
                self.kind,
                self.params.len(),
                self.kind.max_arity()
            ));
        }
        let allowed = self.kind.allowed_params();
        for (i, param) in self.params.iter().enumerate() {
            if !allowed.contains(param) {
                return Err(format!(
                    "{} hook does not accept the {:?} parameter",
                    self.kind, param
                ));
            }
            if self.params[..i].contains(param) {
                return Err(format!(
                    "{} hook declares the {:?} parameter twice",
                    self.kind, param
                ));
            }
        }
        Ok(())
    }

    /// Calls the hook with the declared subset of what `runtime` offers.
    pub async fn invoke(&self, runtime: HookRuntime<'_>) -> anyhow::Result<()> {
        let declared = |param| self.params.contains(&param);
        let args = HookArgs {
            bot: runtime.bot.filter(|_| declared(HookParam::Bot)),
            config: Some(runtime.config).filter(|_| declared(HookParam::Config)),
            app: runtime.app.filter(|_| declared(HookParam::App)),
        };
        (self.func)(args).await
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("kind", &self.kind)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A hook paired with the configuration of the extension it belongs to.
#[derive(Debug, Clone)]
pub struct BoundHook {
    pub hook: Hook,
    pub config: Arc<ExtensionConfig>,
}

impl BoundHook {
    pub async fn invoke(&self, bot: Option<HookBot<'_>>, app: Option<&WebApp>) -> anyhow::Result<()> {
        self.hook
            .invoke(HookRuntime {
                bot,
                config: &self.config,
                app,
            })
            .await
    }

    pub fn extension(&self) -> &str {
        &self.config.name
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use futures::FutureExt;
    use serde_json::json;

    use super::*;
    use crate::extension::ConfigOrigin;

    fn config() -> ExtensionConfig {
        ExtensionConfig::new(
            "test",
            PathBuf::from("extensions/test"),
            json!({ "enabled": true }),
            ConfigOrigin::Default,
        )
    }

    #[test]
    fn test_validate_rejects_foreign_param() {
        let hook = Hook::setup(&[HookParam::App], |_| async { Ok(()) }.boxed());
        assert!(hook.validate().unwrap_err().contains("App"));

        let hook = Hook::new(HookKind::Patch, &[HookParam::Config, HookParam::Bot], |_| {
            async { Ok(()) }.boxed()
        });
        assert!(hook.validate().unwrap_err().contains("at most 1"));

        let hook = Hook::on_startup(&[HookParam::Config, HookParam::Config], |_| {
            async { Ok(()) }.boxed()
        });
        assert!(hook.validate().unwrap_err().contains("twice"));
    }

    #[test]
    fn test_validate_accepts_allowed_params() {
        let hook = Hook::setup_webserver(
            &[HookParam::App, HookParam::Bot, HookParam::Config],
            |_| async { Ok(()) }.boxed(),
        );
        assert!(hook.validate().is_ok());
    }

    #[tokio::test]
    async fn test_invoke_passes_only_declared_params() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let hook = Hook::on_startup(&[HookParam::Config], move |args| {
            let counter = counter.clone();
            async move {
                assert_eq!(args.config()?.name, "test");
                assert!(args.app().is_err());
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            .boxed()
        });

        let app = WebApp::new();
        let config = config();
        hook.invoke(HookRuntime {
            bot: None,
            config: &config,
            app: Some(&app),
        })
        .await
        .unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
