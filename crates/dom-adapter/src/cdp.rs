//! Chromium DevTools backend.
//!
//! Node handles are indices into a page-side registry
//! (`window.__mrfillNodes`); every port call round-trips one `Runtime.evaluate`
//! so no element state is held on this side. Handles go stale whenever the
//! SPA re-renders, which is fine: callers re-resolve every pass.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{DomError, DomPort, NodeHandle};

const REGISTRY: &str = "const reg = (window.__mrfillNodes = window.__mrfillNodes || []);";

/// An owned browser connection plus its event-handler task.
pub struct CdpSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl CdpSession {
    /// Launch a local browser instance.
    pub async fn launch(headless: bool) -> Result<Self, DomError> {
        let mut builder = BrowserConfig::builder();
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(DomError::Backend)?;
        let (browser, handler) = Browser::launch(config)
            .await
            .map_err(|e| DomError::Backend(e.to_string()))?;
        Ok(Self {
            browser,
            handler: spawn_handler(handler),
        })
    }

    /// Attach to an already-running browser via its DevTools websocket URL.
    pub async fn connect(ws_url: &str) -> Result<Self, DomError> {
        let (browser, handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| DomError::Backend(e.to_string()))?;
        Ok(Self {
            browser,
            handler: spawn_handler(handler),
        })
    }

    /// Open a new tab at `url`.
    pub async fn open(&self, url: &str) -> Result<CdpDom, DomError> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| DomError::Backend(e.to_string()))?;
        Ok(CdpDom { page })
    }

    /// Find an existing tab whose URL contains `fragment`.
    pub async fn attach(&self, fragment: &str) -> Result<CdpDom, DomError> {
        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| DomError::Backend(e.to_string()))?;
        for page in pages {
            let url = page
                .url()
                .await
                .map_err(|e| DomError::Backend(e.to_string()))?
                .unwrap_or_default();
            if url.contains(fragment) {
                debug!(url, "attached to existing tab");
                return Ok(CdpDom { page });
            }
        }
        Err(DomError::Backend(format!(
            "no open tab matches '{fragment}'"
        )))
    }

    pub async fn close(mut self) {
        if let Err(err) = self.browser.close().await {
            warn!("browser close failed: {err}");
        }
        self.handler.abort();
    }
}

fn spawn_handler(mut handler: chromiumoxide::handler::Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    })
}

/// [`DomPort`] over one browser tab.
pub struct CdpDom {
    page: Page,
}

impl CdpDom {
    async fn eval<T: DeserializeOwned>(&self, expr: String) -> Result<T, DomError> {
        self.page
            .evaluate(expr)
            .await
            .map_err(|e| DomError::Backend(e.to_string()))?
            .into_value::<T>()
            .map_err(|e| DomError::Backend(e.to_string()))
    }

    /// Evaluate an expression whose script returns `JSON.stringify(...)`.
    /// Compound values cross the protocol as strings; primitives come back
    /// by value, objects do not.
    async fn eval_json<T: DeserializeOwned>(&self, expr: String) -> Result<T, DomError> {
        let raw: String = self.eval(expr).await?;
        serde_json::from_str(&raw).map_err(|e| DomError::Backend(e.to_string()))
    }

    fn scope_expr(scope: Option<&NodeHandle>) -> String {
        match scope {
            Some(node) => format!("reg[{}]", node.0),
            None => "document".to_string(),
        }
    }

    fn node_expr(node: &NodeHandle) -> String {
        format!("reg[{}]", node.0)
    }

    fn quote(value: &str) -> String {
        serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
    }
}

#[async_trait]
impl DomPort for CdpDom {
    async fn location_path(&self) -> Result<String, DomError> {
        self.eval("window.location.pathname".to_string()).await
    }

    async fn query(
        &self,
        scope: Option<&NodeHandle>,
        selector: &str,
    ) -> Result<Option<NodeHandle>, DomError> {
        let expr = format!(
            "(() => {{ {REGISTRY} const scope = {}; \
             if (!scope || scope.isConnected === false) return null; \
             const el = scope.querySelector({}); if (!el) return null; \
             reg.push(el); return reg.length - 1; }})()",
            Self::scope_expr(scope),
            Self::quote(selector),
        );
        let id: Option<u64> = self.eval(expr).await?;
        Ok(id.map(NodeHandle))
    }

    async fn query_all(
        &self,
        scope: Option<&NodeHandle>,
        selector: &str,
    ) -> Result<Vec<NodeHandle>, DomError> {
        let expr = format!(
            "(() => {{ {REGISTRY} const scope = {}; \
             if (!scope || scope.isConnected === false) return '[]'; \
             const out = []; \
             for (const el of scope.querySelectorAll({})) {{ reg.push(el); out.push(reg.length - 1); }} \
             return JSON.stringify(out); }})()",
            Self::scope_expr(scope),
            Self::quote(selector),
        );
        let ids: Vec<u64> = self.eval_json(expr).await?;
        Ok(ids.into_iter().map(NodeHandle).collect())
    }

    async fn attribute(
        &self,
        node: &NodeHandle,
        name: &str,
    ) -> Result<Option<String>, DomError> {
        let expr = format!(
            "(() => {{ {REGISTRY} const el = {}; \
             if (!el || !el.isConnected) return JSON.stringify({{ stale: true }}); \
             const name = {}; \
             const val = (name === 'value' && 'value' in el) ? el.value : el.getAttribute(name); \
             return JSON.stringify({{ val: val === null || val === undefined ? null : String(val) }}); }})()",
            Self::node_expr(node),
            Self::quote(name),
        );
        #[derive(serde::Deserialize)]
        struct Reply {
            #[serde(default)]
            stale: bool,
            #[serde(default)]
            val: Option<String>,
        }
        let reply: Reply = self.eval_json(expr).await?;
        if reply.stale {
            return Err(DomError::Stale(*node));
        }
        Ok(reply.val)
    }

    async fn text(&self, node: &NodeHandle) -> Result<String, DomError> {
        let expr = format!(
            "(() => {{ {REGISTRY} const el = {}; \
             return el && el.isConnected ? (el.textContent || '').trim() : null; }})()",
            Self::node_expr(node),
        );
        let text: Option<String> = self.eval(expr).await?;
        text.ok_or(DomError::Stale(*node))
    }

    async fn in_closest(&self, node: &NodeHandle, selector: &str) -> Result<bool, DomError> {
        let expr = format!(
            "(() => {{ {REGISTRY} const el = {}; \
             return el && el.isConnected ? !!el.closest({}) : false; }})()",
            Self::node_expr(node),
            Self::quote(selector),
        );
        self.eval(expr).await
    }

    async fn click(&self, node: &NodeHandle) -> Result<(), DomError> {
        let expr = format!(
            "(() => {{ {REGISTRY} const el = {}; \
             if (!el || !el.isConnected) return false; el.click(); return true; }})()",
            Self::node_expr(node),
        );
        let ok: bool = self.eval(expr).await?;
        if ok {
            Ok(())
        } else {
            Err(DomError::Stale(*node))
        }
    }

    async fn set_value(&self, node: &NodeHandle, value: &str) -> Result<(), DomError> {
        let expr = format!(
            "(() => {{ {REGISTRY} const el = {}; \
             if (!el || !el.isConnected) return false; \
             if (el.focus) el.focus(); \
             if ('value' in el) el.value = {}; \
             for (const kind of ['input', 'change', 'keyup']) \
               el.dispatchEvent(new Event(kind, {{ bubbles: true }})); \
             return true; }})()",
            Self::node_expr(node),
            Self::quote(value),
        );
        let ok: bool = self.eval(expr).await?;
        if ok {
            Ok(())
        } else {
            Err(DomError::Stale(*node))
        }
    }
}
