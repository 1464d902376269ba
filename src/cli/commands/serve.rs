//! Serve command - the question page over HTTP.

use crate::config::Settings;

/// Run the serve command. `bind` overrides `server.bind`.
pub async fn run(settings: Settings, bind: Option<String>) -> anyhow::Result<()> {
    let bind = bind.unwrap_or_else(|| settings.server.bind.clone());

    #[cfg(feature = "http-server")]
    {
        crate::server::serve(settings, bind).await
    }

    #[cfg(not(feature = "http-server"))]
    {
        let _ = (settings, bind);
        anyhow::bail!(
            "HTTP server support is not compiled in. Rebuild with: cargo build --features http-server"
        )
    }
}
