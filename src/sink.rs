use anyhow::Result;
use futures::future::BoxFuture;

use crate::email::Discovery;

/// Downstream consumer of discovered live streams
pub trait DiscoverySink: Send + Sync {
    /// Receive one batch worth of discoveries, in discovery order
    fn publish<'a>(&'a self, discoveries: &'a [Discovery]) -> BoxFuture<'a, Result<()>>;

    /// Get the name of this sink (for logging)
    fn sink_name(&self) -> &str;
}

/// Writes each discovery to stdout, as plain text or one JSON object per line
pub struct StdoutSink {
    json: bool,
}

impl StdoutSink {
    pub fn new(json: bool) -> Self {
        StdoutSink { json }
    }

    pub fn render(&self, discovery: &Discovery) -> Result<String> {
        if self.json {
            Ok(serde_json::to_string(discovery)?)
        } else {
            Ok(format!("{}\t{}", discovery.video_id, discovery.watch_url()))
        }
    }
}

impl DiscoverySink for StdoutSink {
    fn publish<'a>(&'a self, discoveries: &'a [Discovery]) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            for discovery in discoveries {
                println!("{}", self.render(discovery)?);
            }
            Ok(())
        })
    }

    fn sink_name(&self) -> &str {
        "stdout"
    }
}
