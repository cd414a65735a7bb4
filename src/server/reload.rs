//! Live-reload hub and browser client

use crate::config::ReloadKind;
use crate::utils::to_slash;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;

/// Messages pushed to connected browsers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Reload the whole page
    Reload,
    /// Swap in the given assets (URL paths from the server root)
    Inject { paths: Vec<String> },
}

/// Broadcast point between the watcher and the dev server's sockets
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        ReloadHub { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    /// Send to every connected client; returns how many received it
    pub fn send(&self, message: ReloadMessage) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    /// Signal clients after a watched task wrote `files` under `build_dir`
    pub fn task_finished(&self, kind: ReloadKind, build_dir: &Path, files: &[PathBuf]) -> usize {
        match kind {
            ReloadKind::None => 0,
            ReloadKind::Full => self.send(ReloadMessage::Reload),
            ReloadKind::Inject => {
                let paths: Vec<String> = files
                    .iter()
                    .filter_map(|f| f.strip_prefix(build_dir).ok())
                    .map(|rel| format!("/{}", to_slash(rel)))
                    .collect();
                if paths.is_empty() {
                    return 0;
                }
                self.send(ReloadMessage::Inject { paths })
            }
        }
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        ReloadHub::new()
    }
}

/// Served at `/__livereload.js`. Stylesheets are swapped in place; anything
/// else triggers a full reload.
pub const CLIENT_SCRIPT: &str = r#"(function () {
  var url = (location.protocol === "https:" ? "wss://" : "ws://") + location.host + "/__livereload";
  function bust(link) {
    var href = link.getAttribute("href").replace(/[?&]livereload=\d+/, "");
    link.setAttribute("href", href + (href.indexOf("?") < 0 ? "?" : "&") + "livereload=" + Date.now());
  }
  function inject(paths) {
    for (var i = 0; i < paths.length; i++) {
      if (!/\.css$/.test(paths[i])) { location.reload(); return; }
    }
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    for (var j = 0; j < links.length; j++) { bust(links[j]); }
  }
  function connect() {
    var socket = new WebSocket(url);
    socket.onmessage = function (event) {
      var msg = JSON.parse(event.data);
      if (msg.type === "inject") { inject(msg.paths || []); } else { location.reload(); }
    };
    socket.onclose = function () { setTimeout(connect, 1000); };
  }
  connect();
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        assert_eq!(
            serde_json::to_string(&ReloadMessage::Reload).unwrap(),
            r#"{"type":"reload"}"#
        );
        let inject = ReloadMessage::Inject {
            paths: vec!["/css/styles.css".to_string()],
        };
        assert_eq!(
            serde_json::to_string(&inject).unwrap(),
            r#"{"type":"inject","paths":["/css/styles.css"]}"#
        );
    }

    #[tokio::test]
    async fn test_inject_paths_relative_to_build() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        let build = PathBuf::from("/project/build");
        let sent = hub.task_finished(
            ReloadKind::Inject,
            &build,
            &[build.join("css/styles.css")],
        );
        assert_eq!(sent, 1);
        assert_eq!(
            rx.recv().await.unwrap(),
            ReloadMessage::Inject {
                paths: vec!["/css/styles.css".to_string()]
            }
        );
    }

    #[test]
    fn test_no_reload_and_no_clients() {
        let hub = ReloadHub::new();
        assert_eq!(hub.task_finished(ReloadKind::Full, Path::new("/b"), &[]), 0);

        let _rx = hub.subscribe();
        assert_eq!(hub.task_finished(ReloadKind::None, Path::new("/b"), &[]), 0);
        assert_eq!(hub.task_finished(ReloadKind::Inject, Path::new("/b"), &[]), 0);
    }
}
