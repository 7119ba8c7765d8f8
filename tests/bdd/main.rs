mod steps;

use std::collections::HashMap;
use std::path::PathBuf;

use cucumber::World;

/// Shared state carried through each scenario.
#[derive(Debug, Default, World)]
pub struct HrWorld {
    /// Temporary directory that owns the database file and uploads.
    pub db_dir: Option<tempfile::TempDir>,
    /// Path to the SQLite database file inside `db_dir`.
    pub db_path: Option<PathBuf>,
    /// Root of the local media store used by the test server.
    pub upload_dir: Option<PathBuf>,
    /// Port of the in-process API server, once started.
    pub server_port: Option<u16>,
    pub server_handle: Option<tokio::task::JoinHandle<()>>,
    pub http_client: reqwest::Client,
    /// Session token sent with requests, if someone is logged in.
    pub session: Option<String>,
    /// Person alias to session token, populated by registration steps.
    pub tokens: HashMap<String, String>,
    /// Person alias to user id.
    pub user_ids: HashMap<String, String>,
    /// Alias to task or meeting id.
    pub record_ids: HashMap<String, String>,
    pub last_response_status: Option<u16>,
    pub last_response_body: Option<String>,
    /// The raw stdout of the most recent `hrd` invocation.
    pub last_stdout: String,
    /// The raw stderr of the most recent `hrd` invocation.
    pub last_stderr: String,
    /// Exit code of the most recent `hrd` invocation.
    pub last_exit_code: i32,
}

impl HrWorld {
    /// Replace every `<alias>` in `text` with the id it names.
    pub fn resolve(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('<') {
            let Some(len) = rest[start..].find('>') else {
                break;
            };
            let alias = &rest[start + 1..start + len];
            let id = self
                .record_ids
                .get(alias)
                .or_else(|| self.user_ids.get(alias))
                .unwrap_or_else(|| panic!("no record or user with alias '{alias}'"));
            out.push_str(&rest[..start]);
            out.push_str(id);
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        out
    }

    pub fn token_for(&self, alias: &str) -> String {
        self.tokens
            .get(alias)
            .unwrap_or_else(|| panic!("no session for '{alias}'"))
            .clone()
    }
}

impl Drop for HrWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

#[tokio::main]
async fn main() {
    HrWorld::cucumber().run_and_exit("tests/features").await;
}
