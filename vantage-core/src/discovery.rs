use std::{collections::HashSet, fmt};

use parking_lot::RwLock;
use tracing::trace;
use url::Url;
use vantage_contracts::ScanModel;
use vantage_model::{ScanDirectory, ScanHost};

#[derive(Default)]
struct DiscoveryState {
    uris: Vec<Url>,
    seen_uris: HashSet<String>,
    hosts: Vec<ScanHost>,
    seen_hosts: HashSet<ScanHost>,
    scanned_hosts: HashSet<ScanHost>,
    directories: Vec<ScanDirectory>,
    seen_directories: HashSet<ScanDirectory>,
    scanned_directories: HashSet<ScanDirectory>,
}

/// Process-local discovery graph.
///
/// Hosts and directories are derived from every URI added; each is reported
/// once, in discovery order, until it is marked scanned.
#[derive(Default)]
pub struct InMemoryScanModel {
    state: RwLock<DiscoveryState>,
}

impl fmt::Debug for InMemoryScanModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemoryScanModel")
            .field("uris", &state.uris.len())
            .field("hosts", &state.hosts.len())
            .field("scanned_hosts", &state.scanned_hosts.len())
            .field("directories", &state.directories.len())
            .field("scanned_directories", &state.scanned_directories.len())
            .finish()
    }
}

impl InMemoryScanModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discovered_uris(&self) -> Vec<Url> {
        self.state.read().uris.clone()
    }

    pub fn hosts(&self) -> Vec<ScanHost> {
        self.state.read().hosts.clone()
    }

    pub fn directories(&self) -> Vec<ScanDirectory> {
        self.state.read().directories.clone()
    }
}

impl ScanModel for InMemoryScanModel {
    fn add_discovered_uri(&self, uri: &Url) {
        let mut without_fragment = uri.clone();
        without_fragment.set_fragment(None);

        let (host, directories) = match (
            ScanHost::from_url(&without_fragment),
            ScanDirectory::ancestors_of(&without_fragment),
        ) {
            (Ok(host), Ok(directories)) => (host, directories),
            (Err(err), _) | (_, Err(err)) => {
                trace!(target: "scan::crawl", uri = %uri, error = %err, "ignoring out of scope uri");
                return;
            }
        };

        let mut state = self.state.write();
        if !state.seen_uris.insert(without_fragment.to_string()) {
            return;
        }
        state.uris.push(without_fragment);

        if state.seen_hosts.insert(host.clone()) {
            state.hosts.push(host);
        }
        for directory in directories {
            if state.seen_directories.insert(directory.clone()) {
                state.directories.push(directory);
            }
        }
    }

    fn unscanned_hosts(&self) -> Vec<ScanHost> {
        let state = self.state.read();
        state
            .hosts
            .iter()
            .filter(|host| !state.scanned_hosts.contains(*host))
            .cloned()
            .collect()
    }

    fn unscanned_directories(&self) -> Vec<ScanDirectory> {
        let state = self.state.read();
        state
            .directories
            .iter()
            .filter(|directory| !state.scanned_directories.contains(*directory))
            .cloned()
            .collect()
    }

    fn mark_host_scanned(&self, host: &ScanHost) {
        self.state.write().scanned_hosts.insert(host.clone());
    }

    fn mark_directory_scanned(&self, directory: &ScanDirectory) {
        self.state.write().scanned_directories.insert(directory.clone());
    }
}
