//! Source catalog
//!
//! The registry is built once. Afterwards only each source's runtime state
//! (available feeds, properties, listeners) changes.

use serde::Serialize;
use std::collections::HashMap;

use super::source::{Cadence, KeyMode, MetricSource, SourceDescriptor};

/// Lookup-by-name catalog of metric sources, kept in declaration order.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<MetricSource>,
    index: HashMap<String, usize>,
}

/// Point-in-time view of a source for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSnapshot {
    pub name: String,
    pub cadence: Cadence,
    pub available: Vec<String>,
    pub properties: Vec<String>,
    pub listeners: usize,
}

impl SourceRegistry {
    /// Build a registry from descriptors. Later duplicates of a name are
    /// ignored.
    pub fn new(descriptors: impl IntoIterator<Item = SourceDescriptor>) -> Self {
        let mut sources = Vec::new();
        let mut index = HashMap::new();
        for descriptor in descriptors {
            if index.contains_key(&descriptor.name) {
                continue;
            }
            index.insert(descriptor.name.clone(), sources.len());
            sources.push(MetricSource::new(descriptor));
        }
        Self { sources, index }
    }

    /// The appliance's standard catalog.
    pub fn with_default_catalog() -> Self {
        Self::new(default_catalog())
    }

    pub fn get(&self, name: &str) -> Option<&MetricSource> {
        self.index.get(name).map(|&i| &self.sources[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut MetricSource> {
        self.index.get(name).map(|&i| &mut self.sources[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSource> {
        self.sources.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MetricSource> {
        self.sources.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(MetricSource::name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// `true` if any source has at least one registration.
    pub fn has_listeners(&self) -> bool {
        self.sources.iter().any(MetricSource::has_listeners)
    }

    /// Total registrations across all sources.
    pub fn listener_count(&self) -> usize {
        self.sources.iter().map(|s| s.listeners().len()).sum()
    }

    pub fn snapshot(&self, name: &str) -> Option<SourceSnapshot> {
        self.get(name).map(|source| SourceSnapshot {
            name: source.name().to_string(),
            cadence: source.cadence(),
            available: source.available().to_vec(),
            properties: source.properties().to_vec(),
            listeners: source.listeners().len(),
        })
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::with_default_catalog()
    }
}

fn explicit(keys: &[&str]) -> KeyMode {
    KeyMode::ExplicitKeys(keys.iter().map(|k| k.to_string()).collect())
}

/// Descriptors of the fourteen standard sources.
pub fn default_catalog() -> Vec<SourceDescriptor> {
    use Cadence::{Realtime, Standard};

    vec![
        SourceDescriptor::new(
            "CpuAggregate",
            "aggregation-cpu-",
            explicit(&["average", "max", "min", "num", "stddev", "sum"]),
            Standard,
        )
        .with_legend_prefix("/cpu-"),
        SourceDescriptor::new("Cpu", "cpu-", KeyMode::Wildcard, Realtime),
        SourceDescriptor::new("CpuTemp", "cputemp-", KeyMode::Wildcard, Realtime),
        SourceDescriptor::new("Devices", "ctl-", KeyMode::Wildcard, Standard),
        SourceDescriptor::new("Mounts", "df-mnt", KeyMode::Wildcard, Standard),
        SourceDescriptor::new("Disks", "disk-", KeyMode::Wildcard, Realtime),
        SourceDescriptor::new("DiskTemp", "disktemp-", KeyMode::Wildcard, Realtime),
        SourceDescriptor::new("GEOM", "geom_", explicit(&["stat"]), Standard),
        SourceDescriptor::new(
            "System",
            "",
            explicit(&["load", "processes", "uptime", "swap"]),
            Realtime,
        ),
        SourceDescriptor::new(
            "Load",
            "",
            KeyMode::DatasetKeys {
                datasets_type: "load".to_string(),
                keys: vec![
                    "shortterm".to_string(),
                    "midterm".to_string(),
                    "longterm".to_string(),
                ],
            },
            Standard,
        ),
        SourceDescriptor::new(
            "NIC",
            "interface-",
            KeyMode::Bidirectional {
                forward: "rx".to_string(),
                reverse: "tx".to_string(),
            },
            Realtime,
        ),
        SourceDescriptor::new("Processes", "", explicit(&["processes"]), Standard)
            .with_legend_prefix("/ps_state-"),
        SourceDescriptor::new("Memory", "", explicit(&["memory"]), Standard)
            .with_legend_prefix("/memory-"),
        SourceDescriptor::new("FileSystem", "zfs_", KeyMode::Wildcard, Standard),
    ]
}
