use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    config::EngineConfig,
    dsp::{impulse::ImpulseResponse, param::ParamEvent},
    error::{AudioResult, GraphError},
    graph::{AudioGraphProvider, NodeId, NodeSpec, ParamKind},
};

/*
Signal Bus
==========

    voice ──┬──▶ dry ───────────────────┐
            │                           ▼
            └──▶ convolver ──▶ wet ──▶ master ──┬──▶ destination
                                                 └──▶ capture tap

The voice connects to two bus inputs: the dry gain and the convolver. Both
paths meet again at the master gain. The capture tap hangs off the master so
a recording hears exactly what the speakers do.

Mix
---

    wet = enabled ? ratio : 0
    dry = 1 - wet

Both levels are set instantly (no smoothing). The reverb control moves in
coarse steps, and the pair always sums to 1.

Lifetime
--------

Nodes are built on first use. Wiring runs at most once per build; connecting
an existing edge again reports `AlreadyConnected` and is ignored. A rebuild
after `teardown` draws a fresh impulse response.
*/

/// Node handles of a built bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusNodes {
    pub master: NodeId,
    pub dry: NodeId,
    pub wet: NodeId,
    pub convolver: NodeId,
    pub tap: NodeId,
}

impl BusNodes {
    /// Where a voice connects its output.
    pub fn inputs(&self) -> [NodeId; 2] {
        [self.dry, self.convolver]
    }

    fn all(&self) -> [NodeId; 5] {
        [self.tap, self.master, self.wet, self.convolver, self.dry]
    }
}

pub struct SignalBus {
    nodes: Option<BusNodes>,
    wired: bool,
    wet_ratio: f64,
    enabled: bool,
    impulse_duration: f64,
    decay_exponent: f64,
    rng: StdRng,
}

impl SignalBus {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Bus whose impulse responses are reproducible.
    pub fn with_seed(config: &EngineConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &EngineConfig, rng: StdRng) -> Self {
        Self {
            nodes: None,
            wired: false,
            wet_ratio: config.wet_ratio.clamp(0.0, 1.0),
            enabled: config.reverb_enabled,
            impulse_duration: config.reverb_impulse_duration,
            decay_exponent: config.reverb_decay_exponent,
            rng,
        }
    }

    pub fn nodes(&self) -> Option<BusNodes> {
        self.nodes
    }

    pub fn is_wired(&self) -> bool {
        self.wired
    }

    pub fn wet_ratio(&self) -> f64 {
        self.wet_ratio
    }

    pub fn reverb_enabled(&self) -> bool {
        self.enabled
    }

    pub fn wet_gain(&self) -> f64 {
        if self.enabled {
            self.wet_ratio
        } else {
            0.0
        }
    }

    pub fn dry_gain(&self) -> f64 {
        1.0 - self.wet_gain()
    }

    /// Build and wire the bus if that has not happened yet.
    pub fn ensure(&mut self, graph: &mut dyn AudioGraphProvider) -> AudioResult<BusNodes> {
        let nodes = match self.nodes {
            Some(nodes) => nodes,
            None => {
                let nodes = self.build(graph)?;
                self.nodes = Some(nodes);
                self.wired = false;
                nodes
            }
        };

        if !self.wired {
            wire(graph, &nodes)?;
            self.wired = true;
            debug!("bus wired: {nodes:?}");
        }
        Ok(nodes)
    }

    /// Bus inputs a voice should feed, building the bus on first use.
    pub fn inputs(&mut self, graph: &mut dyn AudioGraphProvider) -> AudioResult<[NodeId; 2]> {
        Ok(self.ensure(graph)?.inputs())
    }

    /// Capture point on the master mix, building the bus on first use.
    pub fn tap(&mut self, graph: &mut dyn AudioGraphProvider) -> AudioResult<NodeId> {
        Ok(self.ensure(graph)?.tap)
    }

    /// Update the mix. Applied to the graph right away when the bus exists.
    pub fn set_wet(
        &mut self,
        graph: Option<&mut dyn AudioGraphProvider>,
        ratio: f64,
        enabled: bool,
    ) -> Result<(), GraphError> {
        self.wet_ratio = ratio.clamp(0.0, 1.0);
        self.enabled = enabled;

        match (graph, self.nodes) {
            (Some(graph), Some(nodes)) => self.apply_mix(graph, &nodes),
            _ => Ok(()),
        }
    }

    /// Release every bus node. The next `ensure` rebuilds from scratch.
    pub fn teardown(&mut self, graph: &mut dyn AudioGraphProvider) {
        let Some(nodes) = self.nodes.take() else {
            return;
        };
        self.wired = false;
        for node in nodes.all() {
            if let Err(err) = graph.release(node) {
                debug!("bus node {node:?} not released: {err}");
            }
        }
    }

    fn build(&mut self, graph: &mut dyn AudioGraphProvider) -> AudioResult<BusNodes> {
        let impulse = ImpulseResponse::decaying_noise(
            &mut self.rng,
            graph.sample_rate(),
            self.impulse_duration,
            self.decay_exponent,
        );
        info!(
            "building signal bus ({:.2} s impulse, {} frames)",
            impulse.duration(),
            impulse.len()
        );

        let mut created = Vec::with_capacity(5);
        let specs = [
            NodeSpec::Gain { gain: 1.0 },
            NodeSpec::Gain {
                gain: self.dry_gain() as f32,
            },
            NodeSpec::Gain {
                gain: self.wet_gain() as f32,
            },
            NodeSpec::Convolver { impulse },
            NodeSpec::CaptureTap,
        ];
        for spec in specs {
            match graph.create_node(spec) {
                Ok(node) => created.push(node),
                Err(err) => {
                    for node in created {
                        if let Err(release) = graph.release(node) {
                            debug!("partial bus node {node:?} not released: {release}");
                        }
                    }
                    return Err(err.into());
                }
            }
        }

        Ok(BusNodes {
            master: created[0],
            dry: created[1],
            wet: created[2],
            convolver: created[3],
            tap: created[4],
        })
    }

    fn apply_mix(
        &self,
        graph: &mut dyn AudioGraphProvider,
        nodes: &BusNodes,
    ) -> Result<(), GraphError> {
        let dry = self.dry_gain() as f32;
        let wet = self.wet_gain() as f32;
        graph.schedule(nodes.dry, ParamKind::Gain, ParamEvent::SetValue { value: dry })?;
        graph.schedule(nodes.wet, ParamKind::Gain, ParamEvent::SetValue { value: wet })?;
        Ok(())
    }
}

fn wire(graph: &mut dyn AudioGraphProvider, nodes: &BusNodes) -> Result<(), GraphError> {
    let destination = graph.destination();
    let edges = [
        (nodes.dry, nodes.master),
        (nodes.convolver, nodes.wet),
        (nodes.wet, nodes.master),
        (nodes.master, destination),
        (nodes.master, nodes.tap),
    ];
    for (from, to) in edges {
        graph.connect(from, to)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphRenderer, NativeGraph};

    fn graph() -> (NativeGraph, GraphRenderer) {
        let (mut graph, renderer) = NativeGraph::new(48_000.0);
        graph.resume().expect("resume");
        (graph, renderer)
    }

    #[test]
    fn builds_lazily_and_wires_once() {
        let (mut graph, _renderer) = graph();
        let mut bus = SignalBus::with_seed(&EngineConfig::default(), 7);
        assert!(bus.nodes().is_none());

        let first = bus.ensure(&mut graph).expect("bus");
        let second = bus.ensure(&mut graph).expect("bus");
        assert_eq!(first, second);
        assert!(bus.is_wired());
        assert_eq!(graph.node_count(), 6);

        let master_inputs = graph.inputs_of(first.master).expect("master");
        assert_eq!(master_inputs.len(), 2, "no duplicate edges into master");
        assert_eq!(
            graph.inputs_of(graph.destination()).expect("destination"),
            &[first.master][..]
        );
        assert_eq!(graph.inputs_of(first.tap).expect("tap"), &[first.master][..]);
    }

    #[test]
    fn tap_builds_the_bus() {
        let (mut graph, _renderer) = graph();
        let mut bus = SignalBus::with_seed(&EngineConfig::default(), 7);
        let tap = bus.tap(&mut graph).expect("tap");
        assert_eq!(bus.nodes().map(|n| n.tap), Some(tap));
    }

    #[test]
    fn dry_and_wet_always_sum_to_one() {
        let mut bus = SignalBus::with_seed(&EngineConfig::default(), 1);
        for i in 0..=1000 {
            let ratio = i as f64 / 1000.0;
            for enabled in [false, true] {
                bus.set_wet(None, ratio, enabled).expect("no graph");
                assert_eq!(
                    bus.dry_gain() + bus.wet_gain(),
                    1.0,
                    "ratio {ratio}, enabled {enabled}"
                );
            }
        }
    }

    #[test]
    fn disabled_reverb_is_fully_dry() {
        let (mut graph, _renderer) = graph();
        let mut bus = SignalBus::with_seed(&EngineConfig::default(), 3);
        let nodes = bus.ensure(&mut graph).expect("bus");

        bus.set_wet(Some(&mut graph), 0.4, false).expect("mix");
        assert_eq!(graph.param_value(nodes.dry, ParamKind::Gain), Ok(1.0));
        assert_eq!(graph.param_value(nodes.wet, ParamKind::Gain), Ok(0.0));

        bus.set_wet(Some(&mut graph), 0.4, true).expect("mix");
        assert_eq!(graph.param_value(nodes.wet, ParamKind::Gain), Ok(0.4));
        let dry = graph.param_value(nodes.dry, ParamKind::Gain).expect("dry");
        assert!((dry - 0.6).abs() < 1e-6);
    }

    #[test]
    fn initial_mix_follows_config() {
        let (mut graph, _renderer) = graph();
        let config = EngineConfig::default().with_reverb(true, 0.25);
        let mut bus = SignalBus::with_seed(&config, 3);
        let nodes = bus.ensure(&mut graph).expect("bus");
        assert_eq!(graph.param_value(nodes.wet, ParamKind::Gain), Ok(0.25));
        assert_eq!(graph.param_value(nodes.dry, ParamKind::Gain), Ok(0.75));
    }

    #[test]
    fn teardown_allows_rebuild() {
        let (mut graph, _renderer) = graph();
        let mut bus = SignalBus::with_seed(&EngineConfig::default(), 9);
        let first = bus.ensure(&mut graph).expect("bus");
        bus.teardown(&mut graph);
        assert_eq!(graph.node_count(), 1);
        assert!(!bus.is_wired());

        let second = bus.ensure(&mut graph).expect("rebuilt bus");
        assert_ne!(first, second);
        assert_eq!(graph.node_count(), 6);
    }

    #[test]
    fn failed_build_releases_what_it_created() {
        let (mut graph, _renderer) = graph();
        // Leave room for two of the five bus nodes.
        for _ in 0..crate::graph::native::MAX_NODES - 3 {
            graph
                .create_node(NodeSpec::Gain { gain: 1.0 })
                .expect("filler node");
        }
        let before = graph.node_count();

        let mut bus = SignalBus::with_seed(&EngineConfig::default(), 2);
        assert!(matches!(
            bus.ensure(&mut graph),
            Err(crate::error::AudioError::Graph(GraphError::CapacityExceeded(_)))
        ));
        assert_eq!(graph.node_count(), before);
        assert!(bus.nodes().is_none());
        assert!(!bus.is_wired());
    }
}

